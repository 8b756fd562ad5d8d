/// Boundary, in bytes, that every payload and every block header starts on.
pub const ALIGNMENT: usize = 8;

/// Rounds the given size up to the next multiple of [`ALIGNMENT`].
///
/// Usable in `const` context. Overflows like plain addition does, so prefer
/// [`checked_align`] for sizes that come from callers.
///
/// # Examples
///
/// ```rust
/// use tinyalloc::align;
///
/// assert_eq!(align!(1), 8);
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(24), 24);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Rounds `size` up to the next multiple of [`ALIGNMENT`], or `None` if that
/// would overflow `usize`.
pub fn checked_align(size: usize) -> Option<usize> {
  size
    .checked_add(ALIGNMENT - 1)
    .map(|padded| padded & !(ALIGNMENT - 1))
}

/// Number of bytes needed to move `address` forward to the next multiple of
/// [`ALIGNMENT`]. Zero when it is already aligned.
pub fn padding_for(address: usize) -> usize {
  address.wrapping_neg() & (ALIGNMENT - 1)
}
