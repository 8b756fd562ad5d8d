use thiserror::Error;

/// Misuse detected by the checked release path.
///
/// The unchecked path never produces these: handing it a bad pointer is
/// undefined behavior instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
  /// The pointer was not returned by this allocator.
  #[error("pointer {address:#x} was not allocated by this allocator")]
  ForeignPointer {
    /// Address the caller tried to release.
    address: usize,
  },

  /// The pointer was allocated here but has already been released.
  #[error("pointer {address:#x} was already released")]
  DoubleRelease {
    /// Address the caller tried to release.
    address: usize,
  },
}

/// A specialized `Result` type for allocator operations, returning the
/// crate's [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
