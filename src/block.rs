use std::{mem, ptr::NonNull};

use static_assertions::const_assert_eq;

use crate::{align, align::ALIGNMENT};

/// Metadata written immediately in front of every payload.
#[repr(C, align(8))]
pub struct Block {
  pub size: usize,
  pub is_free: bool,
  pub next: Option<NonNull<Block>>,
}

/// Width of a block header. Stepping back this many bytes from a payload
/// pointer lands on its header.
pub const HEADER_SIZE: usize = align!(mem::size_of::<Block>());

const_assert_eq!(HEADER_SIZE, mem::size_of::<Block>());
const_assert_eq!(HEADER_SIZE % ALIGNMENT, 0);

impl Block {
  pub fn new(
    size: usize,
    is_free: bool,
    next: Option<NonNull<Block>>,
  ) -> Self {
    Self { size, is_free, next }
  }

  /// Payload pointer for the header at `block`.
  pub fn payload(block: NonNull<Block>) -> NonNull<u8> {
    // SAFETY: headers are only ever placed with their payload following them
    // inside the same granted region, so one header past `block` is in bounds.
    unsafe { block.cast::<u8>().add(HEADER_SIZE) }
  }

  /// Recovers the header in front of a payload pointer. This is plain address
  /// arithmetic, not a lookup.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`Block::payload`] on a live header.
  pub unsafe fn from_payload(payload: NonNull<u8>) -> NonNull<Block> {
    unsafe { payload.sub(HEADER_SIZE) }.cast()
  }
}
