//! Where the allocator gets its memory from.
//!
//! The allocator only ever asks for more: a [`PoolSource`] hands out fresh
//! regions and never takes them back.

use std::{fmt, marker::PhantomData, ptr::NonNull};

/// A pool that can be extended by a number of bytes.
///
/// # Safety
///
/// Implementors must guarantee that when [`extend`](PoolSource::extend)
/// returns `Some(start)`, the `increment` bytes starting at `start` are
/// writable, are not handed out to anybody else, and stay valid for as long
/// as the source itself is alive. Successive regions need not be contiguous
/// when something else moved the pool's end in between.
pub unsafe trait PoolSource {
  /// Current end of the pool, i.e. where the next region would start if the
  /// pool were extended right now.
  fn end(&self) -> *mut u8;

  /// Grows the pool by `increment` bytes and returns the start of the newly
  /// granted region, which is the value [`end`](PoolSource::end) reported
  /// just before the call. Returns `None`, leaving the pool untouched, if the
  /// pool cannot grow.
  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>>;
}

/// A fixed-capacity pool carved out of a caller-provided buffer.
///
/// Useful for embedded heaps backed by a `static` array and for tests that
/// must not touch the process break. Once the buffer is used up every further
/// extension is denied.
///
/// # Examples
///
/// ```rust
/// use tinyalloc::{FixedPool, PoolSource};
///
/// let mut buffer = [0u8; 64];
/// let mut pool = FixedPool::new(&mut buffer);
///
/// assert!(pool.extend(48).is_some());
/// assert_eq!(pool.remaining(), 16);
/// assert!(pool.extend(32).is_none());
/// ```
pub struct FixedPool<'a> {
  start: NonNull<u8>,
  capacity: usize,
  used: usize,
  _buffer: PhantomData<&'a mut [u8]>,
}

impl<'a> FixedPool<'a> {
  pub fn new(buffer: &'a mut [u8]) -> Self {
    Self {
      capacity: buffer.len(),
      start: NonNull::from(buffer).cast(),
      used: 0,
      _buffer: PhantomData,
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Bytes granted so far.
  pub fn used(&self) -> usize {
    self.used
  }

  pub fn remaining(&self) -> usize {
    self.capacity - self.used
  }
}

unsafe impl PoolSource for FixedPool<'_> {
  fn end(&self) -> *mut u8 {
    self.start.as_ptr().wrapping_add(self.used)
  }

  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>> {
    if increment > self.remaining() {
      return None;
    }

    // SAFETY: `used + increment <= capacity`, so the result stays within (or
    // one past the end of) the borrowed buffer.
    let granted = unsafe { self.start.add(self.used) };
    self.used += increment;

    Some(granted)
  }
}

impl fmt::Debug for FixedPool<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("FixedPool")
      .field("start", &self.start)
      .field("capacity", &self.capacity)
      .field("used", &self.used)
      .finish()
  }
}
