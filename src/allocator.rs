use std::{fmt, ptr::NonNull};

use log::{debug, error, trace};
use static_assertions::assert_not_impl_any;

use crate::{
  AllocatorBuilder, FixedPool, ReleasePolicy,
  align::{checked_align, padding_for},
  block::{Block, HEADER_SIZE},
  error::{Error, Result},
  ledger::{Blocks, Ledger, Scan},
  source::PoolSource,
};

/// A first-fit free-list allocator over a pool that only ever grows.
///
/// Every allocation is preceded in the pool by a small header recording its
/// size and whether it is free. Released regions stay where they are and are
/// handed out again to the first later request they are large enough for,
/// whole: free regions are never split or merged, and the pool is never
/// shrunk.
///
/// # Thread safety
///
/// The allocator is neither [`Send`] nor [`Sync`]: it must stay on the thread
/// that created it, and every operation needs `&mut self`.
///
/// # Examples
///
/// ```rust
/// use tinyalloc::{Allocator, FixedPool};
///
/// let mut buffer = [0u8; 512];
/// let mut allocator = Allocator::new(FixedPool::new(&mut buffer));
///
/// let first = allocator.allocate(128).unwrap();
/// unsafe { allocator.release(Some(first)) };
///
/// let second = allocator.allocate(64).unwrap();
/// assert_eq!(first, second);
/// ```
pub struct Allocator<S: PoolSource> {
  source: S,
  ledger: Ledger,
  release_policy: ReleasePolicy,
}

assert_not_impl_any!(Allocator<FixedPool<'static>>: Send, Sync);

impl<S: PoolSource> Allocator<S> {
  /// Creates an allocator with the default configuration.
  pub fn new(source: S) -> Self {
    Self::from_parts(source, ReleasePolicy::default())
  }

  pub fn builder() -> AllocatorBuilder {
    AllocatorBuilder::new()
  }

  pub(crate) fn from_parts(
    source: S,
    release_policy: ReleasePolicy,
  ) -> Self {
    Self {
      source,
      ledger: Ledger::new(),
      release_policy,
    }
  }

  /// Allocates at least `size` bytes, aligned to
  /// [`ALIGNMENT`](crate::align::ALIGNMENT).
  ///
  /// Returns `None` for a zero-size request, without touching any state.
  ///
  /// # Panics
  ///
  /// Panics if the pool source refuses to grow. There is no recovery from an
  /// exhausted pool.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if size == 0 {
      trace!("rejecting zero-size allocation");
      return None;
    }

    let Some(size) = checked_align(size) else {
      self.exhausted(size);
    };

    // SAFETY: the ledger only ever links headers written by `request_space`.
    let block = match unsafe { self.ledger.find_free_block(size) } {
      None => self.request_space(None, size),
      Some(Scan::NotFound { last }) => self.request_space(Some(last), size),
      Some(Scan::Found(block)) => {
        unsafe { (*block.as_ptr()).is_free = false };
        block
      }
    };

    let payload = Block::payload(block);
    trace!("allocated {size} bytes at {payload:?}");

    Some(payload)
  }

  /// Marks the region behind `ptr` as free so a later allocation can reuse
  /// it. `None` is ignored.
  ///
  /// The memory is not cleared and is not given back to the pool source.
  ///
  /// # Safety
  ///
  /// Under [`ReleasePolicy::Unchecked`] `ptr` must have been returned by
  /// [`allocate`](Self::allocate) on this allocator and not released since.
  /// Under [`ReleasePolicy::Checked`] any pointer is accepted and misuse
  /// panics instead.
  ///
  /// In both cases the caller must not access the region after releasing it.
  pub unsafe fn release(
    &mut self,
    ptr: Option<NonNull<u8>>,
  ) {
    let Some(ptr) = ptr else {
      return;
    };

    match self.release_policy {
      ReleasePolicy::Unchecked => {
        unsafe { (*Block::from_payload(ptr).as_ptr()).is_free = true };
        trace!("released {ptr:?}");
      }
      ReleasePolicy::Checked => {
        if let Err(error) = self.try_release(ptr) {
          panic!("invalid release: {error}");
        }
      }
    }
  }

  /// Like [`release`](Self::release), but confirms that `ptr` is a live
  /// allocation of this allocator first. This walks the whole ledger.
  ///
  /// # Errors
  ///
  /// [`Error::ForeignPointer`] if `ptr` was never returned by this allocator,
  /// [`Error::DoubleRelease`] if it has already been released. Nothing is
  /// modified in either case.
  pub fn try_release(
    &mut self,
    ptr: NonNull<u8>,
  ) -> Result<()> {
    let address = ptr.as_ptr() as usize;

    // SAFETY: the ledger only ever links headers written by `request_space`,
    // and `lookup` only returns one of them.
    let Some(block) = (unsafe { self.ledger.lookup(ptr) }) else {
      return Err(Error::ForeignPointer { address });
    };
    let header = unsafe { &mut *block.as_ptr() };

    if header.is_free {
      return Err(Error::DoubleRelease { address });
    }

    header.is_free = true;
    trace!("released {ptr:?}");

    Ok(())
  }

  /// Grows the pool by one header plus `size` bytes and appends the new,
  /// used record after `last`.
  fn request_space(
    &mut self,
    last: Option<NonNull<Block>>,
    size: usize,
  ) -> NonNull<Block> {
    let end = self.source.end();
    let padding = padding_for(end as usize);

    let Some(increment) = size
      .checked_add(HEADER_SIZE)
      .and_then(|total| total.checked_add(padding))
    else {
      self.exhausted(size);
    };

    let Some(region) = self.source.extend(increment) else {
      self.exhausted(size);
    };
    debug_assert_eq!(region.as_ptr(), end, "pool sources grant from their end");

    // SAFETY: the source granted `padding + HEADER_SIZE + size` writable bytes
    // at `region`, and `padding` brings the header onto an aligned address.
    let block = unsafe {
      let block = region.add(padding).cast::<Block>();
      block.write(Block::new(size, false, None));
      self.ledger.append(last, block);
      block
    };

    debug!("grew pool by {increment} bytes for a {size}-byte block at {block:?}");

    block
  }

  #[cold]
  #[track_caller]
  fn exhausted(
    &self,
    size: usize,
  ) -> ! {
    error!(
      "pool exhausted: cannot grow for a {size}-byte block (pool end = {:?})",
      self.source.end()
    );
    panic!("pool exhausted: cannot grow for a {size}-byte block");
  }

  /// The records carved from the pool so far, in the order they were created.
  pub fn blocks(&self) -> Blocks<'_> {
    self.ledger.blocks()
  }

  /// Number of records ever created, used or free.
  pub fn len(&self) -> usize {
    self.ledger.len()
  }

  /// Whether the pool has not been grown yet.
  pub fn is_empty(&self) -> bool {
    self.ledger.head().is_none()
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  pub fn release_policy(&self) -> ReleasePolicy {
    self.release_policy
  }
}

#[cfg(unix)]
impl Default for Allocator<crate::Sbrk> {
  fn default() -> Self {
    Self::new(crate::Sbrk)
  }
}

impl<S: PoolSource + fmt::Debug> fmt::Debug for Allocator<S> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Allocator")
      .field("source", &self.source)
      .field("ledger", &self.ledger)
      .field("release_policy", &self.release_policy)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::ptr;

  use super::*;
  use crate::align::ALIGNMENT;

  #[repr(C, align(8))]
  struct Heap<const N: usize>([u8; N]);

  impl<const N: usize> Heap<N> {
    fn new() -> Self {
      Self([0; N])
    }

    fn base(&self) -> usize {
      self.0.as_ptr() as usize
    }
  }

  fn sizes_and_flags<S: PoolSource>(
    allocator: &Allocator<S>,
  ) -> Vec<(usize, bool)> {
    allocator
      .blocks()
      .map(|info| (info.size, info.is_free))
      .collect()
  }

  #[test_log::test]
  fn test_first_allocation_grows_pool() {
    let mut heap = Heap::<256>::new();
    let base = heap.base();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    assert!(allocator.is_empty());

    let payload = allocator.allocate(5).unwrap();

    assert_eq!(payload.as_ptr() as usize, base + HEADER_SIZE);
    assert_eq!(allocator.source().used(), 8 + HEADER_SIZE);
    assert_eq!(sizes_and_flags(&allocator), [(8, false)]);
    assert!(!allocator.is_empty());
  }

  #[test_log::test]
  fn test_records_are_laid_out_back_to_back() {
    let mut heap = Heap::<512>::new();
    let base = heap.base();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    let a = allocator.allocate(10).unwrap();
    let b = allocator.allocate(32).unwrap();
    let c = allocator.allocate(1).unwrap();

    assert_eq!(a.as_ptr() as usize, base + HEADER_SIZE);
    assert_eq!(b.as_ptr() as usize, base + 2 * HEADER_SIZE + 16);
    assert_eq!(c.as_ptr() as usize, base + 3 * HEADER_SIZE + 16 + 32);
    assert_eq!(allocator.len(), 3);
  }

  #[test_log::test]
  fn test_payloads_are_aligned_even_on_a_misaligned_pool() {
    let mut heap = Heap::<1024>::new();
    let base = heap.base();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0[3..]));

    let first = allocator.allocate(1).unwrap();
    assert_eq!(first.as_ptr() as usize % ALIGNMENT, 0);
    assert_eq!(first.as_ptr() as usize, base + 8 + HEADER_SIZE);
    // Five bytes of padding brought the first header onto a boundary.
    assert_eq!(allocator.source().used(), 5 + HEADER_SIZE + 8);

    for size in [3, 17, 8, 100, 7] {
      let payload = allocator.allocate(size).unwrap();
      assert_eq!(payload.as_ptr() as usize % ALIGNMENT, 0);
    }
  }

  #[test_log::test]
  fn test_zero_size_is_rejected_without_side_effects() {
    let mut heap = Heap::<256>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    assert_eq!(allocator.allocate(0), None);
    assert!(allocator.is_empty());
    assert_eq!(allocator.source().used(), 0);

    allocator.allocate(16).unwrap();
    let used = allocator.source().used();

    assert_eq!(allocator.allocate(0), None);
    assert_eq!(allocator.len(), 1);
    assert_eq!(allocator.source().used(), used);
  }

  #[test_log::test]
  fn test_reuse_after_release() {
    let mut heap = Heap::<512>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    let first = allocator.allocate(128).unwrap();
    unsafe { first.cast::<i32>().write(42) };
    unsafe { allocator.release(Some(first)) };
    let used = allocator.source().used();

    let second = allocator.allocate(64).unwrap();

    assert_eq!(first, second);
    assert_eq!(allocator.source().used(), used);
    // Reused whole: the record keeps its original size.
    assert_eq!(sizes_and_flags(&allocator), [(128, false)]);
  }

  #[test_log::test]
  fn test_first_fit_takes_earliest_large_enough_record() {
    let mut heap = Heap::<1024>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    let small = allocator.allocate(16).unwrap();
    let large = allocator.allocate(64).unwrap();
    let medium = allocator.allocate(32).unwrap();
    unsafe {
      allocator.release(Some(small));
      allocator.release(Some(large));
      allocator.release(Some(medium));
    }

    let picked = allocator.allocate(20).unwrap();

    assert_eq!(picked, large);
    assert_eq!(
      sizes_and_flags(&allocator),
      [(16, true), (64, false), (32, true)]
    );
  }

  #[test_log::test]
  fn test_no_fit_appends_after_tail() {
    let mut heap = Heap::<1024>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    let a = allocator.allocate(8).unwrap();
    let _b = allocator.allocate(8).unwrap();
    unsafe { allocator.release(Some(a)) };

    let c = allocator.allocate(24).unwrap();

    let payloads: Vec<_> = allocator.blocks().map(|info| info.payload).collect();
    assert_eq!(payloads.len(), 3);
    assert_eq!(payloads[2], c);
    assert_eq!(
      sizes_and_flags(&allocator),
      [(8, true), (8, false), (24, false)]
    );
  }

  #[test_log::test]
  fn test_live_regions_do_not_alias() {
    let mut heap = Heap::<1024>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    let sizes = [13usize, 40, 8, 99];
    let regions: Vec<_> = sizes
      .iter()
      .map(|&size| (allocator.allocate(size).unwrap(), size))
      .collect();

    for (index, &(ptr, size)) in regions.iter().enumerate() {
      unsafe { ptr::write_bytes(ptr.as_ptr(), index as u8 + 1, size) };
    }

    for (index, &(ptr, size)) in regions.iter().enumerate() {
      let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), size) };
      assert!(bytes.iter().all(|&byte| byte == index as u8 + 1));
    }

    // Headers survived the writes.
    assert_eq!(
      sizes_and_flags(&allocator),
      [(16, false), (40, false), (8, false), (104, false)]
    );
  }

  #[test_log::test]
  fn test_double_release_is_idempotent() {
    let mut heap = Heap::<256>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    let ptr = allocator.allocate(32).unwrap();

    unsafe { allocator.release(Some(ptr)) };
    assert_eq!(sizes_and_flags(&allocator), [(32, true)]);

    unsafe { allocator.release(Some(ptr)) };
    assert_eq!(sizes_and_flags(&allocator), [(32, true)]);

    assert_eq!(allocator.allocate(32), Some(ptr));
  }

  #[test_log::test]
  fn test_release_none_is_noop() {
    let mut heap = Heap::<256>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    unsafe { allocator.release(None) };
    assert!(allocator.is_empty());

    allocator.allocate(8).unwrap();
    unsafe { allocator.release(None) };
    assert_eq!(sizes_and_flags(&allocator), [(8, false)]);
  }

  #[test_log::test]
  fn test_try_release_reports_misuse() {
    let mut heap = Heap::<256>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    let ptr = allocator.allocate(16).unwrap();
    let inside = unsafe { ptr.add(8) };

    assert_eq!(
      allocator.try_release(inside),
      Err(Error::ForeignPointer {
        address: inside.as_ptr() as usize
      })
    );
    assert_eq!(sizes_and_flags(&allocator), [(16, false)]);

    assert_eq!(allocator.try_release(ptr), Ok(()));
    assert_eq!(
      allocator.try_release(ptr),
      Err(Error::DoubleRelease {
        address: ptr.as_ptr() as usize
      })
    );
    assert_eq!(sizes_and_flags(&allocator), [(16, true)]);
  }

  #[test_log::test]
  fn test_try_release_on_empty_pool_is_foreign() {
    let mut heap = Heap::<64>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));
    let mut outside = 0u64;
    let ptr = NonNull::from(&mut outside).cast::<u8>();

    assert!(matches!(
      allocator.try_release(ptr),
      Err(Error::ForeignPointer { .. })
    ));
  }

  #[test_log::test]
  #[should_panic(expected = "was already released")]
  fn test_checked_policy_panics_on_double_release() {
    let mut heap = Heap::<256>::new();
    let mut allocator = Allocator::<FixedPool>::builder()
      .release_policy(ReleasePolicy::Checked)
      .build(FixedPool::new(&mut heap.0));

    let ptr = allocator.allocate(16);
    unsafe {
      allocator.release(ptr);
      allocator.release(ptr);
    }
  }

  #[test_log::test]
  #[should_panic(expected = "was not allocated by this allocator")]
  fn test_checked_policy_panics_on_foreign_pointer() {
    let mut heap = Heap::<256>::new();
    let mut allocator = Allocator::<FixedPool>::builder()
      .release_policy(ReleasePolicy::Checked)
      .build(FixedPool::new(&mut heap.0));
    let mut outside = [0u8; 8];

    allocator.allocate(16).unwrap();
    unsafe { allocator.release(Some(NonNull::from(&mut outside).cast())) };
  }

  #[test_log::test]
  #[should_panic(expected = "pool exhausted")]
  fn test_exhaustion_is_fatal() {
    let mut heap = Heap::<64>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    allocator.allocate(64);
  }

  #[test_log::test]
  #[should_panic(expected = "pool exhausted")]
  fn test_unrepresentable_size_is_fatal() {
    let mut heap = Heap::<64>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    allocator.allocate(usize::MAX);
  }

  #[test_log::test]
  fn test_free_record_is_reused_before_growing() {
    let mut heap = Heap::<128>::new();
    let mut allocator = Allocator::new(FixedPool::new(&mut heap.0));

    // Fill most of the pool, then cycle one slot many times.
    let ptr = allocator.allocate(64).unwrap();
    for _ in 0..100 {
      unsafe { allocator.release(Some(ptr)) };
      assert_eq!(allocator.allocate(40), Some(ptr));
    }

    assert_eq!(allocator.len(), 1);
  }
}
