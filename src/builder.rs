use crate::{Allocator, PoolSource};

/// Determines how much [`Allocator::release`] trusts its caller.
///
/// # Examples
///
/// ```rust
/// use tinyalloc::{Allocator, FixedPool, ReleasePolicy};
///
/// let mut buffer = [0u8; 256];
/// let allocator = Allocator::<FixedPool>::builder()
///   .release_policy(ReleasePolicy::Checked)
///   .build(FixedPool::new(&mut buffer));
///
/// assert_eq!(allocator.release_policy(), ReleasePolicy::Checked);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ReleasePolicy {
  /// Release steps back from the pointer to its header and marks it free,
  /// nothing else. A pointer that did not come from this allocator, or one
  /// released twice, is undefined behavior. This is the default.
  #[default]
  Unchecked,

  /// Release first walks the ledger to confirm the pointer is a live
  /// allocation of this allocator and panics if it is not.
  Checked,
}

/// Builder for creating an instance of [`Allocator`].
///
/// The pool source is mandatory and is passed to [`build`](Self::build);
/// everything else is optional.
#[derive(Debug, Default)]
#[must_use]
pub struct AllocatorBuilder {
  release_policy: ReleasePolicy,
}

impl AllocatorBuilder {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Sets how [`Allocator::release`] validates its argument.
  pub fn release_policy(
    mut self,
    policy: ReleasePolicy,
  ) -> Self {
    self.release_policy = policy;
    self
  }

  /// Builds an allocator drawing its memory from `source`.
  ///
  /// Nothing is requested from the source until the first allocation.
  pub fn build<S: PoolSource>(
    self,
    source: S,
  ) -> Allocator<S> {
    Allocator::from_parts(source, self.release_policy)
  }
}
