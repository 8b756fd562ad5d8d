use std::{fmt, iter::FusedIterator, marker::PhantomData, ptr::NonNull};

use log::trace;

use crate::block::Block;

/// Outcome of a first-fit scan over the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
  /// The earliest free record large enough for the request.
  Found(NonNull<Block>),
  /// Nothing fits. `last` is the tail of the chain, which is where the next
  /// record must be appended.
  NotFound { last: NonNull<Block> },
}

/// Read-only view of one record in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// The pointer handed out for this record.
  pub payload: NonNull<u8>,
  /// Usable payload bytes, already rounded.
  pub size: usize,
  /// Whether the record is available for reuse.
  pub is_free: bool,
}

/// Every record ever carved from the pool, in the order they were created.
///
/// Records are never unlinked, so the chain only ever grows at its tail.
pub(crate) struct Ledger {
  head: Option<NonNull<Block>>,
  tail: Option<NonNull<Block>>,
  len: usize,
}

impl Ledger {
  pub fn new() -> Self {
    Self {
      head: None,
      tail: None,
      len: 0,
    }
  }

  pub fn head(&self) -> Option<NonNull<Block>> {
    self.head
  }

  pub fn len(&self) -> usize {
    self.len
  }

  /// First-fit search. Returns `None` when the ledger is still empty.
  ///
  /// # Safety
  ///
  /// Every record reachable from the head must be a live header.
  pub unsafe fn find_free_block(
    &self,
    size: usize,
  ) -> Option<Scan> {
    unsafe {
      let mut current = self.head?;

      loop {
        let block = current.as_ref();

        if block.is_free && block.size >= size {
          trace!("first fit for {size} bytes: {:?} ({} bytes)", current, block.size);
          return Some(Scan::Found(current));
        }

        match block.next {
          Some(next) => current = next,
          None => return Some(Scan::NotFound { last: current }),
        }
      }
    }
  }

  /// Links `block` after the current tail. The first record appended becomes
  /// the head.
  ///
  /// # Safety
  ///
  /// `block` must be a live header with `next == None` that is not already in
  /// the chain, and `last` must be the current tail.
  pub unsafe fn append(
    &mut self,
    last: Option<NonNull<Block>>,
    block: NonNull<Block>,
  ) {
    debug_assert_eq!(last, self.tail, "records are only ever appended at the tail");

    unsafe {
      match last {
        Some(mut last) => last.as_mut().next = Some(block),
        None => self.head = Some(block),
      }
    }

    self.tail = Some(block);
    self.len += 1;
  }

  /// Walks the chain looking for the record that owns `payload`.
  ///
  /// # Safety
  ///
  /// Every record reachable from the head must be a live header.
  pub unsafe fn lookup(
    &self,
    payload: NonNull<u8>,
  ) -> Option<NonNull<Block>> {
    let mut current = self.head;

    while let Some(block) = current {
      if Block::payload(block) == payload {
        return Some(block);
      }
      current = unsafe { block.as_ref().next };
    }

    None
  }

  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      current: self.head,
      remaining: self.len,
      _ledger: PhantomData,
    }
  }
}

impl fmt::Debug for Ledger {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_list().entries(self.blocks()).finish()
  }
}

/// Iterator over the ledger's records, head to tail.
///
/// Created by [`Allocator::blocks`](crate::Allocator::blocks).
#[derive(Debug)]
pub struct Blocks<'a> {
  current: Option<NonNull<Block>>,
  remaining: usize,
  _ledger: PhantomData<&'a Ledger>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let block = self.current?;
    // SAFETY: the borrow of the ledger keeps every record live and unmodified.
    let header = unsafe { block.as_ref() };

    self.current = header.next;
    self.remaining -= 1;

    Some(BlockInfo {
      payload: Block::payload(block),
      size: header.size,
      is_free: header.is_free,
    })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl ExactSizeIterator for Blocks<'_> {}

impl FusedIterator for Blocks<'_> {}
