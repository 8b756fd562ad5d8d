//! # tinyalloc - A First-Fit Free-List Allocator
//!
//! This crate provides a minimal dynamic memory allocator that carves
//! variably-sized regions out of a pool that only ever grows, without going
//! through the platform's general-purpose allocator.
//!
//! ## Overview
//!
//! Every region handed out is preceded by a small header. The headers form a
//! singly linked list in the order the regions were created:
//!
//! ```text
//!   Pool Layout:
//!
//!   ┌────────┬──────────────┬────────┬──────────┬────────┬──────────────────┐
//!   │ Block  │  payload A   │ Block  │ payload B│ Block  │    payload C     │
//!   │ used   │  (32 bytes)  │ free   │ (16 b.)  │ used   │    (64 bytes)    │
//!   └───┬────┴──────────────┴───┬────┴──────────┴───┬────┴──────────────────┘
//!       │          next         ▲        next       ▲
//!       └───────────────────────┘───────────────────┘
//!       ▲
//!       └── head
//! ```
//!
//! An allocation walks the list from the head and takes the **first** free
//! block that is large enough. If there is none, the pool is grown by exactly
//! one header plus the requested size and a new block is appended at the tail.
//! Releasing only flips the block's `is_free` flag.
//!
//! ## Crate Structure
//!
//! ```text
//!   tinyalloc
//!   ├── align      - Alignment macro and helpers (align!)
//!   ├── block      - Block header layout (internal)
//!   ├── ledger     - The block list and the first-fit scan (internal)
//!   ├── source     - PoolSource trait and FixedPool
//!   ├── sbrk       - Sbrk pool source (Unix)
//!   ├── builder    - AllocatorBuilder and ReleasePolicy
//!   ├── error      - Errors reported by checked release
//!   └── allocator  - Allocator implementation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tinyalloc::Allocator;
//!
//! fn main() {
//!     // Grows the process data segment with sbrk(2).
//!     let mut allocator = Allocator::default();
//!
//!     let ptr = allocator.allocate(128).unwrap();
//!
//!     unsafe {
//!         ptr.cast::<i32>().write(42);
//!         allocator.release(Some(ptr));
//!     }
//!
//!     // The freed block is large enough, so it is handed out again.
//!     assert_eq!(allocator.allocate(64), Some(ptr));
//! }
//! ```
//!
//! ## How It Works
//!
//! Each allocation creates or reuses a block with metadata:
//!
//! ```text
//!   Single Allocation:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ is_free: false  │  │  │                          │  │
//!   │  │ next: null/ptr  │  │  │  N bytes usable (N % 8   │  │
//!   │  └─────────────────┘  │  │  == 0, 8-byte aligned)   │  │
//!   │      24 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! Requested sizes are rounded up to a multiple of 8 so that the next header,
//! and therefore the next payload, stays 8-byte aligned.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: [`Allocator`] is neither `Send` nor `Sync`
//! - **No splitting**: a reused block keeps its full size
//! - **No coalescing**: adjacent free blocks are never merged
//! - **Grow-only pool**: nothing is ever returned to the OS
//! - **Fatal exhaustion**: a pool that cannot grow panics the caller
//!
//! ## Safety
//!
//! Allocating is safe. Releasing is `unsafe`: with the default
//! [`ReleasePolicy::Unchecked`], releasing a pointer that did not come from
//! [`Allocator::allocate`] is undefined behavior. [`Allocator::try_release`]
//! and [`ReleasePolicy::Checked`] validate the pointer first.

pub mod align;
mod allocator;
mod block;
mod builder;
mod error;
mod ledger;
#[cfg(unix)]
mod sbrk;
mod source;

pub use allocator::Allocator;
pub use builder::{AllocatorBuilder, ReleasePolicy};
pub use error::{Error, Result};
pub use ledger::{BlockInfo, Blocks};
#[cfg(unix)]
pub use sbrk::{Sbrk, program_break, report_alloc};
pub use source::{FixedPool, PoolSource};
