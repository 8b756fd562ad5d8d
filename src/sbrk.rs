use std::ptr::NonNull;

use libc::{c_void, intptr_t, sbrk};
use log::debug;

use crate::source::PoolSource;

/// The process data segment, grown by moving the program break with
/// `sbrk(2)`.
///
/// The break is process-wide state. Other code in the process (including the
/// platform `malloc`) may move it too, which is fine: every region handed out
/// here stays ours, it just may not be adjacent to the previous one. The break
/// is never lowered.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sbrk;

unsafe impl PoolSource for Sbrk {
  fn end(&self) -> *mut u8 {
    program_break()
  }

  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>> {
    let increment = intptr_t::try_from(increment).ok()?;

    let address = unsafe { sbrk(increment) };

    if address == usize::MAX as *mut c_void {
      debug!("sbrk({increment}) refused");
      return None;
    }

    NonNull::new(address.cast())
  }
}

/// Current program break, as reported by `sbrk(0)`.
pub fn program_break() -> *mut u8 {
  unsafe { sbrk(0) }.cast()
}

/// Prints one allocation together with the program break it left behind.
pub fn report_alloc(
  size: usize,
  addr: Option<NonNull<u8>>,
) {
  println!(
    "Allocated {} bytes, address = {:?}, program break = {:?}",
    size,
    addr.map_or(std::ptr::null_mut(), NonNull::as_ptr),
    program_break()
  );
}
