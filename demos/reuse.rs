use std::io::Read;

use tinyalloc::{Allocator, program_break, report_alloc};

/// Waits until the user presses ENTER, when started with `--step`.
/// Useful for inspecting the program break with `pmap` or `gdb` between steps.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

fn main() {
  let step = std::env::args().any(|arg| arg == "--step");

  // Grows the data segment with sbrk(2). Nothing is requested until the
  // first allocation.
  let mut allocator = Allocator::default();

  println!(
    "[start] PID = {}, program break = {:?}",
    std::process::id(),
    program_break()
  );
  pause(step);

  // --------------------------------------------------------------------
  // 1) Allocate 128 bytes and write into them.
  // --------------------------------------------------------------------
  println!("\n[1] Allocating 128 bytes...");
  let data = allocator.allocate(128);
  report_alloc(128, data);

  let Some(data) = data else {
    return;
  };
  unsafe { data.cast::<i32>().write(42) };
  println!(
    "[1] Data stored: {} at {:?}",
    unsafe { data.cast::<i32>().read() },
    data
  );
  pause(step);

  // --------------------------------------------------------------------
  // 2) Free it. The block stays in the list, marked free.
  // --------------------------------------------------------------------
  println!("\n[2] Freeing data...");
  unsafe { allocator.release(Some(data)) };
  pause(step);

  // --------------------------------------------------------------------
  // 3) Allocate 64 bytes. The freed 128-byte block is the first one that
  //    fits, so it is handed out again and the break does not move.
  // --------------------------------------------------------------------
  println!("\n[3] Allocating 64 bytes (should reuse previous block)...");
  let data2 = allocator.allocate(64);
  report_alloc(64, data2);

  println!(
    "[3] data2 == data? {}",
    if data2 == Some(data) {
      "Yes, it reused the freed block"
    } else {
      "No, it allocated somewhere else"
    }
  );

  for block in allocator.blocks() {
    println!(
      "    block at {:?}: {} bytes, {}",
      block.payload,
      block.size,
      if block.is_free { "free" } else { "used" }
    );
  }
}
