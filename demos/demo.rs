//! Interactive walkthrough of `rallocator`'s public surface.
//!
//! Run with `cargo run --example demo` and watch the program break move
//! (e.g. with `pmap`, `htop`, or a debugger attached) as each step runs.

use libc::sbrk;
use rallocator::Allocator;

fn block_until_enter_pressed() {
  use std::io::Read;
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

unsafe fn print_program_break(label: &str) {
  println!("[{}] PID = {}, program break (sbrk(0)) = {:?}", label, std::process::id(), unsafe { sbrk(0) });
}

fn main() {
  let allocator = Allocator::new();

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // 1) Allocate 32 bytes and write a pattern.
    println!("\n[1] alloc(32)");
    let p = allocator.alloc(32);
    println!("[1] returned {:?}, heap stats = {:?}", p, allocator.stats());
    std::ptr::write_bytes(p, 0xAB, 32);
    block_until_enter_pressed();

    // 2) Allocate a second, larger block.
    println!("\n[2] alloc(256)");
    let q = allocator.alloc(256);
    println!("[2] returned {:?}, heap stats = {:?}", q, allocator.stats());
    std::ptr::write_bytes(q, 0xCD, 256);
    block_until_enter_pressed();

    // 3) calloc: zeroed memory.
    println!("\n[3] calloc(5, 32)");
    let z = allocator.calloc(5, 32);
    let all_zero = (0..160).all(|i| *z.add(i) == 0);
    println!("[3] returned {:?}, all zero = {}", z, all_zero);
    block_until_enter_pressed();

    // 4) Shrink q via realloc: splits off and frees the remainder.
    println!("\n[4] realloc(q, 64) — shrink");
    let q2 = allocator.realloc(q, 64);
    println!("[4] returned {:?} (same address: {}), heap stats = {:?}", q2, q2 == q, allocator.stats());
    block_until_enter_pressed();

    // 5) Free everything and watch the index absorb it into one block.
    println!("\n[5] free(p), free(z), free(q2)");
    allocator.free(p);
    allocator.free(z);
    allocator.free(q2);
    println!("[5] heap stats = {:?}", allocator.stats());
    block_until_enter_pressed();

    // 6) A large allocation after freeing should reuse the coalesced region
    //    rather than extending the heap, if it fits.
    print_program_break("before large alloc");
    println!("\n[6] alloc(300) — should reuse freed space if it fits");
    let big = allocator.alloc(300);
    println!("[6] returned {:?}, heap stats = {:?}", big, allocator.stats());
    print_program_break("after large alloc");

    println!("\n[7] End of demo. Process exit reclaims all memory.");
  }
}
