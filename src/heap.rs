//! The heap extender: the only layer that talks to the operating system.
//!
//! `Heap` wraps [`libc::sbrk`] and records the low and high watermarks of
//! the single, monotonically growing region the allocator manages. Every
//! extension is written up front as one allocated block spanning the new
//! bytes, so the rest of the allocator only ever sees fully-tagged blocks.
//!
//! ```text
//!   first extend(n1)                 second extend(n2)
//!   ┌────────────────┐                ┌────────────────┐
//!   lo               hi ──────────────┤               hi'
//!   └── one alloc'd block, size n1 ───┴── one alloc'd block, size n2 ───┘
//! ```

use core::cell::Cell;

use libc::{c_void, intptr_t, sbrk};

use crate::block;

/// Tracks the managed heap region and extends it via `sbrk`.
///
/// Not thread-safe: callers sharing an `Allocator` across threads must
/// serialize access themselves (see [`crate::global`]).
pub struct Heap {
  lo: Cell<usize>,
  hi: Cell<usize>,
}

impl Heap {
  /// An empty heap: no bytes obtained from the OS yet.
  pub const fn new() -> Self {
    Self { lo: Cell::new(0), hi: Cell::new(0) }
  }

  /// Low watermark: address of the first byte ever obtained from the OS.
  /// `0` before the first successful `extend`.
  pub fn lo(&self) -> usize {
    self.lo.get()
  }

  /// High watermark: address one past the last byte currently managed.
  /// `0` before the first successful `extend`.
  pub fn hi(&self) -> usize {
    self.hi.get()
  }

  /// Whether `addr` falls within `[lo, hi)`.
  pub fn in_heap(&self, addr: usize) -> bool {
    block::in_heap(addr, self.lo(), self.hi())
  }

  /// Requests `n` more bytes from the OS and tags them as one allocated
  /// block. Returns the new block's payload address, or `None` if the OS
  /// declined the request (no partial state change is made in that case).
  ///
  /// # Safety
  /// `n` must already be a multiple of the heap alignment and at least
  /// the minimum block size; this is the caller's (the allocator
  /// facade's) responsibility, not checked here.
  pub unsafe fn extend(&self, n: usize) -> Option<usize> {
    let old_break = unsafe { sbrk(n as intptr_t) };
    if old_break == usize::MAX as *mut c_void {
      log::warn!("sbrk({n}) failed, heap not extended");
      return None;
    }

    let old_break_addr = old_break as usize;
    if self.lo.get() == 0 {
      self.lo.set(old_break_addr);
    }
    let new_hi = old_break_addr + n;
    self.hi.set(new_hi);

    let payload = old_break_addr + block::WORD;
    unsafe { block::write_tags(payload, n, true) };

    log::trace!("heap extended by {n} bytes, hi now {new_hi:#x}");
    Some(payload)
  }
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}
