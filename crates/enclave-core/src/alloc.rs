// Copyright (C) 2026 The Enclave Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

//! Tracking allocator.
//!
//! A thread-local accounting shim installed as the process's global
//! allocator. Every allocation it owns gets a size header prepended so
//! `free`/`realloc` always know how many bytes to subtract, even when the
//! tracker's limit is zero (unlimited). This lets a session arm and disarm
//! a per-thread byte ceiling around an `eval` without the embedded
//! interpreter knowing anything about it.
//!
//! Departure from the source design this is modeled on: that design has
//! `allocate` return a null pointer the moment a request would exceed the
//! limit, trusting the interpreter's own allocator wrapper to notice the
//! null and raise a catchable out-of-memory error. `steel-core`, like
//! virtually all safe Rust, allocates through ordinary `Vec`/`Box` growth,
//! and the standard library's response to a `GlobalAlloc` returning null is
//! `handle_alloc_error`, which aborts the process — there is no catch point
//! inside Steel to recover at. Returning null here would take the whole
//! host down on the first over-limit byte, which directly contradicts "the
//! session remains usable".
//!
//! So this allocator only *rejects* (returns null) when the underlying
//! layout arithmetic itself fails — a real allocator fault, independent of
//! the soft limit. Crossing the configured limit instead just raises
//! `exceeded` and services the request anyway; the session's per-instruction
//! hook (see `engine`) samples `exceeded()` at the same stride as the
//! deadline check and stops execution at the next instruction boundary.
//! Enforcement is therefore cooperative and stride-grained for memory, the
//! same way it already is for the timeout — a deliberate, documented
//! loosening of the limit's precision in exchange for never aborting.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

thread_local! {
    static CURRENT_BYTES: Cell<usize> = const { Cell::new(0) };
    static LIMIT_BYTES: Cell<usize> = const { Cell::new(0) };
    static EXCEEDED: Cell<bool> = const { Cell::new(false) };
}

/// Process-wide count of bytes ever rejected, purely diagnostic.
static TOTAL_REJECTIONS: AtomicUsize = AtomicUsize::new(0);

/// Header prepended to every tracked allocation, carrying its usable size.
const HEADER_SIZE: usize = std::mem::size_of::<usize>();

/// A [`GlobalAlloc`] wrapper that accounts bytes per-thread against a
/// configurable limit (0 = unlimited) and flags an exceeded condition
/// instead of aborting the process.
pub struct TrackingAllocator<A> {
    inner: A,
}

impl TrackingAllocator<System> {
    pub const fn system() -> Self {
        TrackingAllocator { inner: System }
    }
}

impl<A> TrackingAllocator<A> {
    /// Set this thread's byte ceiling. `0` means unlimited. Clears the
    /// exceeded flag.
    pub fn arm(&self, limit_bytes: usize) {
        LIMIT_BYTES.with(|c| c.set(limit_bytes));
        EXCEEDED.with(|c| c.set(false));
    }

    /// Disarm the ceiling (allocations are still tracked and counted, just
    /// never rejected) — the tracker remains armed but
    /// unlimited after eval so post-run marshal calls are still counted.
    pub fn disarm(&self) {
        LIMIT_BYTES.with(|c| c.set(0));
    }

    pub fn current_bytes(&self) -> usize {
        CURRENT_BYTES.with(|c| c.get())
    }

    pub fn limit_bytes(&self) -> usize {
        LIMIT_BYTES.with(|c| c.get())
    }

    pub fn exceeded(&self) -> bool {
        EXCEEDED.with(|c| c.get())
    }

    pub fn clear_exceeded(&self) {
        EXCEEDED.with(|c| c.set(false));
    }

    fn would_exceed(&self, additional: usize) -> bool {
        let limit = LIMIT_BYTES.with(|c| c.get());
        if limit == 0 {
            return false;
        }
        let current = CURRENT_BYTES.with(|c| c.get());
        current.saturating_add(additional) > limit
    }

    /// Flag `exceeded` without rejecting the allocation. See the module
    /// doc comment: a hard rejection here would abort the process.
    fn flag_if_exceeded(&self, additional: usize) {
        if self.would_exceed(additional) {
            EXCEEDED.with(|c| c.set(true));
            TOTAL_REJECTIONS.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn bump(&self, delta: usize) {
        CURRENT_BYTES.with(|c| c.set(c.get() + delta));
    }

    fn unbump(&self, delta: usize) {
        CURRENT_BYTES.with(|c| c.set(c.get().saturating_sub(delta)));
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let requested = layout.size();
        self.flag_if_exceeded(requested);

        let Ok((headered, offset)) = headered_layout(layout) else {
            return std::ptr::null_mut();
        };
        let base = unsafe { self.inner.alloc(headered) };
        if base.is_null() {
            return std::ptr::null_mut();
        }

        self.bump(requested);
        unsafe { write_header(base, offset, requested) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let Ok((headered, offset)) = headered_layout(layout) else {
            return;
        };
        let (base, size) = unsafe { read_header(ptr, offset) };
        self.unbump(size);
        unsafe { self.inner.dealloc(base, headered) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let Ok((old_headered, old_offset)) = headered_layout(layout) else {
            return std::ptr::null_mut();
        };
        let (base, old_size) = unsafe { read_header(ptr, old_offset) };

        if new_size > old_size {
            self.flag_if_exceeded(new_size - old_size);
        }

        let Ok(new_layout) = Layout::from_size_align(new_size, layout.align()) else {
            return std::ptr::null_mut();
        };
        let Ok((new_headered, new_offset)) = headered_layout(new_layout) else {
            return std::ptr::null_mut();
        };

        let new_base = unsafe { self.inner.realloc(base, old_headered, new_headered.size()) };
        if new_base.is_null() {
            return std::ptr::null_mut();
        }

        if new_size >= old_size {
            self.bump(new_size - old_size);
        } else {
            self.unbump(old_size - new_size);
        }
        unsafe { write_header(new_base, new_offset, new_size) }
    }
}

/// Combine the fixed `usize` header with `layout`, respecting `layout`'s own
/// alignment requirement. Returns the combined layout and the byte offset at
/// which the caller's payload begins — not always [`HEADER_SIZE`], since an
/// over-aligned `layout` pads the gap between the header and the payload.
fn headered_layout(layout: Layout) -> Result<(Layout, usize), std::alloc::LayoutError> {
    let header = Layout::new::<usize>();
    let (combined, offset) = header.extend(layout)?;
    Ok((combined.pad_to_align(), offset))
}

/// Write `size` into the header preceding the payload at `base + offset`.
unsafe fn write_header(base: *mut u8, offset: usize, size: usize) -> *mut u8 {
    unsafe {
        let payload = base.add(offset);
        (payload.sub(HEADER_SIZE) as *mut usize).write(size);
        payload
    }
}

/// Given a payload pointer and the offset it was written at, recover the
/// allocation's base pointer and the size stashed in its header.
unsafe fn read_header(payload: *mut u8, offset: usize) -> (*mut u8, usize) {
    unsafe {
        let size = (payload.sub(HEADER_SIZE) as *const usize).read();
        (payload.sub(offset), size)
    }
}
