//! Zero-on-allocate heap helpers for values crossing the boundary.
//!
//! Everything handed to the foreign caller comes from here (or from
//! `CString` for plain strings), so unset fields are always null/zero and
//! never garbage. A zero-sized request still yields a live allocation: a
//! non-null pointer must be distinguishable from allocation failure.
//! Allocation failure itself is fatal and aborts via `handle_alloc_error`;
//! it is never reported as a normal error.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ffi::c_char;

fn zeroed(layout: Layout) -> *mut u8 {
    // SAFETY: layout has non-zero size; both call sites guarantee it.
    let ptr = unsafe { alloc_zeroed(layout) };
    if ptr.is_null() {
        handle_alloc_error(layout);
    }
    ptr
}

/// Allocate one zeroed `T`.
pub(crate) fn calloc_one<T>() -> *mut T {
    calloc_slice::<T>(1)
}

/// Allocate a zeroed array of `count` `T`s. `count == 0` still allocates.
pub(crate) fn calloc_slice<T>(count: usize) -> *mut T {
    let layout = match Layout::array::<T>(count) {
        Ok(layout) if layout.size() > 0 => layout,
        Ok(_) => Layout::new::<u8>(),
        // Arithmetic overflow on the requested size: treat like exhaustion.
        Err(_) => handle_alloc_error(Layout::new::<T>()),
    };
    zeroed(layout).cast()
}

/// Release an allocation from `calloc_one`. NULL is a no-op.
pub(crate) unsafe fn free_one<T>(ptr: *mut T) {
    free_slice(ptr, 1);
}

/// Release an allocation from `calloc_slice` with the same `count`.
pub(crate) unsafe fn free_slice<T>(ptr: *mut T, count: usize) {
    if ptr.is_null() {
        return;
    }
    let layout = match Layout::array::<T>(count) {
        Ok(layout) if layout.size() > 0 => layout,
        Ok(_) => Layout::new::<u8>(),
        Err(_) => return,
    };
    dealloc(ptr.cast(), layout);
}

/// Copy arbitrary bytes into a fresh length+1 allocation; the zeroing
/// provides the trailing NUL. Free with [`free_bytes_nul`] and the same
/// length.
pub(crate) fn malloc_bytes_nul(data: &[u8]) -> *mut c_char {
    let ptr = calloc_slice::<u8>(data.len() + 1);
    // SAFETY: ptr has room for len+1 bytes and cannot overlap a fresh
    // allocation.
    unsafe {
        std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
    }
    ptr.cast()
}

pub(crate) unsafe fn free_bytes_nul(ptr: *mut c_char, length: u64) {
    let Some(count) = (length as usize).checked_add(1) else {
        return;
    };
    free_slice(ptr.cast::<u8>(), count);
}
