//! Shared implementation of the three-call iterator protocol.
//!
//! Every listing kind exposes the same four functions: `next` advances the
//! cursor, `err` reports the terminal error, `item` marshals the current
//! element, `free` cancels the iterator's scope and releases the handle.
//! The factories stay hand-written per kind; the protocol itself is
//! generated here so its semantics cannot drift between kinds.

macro_rules! iterator_api {
    (
        iterator: $iterator:ty,
        item: $item:ty,
        as_cursor: $as_cursor:ident,
        malloc_item: $malloc_item:path,
        kind: $kind:literal,
        next: $next:ident,
        err: $err:ident,
        item_fn: $item_fn:ident,
        free: $free:ident,
    ) => {
        /// Prepares the next element for reading.
        ///
        /// Returns false at the end of the iteration or on error; consult
        /// the matching `_err` function to tell the two apart.
        #[no_mangle]
        pub unsafe extern "C" fn $next(iterator: *mut $iterator) -> bool {
            let Ok(universe) = crate::universe::universe() else {
                return false;
            };
            if iterator.is_null() {
                return false;
            }
            let handle = bridge_core::Handle::from_raw((*iterator)._handle);
            let Some(entry) = universe.registry().get(handle) else {
                return false;
            };
            let Some(cursor) = entry.$as_cursor() else {
                return false;
            };
            let result = crate::util::lock_cursor(cursor).advance(universe.runtime());
            result
        }

        /// Returns the error, if one happened during iteration. Natural
        /// exhaustion reports NULL.
        #[no_mangle]
        pub unsafe extern "C" fn $err(
            iterator: *mut $iterator,
        ) -> *mut crate::types::DepotError {
            let Ok(universe) = crate::universe::universe() else {
                return std::ptr::null_mut();
            };
            if iterator.is_null() {
                return crate::error::malloc_error(&bridge_core::BridgeError::NullArgument(
                    "iterator",
                ));
            }
            let handle = bridge_core::Handle::from_raw((*iterator)._handle);
            let Some(entry) = universe.registry().get(handle) else {
                return crate::error::malloc_error(&bridge_core::BridgeError::InvalidHandle($kind));
            };
            let Some(cursor) = entry.$as_cursor() else {
                return crate::error::malloc_error(&bridge_core::BridgeError::InvalidHandle($kind));
            };
            let result = match crate::util::lock_cursor(cursor).error() {
                Some(err) => crate::error::malloc_error(err),
                None => std::ptr::null_mut(),
            };
            result
        }

        /// Returns the current element, freshly allocated for the caller.
        /// Only valid right after a `next` that returned true; otherwise
        /// NULL.
        #[no_mangle]
        pub unsafe extern "C" fn $item_fn(iterator: *mut $iterator) -> *mut $item {
            let Ok(universe) = crate::universe::universe() else {
                return std::ptr::null_mut();
            };
            if iterator.is_null() {
                return std::ptr::null_mut();
            }
            let handle = bridge_core::Handle::from_raw((*iterator)._handle);
            let Some(entry) = universe.registry().get(handle) else {
                return std::ptr::null_mut();
            };
            let Some(cursor) = entry.$as_cursor() else {
                return std::ptr::null_mut();
            };
            let result = match crate::util::lock_cursor(cursor).item() {
                Some(item) => $malloc_item(item),
                None => std::ptr::null_mut(),
            };
            result
        }

        /// Frees the iterator, canceling any in-flight page fetch first.
        /// NULL and already-freed handles are no-ops.
        #[no_mangle]
        pub unsafe extern "C" fn $free(iterator: *mut $iterator) {
            if iterator.is_null() {
                return;
            }
            if let Ok(universe) = crate::universe::universe() {
                let handle = bridge_core::Handle::from_raw((*iterator)._handle);
                if let Some(entry) = universe.registry().get(handle) {
                    if let Some(cursor) = entry.$as_cursor() {
                        crate::util::lock_cursor(cursor).scope().cancel();
                        universe.registry().del(handle);
                    }
                }
            }
            crate::alloc::free_one(iterator);
        }
    };
}

pub(crate) use iterator_api;
