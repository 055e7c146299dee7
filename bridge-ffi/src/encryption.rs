//! Encryption-key derivation.

use std::ffi::c_char;
use std::ptr;

use bridge_core::{BridgeError, Entry, Handle, Result};

use crate::alloc::free_one;
use crate::error::{depot_free_error, malloc_error};
use crate::types::{DepotEncryptionKey, DepotEncryptionKeyResult, HandleStruct};
use crate::universe::universe;
use crate::util::{malloc_handle, required_str};

/// Derives a salted encryption key for a passphrase.
///
/// Useful for implementing multitenancy inside a single app bucket; the
/// derived key is combined with an access grant via
/// `depot_access_override_encryption_key`.
#[no_mangle]
pub unsafe extern "C" fn depot_derive_encryption_key(
    passphrase: *const c_char,
    salt: *const u8,
    length: usize,
) -> DepotEncryptionKeyResult {
    match derive_encryption_key_impl(passphrase, salt, length) {
        Ok(encryption_key) => DepotEncryptionKeyResult {
            encryption_key,
            error: ptr::null_mut(),
        },
        Err(err) => DepotEncryptionKeyResult {
            encryption_key: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn derive_encryption_key_impl(
    passphrase: *const c_char,
    salt: *const u8,
    length: usize,
) -> Result<*mut DepotEncryptionKey> {
    let passphrase = required_str(passphrase, "passphrase")?;
    if salt.is_null() && length > 0 {
        return Err(BridgeError::NullArgument("salt"));
    }
    let salt: &[u8] = if length == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(salt, length)
    };

    let universe = universe()?;
    let key = universe.client()?.derive_encryption_key(passphrase, salt)?;
    let handle = universe.registry().add(Entry::EncryptionKey(key));
    Ok(malloc_handle(handle.raw()))
}

/// Frees an encryption-key result and releases its handle.
#[no_mangle]
pub unsafe extern "C" fn depot_free_encryption_key_result(result: DepotEncryptionKeyResult) {
    depot_free_error(result.error);
    free_encryption_key(result.encryption_key);
}

unsafe fn free_encryption_key(encryption_key: *mut DepotEncryptionKey) {
    if encryption_key.is_null() {
        return;
    }
    let handle = Handle::from_raw((*encryption_key).raw());
    if let Ok(universe) = universe() {
        if let Some(entry) = universe.registry().get(handle) {
            if entry.as_encryption_key().is_some() {
                universe.registry().del(handle);
            }
        }
    }
    free_one(encryption_key);
}
