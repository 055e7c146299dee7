//! Access-grant operations.

use std::ffi::c_char;
use std::ptr;

use bridge_core::{AccessEntry, BridgeError, Entry, Handle, Result, Scope, ScopeConfig};

use crate::alloc::free_one;
use crate::error::{depot_free_error, malloc_error};
use crate::types::{
    DepotAccess, DepotAccessResult, DepotConfig, DepotEncryptionKey, DepotError, DepotStringResult,
    HandleStruct,
};
use crate::universe::universe;
use crate::util::{
    client_config_from_c, free_cstr, lookup, malloc_cstr, malloc_handle, required_str,
};

/// Parses a serialized access grant.
#[no_mangle]
pub unsafe extern "C" fn depot_parse_access(access_string: *const c_char) -> DepotAccessResult {
    match parse_access_impl(access_string) {
        Ok(access) => DepotAccessResult {
            access,
            error: ptr::null_mut(),
        },
        Err(err) => DepotAccessResult {
            access: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn parse_access_impl(access_string: *const c_char) -> Result<*mut DepotAccess> {
    let serialized = required_str(access_string, "access_string")?;
    let universe = universe()?;
    let grant = universe.client()?.parse_access(serialized)?;
    let handle = universe.registry().add(Entry::Access(AccessEntry { grant }));
    Ok(malloc_handle(handle.raw()))
}

/// Requests a new access grant from the satellite using a passphrase.
#[no_mangle]
pub unsafe extern "C" fn depot_request_access_with_passphrase(
    config: DepotConfig,
    satellite_address: *const c_char,
    api_key: *const c_char,
    passphrase: *const c_char,
) -> DepotAccessResult {
    match request_access_impl(config, satellite_address, api_key, passphrase) {
        Ok(access) => DepotAccessResult {
            access,
            error: ptr::null_mut(),
        },
        Err(err) => DepotAccessResult {
            access: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn request_access_impl(
    config: DepotConfig,
    satellite_address: *const c_char,
    api_key: *const c_char,
    passphrase: *const c_char,
) -> Result<*mut DepotAccess> {
    let satellite_address = required_str(satellite_address, "satellite_address")?;
    let api_key = required_str(api_key, "api_key")?;
    let passphrase = required_str(passphrase, "passphrase")?;

    let universe = universe()?;
    let client = universe.client()?;
    let client_config = client_config_from_c(&config);

    // The request has no owning session yet; give it a scope of its own.
    let scope = Scope::root(ScopeConfig {
        temp_directory: client_config.temp_directory.clone(),
    });
    let grant = universe.runtime().run(
        &scope,
        client.request_access_with_passphrase(&client_config, satellite_address, api_key, passphrase),
    )?;
    let handle = universe.registry().add(Entry::Access(AccessEntry { grant }));
    Ok(malloc_handle(handle.raw()))
}

/// Serializes an access grant for later parsing.
#[no_mangle]
pub unsafe extern "C" fn depot_access_serialize(access: *mut DepotAccess) -> DepotStringResult {
    match access_serialize_impl(access) {
        Ok(string) => DepotStringResult {
            string,
            error: ptr::null_mut(),
        },
        Err(err) => DepotStringResult {
            string: ptr::null_mut(),
            error: malloc_error(&err),
        },
    }
}

unsafe fn access_serialize_impl(access: *mut DepotAccess) -> Result<*mut c_char> {
    let universe = universe()?;
    let entry = lookup(universe, access, "access")?;
    let grant = &entry
        .as_access()
        .ok_or(BridgeError::InvalidHandle("access"))?
        .grant;
    let serialized = grant.serialize()?;
    Ok(malloc_cstr(&serialized))
}

/// Overrides the content key for `bucket`/`prefix` with a derived key.
#[no_mangle]
pub unsafe extern "C" fn depot_access_override_encryption_key(
    access: *mut DepotAccess,
    bucket: *const c_char,
    prefix: *const c_char,
    encryption_key: *mut DepotEncryptionKey,
) -> *mut DepotError {
    match override_encryption_key_impl(access, bucket, prefix, encryption_key) {
        Ok(()) => ptr::null_mut(),
        Err(err) => malloc_error(&err),
    }
}

unsafe fn override_encryption_key_impl(
    access: *mut DepotAccess,
    bucket: *const c_char,
    prefix: *const c_char,
    encryption_key: *mut DepotEncryptionKey,
) -> Result<()> {
    let bucket = required_str(bucket, "bucket")?;
    let prefix = required_str(prefix, "prefix")?;

    let universe = universe()?;
    let access_entry = lookup(universe, access, "access")?;
    let grant = &access_entry
        .as_access()
        .ok_or(BridgeError::InvalidHandle("access"))?
        .grant;

    let key_entry = lookup(universe, encryption_key, "encryption_key")?;
    let key = key_entry
        .as_encryption_key()
        .ok_or(BridgeError::InvalidHandle("encryption_key"))?;

    grant.override_encryption_key(bucket, prefix, key)?;
    Ok(())
}

/// Frees a string result.
#[no_mangle]
pub unsafe extern "C" fn depot_free_string_result(result: DepotStringResult) {
    depot_free_error(result.error);
    free_cstr(result.string);
}

/// Frees an access result and releases its handle.
#[no_mangle]
pub unsafe extern "C" fn depot_free_access_result(result: DepotAccessResult) {
    depot_free_error(result.error);
    free_access(result.access);
}

unsafe fn free_access(access: *mut DepotAccess) {
    if access.is_null() {
        return;
    }
    let handle = Handle::from_raw((*access).raw());
    if let Ok(universe) = universe() {
        if let Some(entry) = universe.registry().get(handle) {
            if entry.as_access().is_some() {
                universe.registry().del(handle);
            }
        }
    }
    free_one(access);
}
