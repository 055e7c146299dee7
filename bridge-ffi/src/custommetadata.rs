//! Custom-metadata codec.
//!
//! Metadata crosses the boundary as a flat array of length-prefixed entries
//! sorted ascending by key bytes. Length prefixes (never NUL termination)
//! are what keep embedded NUL bytes intact; the trailing NUL each buffer
//! carries is a convenience for callers with text-only metadata.

use std::slice;

use client_traits::CustomMetadata;

use crate::alloc::{calloc_slice, free_bytes_nul, free_slice, malloc_bytes_nul};
use crate::types::{DepotCustomMetadata, DepotCustomMetadataEntry};

/// Encode a metadata map. Entries come out in lexicographic key order no
/// matter how the map was built, so the encoding is canonical.
pub(crate) fn custom_metadata_to_c(metadata: &CustomMetadata) -> DepotCustomMetadata {
    if metadata.is_empty() {
        return DepotCustomMetadata::default();
    }

    let entries = calloc_slice::<DepotCustomMetadataEntry>(metadata.len());
    for (i, (key, value)) in metadata.iter().enumerate() {
        // SAFETY: i < metadata.len(), within the fresh allocation.
        unsafe {
            entries.add(i).write(DepotCustomMetadataEntry {
                key: malloc_bytes_nul(key),
                key_length: key.len() as u64,
                value: malloc_bytes_nul(value),
                value_length: value.len() as u64,
            });
        }
    }
    DepotCustomMetadata {
        entries,
        count: metadata.len() as u64,
    }
}

/// Decode a metadata array back into a map.
///
/// A well-formed encode never produces duplicate keys, but a malformed
/// buffer must not crash decode: the last occurrence of a key wins.
pub(crate) unsafe fn custom_metadata_from_c(metadata: &DepotCustomMetadata) -> CustomMetadata {
    let mut map = CustomMetadata::new();
    if metadata.entries.is_null() || metadata.count == 0 {
        return map;
    }

    let entries = slice::from_raw_parts(metadata.entries, metadata.count as usize);
    for entry in entries {
        let key = bytes_field(entry.key, entry.key_length);
        let value = bytes_field(entry.value, entry.value_length);
        map.insert(key, value);
    }
    map
}

unsafe fn bytes_field(ptr: *const std::ffi::c_char, length: u64) -> Vec<u8> {
    if ptr.is_null() || length == 0 {
        return Vec::new();
    }
    slice::from_raw_parts(ptr.cast::<u8>(), length as usize).to_vec()
}

/// Frees the entries owned by a metadata value without freeing the struct
/// itself (it is embedded in objects and options). NULL is a no-op.
#[no_mangle]
pub unsafe extern "C" fn depot_free_custom_metadata_data(custom: *mut DepotCustomMetadata) {
    if custom.is_null() {
        return;
    }
    let custom = &mut *custom;
    if custom.entries.is_null() {
        custom.count = 0;
        return;
    }

    let entries = slice::from_raw_parts_mut(custom.entries, custom.count as usize);
    for entry in entries.iter_mut() {
        free_bytes_nul(entry.key, entry.key_length);
        entry.key = std::ptr::null_mut();
        free_bytes_nul(entry.value, entry.value_length);
        entry.value = std::ptr::null_mut();
    }
    free_slice(custom.entries, custom.count as usize);
    custom.entries = std::ptr::null_mut();
    custom.count = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&[u8], &[u8])]) -> CustomMetadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect()
    }

    fn round_trip(input: CustomMetadata) {
        let mut encoded = custom_metadata_to_c(&input);
        let decoded = unsafe { custom_metadata_from_c(&encoded) };
        assert_eq!(decoded, input);
        unsafe { depot_free_custom_metadata_data(&mut encoded) };
        assert!(encoded.entries.is_null());
        assert_eq!(encoded.count, 0);
    }

    #[test]
    fn round_trips_edge_case_maps() {
        round_trip(metadata(&[]));
        round_trip(metadata(&[(b"A", b"B")]));
        round_trip(metadata(&[(b"A", b""), (b"", b"B")]));
        round_trip(metadata(&[(b"", b"")]));
        round_trip(metadata(&[(b"\x00", b"\x00"), (b"\xff", b"\xff")]));
        round_trip(metadata(&[
            (b"nul\x00inside", b"value\x00with\x00nuls"),
            (b"plain", b"text"),
        ]));
    }

    #[test]
    fn encoding_is_sorted_by_key_bytes() {
        // Insertion order differs from byte order on purpose.
        let mut input = CustomMetadata::new();
        for key in [&b"zz"[..], &b"\x01"[..], &b"middle"[..], &b""[..]] {
            input.insert(key.to_vec(), b"v".to_vec());
        }
        let mut encoded = custom_metadata_to_c(&input);
        let entries =
            unsafe { slice::from_raw_parts(encoded.entries, encoded.count as usize) };

        let keys: Vec<Vec<u8>> = entries
            .iter()
            .map(|e| unsafe { bytes_field(e.key, e.key_length) })
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        unsafe { depot_free_custom_metadata_data(&mut encoded) };
    }

    #[test]
    fn decode_attributes_duplicate_keys_to_last_occurrence() {
        // Hand-build a malformed buffer with a duplicated key.
        let duplicated = metadata(&[(b"dup", b"first")]);
        let mut first = custom_metadata_to_c(&duplicated);
        let second_map = metadata(&[(b"dup", b"second")]);
        let mut second = custom_metadata_to_c(&second_map);

        let combined = [
            unsafe { std::ptr::read(first.entries) },
            unsafe { std::ptr::read(second.entries) },
        ];
        let malformed = DepotCustomMetadata {
            entries: combined.as_ptr() as *mut DepotCustomMetadataEntry,
            count: 2,
        };
        let decoded = unsafe { custom_metadata_from_c(&malformed) };
        assert_eq!(decoded.get(&b"dup".to_vec()).unwrap(), b"second");

        unsafe {
            depot_free_custom_metadata_data(&mut first);
            depot_free_custom_metadata_data(&mut second);
        }
    }

    #[test]
    fn free_tolerates_null_and_empty() {
        unsafe {
            depot_free_custom_metadata_data(std::ptr::null_mut());
            let mut empty = DepotCustomMetadata::default();
            depot_free_custom_metadata_data(&mut empty);
        }
    }
}
