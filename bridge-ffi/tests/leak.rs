//! Leak detection: after exercising the full surface and freeing
//! everything, the handle registry must be empty again.
//!
//! This lives in its own integration binary (its own process) so the
//! registry-empty check cannot race handles created by other test suites.

use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

use depot_bridge::*;

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

#[test]
fn full_surface_exercise_leaves_the_universe_empty() {
    install_client(Arc::new(client_memory::MemoryClient::new()));
    assert!(depot_internal_universe_is_empty());

    unsafe {
        let grant = cstr("depot:leak-satellite:key");
        let access = depot_parse_access(grant.as_ptr());
        assert!(access.error.is_null());

        let passphrase = cstr("hunter2");
        let key = depot_derive_encryption_key(passphrase.as_ptr(), b"salt".as_ptr(), 4);
        assert!(key.error.is_null());

        let project = depot_config_open_project(
            DepotConfig {
                user_agent: cstr("leak-test").as_ptr(),
                dial_timeout_milliseconds: 5_000,
                temp_directory: ptr::null(),
            },
            access.access,
        );
        assert!(project.error.is_null());
        let project_handle = project.project;

        let bucket = cstr("leak-bucket");
        depot_free_bucket_result(depot_create_bucket(project_handle, bucket.as_ptr()));

        // Streaming upload + download.
        let object_key = cstr("blob");
        let upload =
            depot_upload_object(project_handle, bucket.as_ptr(), object_key.as_ptr(), ptr::null());
        assert!(upload.error.is_null());
        let write = depot_upload_write(upload.upload, b"leakproof".as_ptr(), 9);
        assert!(write.error.is_null());
        assert!(depot_upload_commit(upload.upload).is_null());
        depot_free_upload_result(upload);

        let download = depot_download_object(
            project_handle,
            bucket.as_ptr(),
            object_key.as_ptr(),
            ptr::null(),
        );
        assert!(download.error.is_null());
        let mut buf = [0u8; 16];
        let read = depot_download_read(download.download, buf.as_mut_ptr(), buf.len());
        assert_eq!(read.bytes_read, 9);
        assert!(depot_close_download(download.download).is_null());
        depot_free_download_result(download);

        // Every iterator kind, including one that failed at construction.
        let buckets = depot_list_buckets(project_handle, ptr::null());
        while depot_bucket_iterator_next(buckets) {
            depot_free_bucket(depot_bucket_iterator_item(buckets));
        }
        depot_free_bucket_iterator(buckets);

        let objects = depot_list_objects(project_handle, bucket.as_ptr(), ptr::null());
        while depot_object_iterator_next(objects) {
            depot_free_object(depot_object_iterator_item(objects));
        }
        depot_free_object_iterator(objects);

        let broken = depot_list_objects(project_handle, ptr::null(), ptr::null());
        assert!(!depot_object_iterator_next(broken));
        depot_free_error(depot_object_iterator_err(broken));
        depot_free_object_iterator(broken);

        // Multipart with one part.
        let begun =
            depot_begin_upload(project_handle, bucket.as_ptr(), object_key.as_ptr(), ptr::null());
        assert!(begun.error.is_null());
        let upload_id = cstr(
            std::ffi::CStr::from_ptr((*begun.info).upload_id)
                .to_str()
                .unwrap(),
        );
        depot_free_upload_info_result(begun);

        let part = depot_upload_part(
            project_handle,
            bucket.as_ptr(),
            object_key.as_ptr(),
            upload_id.as_ptr(),
            1,
        );
        assert!(part.error.is_null());
        let write = depot_part_upload_write(part.part_upload, b"part".as_ptr(), 4);
        assert!(write.error.is_null());
        assert!(depot_part_upload_commit(part.part_upload).is_null());
        depot_free_part_upload_result(part);

        let parts = depot_list_upload_parts(
            project_handle,
            bucket.as_ptr(),
            object_key.as_ptr(),
            upload_id.as_ptr(),
            ptr::null(),
        );
        while depot_part_iterator_next(parts) {
            depot_free_part(depot_part_iterator_item(parts));
        }
        depot_free_part_iterator(parts);

        let uploads = depot_list_uploads(project_handle, bucket.as_ptr(), ptr::null());
        while depot_upload_iterator_next(uploads) {
            depot_free_upload_info(depot_upload_iterator_item(uploads));
        }
        depot_free_upload_iterator(uploads);

        let committed = depot_commit_upload(
            project_handle,
            bucket.as_ptr(),
            object_key.as_ptr(),
            upload_id.as_ptr(),
            ptr::null(),
        );
        assert!(committed.error.is_null());
        depot_free_commit_upload_result(committed);

        assert!(depot_close_project(project_handle).is_null());
        depot_free_project_result(project);
        depot_free_encryption_key_result(key);
        depot_free_access_result(access);
    }

    assert!(depot_internal_universe_is_empty());
}
