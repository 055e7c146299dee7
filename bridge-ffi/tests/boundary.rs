//! End-to-end tests for the C surface, driven against the in-memory client.
//!
//! Everything here goes through the `depot_*` functions exactly as a foreign
//! caller would: NUL-terminated inputs, result envelopes, explicit frees.

use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::{Arc, Once};

use depot_bridge::*;

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        install_client(Arc::new(client_memory::MemoryClient::new()));
    });
}

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

unsafe fn error_code_of(error: *mut DepotError) -> u32 {
    assert!(!error.is_null(), "expected an error descriptor");
    (*error).code
}

unsafe fn open_project_result() -> (DepotProjectResult, *mut DepotProject) {
    setup();
    let grant = cstr("depot:test-satellite:api-key");
    let access = depot_parse_access(grant.as_ptr());
    assert!(access.error.is_null());
    let project = depot_open_project(access.access);
    assert!(project.error.is_null());
    assert!(!project.project.is_null());
    depot_free_access_result(access);
    let handle = project.project;
    (project, handle)
}

unsafe fn put_object(project: *mut DepotProject, bucket: &str, key: &str, data: &[u8]) {
    let bucket = cstr(bucket);
    let key = cstr(key);
    let upload = depot_upload_object(project, bucket.as_ptr(), key.as_ptr(), ptr::null());
    assert!(upload.error.is_null());
    let write = depot_upload_write(upload.upload, data.as_ptr(), data.len());
    assert!(write.error.is_null());
    assert_eq!(write.bytes_written, data.len());
    let commit = depot_upload_commit(upload.upload);
    assert!(commit.is_null());
    depot_free_upload_result(upload);
}

#[test]
fn null_arguments_are_classified_before_anything_else() {
    setup();
    unsafe {
        let result = depot_parse_access(ptr::null());
        assert!(result.access.is_null());
        assert_eq!(error_code_of(result.error), DEPOT_ERROR_NULL_ARGUMENT);
        depot_free_access_result(result);

        let (project_result, project) = open_project_result();
        let stat = depot_stat_bucket(project, ptr::null());
        assert!(stat.bucket.is_null());
        assert_eq!(error_code_of(stat.error), DEPOT_ERROR_NULL_ARGUMENT);
        depot_free_bucket_result(stat);
        depot_free_project_result(project_result);
    }
}

#[test]
fn create_exists_and_ensure_envelopes() {
    unsafe {
        let (project_result, project) = open_project_result();
        let name = cstr("envelope-bucket");

        let first = depot_create_bucket(project, name.as_ptr());
        assert!(first.error.is_null());
        assert!(!first.bucket.is_null());
        let created_at = (*first.bucket).created;
        assert!(created_at > 0);
        depot_free_bucket_result(first);

        // Second create returns the bucket AND a non-fatal already-exists
        // error; callers that only look at the payload stay correct.
        let again = depot_create_bucket(project, name.as_ptr());
        assert!(!again.bucket.is_null());
        assert_eq!(error_code_of(again.error), DEPOT_ERROR_BUCKET_ALREADY_EXISTS);
        let bucket_name = CStr::from_ptr((*again.bucket).name).to_str().unwrap();
        assert_eq!(bucket_name, "envelope-bucket");
        depot_free_bucket_result(again);

        // Ensure swallows the already-exists case entirely.
        let ensured = depot_ensure_bucket(project, name.as_ptr());
        assert!(!ensured.bucket.is_null());
        assert!(ensured.error.is_null());
        depot_free_bucket_result(ensured);

        depot_free_project_result(project_result);
    }
}

#[test]
fn bucket_sentinels_not_found_and_not_empty() {
    unsafe {
        let (project_result, project) = open_project_result();

        let missing = cstr("sentinel-missing");
        let stat = depot_stat_bucket(project, missing.as_ptr());
        assert_eq!(error_code_of(stat.error), DEPOT_ERROR_BUCKET_NOT_FOUND);
        depot_free_bucket_result(stat);

        let full = cstr("sentinel-full");
        let created = depot_create_bucket(project, full.as_ptr());
        depot_free_bucket_result(created);
        put_object(project, "sentinel-full", "occupant", b"x");

        let delete = depot_delete_bucket(project, full.as_ptr());
        assert_eq!(error_code_of(delete.error), DEPOT_ERROR_BUCKET_NOT_EMPTY);
        depot_free_bucket_result(delete);

        let gone = depot_delete_object(project, full.as_ptr(), cstr("occupant").as_ptr());
        assert!(gone.error.is_null());
        depot_free_object_result(gone);

        let delete = depot_delete_bucket(project, full.as_ptr());
        assert!(delete.error.is_null());
        depot_free_bucket_result(delete);

        depot_free_project_result(project_result);
    }
}

#[test]
fn upload_download_roundtrip_with_custom_metadata() {
    unsafe {
        let (project_result, project) = open_project_result();
        let bucket = cstr("transfer-bucket");
        let key = cstr("greeting");
        depot_free_bucket_result(depot_create_bucket(project, bucket.as_ptr()));

        let upload = depot_upload_object(project, bucket.as_ptr(), key.as_ptr(), ptr::null());
        assert!(upload.error.is_null());

        let write = depot_upload_write(upload.upload, b"hello ".as_ptr(), 6);
        assert!(write.error.is_null());
        let write = depot_upload_write(upload.upload, b"world".as_ptr(), 5);
        assert_eq!(write.bytes_written, 5);

        // Metadata with an embedded NUL must survive the crossing.
        let meta_key = b"content\0kind";
        let meta_value = b"text\0plain";
        let mut entry = DepotCustomMetadataEntry {
            key: meta_key.as_ptr() as *mut _,
            key_length: meta_key.len() as u64,
            value: meta_value.as_ptr() as *mut _,
            value_length: meta_value.len() as u64,
        };
        let custom = DepotCustomMetadata {
            entries: &mut entry,
            count: 1,
        };
        let err = depot_upload_set_custom_metadata(upload.upload, custom);
        assert!(err.is_null());

        let commit = depot_upload_commit(upload.upload);
        assert!(commit.is_null());

        // Writing after commit reports the upload as done.
        let late = depot_upload_write(upload.upload, b"!".as_ptr(), 1);
        assert_eq!(error_code_of(late.error), DEPOT_ERROR_UPLOAD_DONE);
        depot_free_error(late.error);
        depot_free_upload_result(upload);

        let stat = depot_stat_object(project, bucket.as_ptr(), key.as_ptr());
        assert!(stat.error.is_null());
        assert_eq!((*stat.object).system.content_length, 11);
        assert_eq!((*stat.object).custom.count, 1);
        let stored = &*(*stat.object).custom.entries;
        let stored_key =
            std::slice::from_raw_parts(stored.key as *const u8, stored.key_length as usize);
        assert_eq!(stored_key, meta_key);
        depot_free_object_result(stat);

        let download =
            depot_download_object(project, bucket.as_ptr(), key.as_ptr(), ptr::null());
        assert!(download.error.is_null());

        let mut buf = [0u8; 32];
        let mut collected = Vec::new();
        loop {
            let read = depot_download_read(download.download, buf.as_mut_ptr(), buf.len());
            if !read.error.is_null() {
                assert_eq!(error_code_of(read.error), DEPOT_ERROR_EOF);
                assert_eq!(read.bytes_read, 0);
                depot_free_error(read.error);
                break;
            }
            collected.extend_from_slice(&buf[..read.bytes_read]);
        }
        assert_eq!(collected, b"hello world");

        let info = depot_download_info(download.download);
        assert!(info.error.is_null());
        assert_eq!((*info.object).system.content_length, 11);
        depot_free_object_result(info);

        let close = depot_close_download(download.download);
        assert!(close.is_null());
        // The handle is already gone; the free only releases the struct.
        depot_free_download_result(download);

        depot_free_project_result(project_result);
    }
}

#[test]
fn download_window_honors_offset_and_length() {
    unsafe {
        let (project_result, project) = open_project_result();
        let bucket = cstr("window-bucket");
        let key = cstr("alphabet");
        depot_free_bucket_result(depot_create_bucket(project, bucket.as_ptr()));
        put_object(project, "window-bucket", "alphabet", b"abcdefghij");

        let options = DepotDownloadOptions {
            offset: 3,
            length: 4,
        };
        let download = depot_download_object(project, bucket.as_ptr(), key.as_ptr(), &options);
        assert!(download.error.is_null());

        let mut buf = [0u8; 32];
        let read = depot_download_read(download.download, buf.as_mut_ptr(), buf.len());
        assert!(read.error.is_null());
        assert_eq!(&buf[..read.bytes_read], b"defg");

        let eof = depot_download_read(download.download, buf.as_mut_ptr(), buf.len());
        assert_eq!(error_code_of(eof.error), DEPOT_ERROR_EOF);
        depot_free_error(eof.error);

        depot_free_error(depot_close_download(download.download));
        depot_free_download_result(download);
        depot_free_project_result(project_result);
    }
}

#[test]
fn object_iterator_yields_each_item_then_false_with_nil_err() {
    unsafe {
        let (project_result, project) = open_project_result();
        let bucket = cstr("iter-bucket");
        depot_free_bucket_result(depot_create_bucket(project, bucket.as_ptr()));
        for key in ["one", "three", "two"] {
            put_object(project, "iter-bucket", key, b"payload");
        }

        let options = DepotListObjectsOptions {
            prefix: ptr::null(),
            cursor: ptr::null(),
            recursive: true,
            system: true,
            custom: false,
        };
        let iterator = depot_list_objects(project, bucket.as_ptr(), &options);
        assert!(!iterator.is_null());

        let mut keys = Vec::new();
        while depot_object_iterator_next(iterator) {
            let object = depot_object_iterator_item(iterator);
            assert!(!object.is_null());
            keys.push(CStr::from_ptr((*object).key).to_str().unwrap().to_string());
            assert!((*object).system.content_length > 0);
            depot_free_object(object);
        }
        assert_eq!(keys, ["one", "three", "two"]);

        // Natural exhaustion: no terminal error, item is NULL.
        assert!(depot_object_iterator_err(iterator).is_null());
        assert!(depot_object_iterator_item(iterator).is_null());
        // next stays false once exhausted.
        assert!(!depot_object_iterator_next(iterator));

        depot_free_object_iterator(iterator);
        depot_free_project_result(project_result);
    }
}

#[test]
fn non_recursive_listing_collapses_common_prefixes() {
    unsafe {
        let (project_result, project) = open_project_result();
        let bucket = cstr("collapse-bucket");
        depot_free_bucket_result(depot_create_bucket(project, bucket.as_ptr()));
        for key in ["dir/a", "dir/b", "top"] {
            put_object(project, "collapse-bucket", key, b"x");
        }

        let iterator = depot_list_objects(project, bucket.as_ptr(), ptr::null());
        let mut seen = Vec::new();
        while depot_object_iterator_next(iterator) {
            let object = depot_object_iterator_item(iterator);
            let key = CStr::from_ptr((*object).key).to_str().unwrap().to_string();
            seen.push((key, (*object).is_prefix));
            depot_free_object(object);
        }
        assert_eq!(
            seen,
            vec![("dir/".to_string(), true), ("top".to_string(), false)]
        );

        depot_free_object_iterator(iterator);
        depot_free_project_result(project_result);
    }
}

#[test]
fn bucket_iterator_resumes_after_cursor() {
    unsafe {
        let (project_result, project) = open_project_result();
        for name in ["cursor-a", "cursor-b", "cursor-c"] {
            let name = cstr(name);
            depot_free_bucket_result(depot_ensure_bucket(project, name.as_ptr()));
        }

        let cursor = cstr("cursor-a");
        let options = DepotListBucketsOptions {
            cursor: cursor.as_ptr(),
        };
        let iterator = depot_list_buckets(project, &options);
        let mut names = Vec::new();
        while depot_bucket_iterator_next(iterator) {
            let bucket = depot_bucket_iterator_item(iterator);
            names.push(CStr::from_ptr((*bucket).name).to_str().unwrap().to_string());
            depot_free_bucket(bucket);
        }
        assert!(depot_bucket_iterator_err(iterator).is_null());
        assert!(!names.contains(&"cursor-a".to_string()));
        assert!(names.contains(&"cursor-b".to_string()));
        assert!(names.contains(&"cursor-c".to_string()));

        depot_free_bucket_iterator(iterator);
        depot_free_project_result(project_result);
    }
}

#[test]
fn iterator_construction_with_null_bucket_still_yields_a_handle() {
    unsafe {
        let (project_result, project) = open_project_result();

        let iterator = depot_list_objects(project, ptr::null(), ptr::null());
        assert!(!iterator.is_null(), "factory must not return NULL");
        assert!(!depot_object_iterator_next(iterator));

        let err = depot_object_iterator_err(iterator);
        assert_eq!(error_code_of(err), DEPOT_ERROR_NULL_ARGUMENT);
        depot_free_error(err);

        depot_free_object_iterator(iterator);
        depot_free_project_result(project_result);
    }
}

#[test]
fn iterator_construction_with_invalid_project_reports_invalid_handle() {
    setup();
    unsafe {
        // Handle 0 is never issued, so this is a guaranteed-stale reference.
        let mut bogus = DepotProject { _handle: 0 };
        let bucket = cstr("whatever");
        let iterator = depot_list_objects(&mut bogus, bucket.as_ptr(), ptr::null());
        assert!(!iterator.is_null());
        assert!(!depot_object_iterator_next(iterator));

        let err = depot_object_iterator_err(iterator);
        assert_eq!(error_code_of(err), DEPOT_ERROR_INVALID_HANDLE);
        depot_free_error(err);
        depot_free_object_iterator(iterator);
    }
}

#[test]
fn multipart_flow_parts_listing_and_done_sentinels() {
    unsafe {
        let (project_result, project) = open_project_result();
        let bucket = cstr("mp-bucket");
        let key = cstr("assembled");
        depot_free_bucket_result(depot_create_bucket(project, bucket.as_ptr()));

        let begun = depot_begin_upload(project, bucket.as_ptr(), key.as_ptr(), ptr::null());
        assert!(begun.error.is_null());
        let upload_id = CStr::from_ptr((*begun.info).upload_id)
            .to_str()
            .unwrap()
            .to_string();
        depot_free_upload_info_result(begun);
        let upload_id_c = cstr(&upload_id);

        // The pending upload is visible to the uploads listing.
        let uploads = depot_list_uploads(project, bucket.as_ptr(), ptr::null());
        assert!(depot_upload_iterator_next(uploads));
        let pending = depot_upload_iterator_item(uploads);
        assert_eq!(
            CStr::from_ptr((*pending).upload_id).to_str().unwrap(),
            upload_id
        );
        depot_free_upload_info(pending);
        assert!(!depot_upload_iterator_next(uploads));
        assert!(depot_upload_iterator_err(uploads).is_null());
        depot_free_upload_iterator(uploads);

        for (number, data, etag) in [
            (1u32, b"hello ".as_slice(), "etag-1"),
            (2u32, b"world".as_slice(), "etag-2"),
        ] {
            let part = depot_upload_part(
                project,
                bucket.as_ptr(),
                key.as_ptr(),
                upload_id_c.as_ptr(),
                number,
            );
            assert!(part.error.is_null());
            let write = depot_part_upload_write(part.part_upload, data.as_ptr(), data.len());
            assert_eq!(write.bytes_written, data.len());
            let etag = cstr(etag);
            assert!(depot_part_upload_set_etag(part.part_upload, etag.as_ptr()).is_null());

            let info = depot_part_upload_info(part.part_upload);
            assert!(info.error.is_null());
            assert_eq!((*info.part).part_number, number);
            assert_eq!((*info.part).size, data.len() as u64);
            depot_free_part_result(info);

            assert!(depot_part_upload_commit(part.part_upload).is_null());
            depot_free_part_upload_result(part);
        }

        let parts = depot_list_upload_parts(
            project,
            bucket.as_ptr(),
            key.as_ptr(),
            upload_id_c.as_ptr(),
            ptr::null(),
        );
        let mut etags = Vec::new();
        while depot_part_iterator_next(parts) {
            let part = depot_part_iterator_item(parts);
            let etag = std::slice::from_raw_parts(
                (*part).etag as *const u8,
                (*part).etag_length as usize,
            )
            .to_vec();
            etags.push(String::from_utf8(etag).unwrap());
            depot_free_part(part);
        }
        assert_eq!(etags, ["etag-1", "etag-2"]);
        assert!(depot_part_iterator_err(parts).is_null());
        depot_free_part_iterator(parts);

        let committed = depot_commit_upload(
            project,
            bucket.as_ptr(),
            key.as_ptr(),
            upload_id_c.as_ptr(),
            ptr::null(),
        );
        assert!(committed.error.is_null());
        assert_eq!((*committed.object).system.content_length, 11);
        depot_free_commit_upload_result(committed);

        // Late commit and abort both classify as upload-done.
        let again = depot_commit_upload(
            project,
            bucket.as_ptr(),
            key.as_ptr(),
            upload_id_c.as_ptr(),
            ptr::null(),
        );
        assert_eq!(error_code_of(again.error), DEPOT_ERROR_UPLOAD_DONE);
        depot_free_commit_upload_result(again);

        let abort = depot_abort_upload(
            project,
            bucket.as_ptr(),
            key.as_ptr(),
            upload_id_c.as_ptr(),
        );
        assert_eq!(error_code_of(abort), DEPOT_ERROR_UPLOAD_DONE);
        depot_free_error(abort);

        depot_free_project_result(project_result);
    }
}

#[test]
fn move_and_copy_objects_across_buckets() {
    unsafe {
        let (project_result, project) = open_project_result();
        let src = cstr("mv-src");
        let dst = cstr("mv-dst");
        depot_free_bucket_result(depot_create_bucket(project, src.as_ptr()));
        depot_free_bucket_result(depot_create_bucket(project, dst.as_ptr()));
        put_object(project, "mv-src", "original", b"cargo");

        let err = depot_move_object(
            project,
            src.as_ptr(),
            cstr("original").as_ptr(),
            dst.as_ptr(),
            cstr("moved").as_ptr(),
        );
        assert!(err.is_null());

        let old = depot_stat_object(project, src.as_ptr(), cstr("original").as_ptr());
        assert_eq!(error_code_of(old.error), DEPOT_ERROR_OBJECT_NOT_FOUND);
        depot_free_object_result(old);

        let copied = depot_copy_object(
            project,
            dst.as_ptr(),
            cstr("moved").as_ptr(),
            dst.as_ptr(),
            cstr("copied").as_ptr(),
        );
        assert!(copied.error.is_null());
        assert_eq!((*copied.object).system.content_length, 5);
        depot_free_object_result(copied);

        depot_free_project_result(project_result);
    }
}

#[test]
fn access_serialize_and_encryption_key_override() {
    setup();
    unsafe {
        let grant = cstr("depot:test-satellite:serialize-me");
        let access = depot_parse_access(grant.as_ptr());
        assert!(access.error.is_null());

        let serialized = depot_access_serialize(access.access);
        assert!(serialized.error.is_null());
        assert_eq!(
            CStr::from_ptr(serialized.string).to_str().unwrap(),
            "depot:test-satellite:serialize-me"
        );
        depot_free_string_result(serialized);

        let passphrase = cstr("correct horse");
        let salt = b"salty";
        let key = depot_derive_encryption_key(passphrase.as_ptr(), salt.as_ptr(), salt.len());
        assert!(key.error.is_null());

        let err = depot_access_override_encryption_key(
            access.access,
            cstr("tenant-bucket").as_ptr(),
            cstr("tenant-1/").as_ptr(),
            key.encryption_key,
        );
        assert!(err.is_null());

        depot_free_encryption_key_result(key);
        depot_free_access_result(access);
    }
}

#[test]
fn close_project_twice_is_a_noop_and_stale_handles_classify() {
    unsafe {
        let (project_result, project) = open_project_result();

        let first = depot_close_project(project);
        assert!(first.is_null());
        // Second close observes the missing handle and stays silent.
        let second = depot_close_project(project);
        assert!(second.is_null());

        // Operations on the stale handle classify as invalid-handle.
        let bucket = cstr("after-close");
        let stat = depot_stat_bucket(project, bucket.as_ptr());
        assert_eq!(error_code_of(stat.error), DEPOT_ERROR_INVALID_HANDLE);
        depot_free_bucket_result(stat);

        depot_free_project_result(project_result);
    }
}

#[test]
fn frees_tolerate_null_and_empty_results() {
    setup();
    unsafe {
        depot_free_error(ptr::null_mut());
        depot_free_bucket(ptr::null_mut());
        depot_free_object(ptr::null_mut());
        depot_free_upload_info(ptr::null_mut());
        depot_free_part(ptr::null_mut());
        depot_free_bucket_iterator(ptr::null_mut());
        depot_free_object_iterator(ptr::null_mut());
        depot_free_upload_iterator(ptr::null_mut());
        depot_free_part_iterator(ptr::null_mut());
        depot_free_custom_metadata_data(ptr::null_mut());

        depot_free_access_result(DepotAccessResult {
            access: ptr::null_mut(),
            error: ptr::null_mut(),
        });
        depot_free_project_result(DepotProjectResult {
            project: ptr::null_mut(),
            error: ptr::null_mut(),
        });
        depot_free_bucket_result(DepotBucketResult {
            bucket: ptr::null_mut(),
            error: ptr::null_mut(),
        });
        depot_free_object_result(DepotObjectResult {
            object: ptr::null_mut(),
            error: ptr::null_mut(),
        });
        depot_free_upload_result(DepotUploadResult {
            upload: ptr::null_mut(),
            error: ptr::null_mut(),
        });
        depot_free_download_result(DepotDownloadResult {
            download: ptr::null_mut(),
            error: ptr::null_mut(),
        });
        depot_free_string_result(DepotStringResult {
            string: ptr::null_mut(),
            error: ptr::null_mut(),
        });
        assert!(depot_close_project(ptr::null_mut()).is_null());
        assert!(depot_close_download(ptr::null_mut()).is_null());
    }
}
