//! End-to-end exercise of the `extern "C"` bridge itself, as opposed to the
//! safe Rust API covered by `end_to_end.rs`. Every call here goes through the
//! same `fdb_*` entry points an external binding would link against.

use formdb_core::{
    fdb_apply, fdb_blob_free, fdb_db_close, fdb_db_open, fdb_render_journal, fdb_txn_begin,
    fdb_txn_commit, LgBlob, LgRenderOpts, LgTxnMode,
};

fn temp_db_path() -> std::path::PathBuf {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();
    std::fs::remove_file(&path).ok();
    path
}

fn open(path: &std::path::Path) -> *mut formdb_core::c_api::FdbDbOpaque {
    let path_str = path.to_str().unwrap();
    let mut out_db = std::ptr::null_mut();
    let mut out_err = LgBlob::empty();
    let status = unsafe {
        fdb_db_open(
            path_str.as_ptr(),
            path_str.len(),
            std::ptr::null(),
            0,
            &mut out_db,
            &mut out_err,
        )
    };
    assert_eq!(status, 0, "fdb_db_open failed");
    out_db
}

#[test]
fn bridge_drives_open_apply_commit_render_journal_close() {
    let path = temp_db_path();
    let db = open(&path);

    let mut out_txn = std::ptr::null_mut();
    let mut out_err = LgBlob::empty();
    let status = unsafe { fdb_txn_begin(db, LgTxnMode::ReadWrite, &mut out_txn, &mut out_err) };
    assert_eq!(status, 0, "fdb_txn_begin failed");
    assert!(!out_txn.is_null());

    let payload = b"hello from the bridge";
    let result = unsafe { fdb_apply(out_txn, payload.as_ptr(), payload.len()) };
    assert_eq!(result.status, 0, "fdb_apply failed");
    assert!(!result.data.ptr.is_null());
    let applied = unsafe { std::slice::from_raw_parts(result.data.ptr, result.data.len) };
    let applied_json: serde_json::Value = serde_json::from_slice(applied).unwrap();
    assert_eq!(applied_json["status"], "pending");
    let mut data_blob = result.data;
    let mut provenance_blob = result.provenance;
    let mut result_err_blob = result.error_blob;
    unsafe {
        fdb_blob_free(&mut data_blob);
        fdb_blob_free(&mut provenance_blob);
        fdb_blob_free(&mut result_err_blob);
    }

    let mut commit_err = LgBlob::empty();
    let status = unsafe { fdb_txn_commit(out_txn, &mut commit_err) };
    assert_eq!(status, 0, "fdb_txn_commit failed");

    let opts = LgRenderOpts {
        format: 0,
        include_metadata: false,
    };
    let mut out_text = LgBlob::empty();
    let mut render_err = LgBlob::empty();
    let status = unsafe { fdb_render_journal(db, 0, opts, &mut out_text, &mut render_err) };
    assert_eq!(status, 0, "fdb_render_journal failed");
    assert!(!out_text.ptr.is_null());

    let rendered = unsafe { std::slice::from_raw_parts(out_text.ptr, out_text.len) };
    let rendered_json: serde_json::Value = serde_json::from_slice(rendered).unwrap();
    let entries = rendered_json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let message = entries[0]["message"].as_str().unwrap();
    assert!(message.starts_with("INSERT"), "unexpected journal message: {message}");
    assert!(message.contains(&format!("size={}", payload.len())));
    assert!(rendered_json["head"].as_u64().unwrap() >= rendered_json["tail"].as_u64().unwrap());

    unsafe {
        fdb_blob_free(&mut out_text);
    }

    let status = unsafe { fdb_db_close(db) };
    assert_eq!(status, 0, "fdb_db_close failed");
}

#[test]
fn closing_the_database_invalidates_an_open_transaction_across_the_bridge() {
    let path = temp_db_path();
    let db = open(&path);

    let mut out_txn = std::ptr::null_mut();
    let mut out_err = LgBlob::empty();
    let status = unsafe { fdb_txn_begin(db, LgTxnMode::ReadWrite, &mut out_txn, &mut out_err) };
    assert_eq!(status, 0);

    let status = unsafe { fdb_db_close(db) };
    assert_eq!(status, 0);

    let mut commit_err = LgBlob::empty();
    let status = unsafe { fdb_txn_commit(out_txn, &mut commit_err) };
    assert_ne!(status, 0, "commit on a handle orphaned by fdb_db_close must fail");
    assert!(!commit_err.ptr.is_null());
    unsafe {
        fdb_blob_free(&mut commit_err);
    }
}

#[test]
fn null_db_handle_is_rejected_without_a_crash() {
    let mut out_txn = std::ptr::null_mut();
    let mut out_err = LgBlob::empty();
    let status = unsafe {
        fdb_txn_begin(
            std::ptr::null_mut(),
            LgTxnMode::ReadWrite,
            &mut out_txn,
            &mut out_err,
        )
    };
    assert_ne!(status, 0);
    assert!(out_txn.is_null());
    unsafe {
        fdb_blob_free(&mut out_err);
    }
}
