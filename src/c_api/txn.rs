//! `fdb_txn_begin` / `fdb_txn_commit` / `fdb_txn_abort` / `fdb_apply` /
//! `fdb_update_block` / `fdb_delete_block`.

use std::os::raw::c_int;

use crate::c_api::blob::{slice_or_empty, write_error_blob, LgBlob};
use crate::c_api::db::FdbDbOpaque;
use crate::error::FdbError;
use crate::handle::{FdbDb, FdbTxnHandle};
use crate::transaction::TxnMode;

/// Opaque transaction handle, never dereferenced by callers.
#[repr(C)]
pub struct FdbTxnOpaque {
    _opaque: [u8; 0],
}

/// Transaction access mode, fixed at `begin` time.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum LgTxnMode {
    ReadOnly = 0,
    ReadWrite = 1,
}

impl From<LgTxnMode> for TxnMode {
    fn from(mode: LgTxnMode) -> Self {
        match mode {
            LgTxnMode::ReadOnly => TxnMode::ReadOnly,
            LgTxnMode::ReadWrite => TxnMode::ReadWrite,
        }
    }
}

/// Result of `apply`: a reserved block id plus a status blob.
#[repr(C)]
pub struct LgResult {
    pub data: LgBlob,
    pub provenance: LgBlob,
    pub status: c_int,
    pub error_blob: LgBlob,
}

impl LgResult {
    fn err(e: FdbError) -> Self {
        let mut out = LgResult {
            data: LgBlob::empty(),
            provenance: LgBlob::empty(),
            status: e.status(),
            error_blob: LgBlob::empty(),
        };
        write_error_blob(&mut out.error_blob, &e);
        out
    }
}

/// Begins a transaction against `db`.
///
/// # Safety
/// `db` must be a live handle returned by [`super::db::fdb_db_open`].
/// `out_txn`/`out_err` must be valid pointers (or null, for `out_err`).
#[no_mangle]
pub unsafe extern "C" fn fdb_txn_begin(
    db: *mut FdbDbOpaque,
    mode: LgTxnMode,
    out_txn: *mut *mut FdbTxnOpaque,
    out_err: *mut LgBlob,
) -> c_int {
    let db_ptr = db as *mut FdbDb;
    if let Err(e) = unsafe { FdbDb::from_raw(db_ptr) } {
        write_error_blob(out_err, &e);
        return e.status();
    }

    let txn_ptr = unsafe { FdbTxnHandle::begin(db_ptr, mode.into()) };
    if !out_txn.is_null() {
        unsafe { *out_txn = txn_ptr as *mut FdbTxnOpaque };
    }
    0
}

/// Commits a transaction (the six-phase WAL, §4.3).
///
/// # Safety
/// `txn` must be a live handle returned by [`fdb_txn_begin`] and not yet
/// finished.
#[no_mangle]
pub unsafe extern "C" fn fdb_txn_commit(txn: *mut FdbTxnOpaque, out_err: *mut LgBlob) -> c_int {
    let txn_ptr = txn as *mut FdbTxnHandle;
    if let Err(e) = unsafe { FdbTxnHandle::from_raw(txn_ptr) } {
        write_error_blob(out_err, &e);
        return e.status();
    }
    match unsafe { FdbTxnHandle::commit(txn_ptr) } {
        Ok(()) => 0,
        Err(e) => {
            write_error_blob(out_err, &e);
            e.status()
        }
    }
}

/// Aborts a transaction, discarding all buffered operations.
///
/// # Safety
/// `txn` must be a live handle returned by [`fdb_txn_begin`] and not yet
/// finished.
#[no_mangle]
pub unsafe extern "C" fn fdb_txn_abort(txn: *mut FdbTxnOpaque) -> c_int {
    let txn_ptr = txn as *mut FdbTxnHandle;
    if unsafe { FdbTxnHandle::from_raw(txn_ptr) }.is_err() {
        return crate::error::ErrorKind::InvalidArgument.to_status();
    }
    match unsafe { FdbTxnHandle::abort(txn_ptr) } {
        Ok(()) => 0,
        Err(e) => e.status(),
    }
}

/// Applies an insert operation within a transaction, returning a status
/// blob referencing the reserved block id.
///
/// # Safety
/// `txn` must be a live handle. `op_ptr`/`op_len` must describe a valid
/// byte slice for the duration of this call.
#[no_mangle]
pub unsafe extern "C" fn fdb_apply(txn: *mut FdbTxnOpaque, op_ptr: *const u8, op_len: usize) -> LgResult {
    let txn_ptr = txn as *mut FdbTxnHandle;
    let handle = match unsafe { FdbTxnHandle::from_raw(txn_ptr) } {
        Ok(h) => h,
        Err(e) => return LgResult::err(e),
    };

    if op_ptr.is_null() && op_len > 0 {
        return LgResult::err(FdbError::new(
            crate::error::ErrorKind::InvalidArgument,
            "null op pointer with nonzero length",
        ));
    }
    // SAFETY: caller guarantees `op_ptr` is valid for `op_len` bytes when
    // non-null; the null-with-nonzero-length case is rejected just above.
    let data = unsafe { slice_or_empty(op_ptr, op_len) };

    // SAFETY: `handle` was just validated live via `from_raw` above.
    match unsafe { handle.apply(data) } {
        Ok(result) => LgResult {
            data: LgBlob::from_json(&crate::json::apply_result(result.block_id)),
            provenance: LgBlob::empty(),
            status: 0,
            error_blob: LgBlob::empty(),
        },
        Err(e) => LgResult::err(e),
    }
}

/// Buffers an update to an existing block.
///
/// # Safety
/// Same pointer-validity requirements as [`fdb_apply`].
#[no_mangle]
pub unsafe extern "C" fn fdb_update_block(
    txn: *mut FdbTxnOpaque,
    id: u64,
    data_ptr: *const u8,
    data_len: usize,
    out_err: *mut LgBlob,
) -> c_int {
    let txn_ptr = txn as *mut FdbTxnHandle;
    let handle = match unsafe { FdbTxnHandle::from_raw(txn_ptr) } {
        Ok(h) => h,
        Err(e) => {
            write_error_blob(out_err, &e);
            return e.status();
        }
    };

    if data_ptr.is_null() && data_len > 0 {
        let e = FdbError::new(crate::error::ErrorKind::InvalidArgument, "null data pointer with nonzero length");
        write_error_blob(out_err, &e);
        return e.status();
    }
    // SAFETY: see the matching comment in `fdb_apply` above.
    let data = unsafe { slice_or_empty(data_ptr, data_len) };

    match handle.update_block(id, data) {
        Ok(()) => 0,
        Err(e) => {
            write_error_blob(out_err, &e);
            e.status()
        }
    }
}

/// Buffers a deletion of `id`.
///
/// # Safety
/// `txn` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn fdb_delete_block(txn: *mut FdbTxnOpaque, id: u64, out_err: *mut LgBlob) -> c_int {
    let txn_ptr = txn as *mut FdbTxnHandle;
    let handle = match unsafe { FdbTxnHandle::from_raw(txn_ptr) } {
        Ok(h) => h,
        Err(e) => {
            write_error_blob(out_err, &e);
            return e.status();
        }
    };

    match handle.delete_block(id) {
        Ok(()) => 0,
        Err(e) => {
            write_error_blob(out_err, &e);
            e.status()
        }
    }
}
