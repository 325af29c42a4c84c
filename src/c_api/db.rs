//! `fdb_db_open` / `fdb_db_close`.

use std::os::raw::c_int;

use crate::c_api::blob::{write_error_blob, LgBlob};
use crate::error::{ErrorKind, FdbError};
use crate::handle::FdbDb;
use crate::store::DbOptions;

/// Opaque database handle, never dereferenced by callers.
#[repr(C)]
pub struct FdbDbOpaque {
    _opaque: [u8; 0],
}

fn path_from_raw(path_ptr: *const u8, path_len: usize) -> Result<String, FdbError> {
    if path_ptr.is_null() || path_len == 0 {
        return Err(FdbError::new(ErrorKind::InvalidArgument, "empty path"));
    }
    // SAFETY: caller guarantees `path_ptr` is valid for `path_len` bytes for
    // the duration of this call, per the ABI contract on every `*_ptr`/
    // `*_len` pair below.
    let bytes = unsafe { std::slice::from_raw_parts(path_ptr, path_len) };
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|_| FdbError::new(ErrorKind::InvalidArgument, "path is not valid UTF-8"))
}

/// Opens or creates a FormDB database file.
///
/// # Safety
/// `path_ptr`/`path_len` must describe a valid UTF-8 byte slice. `out_db`
/// and `out_err` must be valid, non-aliased pointers to writable storage
/// (or null, for `out_err`). `opts_ptr`/`opts_len` are currently unused and
/// accepted only for ABI forward-compatibility with future option blobs.
#[no_mangle]
pub unsafe extern "C" fn fdb_db_open(
    path_ptr: *const u8,
    path_len: usize,
    _opts_ptr: *const u8,
    _opts_len: usize,
    out_db: *mut *mut FdbDbOpaque,
    out_err: *mut LgBlob,
) -> c_int {
    let path = match path_from_raw(path_ptr, path_len) {
        Ok(p) => p,
        Err(e) => {
            write_error_blob(out_err, &e);
            return e.status();
        }
    };

    match FdbDb::open(&path, &DbOptions::default()) {
        Ok(ptr) => {
            if !out_db.is_null() {
                unsafe { *out_db = ptr as *mut FdbDbOpaque };
            }
            0
        }
        Err(e) => {
            write_error_blob(out_err, &e);
            e.status()
        }
    }
}

/// Closes a database, abandoning every live transaction belonging to it.
///
/// # Safety
/// `db` must be a pointer previously returned via `out_db` by
/// [`fdb_db_open`] and not yet closed.
#[no_mangle]
pub unsafe extern "C" fn fdb_db_close(db: *mut FdbDbOpaque) -> c_int {
    match unsafe { FdbDb::close(db as *mut FdbDb) } {
        Ok(()) => 0,
        Err(e) => e.status(),
    }
}
