//! `fdb_register_verifier` / `fdb_unregister_verifier` / `fdb_verify`.
//!
//! These delegate to the single process-wide registry in [`crate::verifier`]
//! rather than keeping FFI-side state of their own, so a verifier registered
//! through this `extern "C"` surface is visible to Rust-side
//! [`crate::verifier::verify`] callers, and a verifier registered in pure
//! Rust (including [`crate::verifier::init_builtins`]) is visible here.

use std::os::raw::{c_int, c_void};

use crate::c_api::blob::{write_error_blob, LgBlob};
use crate::error::{ErrorKind, FdbError};
use crate::verifier::CVerifierFn;

fn type_str(type_ptr: *const u8, type_len: usize) -> Result<String, FdbError> {
    if type_ptr.is_null() || type_len == 0 {
        return Err(FdbError::new(ErrorKind::InvalidArgument, "empty proof type"));
    }
    // SAFETY: caller guarantees `type_ptr` is valid for `type_len` bytes for
    // the duration of this call.
    let bytes = unsafe { std::slice::from_raw_parts(type_ptr, type_len) };
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|_| FdbError::new(ErrorKind::InvalidArgument, "proof type is not valid UTF-8"))
}

/// Registers (or overwrites) a verifier callback for `proof_type`.
///
/// # Safety
/// `type_ptr`/`type_len` must describe a valid UTF-8 byte slice for the
/// duration of this call. `callback` must be safe to call with arbitrary
/// `data` bytes and `context`.
#[no_mangle]
pub unsafe extern "C" fn fdb_register_verifier(
    type_ptr: *const u8,
    type_len: usize,
    callback: CVerifierFn,
    context: *mut c_void,
) -> c_int {
    let proof_type = match type_str(type_ptr, type_len) {
        Ok(t) => t,
        Err(e) => return e.status(),
    };
    crate::verifier::register_c_verifier(&proof_type, callback, context);
    0
}

/// Removes the verifier for `proof_type`, if any.
///
/// # Safety
/// `type_ptr`/`type_len` must describe a valid UTF-8 byte slice.
#[no_mangle]
pub unsafe extern "C" fn fdb_unregister_verifier(type_ptr: *const u8, type_len: usize) -> c_int {
    let proof_type = match type_str(type_ptr, type_len) {
        Ok(t) => t,
        Err(e) => return e.status(),
    };
    crate::verifier::unregister_verifier(&proof_type);
    0
}

/// Parses `proof_bytes` as `{"type", "data"}`, dispatches to the registered
/// verifier for `type` (however it was registered, from either side of the
/// bridge), and writes the verdict to `*out_valid`.
///
/// # Safety
/// `proof_ptr`/`proof_len` must describe a valid byte slice. `out_valid`
/// must be a valid pointer (or null, to discard the verdict).
#[no_mangle]
pub unsafe extern "C" fn fdb_verify(
    proof_ptr: *const u8,
    proof_len: usize,
    out_valid: *mut bool,
    out_err: *mut LgBlob,
) -> c_int {
    if proof_ptr.is_null() || proof_len == 0 {
        let e = FdbError::new(ErrorKind::InvalidArgument, "empty proof");
        write_error_blob(out_err, &e);
        return e.status();
    }
    // SAFETY: caller guarantees `proof_ptr` is valid for `proof_len` bytes.
    let bytes = unsafe { std::slice::from_raw_parts(proof_ptr, proof_len) };

    match crate::verifier::verify(bytes) {
        Ok(valid) => {
            if !out_valid.is_null() {
                unsafe { *out_valid = valid };
            }
            0
        }
        Err(e) => {
            write_error_blob(out_err, &e);
            e.status()
        }
    }
}
