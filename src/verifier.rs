//! The proof-verifier registry: a process-wide map from proof-type
//! identifier to a registered verification callback.
//!
//! Unlike the database/transaction registries (§4.4, now per-database),
//! this one *is* process-wide by design (§2/§4.5): a process has one set of
//! registered proof types regardless of how many databases are open.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::{ErrorKind, FdbError, Result};

/// A verification callback: given the proof's opaque `data` bytes and the
/// context it was registered with, returns whether the proof holds.
pub type VerifierFn = fn(data: &[u8], context: *mut std::ffi::c_void) -> bool;

/// The `extern "C"` callback shape used by [`crate::c_api::verify`]. Kept
/// distinct from [`VerifierFn`] because it crosses the FFI boundary as a
/// `(ptr, len)` pair rather than a Rust slice — one registry, two calling
/// conventions onto it, so a verifier registered from either side of the
/// bridge is visible to `verify` callers on the other side.
pub type CVerifierFn = extern "C" fn(*const u8, usize, *mut std::ffi::c_void) -> bool;

enum Callback {
    Native(VerifierFn),
    C(CVerifierFn),
}

struct VerifierEntry {
    callback: Callback,
    context: usize,
}

// Raw pointers aren't `Send`/`Sync` by default; the context is opaque to us
// and ownership/thread-safety is the registering collaborator's contract to
// keep, exactly as the bridge ABI's `void *context` parameter implies.
unsafe impl Send for VerifierEntry {}

static VERIFIERS: Lazy<Mutex<HashMap<String, VerifierEntry>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Registers (or overwrites) a verifier for `proof_type`, callable from pure
/// Rust code.
pub fn register_verifier(proof_type: &str, callback: VerifierFn, context: *mut std::ffi::c_void) {
    VERIFIERS.lock().unwrap().insert(
        proof_type.to_string(),
        VerifierEntry {
            callback: Callback::Native(callback),
            context: context as usize,
        },
    );
}

/// Registers (or overwrites) a verifier for `proof_type` using the `extern
/// "C"` callback shape. Used by [`crate::c_api::fdb_register_verifier`] so
/// that a verifier registered by an external runtime is visible to Rust-side
/// [`verify`] callers too, and vice versa.
pub(crate) fn register_c_verifier(proof_type: &str, callback: CVerifierFn, context: *mut std::ffi::c_void) {
    VERIFIERS.lock().unwrap().insert(
        proof_type.to_string(),
        VerifierEntry {
            callback: Callback::C(callback),
            context: context as usize,
        },
    );
}

/// Removes the verifier for `proof_type`, if any.
pub fn unregister_verifier(proof_type: &str) {
    VERIFIERS.lock().unwrap().remove(proof_type);
}

/// Parses `proof_bytes` as `{"type": "...", "data": "..."}`, looks up the
/// verifier by `type`, and invokes it with the `data` bytes. Fails with
/// `not_found` if no verifier is registered for the type, or
/// `invalid_argument` if the JSON doesn't match the expected shape.
pub fn verify(proof_bytes: &[u8]) -> Result<bool> {
    let value: serde_json::Value = serde_json::from_slice(proof_bytes)
        .map_err(|e| FdbError::with_message(ErrorKind::InvalidArgument, format!("malformed proof JSON: {e}")))?;

    let proof_type = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FdbError::new(ErrorKind::InvalidArgument, "proof missing string field \"type\""))?;
    let data = value
        .get("data")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FdbError::new(ErrorKind::InvalidArgument, "proof missing string field \"data\""))?;

    let registry = VERIFIERS.lock().unwrap();
    let entry = registry
        .get(proof_type)
        .ok_or_else(|| FdbError::with_message(ErrorKind::NotFound, format!("no verifier registered for type \"{proof_type}\"")))?;

    let context = entry.context as *mut std::ffi::c_void;
    let valid = match entry.callback {
        Callback::Native(callback) => callback(data.as_bytes(), context),
        Callback::C(callback) => callback(data.as_bytes().as_ptr(), data.len(), context),
    };
    drop(registry);

    Ok(valid)
}

fn accept_all(_data: &[u8], _context: *mut std::ffi::c_void) -> bool {
    true
}

/// Registers accept-all verifiers for the three proof types every fresh
/// process needs so the system is usable end-to-end before a real domain
/// collaborator registers its own.
pub fn init_builtins() {
    register_verifier("fd-holds", accept_all, std::ptr::null_mut());
    register_verifier("normalization", accept_all, std::ptr::null_mut());
    register_verifier("denormalization", accept_all, std::ptr::null_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_fail(_data: &[u8], _context: *mut std::ffi::c_void) -> bool {
        false
    }

    #[test]
    fn dispatches_registered_verifier_with_data() {
        unregister_verifier("test-dispatch");
        register_verifier("test-dispatch", accept_all, std::ptr::null_mut());
        let proof = br#"{"type":"test-dispatch","data":"payload"}"#;
        assert!(verify(proof).unwrap());
        unregister_verifier("test-dispatch");
    }

    #[test]
    fn c_registered_verifier_is_visible_to_native_verify() {
        extern "C" fn always_ok(_data: *const u8, _len: usize, _ctx: *mut std::ffi::c_void) -> bool {
            true
        }
        unregister_verifier("test-c-abi");
        register_c_verifier("test-c-abi", always_ok, std::ptr::null_mut());
        let proof = br#"{"type":"test-c-abi","data":"payload"}"#;
        assert!(verify(proof).unwrap());
        unregister_verifier("test-c-abi");
    }

    #[test]
    fn unknown_type_is_not_found() {
        unregister_verifier("never-registered");
        let proof = br#"{"type":"never-registered","data":"x"}"#;
        assert_eq!(verify(proof).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn malformed_json_is_invalid_argument() {
        assert_eq!(verify(b"not json").unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn rejecting_verifier_reports_invalid() {
        unregister_verifier("test-reject");
        register_verifier("test-reject", always_fail, std::ptr::null_mut());
        let proof = br#"{"type":"test-reject","data":"x"}"#;
        assert!(!verify(proof).unwrap());
        unregister_verifier("test-reject");
    }
}
