//! The `{ptr, len}` owned-buffer type crossing the FFI boundary, and its
//! allocation/release helpers.

/// An owned byte buffer returned by the bridge. `ptr == null` iff `len ==
/// 0`. Non-empty blobs are caller-owned until passed to
/// [`fdb_blob_free`].
#[repr(C)]
#[derive(Debug)]
pub struct LgBlob {
    pub ptr: *mut u8,
    pub len: usize,
}

impl LgBlob {
    /// The canonical empty blob.
    pub fn empty() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }

    /// Leaks `bytes` into a caller-owned blob. An empty `bytes` yields
    /// [`LgBlob::empty`] rather than a non-null zero-length pointer.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        let mut boxed = bytes.into_boxed_slice();
        let ptr = boxed.as_mut_ptr();
        let len = boxed.len();
        std::mem::forget(boxed);
        Self { ptr, len }
    }

    /// Leaks a JSON value's compact serialized form into a blob.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::from_vec(value.to_string().into_bytes())
    }
}

/// Frees a blob previously returned by the bridge. `blob` may point at a
/// zeroed/empty `LgBlob`; freeing it is then a no-op.
///
/// # Safety
/// `blob` must be null or point at an `LgBlob` whose `ptr`/`len` were
/// produced by this bridge and not already freed.
#[no_mangle]
pub unsafe extern "C" fn fdb_blob_free(blob: *mut LgBlob) {
    if blob.is_null() {
        return;
    }
    let blob = unsafe { &mut *blob };
    if !blob.ptr.is_null() {
        // SAFETY: non-null `ptr`/`len` pairs on an `LgBlob` were always
        // produced by `LgBlob::from_vec`'s `Box<[u8]>::into_raw`-equivalent
        // leak above, so reconstructing and dropping a boxed slice here is
        // the matching deallocation.
        let slice = unsafe { std::slice::from_raw_parts_mut(blob.ptr, blob.len) };
        drop(unsafe { Box::from_raw(slice as *mut [u8]) });
        blob.ptr = std::ptr::null_mut();
        blob.len = 0;
    }
}

/// Builds an error blob and writes it to `*out_err`, if `out_err` is
/// non-null.
pub(crate) fn write_error_blob(out_err: *mut LgBlob, err: &crate::error::FdbError) {
    if out_err.is_null() {
        return;
    }
    let blob = LgBlob::from_json(&crate::json::error_blob(err));
    unsafe { *out_err = blob };
}

/// Builds a `&[u8]` from a `(ptr, len)` pair crossing the ABI boundary.
/// `from_raw_parts` requires a non-null pointer even for a zero-length
/// slice, so a null `ptr` takes the empty-slice path instead of ever
/// reaching `from_raw_parts`.
///
/// # Safety
/// If `len > 0`, `ptr` must be valid for reads of `len` bytes for the
/// duration of the caller's use of the returned slice. Callers must reject
/// a null `ptr` paired with a nonzero `len` before calling this.
pub(crate) unsafe fn slice_or_empty<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}
