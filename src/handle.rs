//! Opaque database/transaction handles and their registries.
//!
//! The ABI contract (§4.4) calls for two registries — one for databases,
//! one for transactions — so that every bridge call can reject a null or
//! unregistered handle before touching anything. Per the redesign flag in
//! §9 ("process-wide global registries... replace with per-context state"),
//! the transaction registry here is owned per-database rather than process
//! wide: `FdbDb::close` only needs to walk the transactions it itself
//! spawned, and unrelated databases never contend on the same lock. A
//! single process-wide registry remains for `FdbDb` pointers themselves,
//! since `db_open` is the first call across the boundary and has no
//! earlier context to hand the caller.
//!
//! [`FdbTxnHandle`] never stores a reference (or a reference-shaped raw
//! pointer) into its owning [`FdbDb`]'s `BlockFile`: it keeps only the
//! `*mut FdbDb` pointer and a bare [`TxnBuffer`], and re-dereferences the
//! owner pointer for the duration of each call. That means there is no
//! borrow that could ever outlive the `FdbDb` allocation it points into —
//! including for a transaction handle abandoned (and deliberately leaked)
//! by `FdbDb::close` below.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::{ErrorKind, FdbError, Result};
use crate::store::{BlockFile, DbOptions};
use crate::transaction::{ApplyResult, TxnBuffer, TxnMode};

static DB_REGISTRY: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// An open database. Heap-allocated and handed across the FFI boundary as
/// `*mut FdbDb`; never moved after [`FdbDb::open`] returns its pointer.
pub struct FdbDb {
    file: BlockFile,
    /// Addresses of live `FdbTxnHandle` boxes spawned from this database.
    live_txns: Mutex<HashSet<usize>>,
}

impl FdbDb {
    /// Opens or creates a database file and registers the returned handle.
    pub fn open(path: &str, opts: &DbOptions) -> Result<*mut FdbDb> {
        let file = BlockFile::open(path, opts)?;
        let db = Box::new(FdbDb {
            file,
            live_txns: Mutex::new(HashSet::new()),
        });
        let ptr = Box::into_raw(db);
        DB_REGISTRY.lock().unwrap().insert(ptr as usize);
        Ok(ptr)
    }

    /// Whether `ptr` currently names a live, registered database.
    pub fn is_live(ptr: *const FdbDb) -> bool {
        !ptr.is_null() && DB_REGISTRY.lock().unwrap().contains(&(ptr as usize))
    }

    /// Resolves and validates a raw handle, returning a mutable reference
    /// with the handle's natural lifetime. Callers must not outlive the
    /// handle's registration.
    ///
    /// # Safety
    /// `ptr` must either be null (rejected) or a pointer previously
    /// returned by [`FdbDb::open`] and not yet passed to [`FdbDb::close`].
    pub unsafe fn from_raw<'a>(ptr: *mut FdbDb) -> Result<&'a mut FdbDb> {
        if !Self::is_live(ptr) {
            return Err(FdbError::new(ErrorKind::InvalidArgument, "invalid or closed database handle"));
        }
        Ok(unsafe { &mut *ptr })
    }

    /// The underlying block file manager.
    pub fn file_mut(&mut self) -> &mut BlockFile {
        &mut self.file
    }

    /// The underlying block file manager, read-only.
    pub fn file(&self) -> &BlockFile {
        &self.file
    }

    /// Abandons every live transaction belonging to this database (their
    /// handles become invalid; no disk action is taken for them), then
    /// closes the file and frees the handle.
    ///
    /// # Safety
    /// `ptr` must be a pointer previously returned by [`FdbDb::open`] and
    /// not yet closed; it must not be used again after this call returns.
    pub unsafe fn close(ptr: *mut FdbDb) -> Result<()> {
        if !Self::is_live(ptr) {
            return Err(FdbError::new(ErrorKind::InvalidArgument, "invalid or closed database handle"));
        }

        DB_REGISTRY.lock().unwrap().remove(&(ptr as usize));
        let db = unsafe { Box::from_raw(ptr) };

        for addr in db.live_txns.lock().unwrap().drain() {
            let txn_ptr = addr as *mut FdbTxnHandle;
            // SAFETY: every address in `live_txns` was inserted by
            // `FdbTxnHandle::begin` below and only ever removed here or by
            // `FdbTxnHandle::finish`, which also removes it from this set
            // first — so any address still present names a box that has
            // not yet been freed. The box is deliberately *not* freed here:
            // `FdbTxnHandle::is_live` dereferences this same pointer to read
            // `invalidated`, and a caller may still hold it and probe
            // liveness (or call `commit`/`abort`, which must see the
            // invalidated flag and bail) after this database handle is
            // gone. Leaking an abandoned transaction handle is the safe
            // trade — it is reclaimed only when the process exits — versus
            // freeing memory a still-reachable raw pointer can dereference.
            // That leaked handle holds only a `*mut FdbDb` and a bare
            // `TxnBuffer` (no reference into `db.file`), so there is nothing
            // inside it that dangles once `db` is dropped below.
            unsafe {
                (*txn_ptr).invalidated.store(true, Ordering::SeqCst);
            }
        }

        db.file.close()
    }
}

/// A live transaction handle. Heap-allocated and handed across the FFI
/// boundary as `*mut FdbTxnHandle`.
#[derive(Debug)]
pub struct FdbTxnHandle {
    owner: *mut FdbDb,
    buffer: TxnBuffer,
    /// Set by [`FdbDb::close`] when the owning database is closed out from
    /// under this transaction.
    invalidated: AtomicBool,
}

impl FdbTxnHandle {
    /// Begins a transaction against `db` and registers it in the owning
    /// database's transaction set.
    ///
    /// # Safety
    /// `db` must be a live handle (already validated via
    /// [`FdbDb::from_raw`]).
    pub unsafe fn begin(db: *mut FdbDb, mode: TxnMode) -> *mut FdbTxnHandle {
        let db_ref = unsafe { &mut *db };
        let sequence = db_ref.file_mut().superblock().journal_head + 1;

        let handle = Box::new(FdbTxnHandle {
            owner: db,
            buffer: TxnBuffer::new(mode, sequence),
            invalidated: AtomicBool::new(false),
        });
        let ptr = Box::into_raw(handle);
        db_ref.live_txns.lock().unwrap().insert(ptr as usize);
        ptr
    }

    /// Whether `ptr` still names a handle that is live and belongs to a
    /// still-open database.
    pub fn is_live(ptr: *const FdbTxnHandle) -> bool {
        if ptr.is_null() {
            return false;
        }
        let handle = unsafe { &*ptr };
        !handle.invalidated.load(Ordering::SeqCst) && FdbDb::is_live(handle.owner)
    }

    /// Validates and resolves a raw transaction handle.
    ///
    /// # Safety
    /// `ptr` must either be null (rejected) or a pointer previously
    /// returned by [`FdbTxnHandle::begin`] and not yet finished.
    pub unsafe fn from_raw<'a>(ptr: *mut FdbTxnHandle) -> Result<&'a mut FdbTxnHandle> {
        if !Self::is_live(ptr) {
            return Err(FdbError::new(
                ErrorKind::InvalidArgument,
                "invalid, committed, aborted, or abandoned transaction handle",
            ));
        }
        Ok(unsafe { &mut *ptr })
    }

    pub fn mode(&self) -> TxnMode {
        self.buffer.mode()
    }

    /// Buffers an insert, re-dereferencing the owning database's
    /// `BlockFile` through `self.owner` only for the duration of this call.
    ///
    /// # Safety
    /// `self` must have already been validated via [`Self::from_raw`] (and
    /// so `self.owner` is known live) — unlike `update_block`/`delete_block`
    /// below, this touches `self.owner` directly and a stale `&mut self`
    /// obtained before an intervening [`FdbDb::close`] would dereference a
    /// freed `FdbDb`.
    pub unsafe fn apply(&mut self, data: &[u8]) -> Result<ApplyResult> {
        let file = unsafe { (*self.owner).file_mut() };
        self.buffer.apply(file, data)
    }

    /// Buffers an update to an existing block.
    pub fn update_block(&mut self, id: u64, data: &[u8]) -> Result<()> {
        self.buffer.update_block(id, data)
    }

    /// Buffers a deletion of `id`.
    pub fn delete_block(&mut self, id: u64) -> Result<()> {
        self.buffer.delete_block(id)
    }

    /// Removes this handle from its owning database's live set and frees
    /// it. Called after commit or abort, whichever happens first.
    ///
    /// # Safety
    /// `ptr` must be a pointer previously returned by
    /// [`FdbTxnHandle::begin`] and not yet finished.
    unsafe fn finish(ptr: *mut FdbTxnHandle) -> Box<FdbTxnHandle> {
        let handle = unsafe { Box::from_raw(ptr) };
        if FdbDb::is_live(handle.owner) {
            let owner = unsafe { &*handle.owner };
            owner.live_txns.lock().unwrap().remove(&(ptr as usize));
        }
        handle
    }

    /// Commits the transaction and frees the handle.
    ///
    /// # Safety
    /// `ptr` must be a live handle (already validated via
    /// [`FdbTxnHandle::from_raw`]).
    pub unsafe fn commit(ptr: *mut FdbTxnHandle) -> Result<()> {
        let mut handle = unsafe { Self::finish(ptr) };
        let file = unsafe { (*handle.owner).file_mut() };
        handle.buffer.commit(file)
    }

    /// Aborts the transaction and frees the handle.
    ///
    /// # Safety
    /// `ptr` must be a live handle (already validated via
    /// [`FdbTxnHandle::from_raw`]).
    pub unsafe fn abort(ptr: *mut FdbTxnHandle) -> Result<()> {
        let mut handle = unsafe { Self::finish(ptr) };
        handle.buffer.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn fresh_path() -> NamedTempFile {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::remove_file(tmp.path()).ok();
        tmp
    }

    #[test]
    fn close_invalidates_live_transactions() {
        let tmp = fresh_path();
        let db_ptr = FdbDb::open(tmp.path().to_str().unwrap(), &DbOptions::default()).unwrap();
        let txn_ptr = unsafe { FdbTxnHandle::begin(db_ptr, TxnMode::ReadWrite) };

        assert!(FdbTxnHandle::is_live(txn_ptr));
        unsafe { FdbDb::close(db_ptr).unwrap() };
        assert!(!FdbTxnHandle::is_live(txn_ptr));

        let err = unsafe { FdbTxnHandle::from_raw(txn_ptr) }.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn commit_removes_handle_from_live_set() {
        let tmp = fresh_path();
        let db_ptr = FdbDb::open(tmp.path().to_str().unwrap(), &DbOptions::default()).unwrap();
        let txn_ptr = unsafe { FdbTxnHandle::begin(db_ptr, TxnMode::ReadWrite) };
        unsafe {
            FdbTxnHandle::from_raw(txn_ptr).unwrap().apply(b"hi").unwrap();
            // (validated live by `from_raw` immediately above)
            FdbTxnHandle::commit(txn_ptr).unwrap();
            FdbDb::close(db_ptr).unwrap();
        }
    }

    #[test]
    fn invalid_pointer_is_rejected() {
        assert!(!FdbDb::is_live(std::ptr::null()));
        assert!(unsafe { FdbDb::from_raw(std::ptr::null_mut()) }.is_err());
    }
}
