//! Transaction buffer and the six-phase write-ahead-log commit.
//!
//! A transaction buffers every mutation in memory; nothing touches disk
//! between `begin` and `commit`. This mirrors the teacher's
//! `SimpleTransaction` RAII shape (dirty-block list, `TransactionState`,
//! `check_active` guard, auto-abort on `Drop`) generalized from "flush dirty
//! blocks" to the six ordered WAL phases this spec requires.
//!
//! The buffering/commit logic lives in [`TxnBuffer`], which never itself
//! holds a reference to the [`BlockFile`] it commits against — only a
//! `&mut BlockFile` borrowed for the duration of a single `apply`/`commit`
//! call. [`Transaction`] pairs a `TxnBuffer` with a borrowed `BlockFile` for
//! safe, directly-held Rust use; the `c_api` bridge (`handle::FdbTxnHandle`)
//! instead pairs a `TxnBuffer` with a raw pointer to its owning database and
//! re-derefs that pointer per call, so no long-lived reference to a
//! `BlockFile` ever outlives the allocation it points into.

use log::{debug, warn};

use crate::block::{Block, BlockFlags, BlockHeader, BlockType};
use crate::error::{ErrorKind, FdbError, Result};
use crate::store::BlockFile;

/// Transaction access mode, fixed at `begin` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Active,
    Committed,
    Aborted,
}

/// A buffered insert or update, not yet written to disk.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub block_id: u64,
    pub payload: Vec<u8>,
    pub journal_message: String,
    pub is_new: bool,
}

/// A block id to free on commit.
#[derive(Debug, Clone, Copy)]
pub struct PendingDelete {
    pub block_id: u64,
}

/// Outcome of a successful [`TxnBuffer::apply`]/[`Transaction::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyResult {
    pub block_id: u64,
}

/// The in-memory transaction state and six-phase commit, independent of how
/// the caller holds on to its `BlockFile`.
///
/// Every method that needs to touch disk takes `&mut BlockFile` as a
/// parameter rather than storing one, so a `TxnBuffer` itself never
/// out-lives the block file it was built against — the caller decides how
/// that borrow is obtained each time (a live Rust reference for
/// [`Transaction`], a freshly re-dereferenced raw pointer for
/// `handle::FdbTxnHandle`).
#[derive(Debug)]
pub(crate) struct TxnBuffer {
    mode: TxnMode,
    state: TxnState,
    /// `journal_head` snapshot taken at `begin`.
    sequence: u64,
    pending_writes: Vec<PendingWrite>,
    pending_deletes: Vec<PendingDelete>,
}

impl TxnBuffer {
    pub(crate) fn new(mode: TxnMode, sequence: u64) -> Self {
        Self {
            mode,
            state: TxnState::Active,
            sequence,
            pending_writes: Vec::new(),
            pending_deletes: Vec::new(),
        }
    }

    pub(crate) fn mode(&self) -> TxnMode {
        self.mode
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state == TxnState::Active
    }

    fn check_writable(&self) -> Result<()> {
        match self.state {
            TxnState::Committed => {
                return Err(FdbError::new(
                    ErrorKind::TxnAlreadyCommitted,
                    "transaction already committed",
                ))
            }
            TxnState::Aborted => {
                return Err(FdbError::new(ErrorKind::TxnNotActive, "transaction not active"))
            }
            TxnState::Active => {}
        }
        if self.mode != TxnMode::ReadWrite {
            return Err(FdbError::new(
                ErrorKind::InvalidArgument,
                "read-only transaction cannot mutate",
            ));
        }
        Ok(())
    }

    /// Reserves a new block id, buffers the payload as a pending insert, and
    /// returns its id. Rejects zero-length and oversized payloads uniformly
    /// (Open Question 2: resolved to reject).
    pub(crate) fn apply(&mut self, file: &mut BlockFile, data: &[u8]) -> Result<ApplyResult> {
        self.check_writable()?;
        if data.is_empty() {
            return Err(FdbError::new(ErrorKind::InvalidArgument, "apply requires non-empty data"));
        }
        if data.len() > crate::block::MAX_PAYLOAD_LEN {
            return Err(FdbError::new(
                ErrorKind::InvalidArgument,
                "payload exceeds 4032 bytes",
            ));
        }

        let block_id = file.reserve_block_id();
        let journal_message = format!("INSERT block_id={} size={}", block_id, data.len());
        self.pending_writes.push(PendingWrite {
            block_id,
            payload: data.to_vec(),
            journal_message,
            is_new: true,
        });
        Ok(ApplyResult { block_id })
    }

    /// Buffers an update to an existing block.
    pub(crate) fn update_block(&mut self, id: u64, data: &[u8]) -> Result<()> {
        self.check_writable()?;
        if data.is_empty() {
            return Err(FdbError::new(ErrorKind::InvalidArgument, "update requires non-empty data"));
        }
        if data.len() > crate::block::MAX_PAYLOAD_LEN {
            return Err(FdbError::new(
                ErrorKind::InvalidArgument,
                "payload exceeds 4032 bytes",
            ));
        }

        let journal_message = format!("UPDATE block_id={} size={}", id, data.len());
        self.pending_writes.push(PendingWrite {
            block_id: id,
            payload: data.to_vec(),
            journal_message,
            is_new: false,
        });
        Ok(())
    }

    /// Buffers a deletion; the `DELETE` journal message is emitted at
    /// commit time.
    pub(crate) fn delete_block(&mut self, id: u64) -> Result<()> {
        self.check_writable()?;
        self.pending_deletes.push(PendingDelete { block_id: id });
        Ok(())
    }

    /// Runs the six-phase commit (§4.3) against `file`.
    pub(crate) fn commit(&mut self, file: &mut BlockFile) -> Result<()> {
        if self.state != TxnState::Active {
            return Err(FdbError::new(ErrorKind::TxnNotActive, "transaction not active"));
        }
        if self.mode != TxnMode::ReadWrite {
            // A read-only transaction has nothing buffered; committing it
            // is a no-op terminal transition, not an error.
            self.state = TxnState::Committed;
            return Ok(());
        }

        // Phase 1: journal inserts/updates.
        for write in &self.pending_writes {
            file.append_journal(write.journal_message.as_bytes())?;
        }

        // Phase 2: journal deletes.
        for delete in &self.pending_deletes {
            let msg = format!("DELETE block_id={}", delete.block_id);
            file.append_journal(msg.as_bytes())?;
        }

        // Phase 3: sync to durably commit the write-ahead log.
        if file.fsync_on_commit() {
            file.sync_all()?;
        }

        // Phase 4: write data blocks.
        for write in &self.pending_writes {
            let now = crate::store::now_ms();
            let mut header = if write.is_new {
                BlockHeader::new(BlockType::Document, write.block_id, now)
            } else {
                // An update keeps the block's original `created_at`; only
                // `modified_at` advances. Falls back to a fresh header if the
                // existing block can't be read (e.g. it was reserved but
                // never durably written), matching the best-effort policy
                // for this phase.
                match file.read_block(write.block_id) {
                    Ok(existing) => {
                        let mut h = existing.header;
                        h.modified_at = now;
                        h.flags = BlockFlags::empty();
                        h
                    }
                    Err(_) => BlockHeader::new(BlockType::Document, write.block_id, now),
                }
            };
            header.sequence = self.sequence;
            let block = Block {
                header,
                payload: write.payload.clone(),
            };
            if let Err(e) = file.write_block(&block) {
                warn!("formdb: best-effort data write failed for block {}: {e}", write.block_id);
            }
        }

        // Phase 5: process deletes.
        for delete in &self.pending_deletes {
            if let Err(e) = file.free_block(delete.block_id) {
                warn!("formdb: best-effort free failed for block {}: {e}", delete.block_id);
            }
        }

        // Phase 6: flush superblock, then fsync again.
        file.flush_superblock()?;
        if file.fsync_on_commit() {
            file.sync_all()?;
        }

        debug!(
            "formdb: committed txn (writes={}, deletes={})",
            self.pending_writes.len(),
            self.pending_deletes.len()
        );
        self.state = TxnState::Committed;
        self.pending_writes.clear();
        self.pending_deletes.clear();
        Ok(())
    }

    /// Discards all pending operations without writing to disk. Reserved
    /// ids from `apply` remain consumed in the cached `block_count` — a
    /// deliberate, documented leak (§9), not a bug.
    pub(crate) fn abort(&mut self) {
        if self.state == TxnState::Active {
            self.state = TxnState::Aborted;
            self.pending_writes.clear();
            self.pending_deletes.clear();
        }
    }

    #[cfg(test)]
    fn commit_wal_only(&mut self, file: &mut BlockFile) {
        for write in &self.pending_writes {
            file.append_journal(write.journal_message.as_bytes())
                .expect("journal append in crash-injection test");
        }
        for delete in &self.pending_deletes {
            let msg = format!("DELETE block_id={}", delete.block_id);
            file.append_journal(msg.as_bytes())
                .expect("journal append in crash-injection test");
        }
        if file.fsync_on_commit() {
            file.sync_all().expect("fsync in crash-injection test");
        }
        self.state = TxnState::Committed;
    }
}

/// A live transaction directly held against a borrowed [`BlockFile`].
///
/// Exactly one of [`Transaction::commit`] or [`Transaction::abort`] reaches
/// the terminal state; dropping an active transaction without calling
/// either auto-aborts, matching the teacher's RAII guarantee.
pub struct Transaction<'a> {
    file: &'a mut BlockFile,
    buffer: TxnBuffer,
}

impl<'a> Transaction<'a> {
    /// Begins a transaction, snapshotting `sequence := journal_head + 1`.
    pub fn begin(file: &'a mut BlockFile, mode: TxnMode) -> Self {
        let sequence = file.superblock().journal_head + 1;
        Self {
            file,
            buffer: TxnBuffer::new(mode, sequence),
        }
    }

    pub fn mode(&self) -> TxnMode {
        self.buffer.mode()
    }

    pub fn is_active(&self) -> bool {
        self.buffer.is_active()
    }

    /// Reserves a new block id, buffers the payload as a pending insert, and
    /// returns its id. Rejects zero-length and oversized payloads uniformly
    /// (Open Question 2: resolved to reject).
    pub fn apply(&mut self, data: &[u8]) -> Result<ApplyResult> {
        self.buffer.apply(self.file, data)
    }

    /// Buffers an update to an existing block.
    pub fn update_block(&mut self, id: u64, data: &[u8]) -> Result<()> {
        self.buffer.update_block(id, data)
    }

    /// Buffers a deletion; the `DELETE` journal message is emitted at
    /// commit time.
    pub fn delete_block(&mut self, id: u64) -> Result<()> {
        self.buffer.delete_block(id)
    }

    /// Runs the six-phase commit (§4.3) and consumes the transaction.
    pub fn commit(mut self) -> Result<()> {
        self.buffer.commit(self.file)
    }

    /// Discards all pending operations without writing to disk. Reserved
    /// ids from `apply` remain consumed in the cached `block_count` — a
    /// deliberate, documented leak (§9), not a bug.
    pub fn abort(mut self) -> Result<()> {
        self.buffer.abort();
        Ok(())
    }

    #[cfg(test)]
    fn commit_wal_only(mut self) {
        self.buffer.commit_wal_only(self.file);
    }
}

impl<'a> Drop for Transaction<'a> {
    fn drop(&mut self) {
        self.buffer.abort();
    }
}
