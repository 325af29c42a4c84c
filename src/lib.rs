//! formdb_core: the storage engine underneath a single-node, narrative-first,
//! audit-grade document/graph database.
//!
//! This crate is the CORE only: a fixed 4 KiB block format with CRC32C
//! checksums, a superblock-rooted free list and journal chain, a transaction
//! buffer with a six-phase write-ahead-log commit, a stable `extern "C"`
//! bridge for external runtimes, and a pluggable proof-verifier registry.
//! The query language, client SDKs, HTTP/GraphQL layers, and schema
//! discovery/normalization algorithms that sit on top of it are external
//! collaborators and live in separate crates.
//!
//! # Example
//!
//! ```rust,ignore
//! use formdb_core::store::{BlockFile, DbOptions};
//! use formdb_core::transaction::{Transaction, TxnMode};
//!
//! let mut file = BlockFile::open("/tmp/example.lgh", &DbOptions::default())?;
//! let mut txn = Transaction::begin(&mut file, TxnMode::ReadWrite);
//! let result = txn.apply(b"hello")?;
//! txn.commit()?;
//! # Ok::<(), formdb_core::error::FdbError>(())
//! ```
//!
//! # Module structure
//!
//! - [`error`] - error type and ABI status-code mapping
//! - [`crc`] - CRC32C
//! - [`block`] - the 4 KiB block format
//! - [`superblock`] - global file state at block 0
//! - [`cache`] - read-through block cache
//! - [`store`] - the block file manager
//! - [`transaction`] - transaction buffer and six-phase commit
//! - [`handle`] - opaque database/transaction handles and registries
//! - [`verifier`] - the proof-verifier registry
//! - [`json`] - JSON blob shapes for the bridge
//! - [`c_api`] - the `extern "C"` bridge (feature `c-api`, default-on)

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

/// Error handling
pub mod error;

/// CRC32C checksum
pub(crate) mod crc;

/// Block format: header, payload, CRC
pub mod block;

/// Superblock: global file state
pub mod superblock;

/// Read-through block cache
pub mod cache;

/// Block file manager
pub mod store;

/// Transaction buffer and six-phase commit
pub mod transaction;

/// Opaque handles and registries
pub mod handle;

/// Proof-verifier registry
pub mod verifier;

/// JSON blob shapes for the bridge
pub mod json;

/// C ABI bridge
#[cfg(feature = "c-api")]
pub mod c_api;

// ===== Public re-exports =====

pub use error::{ErrorKind, FdbError, Result};

pub use block::{decode_block, encode_block, Block, BlockFlags, BlockHeader, BlockType, DecodeError};

pub use superblock::Superblock;

pub use cache::{BlockCache, DEFAULT_CACHE_SIZE};

pub use store::{now_ms, BlockFile, DbOptions};

pub use transaction::{ApplyResult, PendingDelete, PendingWrite, Transaction, TxnMode};

pub use handle::{FdbDb, FdbTxnHandle};

pub use verifier::{init_builtins, register_verifier, unregister_verifier, verify, VerifierFn};

#[cfg(feature = "c-api")]
pub use c_api::{
    fdb_apply, fdb_blob_free, fdb_db_close, fdb_db_open, fdb_delete_block, fdb_introspect_constraints,
    fdb_introspect_schema, fdb_read_blocks, fdb_register_verifier, fdb_render_block, fdb_render_journal,
    fdb_txn_abort, fdb_txn_begin, fdb_txn_commit, fdb_unregister_verifier, fdb_update_block, fdb_verify,
    fdb_version, FdbDbOpaque, FdbTxnOpaque, LgBlob, LgRenderOpts, LgResult, LgTxnMode,
};
