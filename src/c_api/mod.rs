//! The stable `extern "C"` bridge ABI (§4.4/§6): database/transaction
//! lifecycle, buffered writes, introspection, and the proof-verifier
//! dispatch, all exposed with C calling convention under `fdb_*` names.
//!
//! Gated behind the `c-api` feature exactly as the teacher gates its own
//! C-compatible layer, default-on here since the bridge is this crate's
//! primary deliverable rather than an optional extra.

pub mod blob;
pub mod db;
pub mod introspect;
pub mod txn;
pub mod verify;
pub mod version;

pub use blob::{fdb_blob_free, LgBlob};
pub use db::{fdb_db_close, fdb_db_open, FdbDbOpaque};
pub use introspect::{
    fdb_introspect_constraints, fdb_introspect_schema, fdb_read_blocks, fdb_render_block,
    fdb_render_journal, LgRenderOpts,
};
pub use txn::{
    fdb_apply, fdb_delete_block, fdb_txn_abort, fdb_txn_begin, fdb_txn_commit, fdb_update_block,
    FdbTxnOpaque, LgResult, LgTxnMode,
};
pub use verify::{fdb_register_verifier, fdb_unregister_verifier, fdb_verify};
pub use version::fdb_version;
