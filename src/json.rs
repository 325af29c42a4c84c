//! JSON blob shapes exchanged across the bridge (§6).
//!
//! Each wire shape is a typed `#[derive(Serialize)]` struct rather than an
//! ad-hoc `serde_json::json!` call, so a renamed or dropped field is a
//! compile error at the call site instead of a silent wire-format drift.

use serde::Serialize;
use serde_json::Value;

use crate::block::{Block, BlockType};
use crate::error::FdbError;
use crate::superblock::Superblock;

/// `{"status": N, "error": "..."}`.
#[derive(Serialize)]
struct ErrorBlob<'a> {
    status: i32,
    error: &'a str,
}

/// Builds an error blob.
pub fn error_blob(err: &FdbError) -> Value {
    to_value(&ErrorBlob {
        status: err.status(),
        error: err.message(),
    })
}

/// `apply` result: `{"block_id": N, "status": "pending"}`.
#[derive(Serialize)]
struct ApplyResultBlob {
    block_id: u64,
    status: &'static str,
}

/// Builds an `apply` result blob.
pub fn apply_result(block_id: u64) -> Value {
    to_value(&ApplyResultBlob {
        block_id,
        status: "pending",
    })
}

/// One row of a `read_blocks` listing.
#[derive(Serialize)]
struct ReadBlocksRow {
    block_id: u64,
    size: usize,
    data: String,
}

/// One row of a `read_blocks` listing: `{"block_id": N, "size": K, "data": "..."}`.
pub fn read_blocks_row(block: &Block) -> Value {
    to_value(&ReadBlocksRow {
        block_id: block.header.block_id,
        size: block.payload.len(),
        data: String::from_utf8_lossy(&block.payload).into_owned(),
    })
}

/// `read_blocks(db, type)`: a JSON array of rows for every live block of
/// `block_type`.
pub fn read_blocks(blocks: &[Block]) -> Value {
    Value::Array(blocks.iter().map(read_blocks_row).collect())
}

/// `render_block`: `{"block_id", "type", "sequence", "size", "payload"}`.
#[derive(Serialize)]
struct RenderBlock {
    block_id: u64,
    #[serde(rename = "type")]
    block_type: &'static str,
    sequence: u64,
    size: usize,
    payload: String,
}

/// Renders a single block as `{block_id, type, sequence, size, payload}`.
pub fn render_block(block: &Block) -> Value {
    to_value(&RenderBlock {
        block_id: block.header.block_id,
        block_type: block.header.block_type.name(),
        sequence: block.header.sequence,
        size: block.payload.len(),
        payload: format!("[{} bytes]", block.payload.len()),
    })
}

/// One entry of a `render_journal` listing.
#[derive(Serialize)]
pub struct JournalEntry {
    block_id: u64,
    sequence: u64,
    prev_block_id: u64,
    message: String,
}

/// Builds one entry of a `render_journal` listing from a journal segment
/// block.
pub fn journal_entry(segment: &Block) -> JournalEntry {
    JournalEntry {
        block_id: segment.header.block_id,
        sequence: segment.header.sequence,
        prev_block_id: segment.header.prev_block_id,
        message: String::from_utf8_lossy(&segment.payload).into_owned(),
    }
}

/// `render_journal(db, since, opts)`: `{"since", "head", "tail", "entries"}`.
#[derive(Serialize)]
struct RenderJournal {
    since: u64,
    head: u64,
    tail: u64,
    entries: Vec<JournalEntry>,
}

/// Builds the `render_journal` blob.
pub fn render_journal(since: u64, superblock: &Superblock, entries: Vec<JournalEntry>) -> Value {
    to_value(&RenderJournal {
        since,
        head: superblock.journal_head,
        tail: superblock.journal_tail,
        entries,
    })
}

/// `introspect_schema`: `{"version", "block_count", "collections"}`.
#[derive(Serialize)]
struct IntrospectSchema {
    version: u32,
    block_count: u64,
    /// Stays empty — collection_meta blocks are written by an external
    /// schema collaborator, not this core (Non-goals).
    collections: Vec<Value>,
}

/// Builds the `introspect_schema` blob, rooted at the live superblock.
pub fn introspect_schema(superblock: &Superblock) -> Value {
    to_value(&IntrospectSchema {
        version: superblock.version,
        block_count: superblock.block_count,
        collections: Vec::new(),
    })
}

/// `introspect_constraints`: minimal summary rooted at the live superblock.
#[derive(Serialize)]
struct IntrospectConstraints {
    version: u32,
    block_count: u64,
    /// Stays empty for the same reason `collections` does above.
    constraints: Vec<Value>,
}

/// Builds the `introspect_constraints` blob.
pub fn introspect_constraints(superblock: &Superblock) -> Value {
    to_value(&IntrospectConstraints {
        version: superblock.version,
        block_count: superblock.block_count,
        constraints: Vec::new(),
    })
}

/// `{"type": "<id>", "data": "<opaque string>"}` — the proof blob shape, for
/// tests and callers that want to build one programmatically.
#[derive(Serialize)]
struct ProofBlob<'a> {
    #[serde(rename = "type")]
    proof_type: &'a str,
    data: &'a str,
}

/// Builds a proof blob.
pub fn proof_blob(proof_type: &str, data: &str) -> Value {
    to_value(&ProofBlob { proof_type, data })
}

/// Reverse lookup used by `read_blocks`/`render_block` callers that accept a
/// raw `u16` type code across the ABI.
pub fn block_type_name(block_type: BlockType) -> &'static str {
    block_type.name()
}

/// Every wire shape above is built entirely from primitives and owned
/// strings, so serialization cannot fail; this just spares each call site
/// an `.expect(...)`.
fn to_value(shape: &impl Serialize) -> Value {
    serde_json::to_value(shape).expect("wire shape is always serializable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockHeader, BlockType};
    use crate::error::ErrorKind;

    #[test]
    fn error_blob_has_status_and_message() {
        let err = FdbError::new(ErrorKind::Corruption, "checksum mismatch at block 42");
        let blob = error_blob(&err);
        assert_eq!(blob["status"], 9);
        assert_eq!(blob["error"], "checksum mismatch at block 42");
    }

    #[test]
    fn render_block_reports_type_name_and_size() {
        let header = BlockHeader::new(BlockType::Document, 7, 0);
        let block = Block {
            header,
            payload: b"hello".to_vec(),
        };
        let rendered = render_block(&block);
        assert_eq!(rendered["type"], "document");
        assert_eq!(rendered["size"], 5);
        assert_eq!(rendered["payload"], "[5 bytes]");
    }

    #[test]
    fn read_blocks_row_escapes_through_serde() {
        let header = BlockHeader::new(BlockType::Document, 1, 0);
        let block = Block {
            header,
            payload: b"has \"quotes\"".to_vec(),
        };
        let row = read_blocks_row(&block);
        assert_eq!(row["data"], "has \"quotes\"");
    }
}
