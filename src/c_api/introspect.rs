//! `fdb_read_blocks` / `fdb_render_block` / `fdb_render_journal` /
//! `fdb_introspect_schema` / `fdb_introspect_constraints`.

use std::os::raw::c_int;

use crate::block::BlockType;
use crate::c_api::blob::{write_error_blob, LgBlob};
use crate::c_api::db::FdbDbOpaque;
use crate::error::FdbError;
use crate::handle::FdbDb;
use crate::json;

/// Render options shared by the introspection/render functions. `format`
/// and `include_metadata` are accepted for ABI forward-compatibility; this
/// core always renders the one JSON shape documented in §6.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct LgRenderOpts {
    pub format: c_int,
    pub include_metadata: bool,
}

fn db_from_raw(db: *mut FdbDbOpaque) -> Result<&'static mut FdbDb, FdbError> {
    unsafe { FdbDb::from_raw(db as *mut FdbDb) }
}

/// Scans all blocks of `block_type` and returns a JSON array of
/// `{block_id, size, data}` rows.
///
/// # Safety
/// `db` must be a live handle. `out_data`/`out_err` must be valid pointers
/// (or null, for `out_err`).
#[no_mangle]
pub unsafe extern "C" fn fdb_read_blocks(
    db: *mut FdbDbOpaque,
    block_type: u16,
    out_data: *mut LgBlob,
    out_err: *mut LgBlob,
) -> c_int {
    let db = match db_from_raw(db) {
        Ok(d) => d,
        Err(e) => {
            write_error_blob(out_err, &e);
            return e.status();
        }
    };

    let blocks = db.file_mut().scan_blocks(BlockType::from_code(block_type));
    let payload = json::read_blocks(&blocks);
    if !out_data.is_null() {
        unsafe { *out_data = LgBlob::from_json(&payload) };
    }
    0
}

/// Renders a single block as `{block_id, type, sequence, size, payload}`.
///
/// # Safety
/// `db` must be a live handle. `out_text`/`out_err` must be valid pointers
/// (or null, for `out_err`).
#[no_mangle]
pub unsafe extern "C" fn fdb_render_block(
    db: *mut FdbDbOpaque,
    id: u64,
    _opts: LgRenderOpts,
    out_text: *mut LgBlob,
    out_err: *mut LgBlob,
) -> c_int {
    let db = match db_from_raw(db) {
        Ok(d) => d,
        Err(e) => {
            write_error_blob(out_err, &e);
            return e.status();
        }
    };

    match db.file_mut().read_block(id) {
        Ok(block) => {
            if !out_text.is_null() {
                unsafe { *out_text = LgBlob::from_json(&json::render_block(&block)) };
            }
            0
        }
        Err(e) => {
            write_error_blob(out_err, &e);
            e.status()
        }
    }
}

/// Renders journal entries since sequence `since` as
/// `{since, head, tail, entries}`. Entries are populated by walking the
/// journal chain from `journal_tail` back to (but not past) the segment
/// whose `sequence <= since` (Open Question 1: resolved to enumerate).
///
/// # Safety
/// `db` must be a live handle. `out_text`/`out_err` must be valid pointers
/// (or null, for `out_err`).
#[no_mangle]
pub unsafe extern "C" fn fdb_render_journal(
    db: *mut FdbDbOpaque,
    since: u64,
    _opts: LgRenderOpts,
    out_text: *mut LgBlob,
    out_err: *mut LgBlob,
) -> c_int {
    let db = match db_from_raw(db) {
        Ok(d) => d,
        Err(e) => {
            write_error_blob(out_err, &e);
            return e.status();
        }
    };

    let superblock = *db.file().superblock();
    let mut entries = Vec::new();
    let mut current = superblock.journal_tail;
    while current != 0 {
        let segment = match db.file_mut().read_block(current) {
            Ok(block) => block,
            Err(e) => {
                write_error_blob(out_err, &e);
                return e.status();
            }
        };
        if segment.header.sequence <= since {
            break;
        }
        entries.push(json::journal_entry(&segment));
        current = segment.header.prev_block_id;
    }
    entries.reverse();

    let rendered = json::render_journal(since, &superblock, entries);
    if !out_text.is_null() {
        unsafe { *out_text = LgBlob::from_json(&rendered) };
    }
    0
}

/// Returns `{version, block_count, collections}` rooted at the live
/// superblock.
///
/// # Safety
/// `db` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn fdb_introspect_schema(
    db: *mut FdbDbOpaque,
    out_schema: *mut LgBlob,
    out_err: *mut LgBlob,
) -> c_int {
    let db = match db_from_raw(db) {
        Ok(d) => d,
        Err(e) => {
            write_error_blob(out_err, &e);
            return e.status();
        }
    };
    if !out_schema.is_null() {
        unsafe { *out_schema = LgBlob::from_json(&json::introspect_schema(db.file().superblock())) };
    }
    0
}

/// Returns `{version, block_count, constraints}` rooted at the live
/// superblock.
///
/// # Safety
/// `db` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn fdb_introspect_constraints(
    db: *mut FdbDbOpaque,
    out_constraints: *mut LgBlob,
    out_err: *mut LgBlob,
) -> c_int {
    let db = match db_from_raw(db) {
        Ok(d) => d,
        Err(e) => {
            write_error_blob(out_err, &e);
            return e.status();
        }
    };
    if !out_constraints.is_null() {
        unsafe { *out_constraints = LgBlob::from_json(&json::introspect_constraints(db.file().superblock())) };
    }
    0
}
