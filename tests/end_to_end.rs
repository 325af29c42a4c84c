//! End-to-end scenarios against the safe Rust API (`BlockFile` +
//! `Transaction`), one test per numbered scenario.

use formdb_core::block::BlockType;
use formdb_core::store::{BlockFile, DbOptions};
use formdb_core::transaction::{Transaction, TxnMode};

fn temp_db_path() -> std::path::PathBuf {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();
    std::fs::remove_file(&path).ok();
    path
}

#[test]
fn scenario_1_create_then_open() {
    let path = temp_db_path();
    {
        let bf = BlockFile::open(&path, &DbOptions::default()).unwrap();
        assert_eq!(bf.superblock().block_count, 1);
        bf.close().unwrap();
    }

    let bf = BlockFile::open(&path, &DbOptions::default()).unwrap();
    assert_eq!(bf.superblock().block_count, 1);
}

#[test]
fn scenario_2_insert_commit_is_readable() {
    let path = temp_db_path();
    let mut bf = BlockFile::open(&path, &DbOptions::default()).unwrap();

    let mut txn = Transaction::begin(&mut bf, TxnMode::ReadWrite);
    txn.apply(b"hello").unwrap();
    txn.commit().unwrap();

    let rows = bf.scan_blocks(BlockType::Document);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].payload, b"hello");
}

#[test]
fn scenario_3_abort_leaves_no_document() {
    let path = temp_db_path();
    let mut bf = BlockFile::open(&path, &DbOptions::default()).unwrap();

    {
        let mut txn = Transaction::begin(&mut bf, TxnMode::ReadWrite);
        txn.apply(b"doomed").unwrap();
        txn.abort().unwrap();
    }

    assert!(bf.scan_blocks(BlockType::Document).is_empty());
}

#[test]
fn scenario_4_delete_frees_the_block() {
    let path = temp_db_path();
    let mut bf = BlockFile::open(&path, &DbOptions::default()).unwrap();

    let id = {
        let mut txn = Transaction::begin(&mut bf, TxnMode::ReadWrite);
        let result = txn.apply(b"x").unwrap();
        txn.commit().unwrap();
        result.block_id
    };

    {
        let mut txn = Transaction::begin(&mut bf, TxnMode::ReadWrite);
        txn.delete_block(id).unwrap();
        txn.commit().unwrap();
    }

    assert!(bf.scan_blocks(BlockType::Document).is_empty());
    assert_eq!(bf.superblock().free_list_head, id);
}

#[test]
fn scenario_5_proof_reject() {
    formdb_core::verifier::unregister_verifier("normalization-reject-test");
    formdb_core::verifier::register_verifier(
        "normalization-reject-test",
        |_data, _ctx| false,
        std::ptr::null_mut(),
    );

    let proof = br#"{"type":"normalization-reject-test","data":"payload"}"#;
    let valid = formdb_core::verifier::verify(proof).unwrap();
    assert!(!valid);

    formdb_core::verifier::unregister_verifier("normalization-reject-test");
}

#[test]
fn scenario_6_journal_chain_links_backward() {
    let path = temp_db_path();
    let mut bf = BlockFile::open(&path, &DbOptions::default()).unwrap();

    let mut txn = Transaction::begin(&mut bf, TxnMode::ReadWrite);
    txn.apply(b"a").unwrap();
    txn.apply(b"b").unwrap();
    txn.commit().unwrap();

    let tail = bf.superblock().journal_tail;
    let tail_block = bf.read_block(tail).unwrap();
    assert!(tail_block.header.prev_block_id != 0 || bf.superblock().journal_head <= 1);

    let prev = bf.read_block(tail_block.header.prev_block_id).unwrap();
    assert!(prev.header.sequence < tail_block.header.sequence);
}

#[test]
fn handle_isolation_rejects_operations_on_closed_database() {
    use formdb_core::handle::{FdbDb, FdbTxnHandle};

    let path = temp_db_path();
    let db_ptr = FdbDb::open(path.to_str().unwrap(), &DbOptions::default()).unwrap();
    let txn_ptr = unsafe { FdbTxnHandle::begin(db_ptr, TxnMode::ReadWrite) };

    unsafe { FdbDb::close(db_ptr).unwrap() };

    let err = unsafe { FdbTxnHandle::from_raw(txn_ptr) }.unwrap_err();
    assert_eq!(err.kind(), formdb_core::error::ErrorKind::InvalidArgument);
}
