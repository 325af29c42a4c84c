//! The block file manager: owns the file descriptor, the cached superblock,
//! and the free list / journal chain maintained on top of it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, trace, warn};

use crate::block::{decode_block, encode_block, Block, BlockFlags, BlockHeader, BlockType, BLOCK_SIZE};
use crate::cache::{BlockCache, DEFAULT_CACHE_SIZE};
use crate::error::{ErrorKind, FdbError, Result};
use crate::superblock::Superblock;

/// Open-time configuration for a [`BlockFile`].
#[derive(Debug, Clone)]
pub struct DbOptions {
    /// Create the file if it does not already exist. Matches §4.2 `open`.
    pub create_if_missing: bool,
    /// Whether `commit` fsyncs (phases 3 and 6 of §4.3). Disabling this is a
    /// supported escape hatch for tests, never a silent correctness change.
    pub fsync_on_commit: bool,
    /// Number of blocks kept warm in the read-through cache.
    pub cache_blocks: usize,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            fsync_on_commit: true,
            cache_blocks: DEFAULT_CACHE_SIZE,
        }
    }
}

/// Current wall-clock time in milliseconds, used to stamp block and
/// superblock timestamps.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Owns the on-disk file, the cached superblock, and the block cache.
///
/// Mirrors the teacher's `BlockDev<D: BlockDevice>`, but the device here is
/// always a real `std::fs::File` (see the `std`-only rationale) rather than
/// a generic trait object, since this spec has no pluggable block device
/// layer (an explicit Non-goal).
pub struct BlockFile {
    file: File,
    path: PathBuf,
    superblock: Superblock,
    cache: BlockCache,
    fsync_on_commit: bool,
}

impl BlockFile {
    /// Opens an existing database file, or creates a fresh one if
    /// `opts.create_if_missing` and the path doesn't exist.
    pub fn open<P: AsRef<Path>>(path: P, opts: &DbOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(FdbError::new(ErrorKind::InvalidArgument, "empty path"));
        }

        let existed = path.exists();
        if !existed && !opts.create_if_missing {
            return Err(FdbError::with_message(
                ErrorKind::NotFound,
                format!("database file not found: {}", path.display()),
            ));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(opts.create_if_missing)
            .open(&path)
            .map_err(FdbError::from)?;

        let superblock = if existed && file.metadata().map_err(FdbError::from)?.len() > 0 {
            let mut buf = [0u8; BLOCK_SIZE];
            file.seek(SeekFrom::Start(0)).map_err(FdbError::from)?;
            file.read_exact(&mut buf).map_err(FdbError::from)?;
            Superblock::decode(&buf)?
        } else {
            debug!("formdb: initializing fresh superblock at {}", path.display());
            let sb = Superblock::fresh(now_ms());
            let encoded = sb.encode(sb.created_at);
            file.seek(SeekFrom::Start(0)).map_err(FdbError::from)?;
            file.write_all(&encoded).map_err(FdbError::from)?;
            file.sync_all().map_err(FdbError::from)?;
            sb
        };

        Ok(Self {
            file,
            path,
            superblock,
            cache: BlockCache::new(opts.cache_blocks.max(1)),
            fsync_on_commit: opts.fsync_on_commit,
        })
    }

    /// The path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached superblock as of the last flush or read.
    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// Whether `commit` should fsync at phases 3 and 6.
    pub fn fsync_on_commit(&self) -> bool {
        self.fsync_on_commit
    }

    /// Closes the file. Does not imply a flush; callers are expected to have
    /// flushed before close.
    pub fn close(self) -> Result<()> {
        // Dropping `self.file` closes the descriptor. No flush here per
        // §4.2 contract.
        Ok(())
    }

    fn offset_of(block_id: u64) -> u64 {
        block_id * BLOCK_SIZE as u64
    }

    /// Reads and decodes the block at `id`, consulting the cache first.
    pub fn read_block(&mut self, id: u64) -> Result<Block> {
        if let Some(block) = self.cache.get(id) {
            trace!("formdb: cache hit for block {id}");
            return Ok(block);
        }

        let mut buf = [0u8; BLOCK_SIZE];
        self.file
            .seek(SeekFrom::Start(Self::offset_of(id)))
            .map_err(FdbError::from)?;
        self.file.read_exact(&mut buf).map_err(|e| {
            FdbError::with_message(ErrorKind::Corruption, format!("short read at block {id}: {e}"))
        })?;

        let block = decode_block(&buf)
            .map_err(|e| FdbError::with_message(ErrorKind::Corruption, format!("block {id}: {e}")))?;
        self.cache.put(id, block.clone());
        Ok(block)
    }

    /// Writes a fully-formed 4096-byte block to its offset on disk.
    /// Callers decide whether to fsync; the commit path does so explicitly.
    pub fn write_block_bytes(&mut self, id: u64, bytes: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(Self::offset_of(id)))
            .map_err(FdbError::from)?;
        self.file.write_all(bytes).map_err(FdbError::from)?;
        self.cache.invalidate(id);
        Ok(())
    }

    /// Encodes `block` and writes it at its own `header.block_id`.
    pub fn write_block(&mut self, block: &Block) -> Result<()> {
        let id = block.header.block_id;
        let encoded = encode_block(block.header, &block.payload);
        self.write_block_bytes(id, &encoded)
    }

    /// Allocates a block of `block_type`, popping the free list if
    /// non-empty or extending `block_count` otherwise. The block is written
    /// to disk and the superblock is flushed.
    pub fn allocate_block(&mut self, block_type: BlockType) -> Result<u64> {
        let id = if self.superblock.free_list_head != 0 {
            let head = self.superblock.free_list_head;
            let freed = self.read_block(head)?;
            self.superblock.free_list_head = freed.header.prev_block_id;
            head
        } else {
            let id = self.superblock.block_count;
            self.superblock.block_count += 1;
            id
        };

        let mut header = BlockHeader::new(block_type, id, now_ms());
        header.flags = BlockFlags::empty();
        let encoded = encode_block(header, &[]);
        self.write_block_bytes(id, &encoded)?;
        self.flush_superblock()?;
        debug!("formdb: allocated block {id} as {:?}", block_type);
        Ok(id)
    }

    /// Reserves a block id by bumping the cached `block_count` only; no
    /// disk write happens here. The id is only valid on disk after a
    /// subsequent [`Self::flush_superblock`].
    pub fn reserve_block_id(&mut self) -> u64 {
        let id = self.superblock.block_count;
        self.superblock.block_count += 1;
        id
    }

    /// Serializes the cached superblock into block 0.
    pub fn flush_superblock(&mut self) -> Result<()> {
        let encoded = self.superblock.encode(now_ms());
        self.write_block_bytes(0, &encoded)
    }

    /// fsyncs the underlying file.
    pub fn sync_all(&mut self) -> Result<()> {
        self.file.sync_all().map_err(FdbError::from)
    }

    /// Allocates a journal_segment block carrying `entry_bytes` as its
    /// payload, links it onto the journal chain, and flushes the
    /// superblock. Returns the new segment's block id.
    pub fn append_journal(&mut self, entry_bytes: &[u8]) -> Result<u64> {
        if entry_bytes.len() > crate::block::MAX_PAYLOAD_LEN {
            return Err(FdbError::new(
                ErrorKind::InvalidArgument,
                "journal entry exceeds payload capacity",
            ));
        }

        let id = if self.superblock.free_list_head != 0 {
            let head = self.superblock.free_list_head;
            let freed = self.read_block(head)?;
            self.superblock.free_list_head = freed.header.prev_block_id;
            head
        } else {
            let id = self.superblock.block_count;
            self.superblock.block_count += 1;
            id
        };

        let mut header = BlockHeader::new(BlockType::JournalSegment, id, now_ms());
        header.prev_block_id = self.superblock.journal_tail;
        header.sequence = self.superblock.journal_head + 1;
        let encoded = encode_block(header, entry_bytes);
        self.write_block_bytes(id, &encoded)?;

        if self.superblock.journal_head == 0 {
            // Initial chain bootstrap: the reference also seeds journal_head
            // with the first segment's id. Preserved verbatim (§4.2 note).
            self.superblock.journal_head = id;
        }
        self.superblock.journal_tail = id;
        self.superblock.journal_head += 1;
        self.flush_superblock()?;

        trace!("formdb: appended journal segment {id}");
        Ok(id)
    }

    /// Frees a block: marks it deleted and type-0, pushes it onto the head
    /// of the free list, and flushes the superblock. `id == 0` (the
    /// superblock) is forbidden.
    pub fn free_block(&mut self, id: u64) -> Result<()> {
        if id == 0 {
            return Err(FdbError::new(
                ErrorKind::InvalidArgument,
                "cannot free the superblock",
            ));
        }

        let mut header = BlockHeader::new(BlockType::Free, id, now_ms());
        header.prev_block_id = self.superblock.free_list_head;
        header.flags = BlockFlags::DELETED;
        let encoded = encode_block(header, &[]);
        self.write_block_bytes(id, &encoded)?;

        self.superblock.free_list_head = id;
        self.flush_superblock()?;
        debug!("formdb: freed block {id}");
        Ok(())
    }

    /// Scans all blocks `1..block_count`, decoding each and yielding only
    /// those matching `block_type` and not marked deleted. Errors from an
    /// individual block decode are logged and the block is skipped rather
    /// than aborting the whole scan, since a single corrupt data block
    /// should not hide the rest of a `read_blocks` listing.
    pub fn scan_blocks(&mut self, block_type: BlockType) -> Vec<Block> {
        let mut out = Vec::new();
        let count = self.superblock.block_count;
        for id in 1..count {
            match self.read_block(id) {
                Ok(block) => {
                    if block.header.block_type == block_type
                        && !block.header.flags.contains(BlockFlags::DELETED)
                    {
                        out.push(block);
                    }
                }
                Err(e) => {
                    warn!("formdb: skipping unreadable block {id} during scan: {e}");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn opened(opts: &DbOptions) -> (BlockFile, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::remove_file(tmp.path()).ok();
        let bf = BlockFile::open(tmp.path(), opts).unwrap();
        (bf, tmp)
    }

    #[test]
    fn create_then_reopen_preserves_block_count() {
        let opts = DbOptions::default();
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        std::fs::remove_file(&path).ok();

        {
            let bf = BlockFile::open(&path, &opts).unwrap();
            assert_eq!(bf.superblock().block_count, 1);
            bf.close().unwrap();
        }

        let bf = BlockFile::open(&path, &opts).unwrap();
        assert_eq!(bf.superblock().block_count, 1);
    }

    #[test]
    fn allocate_write_read_round_trips() {
        let (mut bf, _tmp) = opened(&DbOptions::default());
        let id = bf.allocate_block(BlockType::Document).unwrap();
        assert_eq!(id, 1);

        let mut block = bf.read_block(id).unwrap();
        block.payload = b"test document".to_vec();
        block.header.payload_len = block.payload.len() as u32;
        bf.write_block(&block).unwrap();

        let read_back = bf.read_block(id).unwrap();
        assert_eq!(read_back.payload, b"test document");
    }

    #[test]
    fn journal_linkage_tracks_prev_and_sequence() {
        let (mut bf, _tmp) = opened(&DbOptions::default());
        let first = bf.append_journal(b"entry 1").unwrap();
        let second = bf.append_journal(b"entry 2").unwrap();

        let first_block = bf.read_block(first).unwrap();
        let second_block = bf.read_block(second).unwrap();
        assert_eq!(second_block.header.prev_block_id, first_block.header.block_id);
        assert!(second_block.header.sequence > first_block.header.sequence);
    }

    #[test]
    fn free_block_rejects_superblock() {
        let (mut bf, _tmp) = opened(&DbOptions::default());
        assert_eq!(bf.free_block(0).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn free_then_allocate_recycles_from_free_list() {
        let (mut bf, _tmp) = opened(&DbOptions::default());
        let id = bf.allocate_block(BlockType::Document).unwrap();
        bf.free_block(id).unwrap();
        assert_eq!(bf.superblock().free_list_head, id);

        let recycled = bf.allocate_block(BlockType::Document).unwrap();
        assert_eq!(recycled, id);
        assert_eq!(bf.superblock().free_list_head, 0);
    }
}
