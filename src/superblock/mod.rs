//! The superblock: global file state, root of the free list and journal
//! chain, always resident at block id 0.

use byteorder::{ByteOrder, LittleEndian};

use crate::block::{decode_block, encode_block, BlockHeader, BlockType, MAX_PAYLOAD_LEN};
use crate::error::{ErrorKind, FdbError, Result};

/// The version this crate writes into fresh superblocks.
pub const SUPERBLOCK_VERSION: u32 = 1;

/// Global file state cached by the block file manager and mirrored into
/// block 0 on every [`Superblock::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub version: u32,
    /// Total blocks ever allocated, including holes left by aborted
    /// transactions. Never decreases.
    pub block_count: u64,
    /// Head of the free list (linked via `prev_block_id`); `0` if empty.
    pub free_list_head: u64,
    /// Monotonic counter of journal entries appended so far.
    pub journal_head: u64,
    /// Block id of the newest journal segment; `0` if none yet.
    pub journal_tail: u64,
    pub root_collection_id: u64,
    pub flags: u32,
    pub created_at: u64,
    pub last_checkpoint: u64,
}

impl Superblock {
    /// A fresh superblock for a newly created file: one block allocated (the
    /// superblock itself), empty free list, empty journal chain.
    pub fn fresh(now_ms: u64) -> Self {
        Self {
            version: SUPERBLOCK_VERSION,
            block_count: 1,
            free_list_head: 0,
            journal_head: 0,
            journal_tail: 0,
            root_collection_id: 0,
            flags: 0,
            created_at: now_ms,
            last_checkpoint: 0,
        }
    }

    /// Serializes this superblock's fields into a payload buffer, then wraps
    /// it in a full 4096-byte block with `block_id = 0`.
    pub fn encode(&self, now_ms: u64) -> [u8; crate::block::BLOCK_SIZE] {
        let mut payload = [0u8; MAX_PAYLOAD_LEN];
        LittleEndian::write_u32(&mut payload[0..4], self.version);
        LittleEndian::write_u64(&mut payload[4..12], self.block_count);
        LittleEndian::write_u64(&mut payload[12..20], self.free_list_head);
        LittleEndian::write_u64(&mut payload[20..28], self.journal_head);
        LittleEndian::write_u64(&mut payload[28..36], self.journal_tail);
        LittleEndian::write_u64(&mut payload[36..44], self.root_collection_id);
        LittleEndian::write_u32(&mut payload[44..48], self.flags);
        LittleEndian::write_u64(&mut payload[48..56], self.created_at);
        LittleEndian::write_u64(&mut payload[56..64], self.last_checkpoint);

        let mut header = BlockHeader::new(BlockType::Superblock, 0, now_ms);
        header.sequence = self.journal_head;
        encode_block(header, &payload[..64])
    }

    /// Decodes a superblock from a raw 4096-byte block read from offset 0.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let block = decode_block(bytes)
            .map_err(|e| FdbError::with_message(ErrorKind::Corruption, e.to_string()))?;

        if block.header.block_type != BlockType::Superblock || block.header.block_id != 0 {
            return Err(FdbError::new(
                ErrorKind::Corruption,
                "block 0 is not a superblock",
            ));
        }
        if block.payload.len() < 64 {
            return Err(FdbError::new(
                ErrorKind::Corruption,
                "superblock payload too short",
            ));
        }

        let p = &block.payload;
        Ok(Self {
            version: LittleEndian::read_u32(&p[0..4]),
            block_count: LittleEndian::read_u64(&p[4..12]),
            free_list_head: LittleEndian::read_u64(&p[12..20]),
            journal_head: LittleEndian::read_u64(&p[20..28]),
            journal_tail: LittleEndian::read_u64(&p[28..36]),
            root_collection_id: LittleEndian::read_u64(&p[36..44]),
            flags: LittleEndian::read_u32(&p[44..48]),
            created_at: LittleEndian::read_u64(&p[48..56]),
            last_checkpoint: LittleEndian::read_u64(&p[56..64]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let mut sb = Superblock::fresh(1_000);
        sb.block_count = 42;
        sb.journal_head = 100;
        sb.free_list_head = 7;
        sb.journal_tail = 99;

        let encoded = sb.encode(1_000);
        let decoded = Superblock::decode(&encoded).unwrap();
        assert_eq!(decoded, sb);
    }

    #[test]
    fn fresh_superblock_has_one_block() {
        let sb = Superblock::fresh(0);
        assert_eq!(sb.block_count, 1);
        assert_eq!(sb.free_list_head, 0);
        assert_eq!(sb.journal_head, 0);
    }
}
