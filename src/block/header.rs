//! The 64-byte block header and the block type/flag vocabulary.

use byteorder::{ByteOrder, LittleEndian};

use super::{BLOCK_MAGIC, BLOCK_VERSION, HEADER_SIZE};

/// Block type discriminant, stored as a `u16` in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BlockType {
    /// Unallocated block sitting on the free list.
    Free,
    /// The single block at id 0.
    Superblock,
    CollectionMeta,
    Document,
    DocumentOverflow,
    EdgeMeta,
    Edge,
    IndexRoot,
    IndexInternal,
    IndexLeaf,
    JournalSegment,
    Schema,
    Constraint,
    Migration,
    /// A code this build doesn't recognize. Preserved verbatim so that
    /// round-tripping a block never silently reclassifies it.
    Unknown(u16),
}

impl BlockType {
    /// Decodes the raw on-disk `u16` code into a [`BlockType`].
    pub fn from_code(code: u16) -> Self {
        match code {
            0x0000 => BlockType::Free,
            0x0001 => BlockType::Superblock,
            0x0010 => BlockType::CollectionMeta,
            0x0011 => BlockType::Document,
            0x0012 => BlockType::DocumentOverflow,
            0x0020 => BlockType::EdgeMeta,
            0x0021 => BlockType::Edge,
            0x0030 => BlockType::IndexRoot,
            0x0031 => BlockType::IndexInternal,
            0x0032 => BlockType::IndexLeaf,
            0x0040 => BlockType::JournalSegment,
            0x0050 => BlockType::Schema,
            0x0051 => BlockType::Constraint,
            0x0060 => BlockType::Migration,
            other => BlockType::Unknown(other),
        }
    }

    /// Encodes this type back into its raw on-disk `u16` code.
    pub fn to_code(self) -> u16 {
        match self {
            BlockType::Free => 0x0000,
            BlockType::Superblock => 0x0001,
            BlockType::CollectionMeta => 0x0010,
            BlockType::Document => 0x0011,
            BlockType::DocumentOverflow => 0x0012,
            BlockType::EdgeMeta => 0x0020,
            BlockType::Edge => 0x0021,
            BlockType::IndexRoot => 0x0030,
            BlockType::IndexInternal => 0x0031,
            BlockType::IndexLeaf => 0x0032,
            BlockType::JournalSegment => 0x0040,
            BlockType::Schema => 0x0050,
            BlockType::Constraint => 0x0051,
            BlockType::Migration => 0x0060,
            BlockType::Unknown(code) => code,
        }
    }

    /// A short, stable name for introspection blobs (`render_block`'s
    /// `"type"` field, §6).
    pub fn name(self) -> &'static str {
        match self {
            BlockType::Free => "free",
            BlockType::Superblock => "superblock",
            BlockType::CollectionMeta => "collection_meta",
            BlockType::Document => "document",
            BlockType::DocumentOverflow => "document_overflow",
            BlockType::EdgeMeta => "edge_meta",
            BlockType::Edge => "edge",
            BlockType::IndexRoot => "index_root",
            BlockType::IndexInternal => "index_internal",
            BlockType::IndexLeaf => "index_leaf",
            BlockType::JournalSegment => "journal_segment",
            BlockType::Schema => "schema",
            BlockType::Constraint => "constraint",
            BlockType::Migration => "migration",
            BlockType::Unknown(_) => "unknown",
        }
    }
}

bitflags::bitflags! {
    /// Header flag bits. Bits 4-31 are reserved and must round-trip as zero
    /// in this build (compression/encryption are explicit Non-goals).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u32 {
        /// Payload is compressed. Reserved: no codec is implemented here.
        const COMPRESSED = 1 << 0;
        /// Payload is encrypted. Reserved: no cipher is implemented here.
        const ENCRYPTED  = 1 << 1;
        /// Block participates in a chain (`prev_block_id` is meaningful
        /// beyond the free-list/journal-chain uses the core assigns it).
        const CHAINED    = 1 << 2;
        /// Block is logically deleted (on the free list).
        const DELETED    = 1 << 3;
    }
}

/// The 64-byte block header, decoded into native types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u16,
    pub block_type: BlockType,
    pub block_id: u64,
    /// Journal ordering sequence number.
    pub sequence: u64,
    pub created_at: u64,
    pub modified_at: u64,
    /// Length of meaningful payload bytes; the rest of the 4032-byte region
    /// is zero-padded.
    pub payload_len: u32,
    pub checksum: u32,
    /// `0` means "no predecessor" (used by both the free list and the
    /// journal chain, depending on block type).
    pub prev_block_id: u64,
    pub flags: BlockFlags,
}

impl BlockHeader {
    /// Builds a fresh header for a block of the given type and id, with
    /// `created_at`/`modified_at` both set to `now_ms` and everything else
    /// at its zero/default value. Callers fill in `payload_len`,
    /// `checksum`, `prev_block_id`, `flags`, and `sequence` as needed.
    pub fn new(block_type: BlockType, block_id: u64, now_ms: u64) -> Self {
        Self {
            version: BLOCK_VERSION,
            block_type,
            block_id,
            sequence: 0,
            created_at: now_ms,
            modified_at: now_ms,
            payload_len: 0,
            checksum: 0,
            prev_block_id: 0,
            flags: BlockFlags::empty(),
        }
    }

    /// Encodes the header into the first 64 bytes of `out`, which must be at
    /// least [`HEADER_SIZE`] bytes long.
    pub fn encode_into(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= HEADER_SIZE);
        LittleEndian::write_u32(&mut out[0..4], BLOCK_MAGIC);
        LittleEndian::write_u16(&mut out[4..6], self.version);
        LittleEndian::write_u16(&mut out[6..8], self.block_type.to_code());
        LittleEndian::write_u64(&mut out[8..16], self.block_id);
        LittleEndian::write_u64(&mut out[16..24], self.sequence);
        LittleEndian::write_u64(&mut out[24..32], self.created_at);
        LittleEndian::write_u64(&mut out[32..40], self.modified_at);
        LittleEndian::write_u32(&mut out[40..44], self.payload_len);
        LittleEndian::write_u32(&mut out[44..48], self.checksum);
        LittleEndian::write_u64(&mut out[48..56], self.prev_block_id);
        LittleEndian::write_u32(&mut out[56..60], self.flags.bits());
        LittleEndian::write_u32(&mut out[60..64], 0); // reserved
    }

    /// Decodes a header from the first 64 bytes of `buf`, validating magic
    /// and version. Does not validate the checksum — that requires the
    /// payload region too (see `decode_block`).
    pub fn decode_from(buf: &[u8]) -> Result<Self, HeaderError> {
        debug_assert!(buf.len() >= HEADER_SIZE);

        let magic = LittleEndian::read_u32(&buf[0..4]);
        if magic != BLOCK_MAGIC {
            return Err(HeaderError::InvalidMagic);
        }
        let version = LittleEndian::read_u16(&buf[4..6]);
        if version != BLOCK_VERSION {
            return Err(HeaderError::UnsupportedVersion);
        }
        let block_type = BlockType::from_code(LittleEndian::read_u16(&buf[6..8]));
        let block_id = LittleEndian::read_u64(&buf[8..16]);
        let sequence = LittleEndian::read_u64(&buf[16..24]);
        let created_at = LittleEndian::read_u64(&buf[24..32]);
        let modified_at = LittleEndian::read_u64(&buf[32..40]);
        let payload_len = LittleEndian::read_u32(&buf[40..44]);
        let checksum = LittleEndian::read_u32(&buf[44..48]);
        let prev_block_id = LittleEndian::read_u64(&buf[48..56]);
        let flags = BlockFlags::from_bits_truncate(LittleEndian::read_u32(&buf[56..60]));

        if payload_len as usize > super::MAX_PAYLOAD_LEN {
            return Err(HeaderError::PayloadTooLarge);
        }

        Ok(Self {
            version,
            block_type,
            block_id,
            sequence,
            created_at,
            modified_at,
            payload_len,
            checksum,
            prev_block_id,
            flags,
        })
    }
}

/// Header-level decode failures (checksum mismatch is validated one layer up
/// once the payload is available — see [`super::DecodeError`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    InvalidMagic,
    UnsupportedVersion,
    PayloadTooLarge,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut header = BlockHeader::new(BlockType::Document, 7, 1_000);
        header.payload_len = 13;
        header.checksum = 0xDEAD_BEEF;
        header.prev_block_id = 3;
        header.flags = BlockFlags::CHAINED;
        header.sequence = 42;

        let mut buf = [0u8; HEADER_SIZE];
        header.encode_into(&mut buf);
        let decoded = BlockHeader::decode_from(&buf).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = [0u8; HEADER_SIZE];
        assert_eq!(
            BlockHeader::decode_from(&buf).unwrap_err(),
            HeaderError::InvalidMagic
        );
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut header = BlockHeader::new(BlockType::Document, 0, 0);
        header.version = 2;
        let mut buf = [0u8; HEADER_SIZE];
        header.encode_into(&mut buf);
        assert_eq!(
            BlockHeader::decode_from(&buf).unwrap_err(),
            HeaderError::UnsupportedVersion
        );
    }

    #[test]
    fn block_type_round_trips_through_code() {
        for ty in [
            BlockType::Free,
            BlockType::Superblock,
            BlockType::CollectionMeta,
            BlockType::Document,
            BlockType::DocumentOverflow,
            BlockType::EdgeMeta,
            BlockType::Edge,
            BlockType::IndexRoot,
            BlockType::IndexInternal,
            BlockType::IndexLeaf,
            BlockType::JournalSegment,
            BlockType::Schema,
            BlockType::Constraint,
            BlockType::Migration,
        ] {
            assert_eq!(BlockType::from_code(ty.to_code()), ty);
        }
    }
}
