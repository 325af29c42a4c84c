//! Fixed 4 KiB block format: header layout, CRC32C-checked payload, and the
//! block type/flag vocabulary used across the superblock, journal, and data
//! blocks.
//!
//! `header.rs` defines the 64-byte on-disk header and its codec; `format.rs`
//! ties header + payload together into a full 4096-byte [`Block`] and
//! implements `encode_block`/`decode_block`.

mod format;
mod header;

pub use format::{decode_block, encode_block, Block, DecodeError};
pub use header::{BlockFlags, BlockHeader, BlockType};

/// Total on-disk size of a block, in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// On-disk header size, in bytes.
pub const HEADER_SIZE: usize = 64;

/// Maximum payload size, in bytes (`BLOCK_SIZE - HEADER_SIZE`).
pub const MAX_PAYLOAD_LEN: usize = BLOCK_SIZE - HEADER_SIZE;

/// Magic value stamped into every valid block header (`"LGH\0"` as a
/// little-endian `u32`).
pub const BLOCK_MAGIC: u32 = 0x4C47_4800;

/// The only header version this crate understands.
pub const BLOCK_VERSION: u16 = 1;
