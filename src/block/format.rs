//! A full 4096-byte block (header + checksummed, zero-padded payload) and
//! its codec.

use super::header::{BlockHeader, HeaderError};
use super::{BLOCK_SIZE, HEADER_SIZE, MAX_PAYLOAD_LEN};
use crate::crc::crc32c;

/// A decoded block: header plus its payload, trimmed to `header.payload_len`
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: Vec<u8>,
}

/// Failures from [`decode_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    InvalidMagic,
    UnsupportedVersion,
    PayloadTooLarge,
    ChecksumMismatch,
}

impl From<HeaderError> for DecodeError {
    fn from(err: HeaderError) -> Self {
        match err {
            HeaderError::InvalidMagic => DecodeError::InvalidMagic,
            HeaderError::UnsupportedVersion => DecodeError::UnsupportedVersion,
            HeaderError::PayloadTooLarge => DecodeError::PayloadTooLarge,
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            DecodeError::InvalidMagic => "invalid block magic",
            DecodeError::UnsupportedVersion => "unsupported block version",
            DecodeError::PayloadTooLarge => "payload_len exceeds 4032 bytes",
            DecodeError::ChecksumMismatch => "CRC32C checksum mismatch",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for DecodeError {}

/// Encodes `header` and `payload` into a fixed 4096-byte on-disk block.
///
/// `payload` must be `<= 4032` bytes (callers are expected to have already
/// validated this; `header.payload_len` is overwritten here to
/// `payload.len()`). Bytes beyond `payload.len()` in the payload region are
/// zeroed, and the checksum is computed over that zero-padded region, so
/// `decode_block` validates without needing to know the declared length
/// first.
pub fn encode_block(mut header: BlockHeader, payload: &[u8]) -> [u8; BLOCK_SIZE] {
    assert!(
        payload.len() <= MAX_PAYLOAD_LEN,
        "payload exceeds {MAX_PAYLOAD_LEN} bytes"
    );

    let mut buf = [0u8; BLOCK_SIZE];
    let payload_region = &mut buf[HEADER_SIZE..];
    payload_region[..payload.len()].copy_from_slice(payload);
    // The rest of payload_region is already zero from the array init.

    header.payload_len = payload.len() as u32;
    header.checksum = crc32c(payload_region);
    header.encode_into(&mut buf[..HEADER_SIZE]);

    buf
}

/// Decodes a 4096-byte on-disk block, validating the header invariants and
/// the CRC32C checksum over the full zero-padded payload region.
pub fn decode_block(bytes: &[u8]) -> Result<Block, DecodeError> {
    if bytes.len() != BLOCK_SIZE {
        // A short read is a storage-layer concern (`InvalidBlock`); at the
        // format layer we can only say the input doesn't look like a block.
        return Err(DecodeError::PayloadTooLarge);
    }

    let header = BlockHeader::decode_from(&bytes[..HEADER_SIZE])?;

    let payload_region = &bytes[HEADER_SIZE..];
    let computed = crc32c(payload_region);
    if computed != header.checksum {
        return Err(DecodeError::ChecksumMismatch);
    }

    let payload = payload_region[..header.payload_len as usize].to_vec();
    Ok(Block { header, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    #[test]
    fn round_trips_arbitrary_payloads() {
        for len in [0usize, 1, 13, 4032] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let header = BlockHeader::new(BlockType::Document, 1, 0);
            let encoded = encode_block(header, &payload);
            assert_eq!(encoded.len(), BLOCK_SIZE);

            let decoded = decode_block(&encoded).unwrap();
            assert_eq!(decoded.payload, payload);
            assert_eq!(decoded.header.payload_len as usize, len);
        }
    }

    #[test]
    fn detects_checksum_mismatch_on_bit_flip() {
        let header = BlockHeader::new(BlockType::Document, 1, 0);
        let mut encoded = encode_block(header, b"hello document");
        // Flip a bit inside the payload region, past the header.
        encoded[HEADER_SIZE + 2] ^= 0x01;
        assert_eq!(
            decode_block(&encoded).unwrap_err(),
            DecodeError::ChecksumMismatch
        );
    }

    #[test]
    fn detects_zeroed_magic() {
        let header = BlockHeader::new(BlockType::Document, 1, 0);
        let mut encoded = encode_block(header, b"x");
        encoded[0..4].copy_from_slice(&[0, 0, 0, 0]);
        assert_eq!(decode_block(&encoded).unwrap_err(), DecodeError::InvalidMagic);
    }

    #[test]
    fn block_size_is_exactly_4096() {
        let header = BlockHeader::new(BlockType::Superblock, 0, 0);
        let encoded = encode_block(header, &[]);
        assert_eq!(std::mem::size_of_val(&encoded), BLOCK_SIZE);
    }

    #[test]
    fn header_size_is_exactly_64() {
        assert_eq!(HEADER_SIZE, 64);
    }
}
