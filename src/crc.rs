//! CRC32C (Castagnoli) checksum used for block payload integrity.

/// Computes CRC32C over `data`: polynomial `0x1EDC6F41` (reflected
/// `0x82F63B78`), initial value `0xFFFFFFFF`, final XOR `0xFFFFFFFF`.
#[inline]
pub fn crc32c(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Standard CRC32C check value for `"123456789"`, used to confirm
    /// polynomial/constant choice against peer implementations (§6).
    const CRC32C_CHECK_VALUE: u32 = 0xE3069283;

    #[test]
    fn matches_standard_check_value() {
        assert_eq!(crc32c(b"123456789"), CRC32C_CHECK_VALUE);
    }

    #[test]
    fn nonzero_for_simple_input() {
        assert_ne!(crc32c(b"hello world"), 0);
    }

    #[test]
    fn sensitive_to_single_bit_flip() {
        let mut data = vec![0u8; 64];
        let base = crc32c(&data);
        data[10] ^= 0x01;
        assert_ne!(crc32c(&data), base);
    }
}
