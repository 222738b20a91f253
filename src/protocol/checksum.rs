//! XOR checksum of UNER frames.

/// Folds one byte into a running XOR checksum.
pub(crate) fn xor_update(checksum: u8, data: &u8) -> u8 {
    checksum ^ *data
}

/// XOR of every byte in `bytes`.
pub(crate) fn xor_all(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, xor_update)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xor_of_header_and_token() {
        assert_eq!(xor_all(b"UNER"), b'U' ^ b'N' ^ b'E' ^ b'R');
        assert_eq!(xor_update(xor_all(b"UNER"), &b':'), xor_all(b"UNER:"));
    }

    #[test]
    fn test_xor_cancels_pairs() {
        assert_eq!(xor_all(&[0xA5, 0xA5]), 0);
        assert_eq!(xor_all(&[]), 0);
    }
}
