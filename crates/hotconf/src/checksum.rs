//! Content checksums used to detect changed files.
//!
//! MurmurHash2 is fast and good enough as an equality proxy. It is not
//! collision resistant: two different contents hashing alike means one
//! reload is missed, which is accepted.

use std::io::{self, Read};

/// 32-bit content checksum.
pub type Checksum = u32;

const SEED: u32 = 0x9747_b28c;

/// Checksum of raw bytes.
#[must_use]
pub fn checksum(bytes: &[u8]) -> Checksum {
    murmur2::murmur2(bytes, SEED)
}

/// Checksum of the UTF-8 encoding of `text`.
#[must_use]
pub fn checksum_str(text: &str) -> Checksum {
    checksum(text.as_bytes())
}

/// Reads `reader` to the end and checksums everything read.
///
/// # Errors
///
/// Propagates any read error.
pub fn checksum_reader(mut reader: impl Read) -> io::Result<Checksum> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(checksum(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(checksum_str("a: 1"), checksum_str("a: 1"));
    }

    #[test]
    fn test_discriminates_small_edits() {
        assert_ne!(checksum_str("a: 1"), checksum_str("a: 2"));
        assert_ne!(checksum_str("a: 1"), checksum_str("a: 1 "));
    }

    #[test]
    fn test_reader_matches_slice() {
        let text = "key: value\nlist: [1, 2, 3]\n";
        let from_reader = checksum_reader(text.as_bytes()).unwrap();
        assert_eq!(from_reader, checksum_str(text));
    }
}
