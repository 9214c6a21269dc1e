//! SHA-256 hashing and per-message sequence nonces.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use staticnet_types::Seqno;

/// Computes the SHA-256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Draws a fresh 8-byte sequence nonce from OS entropy.
///
/// Nonces are random rather than monotonic, so receivers cannot use them
/// to detect replays.
pub fn random_seqno() -> Seqno {
    let mut bytes = [0u8; Seqno::LEN];
    OsRng.fill_bytes(&mut bytes);
    Seqno::new(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// FIPS 180-2 SHA-256 test vector: empty input.
    #[test]
    fn sha256_empty_input() {
        let expected = [
            0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14,
            0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
            0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c,
            0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
        ];
        assert_eq!(sha256(b""), expected);
    }

    /// FIPS 180-2 SHA-256 test vector: "abc".
    #[test]
    fn sha256_abc() {
        let expected = [
            0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea,
            0x41, 0x41, 0x40, 0xde, 0x5d, 0xae, 0x22, 0x23,
            0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c,
            0xb4, 0x10, 0xff, 0x61, 0xf2, 0x00, 0x15, 0xad,
        ];
        assert_eq!(sha256(b"abc"), expected);
    }

    #[test]
    fn seqnos_differ() {
        // 2^-64 collision chance.
        assert_ne!(random_seqno(), random_seqno());
    }
}
