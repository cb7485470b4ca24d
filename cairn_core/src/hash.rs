//! Content address of a block (blake3, 32 bytes).
//!
//! Implementation from Iroh (MIT OR Apache-2.0)
//! https://github.com/n0-computer/iroh-blobs/blob/main/src/hash.rs
//!
//! Every block in a cairn store is identified by the BLAKE3 hash of its
//! encoded bytes. The type is used as a map/set key throughout the pinner
//! and the garbage collector, so equality, hashing and ordering are all
//! defined over the raw bytes.

use std::{borrow::Borrow, fmt, str::FromStr};

use minicbor::{Decoder, Encoder, decode, encode};

/// Content address of a block.
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
pub struct Hash(blake3::Hash);

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash").field(&self.to_hex()).finish()
    }
}

impl Hash {
    /// The size of the hash in bytes.
    pub const SIZE: usize = 32;

    /// Calculate the hash of the provided bytes.
    pub fn new(buf: impl AsRef<[u8]>) -> Self {
        Hash(blake3::hash(buf.as_ref()))
    }

    /// Bytes of the hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Create a `Hash` from its raw bytes representation.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(blake3::Hash::from_bytes(bytes))
    }

    /// Convert the hash to a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// First 5 bytes as hex, for log lines.
    pub fn fmt_short(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.as_bytes()[..5])
    }
}

/// Error returned when a string is not a 64-character hex hash.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseHashError {
    #[error("expected 64-character hex hash, got {0} characters")]
    InvalidLength(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl FromStr for Hash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != Self::SIZE * 2 {
            return Err(ParseHashError::InvalidLength(s.len()));
        }
        let bytes = data_encoding::HEXLOWER_PERMISSIVE
            .decode(s.as_bytes())
            .map_err(|e| ParseHashError::InvalidHex(e.to_string()))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Hash::from_bytes(out))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Borrow<[u8; 32]> for Hash {
    fn borrow(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl From<blake3::Hash> for Hash {
    fn from(value: blake3::Hash) -> Self {
        Hash(value)
    }
}

impl From<[u8; 32]> for Hash {
    fn from(value: [u8; 32]) -> Self {
        Hash(blake3::Hash::from(value))
    }
}

impl From<Hash> for [u8; 32] {
    fn from(value: Hash) -> Self {
        *value.as_bytes()
    }
}

impl PartialOrd for Hash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Encoded as a plain CBOR byte string so pin records and DAG nodes stay
// readable by generic CBOR tooling.
impl<C> minicbor::Encode<C> for Hash {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.bytes(self.as_bytes())?;
        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Hash {
    fn decode(d: &mut Decoder<'b>, _: &mut C) -> Result<Self, decode::Error> {
        let p = d.position();
        let bytes = d.bytes()?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| decode::Error::message("hash must be 32 bytes").at(p))?;
        Ok(Hash::from_bytes(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_value() {
        // BLAKE3 hash of "hello" is well-known
        let hash = Hash::new(b"hello");
        let expected_hex = "ea8f163db38682925e4491c5e58d4bb3506ef8c14eb78a86e908c5624a67200f";
        assert_eq!(hash.to_hex(), expected_hex);
    }

    #[test]
    fn test_hash_parse_hex() {
        let hash = Hash::new(b"hello");
        let parsed: Hash = hash.to_hex().parse().unwrap();
        assert_eq!(parsed, hash);

        let upper: Hash = hash.to_hex().to_uppercase().parse().unwrap();
        assert_eq!(upper, hash);
    }

    #[test]
    fn test_hash_parse_rejects_bad_input() {
        assert_eq!(
            "abcd".parse::<Hash>(),
            Err(ParseHashError::InvalidLength(4))
        );
        let not_hex = "z".repeat(64);
        assert!(matches!(
            not_hex.parse::<Hash>(),
            Err(ParseHashError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_hash_fmt_short() {
        let hash = Hash::new(b"hello");
        let short = hash.fmt_short();
        assert_eq!(short.len(), 10);
        assert!(hash.to_hex().starts_with(&short));
    }

    #[test]
    fn test_hash_ordering() {
        let h1 = Hash::from_bytes([0u8; 32]);
        let h2 = Hash::from_bytes([1u8; 32]);
        let h3 = Hash::from_bytes([0xff; 32]);
        assert!(h1 < h2);
        assert!(h2 < h3);
    }

    #[test]
    fn test_hash_cbor_is_byte_string() {
        let hash = Hash::new(b"cbor");
        let encoded = minicbor::to_vec(hash).unwrap();
        // major type 2 (bytes), one-byte length 32
        assert_eq!(&encoded[..2], &[0x58, 0x20]);
        let decoded: Hash = minicbor::decode(&encoded).unwrap();
        assert_eq!(decoded, hash);
    }

    #[test]
    fn test_hash_cbor_rejects_short_bytes() {
        let encoded = minicbor::to_vec(minicbor::bytes::ByteVec::from(vec![1u8; 4])).unwrap();
        assert!(minicbor::decode::<Hash>(&encoded).is_err());
    }
}
