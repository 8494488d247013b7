//! # Content Digest
//!
//! The wire digest is a 128-bit hash rendered as a 32-character lowercase
//! hexadecimal string. Any digest algorithm of that width and output
//! length satisfies the protocol; this crate standardizes on `md-5` from
//! the RustCrypto family (the same family the reference digest service
//! draws `sha2` from) purely because it already produces the required
//! 16-byte/32-hex surface without truncation or re-encoding.
//!
//! `Digest` is a thin validated newtype. `ChunkHasher` is the trait the
//! Digest & Slicer component (C1) implements against, kept synchronous by
//! the same reasoning the reference checksum service uses: hashing is
//! CPU-bound, not I/O-bound, so async is an infrastructure concern layered
//! on top (see `upload_engine`'s blocking-task adapter) rather than a
//! domain one.

use std::fmt;

use md5::{Digest as Md5DigestTrait, Md5};

use crate::error::UploadError;

/// Length in bytes of the platform's content digest (MD5-compatible: 128
/// bits).
pub const DIGEST_BYTES: usize = 16;

/// Length in hex characters of the platform's content digest.
pub const DIGEST_HEX_LEN: usize = DIGEST_BYTES * 2;

/// A validated 32-character lowercase hexadecimal content digest.
///
/// Two `Digest` values compare equal iff the underlying bytes are equal;
/// the hex string is canonicalized to lowercase at construction so that
/// `Digest::parse("AA..")` and `Digest::parse("aa..")` are the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Parses and validates a hex digest string.
    ///
    /// # Errors
    /// Returns `UploadError::InvalidArgument` if the string is not exactly
    /// [`DIGEST_HEX_LEN`] hex characters.
    pub fn parse(hex_str: &str) -> Result<Self, UploadError> {
        if hex_str.len() != DIGEST_HEX_LEN {
            return Err(UploadError::invalid_argument(format!(
                "digest must be {} hex characters, got {}",
                DIGEST_HEX_LEN,
                hex_str.len()
            )));
        }
        if !hex_str.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UploadError::invalid_argument("digest must be hexadecimal"));
        }
        Ok(Self(hex_str.to_ascii_lowercase()))
    }

    /// Computes the digest of a complete byte slice.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(bytes);
        let result = hasher.finalize();
        Self(hex::encode(result))
    }

    /// The well-defined digest of the empty input.
    pub fn of_empty() -> Self {
        Self::of_bytes(&[])
    }

    /// Returns the canonical lowercase hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes this digest, returning the owned hex `String`.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Digest {
    type Error = UploadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Digest::parse(&value)
    }
}

impl TryFrom<&str> for Digest {
    type Error = UploadError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Digest::parse(value)
    }
}

/// Streaming hash accumulator used by C1 to compute a digest across
/// successive reads without holding the whole input in memory.
///
/// Implementations are not required to be `Send`; the engine's streaming
/// file-hash routine owns one instance per hashing pass and drives it from
/// a single blocking task.
pub trait ChunkHasher: Default {
    /// Folds another slice of bytes into the running hash state.
    fn update(&mut self, bytes: &[u8]);

    /// Consumes the accumulator, producing the final digest.
    fn finalize(self) -> Digest;
}

/// The [`ChunkHasher`] used throughout the platform: streaming MD5.
#[derive(Default)]
pub struct StreamingHasher(Md5);

impl ChunkHasher for StreamingHasher {
    fn update(&mut self, bytes: &[u8]) {
        Md5DigestTrait::update(&mut self.0, bytes);
    }

    fn finalize(self) -> Digest {
        let result = self.0.finalize();
        Digest(hex::encode(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(Digest::parse("abc").is_err());
        assert!(Digest::parse(&"a".repeat(31)).is_err());
        assert!(Digest::parse(&"a".repeat(33)).is_err());
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!(Digest::parse(&"g".repeat(32)).is_err());
    }

    #[test]
    fn parse_canonicalizes_case() {
        let upper = "A".repeat(32);
        let lower = "a".repeat(32);
        assert_eq!(Digest::parse(&upper).unwrap(), Digest::parse(&lower).unwrap());
    }

    #[test]
    fn same_bytes_same_digest() {
        let a = Digest::of_bytes(b"hello world");
        let b = Digest::of_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn single_bit_flip_changes_digest() {
        let a = Digest::of_bytes(b"hello world");
        let b = Digest::of_bytes(b"hello worle");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_digest_is_well_defined() {
        let empty = Digest::of_empty();
        assert_eq!(empty, Digest::of_bytes(&[]));
        assert_eq!(empty.as_str().len(), DIGEST_HEX_LEN);
    }

    #[test]
    fn streaming_hasher_matches_one_shot() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let one_shot = Digest::of_bytes(data);

        let mut streaming = StreamingHasher::default();
        for chunk in data.chunks(7) {
            streaming.update(chunk);
        }
        let streamed = streaming.finalize();

        assert_eq!(one_shot, streamed);
    }
}
