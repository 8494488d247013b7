//! Server-issued upload session handle (C9 Protocol Types).

use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Opaque session handle binding a client upload session to a single
/// logical file on the server, for an expiration window.
///
/// The token string itself is opaque to the client (it is never parsed,
/// only echoed back on `verifyHash`/`uploadChunk`/`mergeFile`); this type
/// exists to carry the negotiated chunk size and expiry alongside it so
/// the engine does not need a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadToken {
    token: String,
    file_id: String,
    negotiated_chunk_size: u64,
    expires_at: i64,
}

impl UploadToken {
    pub fn new(
        token: impl Into<String>,
        file_id: impl Into<String>,
        negotiated_chunk_size: u64,
        expires_at: i64,
    ) -> Result<Self, UploadError> {
        let token = token.into();
        let file_id = file_id.into();
        if token.is_empty() {
            return Err(UploadError::invalid_argument("token must not be empty"));
        }
        if file_id.is_empty() {
            return Err(UploadError::invalid_argument("file_id must not be empty"));
        }
        if negotiated_chunk_size == 0 {
            return Err(UploadError::invalid_argument("negotiated_chunk_size must be > 0"));
        }
        Ok(Self {
            token,
            file_id,
            negotiated_chunk_size,
            expires_at,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn negotiated_chunk_size(&self) -> u64 {
        self.negotiated_chunk_size
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Whether this token has expired as of `now` (epoch-ms).
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_token_or_file_id() {
        assert!(UploadToken::new("", "file-1", 1024, 0).is_err());
        assert!(UploadToken::new("tok", "", 1024, 0).is_err());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(UploadToken::new("tok", "file-1", 0, 0).is_err());
    }

    #[test]
    fn expiry_is_inclusive_at_expires_at() {
        let tok = UploadToken::new("tok", "file-1", 1024, 1_000).unwrap();
        assert!(!tok.is_expired(999));
        assert!(tok.is_expired(1_000));
        assert!(tok.is_expired(1_001));
    }
}
