//! Caller identities and evidence digests.
//!
//! The ledger never interprets identities beyond equality; the host's
//! identity layer authenticates callers before they reach this core.
//! Likewise, evidence digests are opaque here: the core only rejects the
//! all-zero digest, and verifying a digest against the underlying
//! evidence is the host's concern.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

/// An opaque caller identity supplied by the host.
///
/// The empty string is the null principal. It is rejected wherever an
/// identity would be stored (admin, validation pool, contributor).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Creates a principal from a host identity string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The null principal (no identity).
    #[must_use]
    pub const fn null() -> Self {
        Self(String::new())
    }

    /// Whether this is the null principal.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// The identity string as supplied by the host.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl ToSql for Principal {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for Principal {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(|s| Self(s.to_owned()))
    }
}

/// A 32-byte evidence digest attached to every observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceHash([u8; 32]);

impl EvidenceHash {
    /// Digest length in bytes.
    pub const LEN: usize = 32;

    /// Wraps a 32-byte digest.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zero digest, never accepted as evidence.
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Whether every byte of the digest is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// The raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl ToSql for EvidenceHash {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(&self.0[..]))
    }
}

impl FromSql for EvidenceHash {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_blob()?;
        let bytes: [u8; 32] = blob.try_into().map_err(|_| FromSqlError::InvalidBlobSize {
            expected_size: Self::LEN,
            blob_size: blob.len(),
        })?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_principal() {
        assert!(Principal::null().is_null());
        assert!(Principal::new("").is_null());
        assert!(!Principal::new("alice").is_null());
    }

    #[test]
    fn test_principal_equality() {
        assert_eq!(Principal::new("pool"), Principal::from("pool"));
        assert_ne!(Principal::new("pool"), Principal::new("admin"));
    }

    #[test]
    fn test_zero_evidence_hash() {
        assert!(EvidenceHash::zero().is_zero());
        assert!(EvidenceHash::new([0u8; 32]).is_zero());

        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        assert!(!EvidenceHash::new(bytes).is_zero());
    }
}
