//! One-shot ownership certificates.
//!
//! A contributor may mint exactly one certificate per record they own,
//! binding an externally assigned token id to the record. A certificate
//! row either does not exist (never minted) or exists permanently;
//! there is no unminted-but-owned intermediate state.

use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// A minted certificate for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Certificate {
    /// The record the certificate was minted for.
    pub record_id: u64,

    /// The contributor who minted it; fixed at mint time.
    pub owner: Principal,

    /// Externally assigned token identifier (positive).
    pub token_id: i64,
}
