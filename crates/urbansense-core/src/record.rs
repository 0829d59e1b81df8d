//! Observation records and submission payloads.
//!
//! A [`Record`] is one immutable validated urban-environmental
//! observation. Records are appended through
//! [`SqliteLedger::add_record`](crate::SqliteLedger::add_record) and are
//! never altered or deleted afterwards.
//!
//! A [`RecordDraft`] is the submission payload: every record field
//! except the ledger-assigned `id`. Field validation runs over the
//! draft in a fixed order, and the first violated rule is the one
//! reported (see [`RecordDraft::validate`]).

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::principal::{EvidenceHash, Principal};

/// Maximum length of the data-type string, in characters.
pub const MAX_DATA_TYPE_LEN: usize = 50;

/// Maximum length of the free-form metadata string, in characters.
pub const MAX_METADATA_LEN: usize = 500;

/// Maximum number of tags per record.
pub const MAX_TAGS: usize = 10;

/// Maximum length of a single tag, in characters.
pub const MAX_TAG_LEN: usize = 20;

/// Latitude bounds in micro-degrees (scaled x1e6).
pub const MIN_LATITUDE: i64 = -90_000_000;
/// See [`MIN_LATITUDE`].
pub const MAX_LATITUDE: i64 = 90_000_000;

/// Longitude bounds in micro-degrees (scaled x1e6).
pub const MIN_LONGITUDE: i64 = -180_000_000;
/// See [`MIN_LONGITUDE`].
pub const MAX_LONGITUDE: i64 = 180_000_000;

/// Maximum quality score.
pub const MAX_QUALITY_SCORE: u8 = 100;

/// A validated urban-environmental observation.
///
/// Ids form a contiguous increasing sequence starting at 1; rejected
/// submissions never consume an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Record {
    /// Ledger-assigned id (1-based, strictly increasing, no gaps).
    pub id: u64,

    /// Observation type, e.g. `"PM2.5"` (non-empty, <= 50 chars).
    pub data_type: String,

    /// Scaled measurement value.
    pub value: i64,

    /// Latitude in micro-degrees.
    pub location_lat: i64,

    /// Longitude in micro-degrees.
    pub location_lon: i64,

    /// Observation time in seconds (positive).
    pub timestamp: u64,

    /// Identity of the contributor who produced the observation.
    pub contributor: Principal,

    /// Digest of the supporting evidence (not all-zero).
    pub evidence_hash: EvidenceHash,

    /// Free-form metadata (<= 500 chars).
    pub metadata: String,

    /// Ordered tags (<= 10, each <= 20 chars).
    pub tags: Vec<String>,

    /// Host-supplied ingestion sequence marker (e.g. block height).
    pub validated_at: u64,

    /// Quality score in 0..=100.
    pub quality_score: u8,
}

/// Submission payload for [`SqliteLedger::add_record`](crate::SqliteLedger::add_record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    /// Observation type.
    pub data_type: String,
    /// Scaled measurement value.
    pub value: i64,
    /// Latitude in micro-degrees.
    pub location_lat: i64,
    /// Longitude in micro-degrees.
    pub location_lon: i64,
    /// Observation time in seconds.
    pub timestamp: u64,
    /// Identity of the contributor.
    pub contributor: Principal,
    /// Digest of the supporting evidence.
    pub evidence_hash: EvidenceHash,
    /// Free-form metadata.
    pub metadata: String,
    /// Ordered tags.
    pub tags: Vec<String>,
    /// Host-supplied ingestion sequence marker.
    pub validated_at: u64,
    /// Quality score.
    pub quality_score: u8,
}

impl RecordDraft {
    /// Creates a draft with empty metadata, no tags, and a zero quality
    /// score. Optional fields are set with the `with_*` builders.
    #[must_use]
    pub fn new(
        data_type: impl Into<String>,
        value: i64,
        location_lat: i64,
        location_lon: i64,
        timestamp: u64,
        contributor: Principal,
        evidence_hash: EvidenceHash,
    ) -> Self {
        Self {
            data_type: data_type.into(),
            value,
            location_lat,
            location_lon,
            timestamp,
            contributor,
            evidence_hash,
            metadata: String::new(),
            tags: Vec::new(),
            validated_at: 0,
            quality_score: 0,
        }
    }

    /// Sets the free-form metadata (builder pattern).
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    /// Sets the tag list (builder pattern).
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the quality score (builder pattern).
    #[must_use]
    pub const fn with_quality_score(mut self, quality_score: u8) -> Self {
        self.quality_score = quality_score;
        self
    }

    /// Sets the host-supplied ingestion sequence marker (builder pattern).
    #[must_use]
    pub const fn with_validated_at(mut self, validated_at: u64) -> Self {
        self.validated_at = validated_at;
        self
    }

    /// Validates all submitted fields in the contractual order.
    ///
    /// The order is part of the external contract: consumers observe
    /// the *first* violated rule, never a combination. Checks are pure;
    /// nothing is mutated on failure.
    ///
    /// # Errors
    ///
    /// The first violated rule, as:
    /// `InvalidData` (data type), `InvalidLocation` (latitude, then
    /// longitude), `InvalidTimestamp`, `InvalidEvidence`, `InvalidData`
    /// (tags/metadata/quality, one failure class), `InvalidPrincipal`.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.data_type.is_empty() || self.data_type.chars().count() > MAX_DATA_TYPE_LEN {
            return Err(LedgerError::InvalidData {
                reason: "data type must be 1..=50 characters",
            });
        }
        if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&self.location_lat) {
            return Err(LedgerError::InvalidLocation);
        }
        if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&self.location_lon) {
            return Err(LedgerError::InvalidLocation);
        }
        if self.timestamp == 0 {
            return Err(LedgerError::InvalidTimestamp);
        }
        if self.evidence_hash.is_zero() {
            return Err(LedgerError::InvalidEvidence);
        }
        if self.tags.len() > MAX_TAGS
            || self.tags.iter().any(|t| t.chars().count() > MAX_TAG_LEN)
            || self.metadata.chars().count() > MAX_METADATA_LEN
            || self.quality_score > MAX_QUALITY_SCORE
        {
            return Err(LedgerError::InvalidData {
                reason: "tags, metadata, or quality score out of bounds",
            });
        }
        if self.contributor.is_null() {
            return Err(LedgerError::InvalidPrincipal);
        }
        Ok(())
    }

    /// Materializes the draft into a stored record under `id`.
    pub(crate) fn into_record(self, id: u64) -> Record {
        Record {
            id,
            data_type: self.data_type,
            value: self.value,
            location_lat: self.location_lat,
            location_lon: self.location_lon,
            timestamp: self.timestamp,
            contributor: self.contributor,
            evidence_hash: self.evidence_hash,
            metadata: self.metadata,
            tags: self.tags,
            validated_at: self.validated_at,
            quality_score: self.quality_score,
        }
    }
}
