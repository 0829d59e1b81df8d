//! Append-only ledger core for validated urban-environmental
//! observations.
//!
//! This crate stores observations that have already been vetted by an
//! external validation pool and makes them queryable by multiple
//! dimensions while maintaining streaming per-type/per-day statistics.
//! It is the storage and consistency core only: identity, consensus,
//! evidence verification, and submission intake are the host's concern
//! and reach this crate through a narrow, pre-authenticated interface.
//!
//! # Components
//!
//! - **Access gate** ([`GateState`]): admin and validation-pool
//!   identities plus a circuit-breaker pause flag; authorizes every
//!   mutating call.
//! - **Record store** ([`Record`], [`SqliteLedger::add_record`]): the
//!   primary, append-only, monotonically-keyed observation table.
//! - **Dimension indices** (`index`): derived by-type, by-location,
//!   by-timestamp, and by-contributor indices, updated transactionally
//!   with every insert.
//! - **Aggregation** ([`AggregateBucket`]): running count/sum/min/max/
//!   floor-average per `(data_type, period)`, folded incrementally.
//! - **Certificates** ([`Certificate`], [`SqliteLedger::mint`]): a
//!   one-shot per-record mint registry.
//! - **Events** ([`LedgerEvent`], [`EventSink`]): `data-added` and
//!   `nft-minted` notifications for observers, emitted after commit.
//!
//! # Example
//!
//! ```rust,no_run
//! use urbansense_core::{EvidenceHash, Principal, RecordDraft, SqliteLedger};
//!
//! # fn example() -> Result<(), urbansense_core::LedgerError> {
//! let admin = Principal::new("host-admin");
//! let ledger = SqliteLedger::open("/path/to/ledger.db", admin.clone())?;
//!
//! let draft = RecordDraft::new(
//!     "PM2.5",
//!     250,
//!     40_712_345,
//!     -74_000_000,
//!     1_725_000_000,
//!     Principal::new("contributor-a"),
//!     EvidenceHash::new([7u8; 32]),
//! )
//! .with_metadata("near highway")
//! .with_tags(vec!["urban".into(), "air-quality".into()])
//! .with_quality_score(85)
//! .with_validated_at(1024);
//!
//! let id = ledger.add_record(&admin, &draft)?;
//! let record = ledger.get_record(id)?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod certificate;
pub mod error;
pub mod events;
pub mod gate;
pub mod index;
pub mod principal;
pub mod record;
pub mod store;


pub use aggregate::{period_of, AggregateBucket, PERIOD_SECONDS};
pub use certificate::Certificate;
pub use error::LedgerError;
pub use events::{CollectingSink, EventSink, LedgerEvent, TracingSink};
pub use gate::GateState;
pub use index::location_bucket;
pub use principal::{EvidenceHash, Principal};
pub use record::{Record, RecordDraft};
pub use store::{LedgerReader, LedgerStats, SqliteLedger};
