//! Observer events emitted after committed mutations.
//!
//! The ledger produces two events for analytics and indexing observers
//! outside the core: `data-added` and `nft-minted`. Events are emitted
//! only after the owning transaction has committed, so an observer
//! never sees an effect that later rolls back.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// An event produced by a committed ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum LedgerEvent {
    /// A record was appended to the ledger.
    DataAdded {
        /// The assigned record id.
        record_id: u64,
        /// The record's contributor.
        contributor: Principal,
        /// The record's data type.
        data_type: String,
    },

    /// A certificate was minted for a record.
    NftMinted {
        /// The record the certificate was minted for.
        record_id: u64,
        /// The minting contributor.
        owner: Principal,
        /// The externally assigned token id.
        token_id: i64,
    },
}

/// Observer seam for ledger events.
///
/// The ledger calls sinks synchronously after commit; implementations
/// must be cheap and non-blocking. A sink failure cannot roll the
/// mutation back, so sinks do not return errors.
pub trait EventSink: Send + Sync {
    /// Receives one committed event.
    fn emit(&self, event: &LedgerEvent);
}

/// Default sink reporting events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::DataAdded {
                record_id,
                contributor,
                data_type,
            } => {
                tracing::info!(
                    record_id,
                    contributor = %contributor,
                    data_type = %data_type,
                    "data-added"
                );
            }
            LedgerEvent::NftMinted {
                record_id,
                owner,
                token_id,
            } => {
                tracing::info!(
                    record_id,
                    owner = %owner,
                    token_id,
                    "nft-minted"
                );
            }
        }
    }
}

/// Sink that records every event in memory, for tests and embedders
/// that poll instead of subscribe.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl CollectingSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all events collected so far, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &LedgerEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
