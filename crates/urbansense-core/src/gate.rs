//! Access gating for mutating ledger operations.
//!
//! The gate row holds the admin identity, the validation-pool identity,
//! the circuit-breaker pause flag, and the last-assigned record id. It
//! is loaded at the start of every mutating transaction and rewritten
//! in the same transaction when it changes, so gate decisions and their
//! effects commit as one unit.
//!
//! Check ordering is fail-closed and contractual: `paused` is a blanket
//! override evaluated before authorization, which in turn runs before
//! any field validation.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::principal::Principal;

/// Snapshot of the global gate state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    /// Identity allowed to administer the gate and ingest records.
    pub admin: Principal,

    /// External collaborator allowed to ingest post-consensus records.
    pub validation_pool: Principal,

    /// Circuit breaker; while set, every mutating call is refused.
    pub paused: bool,

    /// Last-assigned record id (0 while the ledger is empty).
    pub counter: u64,
}

impl GateState {
    /// Fails with [`LedgerError::Paused`] while the circuit breaker is
    /// engaged.
    pub(crate) const fn ensure_not_paused(&self) -> Result<(), LedgerError> {
        if self.paused {
            Err(LedgerError::Paused)
        } else {
            Ok(())
        }
    }

    /// Fails unless `caller` is the current admin.
    pub(crate) fn ensure_admin(&self, caller: &Principal) -> Result<(), LedgerError> {
        if *caller == self.admin {
            Ok(())
        } else {
            Err(LedgerError::NotAuthorized)
        }
    }

    /// Ingestion is open to the admin and the validation pool only.
    pub(crate) fn authorize_ingestion(&self, caller: &Principal) -> Result<(), LedgerError> {
        if *caller == self.admin || *caller == self.validation_pool {
            Ok(())
        } else {
            Err(LedgerError::NotAuthorized)
        }
    }
}
