//! The `SQLite`-backed observation ledger.
//!
//! This module ties the components together: the append-only record
//! table, the four derived dimension indices, the streaming aggregate
//! buckets, the access gate, and the certificate registry all live in
//! one database and are mutated through [`SqliteLedger`].
//!
//! # Atomicity
//!
//! Every mutating call executes as one `SQLite` transaction: the record
//! insert, the counter advance, all four index entries, and the
//! aggregate fold commit together or not at all. A failure anywhere in
//! the pipeline rolls the whole unit back; no orphaned index entries or
//! advanced counters are observable.
//!
//! # Concurrency
//!
//! WAL mode allows concurrent readers while a write is in progress, and
//! readers never observe a transaction mid-flight. Use
//! [`SqliteLedger::open_reader`] for additional read-only connections
//! against an on-disk ledger.

// SQLite returns i64 for row ids and counts, but they are always
// non-negative here. Mutex poisoning indicates a panic in another
// thread, which is unrecoverable.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::missing_panics_doc
)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row, Transaction};

use crate::aggregate::{period_of, AggregateBucket};
use crate::certificate::Certificate;
use crate::error::LedgerError;
use crate::events::{EventSink, LedgerEvent, TracingSink};
use crate::gate::GateState;
use crate::index;
use crate::principal::Principal;
use crate::record::{Record, RecordDraft};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Statistics about the ledger.
#[derive(Debug, Clone, Default)]
pub struct LedgerStats {
    /// Total number of stored records.
    pub record_count: u64,

    /// Total number of minted certificates.
    pub certificate_count: u64,

    /// Highest record id (0 if empty).
    pub max_record_id: u64,

    /// Database file size in bytes.
    pub db_size_bytes: u64,
}

/// The append-only observation ledger.
///
/// Records can only be added, never modified or deleted; the schema
/// enforces this with triggers on the record table. All mutating
/// operations are gated by the pause flag and caller authorization.
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
    sink: Arc<dyn EventSink>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteLedger {
    /// Opens or creates a ledger at the specified path.
    ///
    /// A fresh database is seeded with `admin` as both the admin and
    /// the validation pool; the host rotates the pool afterwards via
    /// [`set_validation_pool`](Self::set_validation_pool). Opening an
    /// existing database preserves its stored gate state and ignores
    /// the argument.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrincipal` for a null admin, or a database error
    /// if the ledger cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>, admin: Principal) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Self::initialize_connection(&conn, &admin)?;
        tracing::debug!(path = %path.display(), "opened observation ledger");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            sink: Arc::new(TracingSink),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory ledger, mainly for testing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrincipal` for a null admin, or a database error
    /// if the database cannot be initialized.
    pub fn in_memory(admin: Principal) -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_connection(&conn, &admin)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            sink: Arc::new(TracingSink),
            path: None,
        })
    }

    /// Replaces the event sink (builder pattern).
    ///
    /// The default sink reports events through `tracing`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Initialize the connection with schema, pragmas, and gate seed.
    fn initialize_connection(conn: &Connection, admin: &Principal) -> Result<(), LedgerError> {
        if admin.is_null() {
            return Err(LedgerError::InvalidPrincipal);
        }

        // Execute schema (includes PRAGMA statements).
        conn.execute_batch(SCHEMA_SQL)?;

        // Seed the gate row on first open only.
        conn.execute(
            "INSERT OR IGNORE INTO gate_state (id, admin, validation_pool, paused, counter)
             VALUES (1, ?1, ?1, 0, 0)",
            params![admin],
        )?;

        Ok(())
    }

    // ---------------------------------------------------------------
    // Ingestion
    // ---------------------------------------------------------------

    /// Appends a validated observation to the ledger.
    ///
    /// The validation pipeline runs in contractual order and the first
    /// violated rule is reported: pause flag, caller authorization,
    /// then the field checks of [`RecordDraft::validate`]. On success
    /// the record, the counter advance, all four index entries, and the
    /// aggregate fold commit as one unit, a `data-added` event is
    /// emitted, and the assigned id is returned.
    ///
    /// Rejected calls never consume an id.
    ///
    /// # Errors
    ///
    /// `Paused`, `NotAuthorized`, or the first violated field rule.
    pub fn add_record(
        &self,
        caller: &Principal,
        draft: &RecordDraft,
    ) -> Result<u64, LedgerError> {
        let (id, event) = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let gate = load_gate(&tx)?;
            gate.ensure_not_paused()?;
            gate.authorize_ingestion(caller)?;
            draft.validate()?;

            let id = gate.counter + 1;
            let record = draft.clone().into_record(id);

            insert_record(&tx, &record)?;
            tx.execute(
                "UPDATE gate_state SET counter = ?1 WHERE id = 1",
                params![id],
            )?;
            index::append_entries(&tx, &record)?;
            fold_aggregate(&tx, &record)?;

            tx.commit()?;

            let event = LedgerEvent::DataAdded {
                record_id: id,
                contributor: record.contributor,
                data_type: record.data_type,
            };
            (id, event)
        };

        self.sink.emit(&event);
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Access gate
    // ---------------------------------------------------------------

    /// Engages the circuit breaker. Admin only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` unless `caller` is the current admin.
    pub fn pause(&self, caller: &Principal) -> Result<(), LedgerError> {
        self.set_paused(caller, true)
    }

    /// Releases the circuit breaker. Admin only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` unless `caller` is the current admin.
    pub fn unpause(&self, caller: &Principal) -> Result<(), LedgerError> {
        self.set_paused(caller, false)
    }

    fn set_paused(&self, caller: &Principal, paused: bool) -> Result<(), LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let gate = load_gate(&tx)?;
        gate.ensure_admin(caller)?;

        tx.execute(
            "UPDATE gate_state SET paused = ?1 WHERE id = 1",
            params![paused],
        )?;
        tx.commit()?;

        tracing::info!(paused, "ledger pause flag changed");
        Ok(())
    }

    /// Hands the admin role to another identity. Admin only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` unless `caller` is the current admin;
    /// `InvalidPrincipal` for a null replacement.
    pub fn set_admin(
        &self,
        caller: &Principal,
        new_admin: &Principal,
    ) -> Result<(), LedgerError> {
        self.set_gate_identity(caller, new_admin, "admin")
    }

    /// Rotates the validation-pool identity. Admin only.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` unless `caller` is the current admin;
    /// `InvalidPrincipal` for a null replacement.
    pub fn set_validation_pool(
        &self,
        caller: &Principal,
        new_pool: &Principal,
    ) -> Result<(), LedgerError> {
        self.set_gate_identity(caller, new_pool, "validation_pool")
    }

    fn set_gate_identity(
        &self,
        caller: &Principal,
        replacement: &Principal,
        column: &str,
    ) -> Result<(), LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let gate = load_gate(&tx)?;
        gate.ensure_admin(caller)?;
        if replacement.is_null() {
            return Err(LedgerError::InvalidPrincipal);
        }

        // `column` is one of two compile-time literals, never caller input.
        tx.execute(
            &format!("UPDATE gate_state SET {column} = ?1 WHERE id = 1"),
            params![replacement],
        )?;
        tx.commit()?;

        tracing::info!(role = column, identity = %replacement, "gate identity changed");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Certificates
    // ---------------------------------------------------------------

    /// Mints the one-shot certificate for a record.
    ///
    /// Only the record's contributor may mint, exactly once, with a
    /// positive externally assigned token id. On success the
    /// certificate is stored permanently and an `nft-minted` event is
    /// emitted.
    ///
    /// # Errors
    ///
    /// In order: `Paused`, `NotFound` (no such record), `NotAuthorized`
    /// (caller is not the contributor), `DataExists` (already minted),
    /// `InvalidTokenId` (non-positive token id).
    pub fn mint(
        &self,
        caller: &Principal,
        record_id: u64,
        token_id: i64,
    ) -> Result<(), LedgerError> {
        let event = {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let gate = load_gate(&tx)?;
            gate.ensure_not_paused()?;

            let contributor: Option<Principal> = tx
                .query_row(
                    "SELECT contributor FROM records WHERE id = ?1",
                    params![record_id],
                    |row| row.get(0),
                )
                .optional()?;
            let contributor = contributor.ok_or(LedgerError::NotFound { record_id })?;

            if *caller != contributor {
                return Err(LedgerError::NotAuthorized);
            }

            let already_minted: Option<i64> = tx
                .query_row(
                    "SELECT token_id FROM certificates WHERE record_id = ?1",
                    params![record_id],
                    |row| row.get(0),
                )
                .optional()?;
            if already_minted.is_some() {
                return Err(LedgerError::DataExists { record_id });
            }

            if token_id <= 0 {
                return Err(LedgerError::InvalidTokenId { token_id });
            }

            tx.execute(
                "INSERT INTO certificates (record_id, owner, token_id) VALUES (?1, ?2, ?3)",
                params![record_id, caller, token_id],
            )?;
            tx.commit()?;

            LedgerEvent::NftMinted {
                record_id,
                owner: caller.clone(),
                token_id,
            }
        };

        self.sink.emit(&event);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Read surface
    // ---------------------------------------------------------------

    /// Reads a single record by id. Absence is a valid result.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn get_record(&self, id: u64) -> Result<Option<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        read_record(&conn, id)
    }

    /// Records of an exact data type with `id >= start_id`, up to
    /// `limit`, in insertion order. Unknown types yield an empty vec.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn query_by_type(
        &self,
        data_type: &str,
        start_id: u64,
        limit: u64,
    ) -> Result<Vec<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        query_by_type(&conn, data_type, start_id, limit)
    }

    /// Records in an exact location bucket with `id >= start_id`, up to
    /// `limit`, in insertion order. Exact-match, not a radius search.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn query_by_location(
        &self,
        location_lat: i64,
        location_lon: i64,
        start_id: u64,
        limit: u64,
    ) -> Result<Vec<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        query_by_location(&conn, location_lat, location_lon, start_id, limit)
    }

    /// The first `limit` records with an exact timestamp, in insertion
    /// order. This dimension takes no start id, by contract.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn query_by_timestamp(
        &self,
        timestamp: u64,
        limit: u64,
    ) -> Result<Vec<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        query_by_timestamp(&conn, timestamp, limit)
    }

    /// Records by an exact contributor with `id >= start_id`, up to
    /// `limit`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn query_by_contributor(
        &self,
        contributor: &Principal,
        start_id: u64,
        limit: u64,
    ) -> Result<Vec<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        query_by_contributor(&conn, contributor, start_id, limit)
    }

    /// The aggregate bucket for `(data_type, period)`, if any record
    /// has been folded into it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn get_aggregate(
        &self,
        data_type: &str,
        period: u64,
    ) -> Result<Option<AggregateBucket>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        read_aggregate(&conn, data_type, period)
    }

    /// The certificate for a record, if one was minted.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn get_certificate(&self, record_id: u64) -> Result<Option<Certificate>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        read_certificate(&conn, record_id)
    }

    /// Snapshot of the gate state (admin, pool, pause flag, counter).
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn gate_snapshot(&self) -> Result<GateState, LedgerError> {
        let conn = self.conn.lock().unwrap();
        load_gate(&conn)
    }

    /// Whether the circuit breaker is engaged.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn is_paused(&self) -> Result<bool, LedgerError> {
        Ok(self.gate_snapshot()?.paused)
    }

    /// The current admin identity.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn admin(&self) -> Result<Principal, LedgerError> {
        Ok(self.gate_snapshot()?.admin)
    }

    /// The current validation-pool identity.
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn validation_pool(&self) -> Result<Principal, LedgerError> {
        Ok(self.gate_snapshot()?.validation_pool)
    }

    /// The last-assigned record id (0 while the ledger is empty).
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn counter(&self) -> Result<u64, LedgerError> {
        Ok(self.gate_snapshot()?.counter)
    }

    // ---------------------------------------------------------------
    // Diagnostics
    // ---------------------------------------------------------------

    /// Gets statistics about the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    pub fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let record_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        let certificate_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM certificates", [], |row| row.get(0))?;
        let max_record_id: Option<i64> =
            conn.query_row("SELECT MAX(id) FROM records", [], |row| row.get(0))?;

        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;

        Ok(LedgerStats {
            record_count: record_count as u64,
            certificate_count: certificate_count as u64,
            max_record_id: max_record_id.unwrap_or(0) as u64,
            db_size_bytes: (page_count * page_size) as u64,
        })
    }

    /// Verifies that WAL mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal mode cannot be queried.
    pub fn verify_wal_mode(&self) -> Result<bool, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        Ok(mode.eq_ignore_ascii_case("wal"))
    }

    /// Opens a read-only connection for concurrent reads.
    ///
    /// # Errors
    ///
    /// Returns an error for in-memory ledgers (they have no path) or if
    /// the connection cannot be opened.
    pub fn open_reader(&self) -> Result<LedgerReader, LedgerError> {
        let path = self.path.as_ref().ok_or_else(|| {
            LedgerError::Database(rusqlite::Error::InvalidPath(PathBuf::from(
                ":memory: has no reader path",
            )))
        })?;

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(LedgerReader {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// A read-only view of the ledger for concurrent readers.
///
/// Offers the full read surface; committed state only, never a
/// transaction mid-flight.
pub struct LedgerReader {
    conn: Arc<Mutex<Connection>>,
}

impl LedgerReader {
    /// See [`SqliteLedger::get_record`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn get_record(&self, id: u64) -> Result<Option<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        read_record(&conn, id)
    }

    /// See [`SqliteLedger::query_by_type`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn query_by_type(
        &self,
        data_type: &str,
        start_id: u64,
        limit: u64,
    ) -> Result<Vec<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        query_by_type(&conn, data_type, start_id, limit)
    }

    /// See [`SqliteLedger::query_by_location`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn query_by_location(
        &self,
        location_lat: i64,
        location_lon: i64,
        start_id: u64,
        limit: u64,
    ) -> Result<Vec<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        query_by_location(&conn, location_lat, location_lon, start_id, limit)
    }

    /// See [`SqliteLedger::query_by_timestamp`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn query_by_timestamp(
        &self,
        timestamp: u64,
        limit: u64,
    ) -> Result<Vec<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        query_by_timestamp(&conn, timestamp, limit)
    }

    /// See [`SqliteLedger::query_by_contributor`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn query_by_contributor(
        &self,
        contributor: &Principal,
        start_id: u64,
        limit: u64,
    ) -> Result<Vec<Record>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        query_by_contributor(&conn, contributor, start_id, limit)
    }

    /// See [`SqliteLedger::get_aggregate`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn get_aggregate(
        &self,
        data_type: &str,
        period: u64,
    ) -> Result<Option<AggregateBucket>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        read_aggregate(&conn, data_type, period)
    }

    /// See [`SqliteLedger::get_certificate`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn get_certificate(&self, record_id: u64) -> Result<Option<Certificate>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        read_certificate(&conn, record_id)
    }

    /// See [`SqliteLedger::gate_snapshot`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the query itself fails.
    pub fn gate_snapshot(&self) -> Result<GateState, LedgerError> {
        let conn = self.conn.lock().unwrap();
        load_gate(&conn)
    }
}

// -------------------------------------------------------------------
// Shared read/write helpers (one connection-level implementation for
// both the ledger and its read-only views).
// -------------------------------------------------------------------

fn load_gate(conn: &Connection) -> Result<GateState, LedgerError> {
    let gate = conn.query_row(
        "SELECT admin, validation_pool, paused, counter FROM gate_state WHERE id = 1",
        [],
        |row| {
            Ok(GateState {
                admin: row.get(0)?,
                validation_pool: row.get(1)?,
                paused: row.get(2)?,
                counter: row.get::<_, i64>(3)? as u64,
            })
        },
    )?;
    Ok(gate)
}

fn insert_record(tx: &Transaction<'_>, record: &Record) -> Result<(), LedgerError> {
    let tags = serde_json::to_string(&record.tags)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    tx.execute(
        "INSERT INTO records (id, data_type, value, location_lat, location_lon, timestamp,
                              contributor, evidence_hash, metadata, tags, validated_at,
                              quality_score)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            record.id,
            record.data_type,
            record.value,
            record.location_lat,
            record.location_lon,
            record.timestamp,
            record.contributor,
            record.evidence_hash,
            record.metadata,
            tags,
            record.validated_at,
            record.quality_score,
        ],
    )?;
    Ok(())
}

fn fold_aggregate(tx: &Transaction<'_>, record: &Record) -> Result<(), LedgerError> {
    let period = period_of(record.timestamp);

    let mut bucket = tx
        .query_row(
            "SELECT count, sum, min, max, avg FROM aggregates
             WHERE data_type = ?1 AND period = ?2",
            params![record.data_type, period],
            |row| {
                Ok(AggregateBucket {
                    count: row.get::<_, i64>(0)? as u64,
                    sum: row.get(1)?,
                    min: row.get(2)?,
                    max: row.get(3)?,
                    avg: row.get(4)?,
                })
            },
        )
        .optional()?
        .unwrap_or(AggregateBucket::empty());

    bucket.fold(record.value);

    // Full-row overwrite, not a delta merge.
    tx.execute(
        "INSERT INTO aggregates (data_type, period, count, sum, min, max, avg)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(data_type, period) DO UPDATE SET
             count = excluded.count,
             sum   = excluded.sum,
             min   = excluded.min,
             max   = excluded.max,
             avg   = excluded.avg",
        params![
            record.data_type,
            period,
            bucket.count,
            bucket.sum,
            bucket.min,
            bucket.max,
            bucket.avg,
        ],
    )?;
    Ok(())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let tags_json: String = row.get(9)?;
    let tags = serde_json::from_str(&tags_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Record {
        id: row.get::<_, i64>(0)? as u64,
        data_type: row.get(1)?,
        value: row.get(2)?,
        location_lat: row.get(3)?,
        location_lon: row.get(4)?,
        timestamp: row.get::<_, i64>(5)? as u64,
        contributor: row.get(6)?,
        evidence_hash: row.get(7)?,
        metadata: row.get(8)?,
        tags,
        validated_at: row.get::<_, i64>(10)? as u64,
        quality_score: row.get::<_, i64>(11)? as u8,
    })
}

fn read_record(conn: &Connection, id: u64) -> Result<Option<Record>, LedgerError> {
    let record = conn
        .query_row(
            "SELECT id, data_type, value, location_lat, location_lon, timestamp,
                    contributor, evidence_hash, metadata, tags, validated_at, quality_score
             FROM records
             WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

fn resolve_ids(conn: &Connection, ids: &[u64]) -> Result<Vec<Record>, LedgerError> {
    let mut records = Vec::with_capacity(ids.len());
    for &id in ids {
        // Index entries reference committed records; a miss here means
        // the derived state diverged from the primary table.
        let record = read_record(conn, id)?.ok_or(LedgerError::NotFound { record_id: id })?;
        records.push(record);
    }
    Ok(records)
}

fn query_by_type(
    conn: &Connection,
    data_type: &str,
    start_id: u64,
    limit: u64,
) -> Result<Vec<Record>, LedgerError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let ids = index::ids_by_type(conn, data_type, start_id, limit)?;
    resolve_ids(conn, &ids)
}

fn query_by_location(
    conn: &Connection,
    location_lat: i64,
    location_lon: i64,
    start_id: u64,
    limit: u64,
) -> Result<Vec<Record>, LedgerError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let ids = index::ids_by_location(conn, location_lat, location_lon, start_id, limit)?;
    resolve_ids(conn, &ids)
}

fn query_by_timestamp(
    conn: &Connection,
    timestamp: u64,
    limit: u64,
) -> Result<Vec<Record>, LedgerError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let ids = index::ids_by_timestamp(conn, timestamp, limit)?;
    resolve_ids(conn, &ids)
}

fn query_by_contributor(
    conn: &Connection,
    contributor: &Principal,
    start_id: u64,
    limit: u64,
) -> Result<Vec<Record>, LedgerError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let ids = index::ids_by_contributor(conn, contributor, start_id, limit)?;
    resolve_ids(conn, &ids)
}

fn read_aggregate(
    conn: &Connection,
    data_type: &str,
    period: u64,
) -> Result<Option<AggregateBucket>, LedgerError> {
    let bucket = conn
        .query_row(
            "SELECT count, sum, min, max, avg FROM aggregates
             WHERE data_type = ?1 AND period = ?2",
            params![data_type, period],
            |row| {
                Ok(AggregateBucket {
                    count: row.get::<_, i64>(0)? as u64,
                    sum: row.get(1)?,
                    min: row.get(2)?,
                    max: row.get(3)?,
                    avg: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(bucket)
}

fn read_certificate(
    conn: &Connection,
    record_id: u64,
) -> Result<Option<Certificate>, LedgerError> {
    let certificate = conn
        .query_row(
            "SELECT record_id, owner, token_id FROM certificates WHERE record_id = ?1",
            params![record_id],
            |row| {
                Ok(Certificate {
                    record_id: row.get::<_, i64>(0)? as u64,
                    owner: row.get(1)?,
                    token_id: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(certificate)
}
