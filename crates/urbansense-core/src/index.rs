//! Derived dimension indices.
//!
//! Four secondary indices map a dimension key to the ordered set of
//! record ids carrying that key: data type, location bucket, timestamp,
//! and contributor. They are derived state: written only inside the
//! insert transaction, never mutated independently, and never rebuilt
//! by scanning the record table at query time.
//!
//! Entries keep insertion order, which equals record-id order because
//! ids are assigned monotonically. Pagination filters `id >= start_id`
//! and then takes up to `limit` entries. The timestamp dimension is the
//! deliberate exception: it ignores the start id and always returns the
//! first `limit` entries for the exact timestamp. The asymmetry is part
//! of the external contract and must not be unified away.

use rusqlite::{params, Connection, Transaction};

use crate::principal::Principal;
use crate::record::Record;

/// The location dimension key for a pair of coordinates.
///
/// Coordinates arrive pre-quantized in micro-degrees, so the bucket is
/// the exact `(lat, lon)` pair; the composite key is deterministic and
/// collision-free. Location queries are exact-match, not radius
/// searches.
#[must_use]
pub const fn location_bucket(location_lat: i64, location_lon: i64) -> (i64, i64) {
    (location_lat, location_lon)
}

/// Appends a freshly inserted record to all four dimension indices.
///
/// Runs inside the insert transaction; the caller commits or rolls back
/// the whole unit, so a record is either present in every index or in
/// none.
pub(crate) fn append_entries(tx: &Transaction<'_>, record: &Record) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO index_by_type (data_type, record_id) VALUES (?1, ?2)",
        params![record.data_type, record.id],
    )?;

    let (lat, lon) = location_bucket(record.location_lat, record.location_lon);
    tx.execute(
        "INSERT INTO index_by_location (location_lat, location_lon, record_id)
         VALUES (?1, ?2, ?3)",
        params![lat, lon, record.id],
    )?;

    tx.execute(
        "INSERT INTO index_by_timestamp (timestamp, record_id) VALUES (?1, ?2)",
        params![record.timestamp, record.id],
    )?;

    tx.execute(
        "INSERT INTO index_by_contributor (contributor, record_id) VALUES (?1, ?2)",
        params![record.contributor, record.id],
    )?;

    Ok(())
}

/// Ids for an exact data type, starting at `start_id`, in insertion order.
pub(crate) fn ids_by_type(
    conn: &Connection,
    data_type: &str,
    start_id: u64,
    limit: u64,
) -> rusqlite::Result<Vec<u64>> {
    let mut stmt = conn.prepare(
        "SELECT record_id FROM index_by_type
         WHERE data_type = ?1 AND record_id >= ?2
         ORDER BY record_id ASC
         LIMIT ?3",
    )?;
    let ids = collect_ids(stmt.query_map(params![data_type, start_id, limit], |row| row.get(0))?);
    ids
}

/// Ids for an exact location bucket, starting at `start_id`.
pub(crate) fn ids_by_location(
    conn: &Connection,
    location_lat: i64,
    location_lon: i64,
    start_id: u64,
    limit: u64,
) -> rusqlite::Result<Vec<u64>> {
    let (lat, lon) = location_bucket(location_lat, location_lon);
    let mut stmt = conn.prepare(
        "SELECT record_id FROM index_by_location
         WHERE location_lat = ?1 AND location_lon = ?2 AND record_id >= ?3
         ORDER BY record_id ASC
         LIMIT ?4",
    )?;
    let ids = collect_ids(stmt.query_map(params![lat, lon, start_id, limit], |row| row.get(0))?);
    ids
}

/// First `limit` ids for an exact timestamp, in insertion order.
///
/// No start-id filter, by contract.
pub(crate) fn ids_by_timestamp(
    conn: &Connection,
    timestamp: u64,
    limit: u64,
) -> rusqlite::Result<Vec<u64>> {
    let mut stmt = conn.prepare(
        "SELECT record_id FROM index_by_timestamp
         WHERE timestamp = ?1
         ORDER BY record_id ASC
         LIMIT ?2",
    )?;
    let ids = collect_ids(stmt.query_map(params![timestamp, limit], |row| row.get(0))?);
    ids
}

/// Ids for an exact contributor, starting at `start_id`.
pub(crate) fn ids_by_contributor(
    conn: &Connection,
    contributor: &Principal,
    start_id: u64,
    limit: u64,
) -> rusqlite::Result<Vec<u64>> {
    let mut stmt = conn.prepare(
        "SELECT record_id FROM index_by_contributor
         WHERE contributor = ?1 AND record_id >= ?2
         ORDER BY record_id ASC
         LIMIT ?3",
    )?;
    let ids = collect_ids(stmt.query_map(params![contributor, start_id, limit], |row| row.get(0))?);
    ids
}

#[allow(clippy::cast_sign_loss)] // ids are always non-negative in SQLite
fn collect_ids(
    rows: impl Iterator<Item = rusqlite::Result<i64>>,
) -> rusqlite::Result<Vec<u64>> {
    rows.map(|row| row.map(|id| id as u64)).collect()
}
