//! Unit conversion repository: `global_unit_conversions`.

use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;

/// Factor `f` such that `qty_in_to = qty_in_from * f`, if registered.
pub fn find_factor(conn: &Connection, from: &str, to: &str) -> Result<Option<f64>, DatabaseError> {
    let factor = conn
        .query_row(
            "SELECT factor FROM global_unit_conversions WHERE from_unit = ?1 AND to_unit = ?2",
            params![from, to],
            |r| r.get(0),
        )
        .optional()?;
    Ok(factor)
}

/// Inserts one directed factor. Fails on an existing `(from, to)` pair.
pub fn insert(conn: &Connection, from: &str, to: &str, factor: f64) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO global_unit_conversions (from_unit, to_unit, factor) VALUES (?1, ?2, ?3)",
        params![from, to, factor],
    )?;
    Ok(())
}
