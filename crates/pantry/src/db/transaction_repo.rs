//! Transaction log repository. Append-only: there is no update or delete.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{DatabaseError, Timestamp};
use crate::model::{Operation, TransactionRecord};

fn record_from_row(row: &Row<'_>) -> Result<TransactionRecord, rusqlite::Error> {
    Ok(TransactionRecord {
        id: row.get("id")?,
        container_id: row.get("container_id")?,
        operation: row.get("operation")?,
        delta: row.get("delta")?,
        unit: row.get("unit")?,
        reason: row.get("reason")?,
        created_at: row.get::<_, Timestamp>("created_at")?.0,
    })
}

/// Appends one record to the log.
pub fn append(conn: &Connection, record: &TransactionRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO transactions (id, container_id, operation, delta, unit, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id,
            record.container_id,
            record.operation,
            record.delta,
            record.unit,
            record.reason,
            Timestamp(record.created_at),
        ],
    )?;
    Ok(())
}

/// All records of one container in append order.
pub fn list_for_container(
    conn: &Connection,
    container_id: &str,
) -> Result<Vec<TransactionRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM transactions WHERE container_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt
        .query_map(params![container_id], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The earliest record of a given operation for a container.
pub fn find_first(
    conn: &Connection,
    container_id: &str,
    operation: Operation,
) -> Result<Option<TransactionRecord>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT * FROM transactions WHERE container_id = ?1 AND operation = ?2
             ORDER BY created_at ASC, rowid ASC LIMIT 1",
            params![container_id, operation],
            record_from_row,
        )
        .optional()?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, operation: Operation, delta: Option<f64>) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            container_id: "c1".to_string(),
            operation,
            delta,
            unit: "ml".to_string(),
            reason: String::new(),
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap(),
        }
    }

    fn seed_container(conn: &Connection) {
        conn.execute(
            "INSERT INTO containers (id, dish_name, status, purchase_unit, source, created_at, updated_at)
             VALUES ('c1', 'Broth', 'OPEN', 'ml', 'cooked', '2026-02-01T08:00:00.000000Z', '2026-02-01T08:00:00.000000Z')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_append_and_list_in_order() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            seed_container(conn);
            append(conn, &record("t1", Operation::Add, Some(1000.0)))?;
            append(conn, &record("t2", Operation::StatusChange, None))?;
            append(conn, &record("t3", Operation::Deduct, Some(-250.0)))?;

            let log = list_for_container(conn, "c1")?;
            let ids: Vec<&str> = log.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["t1", "t2", "t3"]);
            assert_eq!(log[1].delta, None);
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_find_first_add() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            seed_container(conn);
            assert!(find_first(conn, "c1", Operation::Add)?.is_none());

            append(conn, &record("t1", Operation::Add, Some(1000.0)))?;
            append(conn, &record("t2", Operation::Add, Some(5.0)))?;
            let first = find_first(conn, "c1", Operation::Add)?.unwrap();
            assert_eq!(first.delta, Some(1000.0));
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }
}
