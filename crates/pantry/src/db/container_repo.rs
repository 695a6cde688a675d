//! Container repository: `containers` joined 1:1 with `contents`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{DatabaseError, Timestamp};
use crate::model::{Category, Container, ContainerState, ContainerStatus, Contents};

const SELECT_STATE: &str = "SELECT c.*, ct.remaining_qty, ct.unit, ct.version
     FROM containers c JOIN contents ct ON ct.container_id = c.id";

fn state_from_row(row: &Row<'_>) -> Result<ContainerState, rusqlite::Error> {
    let id: String = row.get("id")?;
    Ok(ContainerState {
        container: Container {
            id: id.clone(),
            master_id: row.get("master_id")?,
            dish_name: row.get("dish_name")?,
            recipe_id: row.get("recipe_id")?,
            status: row.get("status")?,
            purchase_unit: row.get("purchase_unit")?,
            source: row.get("source")?,
            confidence: row.get("confidence")?,
            vision_job_id: row.get("vision_job_id")?,
            expires_at: row.get::<_, Option<Timestamp>>("expires_at")?.map(|t| t.0),
            created_at: row.get::<_, Timestamp>("created_at")?.0,
            updated_at: row.get::<_, Timestamp>("updated_at")?.0,
        },
        contents: Contents {
            container_id: id,
            remaining_qty: row.get("remaining_qty")?,
            unit: row.get("unit")?,
            version: row.get("version")?,
        },
    })
}

/// Inserts a container together with its single contents row.
pub fn insert(conn: &Connection, state: &ContainerState) -> Result<(), DatabaseError> {
    let c = &state.container;
    conn.execute(
        "INSERT INTO containers (id, master_id, dish_name, recipe_id, status, purchase_unit,
         source, confidence, vision_job_id, expires_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            c.id,
            c.master_id,
            c.dish_name,
            c.recipe_id,
            c.status,
            c.purchase_unit,
            c.source,
            c.confidence,
            c.vision_job_id,
            c.expires_at.map(Timestamp),
            Timestamp(c.created_at),
            Timestamp(c.updated_at),
        ],
    )?;
    conn.execute(
        "INSERT INTO contents (container_id, remaining_qty, unit, version) VALUES (?1, ?2, ?3, ?4)",
        params![
            c.id,
            state.contents.remaining_qty,
            state.contents.unit,
            state.contents.version,
        ],
    )?;
    Ok(())
}

/// Finds a container and its contents by container id.
pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<ContainerState>, DatabaseError> {
    let sql = format!("{} WHERE c.id = ?1", SELECT_STATE);
    let found = conn
        .query_row(&sql, params![id], state_from_row)
        .optional()?;
    Ok(found)
}

/// Active containers of one ingredient, oldest stock first.
///
/// Ties on `created_at` fall back to insertion order.
pub fn find_active_for_master(
    conn: &Connection,
    master_id: &str,
) -> Result<Vec<ContainerState>, DatabaseError> {
    let sql = format!(
        "{} WHERE c.master_id = ?1 AND c.status IN ('SEALED', 'OPEN', 'LOW')
         ORDER BY c.created_at ASC, c.rowid ASC",
        SELECT_STATE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![master_id], state_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Writes a new quantity if the contents row is still at `expected_version`.
///
/// Returns `false` when another writer bumped the version first.
pub fn update_contents(
    conn: &Connection,
    container_id: &str,
    remaining_qty: f64,
    unit: &str,
    expected_version: i64,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE contents SET remaining_qty = ?2, unit = ?3, version = version + 1
         WHERE container_id = ?1 AND version = ?4",
        params![container_id, remaining_qty, unit, expected_version],
    )?;
    Ok(updated > 0)
}

/// Updates the status and `updated_at` of a container.
pub fn update_status(
    conn: &Connection,
    id: &str,
    status: ContainerStatus,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE containers SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status, Timestamp(updated_at)],
    )?;
    Ok(())
}

/// Updates the expiry and `updated_at` of a container.
pub fn update_expiry(
    conn: &Connection,
    id: &str,
    expires_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE containers SET expires_at = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, expires_at.map(Timestamp), Timestamp(updated_at)],
    )?;
    Ok(())
}

/// Bumps `updated_at` after a contents-only change.
pub fn touch(conn: &Connection, id: &str, updated_at: DateTime<Utc>) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE containers SET updated_at = ?2 WHERE id = ?1",
        params![id, Timestamp(updated_at)],
    )?;
    Ok(())
}

/// Query filter parameters for inventory listing.
#[derive(Debug, Default, Clone)]
pub struct ContainerFilter {
    /// Case-insensitive substring of the canonical or dish name.
    pub name_contains: Option<String>,
    pub category: Option<Category>,
    /// Empty means no status restriction.
    pub statuses: Vec<ContainerStatus>,
    pub expires_before: Option<DateTime<Utc>>,
    pub include_leftovers: bool,
    pub master_id: Option<String>,
    pub limit: u32,
}

/// A container row joined with its catalog entry, if any.
#[derive(Debug, Clone)]
pub struct InventoryRow {
    pub state: ContainerState,
    pub canonical_name: Option<String>,
    pub category: Option<Category>,
}

/// Lists containers matching the filter, soonest expiry first.
pub fn query(conn: &Connection, filter: &ContainerFilter) -> Result<Vec<InventoryRow>, DatabaseError> {
    let mut conditions = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(ref needle) = filter.name_contains {
        let n = param_values.len() + 1;
        conditions.push(format!(
            "(unicode_lower(COALESCE(m.canonical_name, '')) LIKE ?{n} ESCAPE '\\'
              OR unicode_lower(COALESCE(c.dish_name, '')) LIKE ?{n} ESCAPE '\\')"
        ));
        param_values.push(Box::new(format!("%{}%", escape_like(&needle.to_lowercase()))));
    }
    if let Some(category) = filter.category {
        conditions.push(format!("m.category = ?{}", param_values.len() + 1));
        param_values.push(Box::new(category));
    }
    if !filter.statuses.is_empty() {
        let placeholders: Vec<String> = filter
            .statuses
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", param_values.len() + i + 1))
            .collect();
        conditions.push(format!("c.status IN ({})", placeholders.join(", ")));
        for status in &filter.statuses {
            param_values.push(Box::new(*status));
        }
    }
    if let Some(before) = filter.expires_before {
        conditions.push(format!(
            "c.expires_at IS NOT NULL AND c.expires_at <= ?{}",
            param_values.len() + 1
        ));
        param_values.push(Box::new(Timestamp(before)));
    }
    if !filter.include_leftovers {
        conditions.push("c.master_id IS NOT NULL".to_string());
    }
    if let Some(ref master_id) = filter.master_id {
        conditions.push(format!("c.master_id = ?{}", param_values.len() + 1));
        param_values.push(Box::new(master_id.clone()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    param_values.push(Box::new(i64::from(filter.limit)));
    let sql = format!(
        "SELECT c.*, ct.remaining_qty, ct.unit, ct.version,
                m.canonical_name AS m_canonical_name, m.category AS m_category
         FROM containers c
         JOIN contents ct ON ct.container_id = c.id
         LEFT JOIN master_ingredients m ON m.id = c.master_id
         {} ORDER BY c.expires_at IS NULL, c.expires_at ASC, c.created_at ASC, c.rowid ASC
         LIMIT ?{}",
        where_clause,
        param_values.len()
    );

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_ref.as_slice(), |row| {
            Ok(InventoryRow {
                state: state_from_row(row)?,
                canonical_name: row.get("m_canonical_name")?,
                category: row.get("m_category")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
