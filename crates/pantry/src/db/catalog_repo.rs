//! Catalog repository: `master_ingredients` and `ingredient_aliases`.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{DatabaseError, Timestamp};
use crate::model::{AliasSource, Category, IngredientAlias, MasterIngredient};

fn master_from_row(row: &Row<'_>) -> Result<MasterIngredient, rusqlite::Error> {
    Ok(MasterIngredient {
        id: row.get("id")?,
        canonical_name: row.get("canonical_name")?,
        category: row.get("category")?,
        default_unit: row.get("default_unit")?,
        default_shelf_life_days: row.get("default_shelf_life_days")?,
        created_at: row.get::<_, Timestamp>("created_at")?.0,
    })
}

fn alias_from_row(row: &Row<'_>) -> Result<IngredientAlias, rusqlite::Error> {
    Ok(IngredientAlias {
        alias: row.get("alias")?,
        master_id: row.get("master_id")?,
        source: row.get("source")?,
        created_at: row.get::<_, Timestamp>("created_at")?.0,
        updated_at: row.get::<_, Timestamp>("updated_at")?.0,
    })
}

/// Inserts the ingredient unless a row with the same id exists.
///
/// Relies on the primary-key constraint, so two writers racing on the
/// same slug end up with a single row. Returns whether a row was inserted.
pub fn insert_if_absent(conn: &Connection, master: &MasterIngredient) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT INTO master_ingredients (id, canonical_name, category, default_unit,
         default_shelf_life_days, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO NOTHING",
        params![
            master.id,
            master.canonical_name,
            master.category,
            master.default_unit,
            master.default_shelf_life_days,
            Timestamp(master.created_at),
        ],
    )?;
    Ok(inserted > 0)
}

/// Overwrites the user-editable fields of an ingredient.
pub fn update_master(conn: &Connection, master: &MasterIngredient) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE master_ingredients SET canonical_name = ?2, category = ?3, default_unit = ?4,
         default_shelf_life_days = ?5 WHERE id = ?1",
        params![
            master.id,
            master.canonical_name,
            master.category,
            master.default_unit,
            master.default_shelf_life_days,
        ],
    )?;
    Ok(updated > 0)
}

/// Finds an ingredient by its slug id.
pub fn find_master(conn: &Connection, id: &str) -> Result<Option<MasterIngredient>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT * FROM master_ingredients WHERE id = ?1",
            params![id],
            master_from_row,
        )
        .optional()?;
    Ok(found)
}

/// Returns every catalog row. Used by the linear-scan fuzzy index.
pub fn list_masters(conn: &Connection) -> Result<Vec<MasterIngredient>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM master_ingredients ORDER BY canonical_name")?;
    let rows = stmt
        .query_map([], master_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Finds the alias row for an already-normalized raw name.
pub fn find_alias(conn: &Connection, alias: &str) -> Result<Option<IngredientAlias>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT * FROM ingredient_aliases WHERE alias = ?1",
            params![alias],
            alias_from_row,
        )
        .optional()?;
    Ok(found)
}

/// Inserts or re-points an alias. The original `created_at` is kept.
pub fn upsert_alias(conn: &Connection, alias: &IngredientAlias) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO ingredient_aliases (alias, master_id, source, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(alias) DO UPDATE SET
           master_id = excluded.master_id,
           source = excluded.source,
           updated_at = excluded.updated_at",
        params![
            alias.alias,
            alias.master_id,
            alias.source,
            Timestamp(alias.created_at),
            Timestamp(alias.updated_at),
        ],
    )?;
    Ok(())
}

/// Lists the aliases pointing at one ingredient.
pub fn list_aliases(conn: &Connection, master_id: &str) -> Result<Vec<IngredientAlias>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM ingredient_aliases WHERE master_id = ?1 ORDER BY alias")?;
    let rows = stmt
        .query_map(params![master_id], alias_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
