//! Master ingredient catalog and alias learning.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db::catalog_repo;
use crate::error::{PantryError, Result};
use crate::model::{AliasSource, Category, IngredientAlias, MasterIngredient};
use crate::units::normalize_unit;

pub mod index;

pub use index::{bigram_jaccard, CatalogIndex, LinearScanIndex, ScoredCandidate};

/// Lowercase, trimmed, whitespace-collapsed form used as the alias key.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stable id for an ingredient name: `"Extra Virgin  Olive-Oil"` → `"extra-virgin-olive-oil"`.
pub fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// `"olive  OIL"` → `"Olive Oil"`.
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Optional attributes used only when a new catalog row is created.
#[derive(Debug, Clone, Default)]
pub struct NewIngredient<'a> {
    pub category: Option<Category>,
    pub default_unit: Option<&'a str>,
    pub shelf_life_days: Option<u32>,
}

/// Returns the ingredient whose id is the slug of `name`, creating it first
/// if needed.
///
/// Idempotent on the slug: `"Olive Oil"` and `"olive-oil"` land on the same
/// row and the first writer's attributes win.
pub fn get_or_create(
    conn: &Connection,
    name: &str,
    attrs: &NewIngredient<'_>,
    now: DateTime<Utc>,
) -> Result<MasterIngredient> {
    let id = slugify(name);
    if id.is_empty() {
        return Err(PantryError::invalid(format!(
            "ingredient name '{}' has no usable characters",
            name
        )));
    }

    let candidate = MasterIngredient {
        id: id.clone(),
        canonical_name: title_case(name),
        category: attrs.category.unwrap_or_default(),
        default_unit: attrs.default_unit.map(normalize_unit),
        default_shelf_life_days: attrs.shelf_life_days,
        created_at: now,
    };
    if catalog_repo::insert_if_absent(conn, &candidate)? {
        tracing::info!(master_id = %id, "created master ingredient");
    }

    catalog_repo::find_master(conn, &id)?.ok_or_else(|| PantryError::not_found("ingredient", id))
}

/// Fetches an ingredient or fails with `NotFound`.
pub fn require(conn: &Connection, master_id: &str) -> Result<MasterIngredient> {
    catalog_repo::find_master(conn, master_id)?
        .ok_or_else(|| PantryError::not_found("ingredient", master_id))
}

/// Maps a raw name onto an ingredient.
///
/// Last write wins per alias, except that an `agent` write never replaces
/// an existing `user_correction`. Returns the alias as stored afterwards.
pub fn register_alias(
    conn: &Connection,
    raw: &str,
    master_id: &str,
    source: AliasSource,
    now: DateTime<Utc>,
) -> Result<IngredientAlias> {
    let alias = normalize_name(raw);
    if alias.is_empty() {
        return Err(PantryError::invalid("alias must not be empty"));
    }
    require(conn, master_id)?;

    if let Some(existing) = catalog_repo::find_alias(conn, &alias)? {
        if existing.source == AliasSource::UserCorrection && source == AliasSource::Agent {
            tracing::debug!(
                %alias,
                kept = %existing.master_id,
                ignored = %master_id,
                "agent alias does not override user correction"
            );
            return Ok(existing);
        }
    }

    let record = IngredientAlias {
        alias: alias.clone(),
        master_id: master_id.to_string(),
        source,
        created_at: now,
        updated_at: now,
    };
    catalog_repo::upsert_alias(conn, &record)?;
    tracing::info!(%alias, %master_id, source = %source, "registered alias");

    catalog_repo::find_alias(conn, &alias)?.ok_or_else(|| PantryError::not_found("alias", alias))
}

/// User-supplied edits to a catalog row. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct MasterCorrection {
    pub canonical_name: Option<String>,
    pub category: Option<Category>,
    pub default_unit: Option<String>,
    pub default_shelf_life_days: Option<u32>,
}

/// Applies an explicit user correction. The id never changes.
pub fn correct(
    conn: &Connection,
    master_id: &str,
    correction: &MasterCorrection,
) -> Result<MasterIngredient> {
    let mut master = require(conn, master_id)?;
    if let Some(ref name) = correction.canonical_name {
        let name = title_case(name);
        if name.is_empty() {
            return Err(PantryError::invalid("canonical name must not be empty"));
        }
        master.canonical_name = name;
    }
    if let Some(category) = correction.category {
        master.category = category;
    }
    if let Some(ref unit) = correction.default_unit {
        master.default_unit = Some(normalize_unit(unit));
    }
    if let Some(days) = correction.default_shelf_life_days {
        master.default_shelf_life_days = Some(days);
    }
    catalog_repo::update_master(conn, &master)?;
    Ok(master)
}
