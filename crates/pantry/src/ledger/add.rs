//! Container creation: purchases and cooked leftovers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{record, require_positive};
use crate::catalog::{self, get_or_create, register_alias, NewIngredient};
use crate::db::{container_repo, UnitOfWork};
use crate::duplicates;
use crate::error::{PantryError, Result};
use crate::model::{
    AliasSource, Category, Container, ContainerSource, ContainerState, ContainerStatus, Contents,
    MasterIngredient, Operation,
};
use crate::resolver::{MatchType, Resolver};
use crate::units::normalize_unit;

/// One item to put into the inventory.
///
/// Either `masterId` or `name` identifies the ingredient. Expiry is taken
/// from `expiresAt`, then `expiresInDays`, then `shelfLifeDays`, then the
/// ingredient's default shelf life.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewContainer {
    pub name: Option<String>,
    pub master_id: Option<String>,
    pub category: Option<Category>,
    pub quantity: f64,
    /// Defaults to the ingredient's default unit.
    pub unit: Option<String>,
    /// Defaults to `SEALED`.
    pub status: Option<ContainerStatus>,
    pub source: ContainerSource,
    pub confidence: Option<f64>,
    pub vision_job_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in_days: Option<i64>,
    pub shelf_life_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLeftover {
    pub dish_name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub expires_in_days: Option<i64>,
    #[serde(default)]
    pub recipe_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedContainer {
    pub container_id: String,
    pub master_id: Option<String>,
    pub canonical_name: Option<String>,
    pub dish_name: Option<String>,
    /// How the item name was resolved; absent when the caller passed an id.
    pub match_type: Option<MatchType>,
    pub quantity: f64,
    pub unit: String,
    pub status: ContainerStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub master_id: String,
    pub vision_job_id: String,
    pub existing_container_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddOutcome {
    Added(AddedContainer),
    Skipped(SkippedItem),
}

/// Columns of a container that is about to be inserted.
struct Draft {
    master_id: Option<String>,
    dish_name: Option<String>,
    recipe_id: Option<String>,
    status: ContainerStatus,
    unit: String,
    quantity: f64,
    source: ContainerSource,
    confidence: f64,
    vision_job_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

/// Inserts container and contents, and logs the opening `ADD`.
fn insert(uow: &UnitOfWork<'_>, draft: Draft) -> Result<ContainerState> {
    let now = uow.now();
    let id = Uuid::new_v4().to_string();
    let state = ContainerState {
        container: Container {
            id: id.clone(),
            master_id: draft.master_id,
            dish_name: draft.dish_name,
            recipe_id: draft.recipe_id,
            status: draft.status,
            purchase_unit: draft.unit.clone(),
            source: draft.source,
            confidence: draft.confidence,
            vision_job_id: draft.vision_job_id,
            expires_at: draft.expires_at,
            created_at: now,
            updated_at: now,
        },
        contents: Contents {
            container_id: id.clone(),
            remaining_qty: draft.quantity,
            unit: draft.unit,
            version: 0,
        },
    };
    container_repo::insert(uow.conn(), &state)?;
    record(
        uow,
        &id,
        Operation::Add,
        Some(draft.quantity),
        &state.contents.unit,
        "added",
    )?;
    Ok(state)
}

fn days_from(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    if days < 0 {
        return Err(PantryError::invalid(format!(
            "expiry offset must not be negative, got {} days",
            days
        )));
    }
    Duration::try_days(days)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| PantryError::invalid(format!("expiry offset of {} days is out of range", days)))
}

/// Finds the ingredient an item refers to, learning or creating as needed.
///
/// A fuzzy hit is remembered as an agent alias. Ambiguous and unknown names
/// get their own catalog entry.
fn resolve_master(
    uow: &UnitOfWork<'_>,
    resolver: &Resolver,
    item: &NewContainer,
) -> Result<(MasterIngredient, Option<MatchType>)> {
    let conn = uow.conn();
    if let Some(ref id) = item.master_id {
        return Ok((catalog::require(conn, id)?, None));
    }

    let name = item
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PantryError::invalid("an item needs either a name or a masterId"))?;

    let resolution = resolver.resolve(conn, name, item.category)?;
    let master = match (resolution.match_type, resolution.master_id.as_deref()) {
        (MatchType::Exact | MatchType::Alias, Some(id)) => catalog::require(conn, id)?,
        (MatchType::Fuzzy, Some(id)) => {
            let master = catalog::require(conn, id)?;
            register_alias(conn, name, id, AliasSource::Agent, uow.now())?;
            master
        }
        _ => get_or_create(
            conn,
            name,
            &NewIngredient {
                category: item.category,
                default_unit: item.unit.as_deref(),
                shelf_life_days: item.shelf_life_days,
            },
            uow.now(),
        )?,
    };
    Ok((master, Some(resolution.match_type)))
}

/// Adds one purchased container, or skips it when the same vision job
/// already produced an active container of that ingredient.
pub fn add_container(
    uow: &UnitOfWork<'_>,
    resolver: &Resolver,
    item: &NewContainer,
) -> Result<AddOutcome> {
    require_positive(item.quantity, "quantity")?;
    let status = item.status.unwrap_or(ContainerStatus::Sealed);
    if !status.is_active() {
        return Err(PantryError::invalid(format!(
            "new containers must be SEALED, OPEN or LOW, got {}",
            status
        )));
    }
    let confidence = item.confidence.unwrap_or(1.0);
    if !(0.0..=1.0).contains(&confidence) {
        return Err(PantryError::invalid(format!(
            "confidence must be within 0..1, got {}",
            confidence
        )));
    }

    let (master, match_type) = resolve_master(uow, resolver, item)?;
    let _span = tracing::info_span!("ledger.add", master_id = %master.id).entered();

    if let Some(ref job) = item.vision_job_id {
        let active = container_repo::find_active_for_master(uow.conn(), &master.id)?;
        if let Some(existing) = duplicates::vision_duplicate(&active, job) {
            tracing::info!(
                vision_job_id = %job,
                existing = %existing.container.id,
                "skipping item already recorded by this vision job"
            );
            return Ok(AddOutcome::Skipped(SkippedItem {
                master_id: master.id,
                vision_job_id: job.clone(),
                existing_container_id: existing.container.id.clone(),
                reason: "duplicate vision job".to_string(),
            }));
        }
    }

    let unit = item
        .unit
        .as_deref()
        .map(normalize_unit)
        .filter(|u| !u.is_empty())
        .or_else(|| master.default_unit.clone())
        .ok_or_else(|| {
            PantryError::invalid(format!("no unit given and '{}' has no default unit", master.id))
        })?;

    let now = uow.now();
    let expires_at = match (item.expires_at, item.expires_in_days) {
        (Some(at), _) => Some(at),
        (None, Some(days)) => Some(days_from(now, days)?),
        (None, None) => match item.shelf_life_days.or(master.default_shelf_life_days) {
            Some(days) => Some(days_from(now, i64::from(days))?),
            None => None,
        },
    };

    let state = insert(
        uow,
        Draft {
            master_id: Some(master.id.clone()),
            dish_name: None,
            recipe_id: None,
            status,
            unit,
            quantity: item.quantity,
            source: item.source,
            confidence,
            vision_job_id: item.vision_job_id.clone(),
            expires_at,
        },
    )?;
    tracing::info!(
        container_id = %state.container.id,
        quantity = state.contents.remaining_qty,
        unit = %state.contents.unit,
        "container added"
    );

    Ok(AddOutcome::Added(AddedContainer {
        container_id: state.container.id,
        master_id: Some(master.id),
        canonical_name: Some(master.canonical_name),
        dish_name: None,
        match_type,
        quantity: state.contents.remaining_qty,
        unit: state.contents.unit,
        status: state.container.status,
        expires_at: state.container.expires_at,
    }))
}

/// Adds a cooked dish. Leftovers have no catalog entry and start `OPEN`.
pub fn add_leftover(
    uow: &UnitOfWork<'_>,
    item: &NewLeftover,
    default_shelf_life_days: u32,
) -> Result<AddedContainer> {
    let dish_name = item.dish_name.split_whitespace().collect::<Vec<_>>().join(" ");
    if dish_name.is_empty() {
        return Err(PantryError::invalid("leftovers need a dish name"));
    }
    require_positive(item.quantity, "quantity")?;
    let unit = normalize_unit(&item.unit);
    if unit.is_empty() {
        return Err(PantryError::invalid("leftovers need a unit"));
    }

    let _span = tracing::info_span!("ledger.add_leftover", dish = %dish_name).entered();
    let days = item
        .expires_in_days
        .unwrap_or_else(|| i64::from(default_shelf_life_days));
    let expires_at = days_from(uow.now(), days)?;

    let state = insert(
        uow,
        Draft {
            master_id: None,
            dish_name: Some(dish_name),
            recipe_id: item.recipe_id.clone(),
            status: ContainerStatus::Open,
            unit,
            quantity: item.quantity,
            source: ContainerSource::Cooked,
            confidence: 1.0,
            vision_job_id: None,
            expires_at: Some(expires_at),
        },
    )?;
    tracing::info!(container_id = %state.container.id, "leftover added");

    Ok(AddedContainer {
        container_id: state.container.id,
        master_id: None,
        canonical_name: None,
        dish_name: state.container.dish_name,
        match_type: None,
        quantity: state.contents.remaining_qty,
        unit: state.contents.unit,
        status: state.container.status,
        expires_at: state.container.expires_at,
    })
}
