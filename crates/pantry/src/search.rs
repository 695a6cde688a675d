//! Inventory listing and expiry views.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::container_repo::{self, ContainerFilter, InventoryRow};
use crate::error::{PantryError, Result};
use crate::model::{Category, ContainerSource, ContainerStatus};

pub const MAX_SEARCH_LIMIT: u32 = 500;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryFilters {
    /// Case-insensitive substring of the ingredient or dish name.
    pub query: Option<String>,
    pub category: Option<Category>,
    /// Defaults to the active statuses.
    pub status: Option<Vec<ContainerStatus>>,
    pub expiring_within_days: Option<i64>,
    /// Defaults to `true`.
    pub include_leftovers: Option<bool>,
    pub master_id: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub container_id: String,
    pub master_id: Option<String>,
    /// Canonical ingredient name, or the dish name for leftovers.
    pub name: String,
    pub category: Option<Category>,
    pub status: ContainerStatus,
    pub remaining_qty: f64,
    pub unit: String,
    pub source: ContainerSource,
    pub confidence: f64,
    pub expires_at: Option<DateTime<Utc>>,
    /// Calendar days from today; negative once expired.
    pub days_until_expiry: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    fn from_row(row: InventoryRow, now: DateTime<Utc>) -> Self {
        let c = row.state.container;
        let name = row
            .canonical_name
            .or_else(|| c.dish_name.clone())
            .unwrap_or_default();
        Self {
            days_until_expiry: c
                .expires_at
                .map(|at| (at.date_naive() - now.date_naive()).num_days()),
            container_id: c.id,
            master_id: c.master_id,
            name,
            category: row.category,
            status: c.status,
            remaining_qty: row.state.contents.remaining_qty,
            unit: row.state.contents.unit,
            source: c.source,
            confidence: c.confidence,
            expires_at: c.expires_at,
            created_at: c.created_at,
        }
    }
}

fn horizon(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    if days < 0 {
        return Err(PantryError::invalid(format!(
            "expiry window must not be negative, got {} days",
            days
        )));
    }
    Ok(Duration::try_days(days)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC))
}

/// Lists containers matching `filters`, soonest expiry first and containers
/// without an expiry last.
pub fn search(
    conn: &Connection,
    filters: &InventoryFilters,
    now: DateTime<Utc>,
    default_limit: u32,
) -> Result<Vec<InventoryItem>> {
    let expires_before = match filters.expiring_within_days {
        Some(days) => Some(horizon(now, days)?),
        None => None,
    };
    let filter = ContainerFilter {
        name_contains: filters
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string),
        category: filters.category,
        statuses: filters
            .status
            .clone()
            .unwrap_or_else(|| ContainerStatus::ACTIVE.to_vec()),
        expires_before,
        include_leftovers: filters.include_leftovers.unwrap_or(true),
        master_id: filters.master_id.clone(),
        limit: filters
            .limit
            .unwrap_or(default_limit)
            .clamp(1, MAX_SEARCH_LIMIT),
    };

    let items: Vec<InventoryItem> = container_repo::query(conn, &filter)?
        .into_iter()
        .map(|row| InventoryItem::from_row(row, now))
        .collect();
    tracing::debug!(count = items.len(), "inventory search");
    Ok(items)
}

/// Active containers, leftovers included, expiring within `within_days`.
/// Already expired stock is part of the result.
pub fn expiring(
    conn: &Connection,
    within_days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<InventoryItem>> {
    search(
        conn,
        &InventoryFilters {
            expiring_within_days: Some(within_days),
            ..Default::default()
        },
        now,
        MAX_SEARCH_LIMIT,
    )
}
