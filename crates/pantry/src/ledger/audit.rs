//! Read-only checks over the transaction log.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{container_repo, transaction_repo};
use crate::error::{render_warnings, LedgerWarning, PantryError, Result};
use crate::model::TransactionRecord;
use crate::units;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionReport {
    pub container_id: String,
    pub unit: String,
    pub remaining_qty: f64,
    /// Sum of all logged deltas, projected into `unit`.
    pub logged_qty: f64,
    pub consistent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// The container's transactions in append order.
pub fn history(conn: &Connection, container_id: &str) -> Result<Vec<TransactionRecord>> {
    if container_repo::find_by_id(conn, container_id)?.is_none() {
        return Err(PantryError::not_found("container", container_id));
    }
    Ok(transaction_repo::list_for_container(conn, container_id)?)
}

/// Recomputes the remaining quantity from the log and compares it with the
/// stored contents.
pub fn verify_projection(conn: &Connection, container_id: &str) -> Result<ProjectionReport> {
    let state = container_repo::find_by_id(conn, container_id)?
        .ok_or_else(|| PantryError::not_found("container", container_id))?;
    let unit = state.contents.unit.clone();

    let mut logged = 0.0;
    let mut warnings: Vec<LedgerWarning> = Vec::new();
    for entry in transaction_repo::list_for_container(conn, container_id)? {
        let Some(delta) = entry.delta else { continue };
        let projected = units::convert(conn, delta, &entry.unit, &unit)?;
        if let Some(w) = projected.warning {
            if !warnings.contains(&w) {
                warnings.push(w);
            }
        }
        logged += projected.quantity;
    }

    let remaining = state.contents.remaining_qty;
    let tolerance = 1e-6 * remaining.abs().max(1.0);
    let consistent = (logged - remaining).abs() <= tolerance;
    if !consistent {
        tracing::warn!(%container_id, logged, remaining, "projection mismatch");
    }

    Ok(ProjectionReport {
        container_id: container_id.to_string(),
        unit,
        remaining_qty: remaining,
        logged_qty: logged,
        consistent,
        warning: render_warnings(&warnings),
    })
}
