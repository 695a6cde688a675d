//! Duplicate detection for incoming purchases.
//!
//! Checks run in a fixed order and the first hit decides the verdict.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::config::Thresholds;
use crate::db::container_repo;
use crate::error::Result;
use crate::model::ContainerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicateType {
    Definite,
    Likely,
    Possible,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Skip,
    Merge,
    AddNew,
    AskUser,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateQuery {
    pub master_id: String,
    #[serde(default)]
    pub vision_job_id: Option<String>,
    #[serde(default)]
    pub candidate_qty: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheck {
    pub duplicate_type: DuplicateType,
    /// The containers that triggered the verdict; every active container for
    /// `NONE`.
    pub existing_containers: Vec<ContainerState>,
    pub recommendation: Recommendation,
}

impl DuplicateCheck {
    fn verdict(
        duplicate_type: DuplicateType,
        recommendation: Recommendation,
        existing_containers: Vec<ContainerState>,
    ) -> Self {
        Self {
            duplicate_type,
            existing_containers,
            recommendation,
        }
    }
}

/// An active container already recorded by vision job `job`.
pub fn vision_duplicate<'a>(active: &'a [ContainerState], job: &str) -> Option<&'a ContainerState> {
    active
        .iter()
        .find(|s| s.container.vision_job_id.as_deref() == Some(job))
}

fn within_tolerance(remaining: f64, candidate: f64, tolerance: f64) -> bool {
    (remaining - candidate).abs() <= candidate * tolerance
}

/// Classifies `active` against an incoming purchase.
pub fn classify(
    active: Vec<ContainerState>,
    query: &DuplicateQuery,
    now: DateTime<Utc>,
    thresholds: &Thresholds,
) -> DuplicateCheck {
    if active.is_empty() {
        return DuplicateCheck::verdict(DuplicateType::None, Recommendation::AddNew, active);
    }

    if let Some(ref job) = query.vision_job_id {
        if let Some(hit) = vision_duplicate(&active, job) {
            let hit = hit.clone();
            return DuplicateCheck::verdict(DuplicateType::Definite, Recommendation::Skip, vec![hit]);
        }
    }

    let window_start = Duration::try_hours(thresholds.duplicate_window_hours)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let recent: Vec<ContainerState> = active
        .iter()
        .filter(|s| s.container.created_at >= window_start)
        .cloned()
        .collect();
    if !recent.is_empty() {
        return DuplicateCheck::verdict(DuplicateType::Likely, Recommendation::AskUser, recent);
    }

    if let Some(candidate) = query.candidate_qty.filter(|q| q.is_finite() && *q > 0.0) {
        let similar: Vec<ContainerState> = active
            .iter()
            .filter(|s| {
                within_tolerance(
                    s.contents.remaining_qty,
                    candidate,
                    thresholds.duplicate_qty_tolerance,
                )
            })
            .cloned()
            .collect();
        if !similar.is_empty() {
            return DuplicateCheck::verdict(DuplicateType::Possible, Recommendation::AskUser, similar);
        }
    }

    DuplicateCheck::verdict(DuplicateType::None, Recommendation::AddNew, active)
}

/// Loads the active containers of `query.master_id` and classifies them.
/// An unknown master id is `NotFound`.
pub fn check(
    conn: &Connection,
    query: &DuplicateQuery,
    now: DateTime<Utc>,
    thresholds: &Thresholds,
) -> Result<DuplicateCheck> {
    catalog::require(conn, &query.master_id)?;
    let active = container_repo::find_active_for_master(conn, &query.master_id)?;
    let verdict = classify(active, query, now, thresholds);
    tracing::debug!(
        master_id = %query.master_id,
        duplicate_type = ?verdict.duplicate_type,
        matched = verdict.existing_containers.len(),
        "duplicate check"
    );
    Ok(verdict)
}
