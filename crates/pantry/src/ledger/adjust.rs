//! Manual corrections and soft deletion.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::status::{self, REASON_DEPLETED};
use super::{change_status, clamp_to_zero, load, record, write_quantity};
use crate::db::{container_repo, UnitOfWork};
use crate::error::{PantryError, Result};
use crate::model::{ContainerState, ContainerStatus, Operation};
use crate::units::{self, normalize_unit};

/// Fields to change on one container. `None` leaves a field alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerUpdate {
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub status: Option<ContainerStatus>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ContainerUpdate {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.unit.is_none()
            && self.status.is_none()
            && self.expires_at.is_none()
    }
}

/// Applies `changes` in order: unit, quantity, expiry, status.
///
/// Requesting `DELETED` is a soft delete and cannot be combined with other
/// changes.
pub fn update(
    uow: &UnitOfWork<'_>,
    container_id: &str,
    changes: &ContainerUpdate,
    reason: &str,
    low_stock_ratio: f64,
) -> Result<ContainerState> {
    if changes.is_empty() {
        return Err(PantryError::invalid("no changes supplied"));
    }
    if changes.status == Some(ContainerStatus::Deleted) {
        let only_status = ContainerUpdate {
            status: None,
            ..changes.clone()
        }
        .is_empty();
        if !only_status {
            return Err(PantryError::invalid(
                "a delete cannot be combined with other changes",
            ));
        }
        return soft_delete(uow, container_id, reason);
    }

    let _span = tracing::info_span!("ledger.update", container_id).entered();
    let mut state = load(uow, container_id)?;
    if state.container.status == ContainerStatus::Deleted {
        return Err(PantryError::invalid(format!(
            "container {} is deleted",
            container_id
        )));
    }
    if let Some(target) = changes.status {
        if !state.container.status.can_transition_to(target) {
            return Err(PantryError::invalid(format!(
                "container {} cannot move from {} to {}",
                container_id, state.container.status, target
            )));
        }
    }
    let reason = if reason.trim().is_empty() {
        "manual_adjustment"
    } else {
        reason
    };

    if let Some(ref unit) = changes.unit {
        change_unit(uow, &mut state, unit, reason)?;
    }
    if let Some(quantity) = changes.quantity {
        change_quantity(uow, &mut state, quantity, reason, low_stock_ratio)?;
    }
    if let Some(expires_at) = changes.expires_at {
        container_repo::update_expiry(uow.conn(), container_id, Some(expires_at), uow.now())?;
        record(
            uow,
            container_id,
            Operation::Adjust,
            None,
            &state.contents.unit,
            &format!("expiry set to {}: {}", expires_at.to_rfc3339(), reason),
        )?;
        state.container.expires_at = Some(expires_at);
        state.container.updated_at = uow.now();
    }
    if let Some(target) = changes.status {
        set_requested_status(uow, &mut state, target, reason)?;
    }

    tracing::info!(status = %state.container.status, qty = state.contents.remaining_qty, "container updated");
    Ok(state)
}

/// Re-expresses the contents in another unit. Needs a real conversion so
/// that earlier log entries still project onto the new unit.
fn change_unit(uow: &UnitOfWork<'_>, state: &mut ContainerState, unit: &str, reason: &str) -> Result<()> {
    let new_unit = normalize_unit(unit);
    if new_unit.is_empty() {
        return Err(PantryError::invalid("unit must not be empty"));
    }
    let old_unit = state.contents.unit.clone();
    if new_unit == old_unit {
        return Ok(());
    }

    let converted = units::convert_strict(uow.conn(), state.contents.remaining_qty, &old_unit, &new_unit)?;
    write_quantity(uow, state, converted, &new_unit)?;
    record(
        uow,
        &state.container.id,
        Operation::Adjust,
        Some(0.0),
        &new_unit,
        &format!("unit changed from {} to {}: {}", old_unit, new_unit, reason),
    )?;
    Ok(())
}

fn change_quantity(
    uow: &UnitOfWork<'_>,
    state: &mut ContainerState,
    quantity: f64,
    reason: &str,
    low_stock_ratio: f64,
) -> Result<()> {
    if !(quantity.is_finite() && quantity >= 0.0) {
        return Err(PantryError::invalid(format!(
            "quantity must be zero or more, got {}",
            quantity
        )));
    }
    let quantity = clamp_to_zero(quantity);
    if state.container.status == ContainerStatus::Empty && quantity > 0.0 {
        return Err(PantryError::invalid(format!(
            "container {} is empty and cannot be refilled",
            state.container.id
        )));
    }

    let current = state.contents.remaining_qty;
    let delta = quantity - current;
    if delta == 0.0 {
        return Ok(());
    }
    let initial = status::initial_quantity(uow.conn(), state, current)?;
    let unit = state.contents.unit.clone();
    write_quantity(uow, state, quantity, &unit)?;
    record(uow, &state.container.id, Operation::Adjust, Some(delta), &unit, reason)?;

    // A sealed container only leaves SEALED here when it is emptied.
    let next = match state.container.status {
        _ if quantity == 0.0 => ContainerStatus::Empty,
        ContainerStatus::Open | ContainerStatus::Low => {
            status::derive(state.container.status, quantity, initial, low_stock_ratio).status
        }
        unchanged => unchanged,
    };
    if next != state.container.status {
        change_status(uow, state, next, status::reason_for(next))?;
    }
    Ok(())
}

fn set_requested_status(
    uow: &UnitOfWork<'_>,
    state: &mut ContainerState,
    target: ContainerStatus,
    reason: &str,
) -> Result<()> {
    if state.container.status == target {
        return Ok(());
    }
    if target == ContainerStatus::Empty && state.contents.remaining_qty > 0.0 {
        let remaining = state.contents.remaining_qty;
        let unit = state.contents.unit.clone();
        write_quantity(uow, state, 0.0, &unit)?;
        record(
            uow,
            &state.container.id,
            Operation::Adjust,
            Some(-remaining),
            &unit,
            REASON_DEPLETED,
        )?;
    }
    change_status(uow, state, target, reason)
}

/// Marks a container `DELETED`. The remaining quantity stays as it was.
pub fn soft_delete(uow: &UnitOfWork<'_>, container_id: &str, reason: &str) -> Result<ContainerState> {
    let _span = tracing::info_span!("ledger.delete", container_id).entered();
    let mut state = load(uow, container_id)?;
    if !state.container.status.is_active() {
        return Err(PantryError::invalid(format!(
            "container {} is {} and cannot be deleted",
            container_id, state.container.status
        )));
    }

    container_repo::update_status(uow.conn(), container_id, ContainerStatus::Deleted, uow.now())?;
    let reason = if reason.trim().is_empty() { "deleted" } else { reason };
    record(
        uow,
        container_id,
        Operation::Delete,
        None,
        &state.contents.unit,
        reason,
    )?;
    state.container.status = ContainerStatus::Deleted;
    state.container.updated_at = uow.now();
    tracing::info!(reason, "container deleted");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::db::{transaction_repo, Database};
    use crate::ledger::add::{add_container, AddOutcome, NewContainer};
    use crate::resolver::Resolver;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 18, 0, 0).unwrap()
    }

    fn stocked(status: ContainerStatus) -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let resolver = Resolver::new(&Thresholds::default());
        let id = db
            .unit_of_work(now(), |uow| {
                let item = NewContainer {
                    name: Some("oats".to_string()),
                    quantity: 1000.0,
                    unit: Some("g".to_string()),
                    status: Some(status),
                    ..Default::default()
                };
                match add_container(uow, &resolver, &item)? {
                    AddOutcome::Added(a) => Ok::<_, PantryError>(a.container_id),
                    AddOutcome::Skipped(_) => unreachable!(),
                }
            })
            .unwrap();
        (db, id)
    }

    fn apply(db: &Database, id: &str, changes: ContainerUpdate) -> Result<ContainerState> {
        db.unit_of_work(now(), |uow| update(uow, id, &changes, "recount", 0.20))
    }

    #[test]
    fn test_quantity_adjustment_logs_delta() {
        let (db, id) = stocked(ContainerStatus::Open);
        let state = apply(
            &db,
            &id,
            ContainerUpdate {
                quantity: Some(1200.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(state.contents.remaining_qty, 1200.0);
        assert_eq!(state.container.status, ContainerStatus::Open);

        let log = db
            .with_conn(|conn| transaction_repo::list_for_container(conn, &id))
            .unwrap();
        assert_eq!(log.last().unwrap().operation, Operation::Adjust);
        assert_eq!(log.last().unwrap().delta, Some(200.0));
    }

    #[test]
    fn test_adjust_to_zero_empties_and_blocks_refill() {
        let (db, id) = stocked(ContainerStatus::Sealed);
        let state = apply(
            &db,
            &id,
            ContainerUpdate {
                quantity: Some(0.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(state.container.status, ContainerStatus::Empty);

        let err = apply(
            &db,
            &id,
            ContainerUpdate {
                quantity: Some(5.0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PantryError::InvalidOperation(_)));
    }

    #[test]
    fn test_unit_change_converts() {
        let (db, id) = stocked(ContainerStatus::Open);
        let state = apply(
            &db,
            &id,
            ContainerUpdate {
                unit: Some("kilograms".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(state.contents.unit, "kg");
        assert!((state.contents.remaining_qty - 1.0).abs() < 1e-12);

        let err = apply(
            &db,
            &id,
            ContainerUpdate {
                unit: Some("jar".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PantryError::InvalidOperation(_)));
    }

    #[test]
    fn test_status_must_move_forward() {
        let (db, id) = stocked(ContainerStatus::Low);
        let err = apply(
            &db,
            &id,
            ContainerUpdate {
                status: Some(ContainerStatus::Open),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PantryError::InvalidOperation(_)));

        let state = apply(
            &db,
            &id,
            ContainerUpdate {
                status: Some(ContainerStatus::Empty),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(state.container.status, ContainerStatus::Empty);
        assert_eq!(state.contents.remaining_qty, 0.0);
    }

    #[test]
    fn test_expiry_update() {
        let (db, id) = stocked(ContainerStatus::Sealed);
        let at = now() + Duration::days(30);
        let state = apply(
            &db,
            &id,
            ContainerUpdate {
                expires_at: Some(at),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(state.container.expires_at, Some(at));
        assert_eq!(state.container.status, ContainerStatus::Sealed);
    }

    #[test]
    fn test_soft_delete_keeps_quantity() {
        let (db, id) = stocked(ContainerStatus::Open);
        let state = apply(
            &db,
            &id,
            ContainerUpdate {
                status: Some(ContainerStatus::Deleted),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(state.container.status, ContainerStatus::Deleted);
        assert_eq!(state.contents.remaining_qty, 1000.0);

        let again = db
            .unit_of_work(now(), |uow| soft_delete(uow, &id, "again"))
            .unwrap_err();
        assert!(matches!(again, PantryError::InvalidOperation(_)));

        let update_deleted = apply(
            &db,
            &id,
            ContainerUpdate {
                quantity: Some(1.0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(update_deleted, PantryError::InvalidOperation(_)));
    }

    #[test]
    fn test_update_unknown_container() {
        let db = Database::open_in_memory().unwrap();
        let err = apply(
            &db,
            "missing",
            ContainerUpdate {
                quantity: Some(1.0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PantryError::NotFound { .. }));
    }
}
