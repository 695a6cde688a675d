//! Folding one container into another of the same ingredient.

use serde::Serialize;

use super::{load, record, write_quantity};
use crate::catalog::normalize_name;
use crate::db::{container_repo, UnitOfWork};
use crate::error::{render_warnings, PantryError, Result};
use crate::model::{ContainerState, ContainerStatus, Operation};
use crate::units;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub source_id: String,
    pub target_id: String,
    /// Amount added to the target, in the target's unit.
    pub moved: f64,
    pub unit: String,
    pub target_remaining: f64,
    pub target_status: ContainerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

fn same_contents(source: &ContainerState, target: &ContainerState) -> bool {
    match (&source.container.master_id, &target.container.master_id) {
        (Some(a), Some(b)) => a == b,
        (None, None) => match (&source.container.dish_name, &target.container.dish_name) {
            (Some(a), Some(b)) => normalize_name(a) == normalize_name(b),
            _ => false,
        },
        _ => false,
    }
}

/// Moves everything left in `source_id` into `target_id` and soft-deletes
/// the source. The target keeps its status.
pub fn merge(uow: &UnitOfWork<'_>, source_id: &str, target_id: &str) -> Result<MergeResult> {
    let _span = tracing::info_span!("ledger.merge", source_id, target_id).entered();
    let mut source = load(uow, source_id)?;
    let mut target = load(uow, target_id)?;

    if source_id == target_id {
        return Err(PantryError::invalid("cannot merge a container into itself"));
    }
    for state in [&source, &target] {
        if !state.container.status.is_active() {
            return Err(PantryError::invalid(format!(
                "container {} is {} and cannot be merged",
                state.container.id, state.container.status
            )));
        }
    }
    if !same_contents(&source, &target) {
        return Err(PantryError::invalid(format!(
            "containers {} and {} hold different things",
            source_id, target_id
        )));
    }

    let source_qty = source.contents.remaining_qty;
    let source_unit = source.contents.unit.clone();
    let target_unit = target.contents.unit.clone();
    let conversion = units::convert(uow.conn(), source_qty, &source_unit, &target_unit)?;
    let moved = conversion.quantity;

    let target_qty = target.contents.remaining_qty + moved;
    write_quantity(uow, &mut target, target_qty, &target_unit)?;
    record(
        uow,
        target_id,
        Operation::Merge,
        Some(moved),
        &target_unit,
        &format!("merged_from:{}", source_id),
    )?;

    let into = format!("merged_into:{}", target_id);
    write_quantity(uow, &mut source, 0.0, &source_unit)?;
    record(uow, source_id, Operation::Merge, Some(-source_qty), &source_unit, &into)?;
    container_repo::update_status(uow.conn(), source_id, ContainerStatus::Deleted, uow.now())?;
    record(uow, source_id, Operation::Delete, None, &source_unit, &into)?;

    tracing::info!(moved, unit = %target_unit, "containers merged");
    let warnings: Vec<_> = conversion.warning.into_iter().collect();
    Ok(MergeResult {
        source_id: source_id.to_string(),
        target_id: target_id.to_string(),
        moved,
        unit: target_unit,
        target_remaining: target_qty,
        target_status: target.container.status,
        warning: render_warnings(&warnings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{transaction_repo, Database};
    use crate::ledger::add::{add_leftover, NewLeftover};
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 4, 20, 0, 0).unwrap()
    }

    fn leftover(db: &Database, dish: &str, quantity: f64, unit: &str) -> String {
        db.unit_of_work(now(), |uow| {
            add_leftover(
                uow,
                &NewLeftover {
                    dish_name: dish.to_string(),
                    quantity,
                    unit: unit.to_string(),
                    expires_in_days: None,
                    recipe_id: None,
                },
                4,
            )
            .map(|a| a.container_id)
        })
        .unwrap()
    }

    #[test]
    fn test_merge_leftovers_of_the_same_dish() {
        let db = Database::open_in_memory().unwrap();
        let a = leftover(&db, "Lentil Soup", 500.0, "ml");
        let b = leftover(&db, "lentil soup", 1.0, "l");

        let result = db.unit_of_work(now(), |uow| merge(uow, &a, &b)).unwrap();
        assert!((result.moved - 0.5).abs() < 1e-12);
        assert!((result.target_remaining - 1.5).abs() < 1e-12);
        assert_eq!(result.unit, "l");
        assert_eq!(result.target_status, ContainerStatus::Open);

        db.with_conn(|conn| {
            let source = container_repo::find_by_id(conn, &a)?.unwrap();
            assert_eq!(source.container.status, ContainerStatus::Deleted);
            assert_eq!(source.contents.remaining_qty, 0.0);

            let log = transaction_repo::list_for_container(conn, &a)?;
            let last = log.last().unwrap();
            assert_eq!(last.operation, Operation::Delete);
            assert_eq!(last.reason, format!("merged_into:{}", b));
            Ok::<_, PantryError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_merge_rejections() {
        let db = Database::open_in_memory().unwrap();
        let soup = leftover(&db, "soup", 1.0, "l");
        let stew = leftover(&db, "stew", 1.0, "l");

        let cases = [(&soup, &soup), (&soup, &stew)];
        for (s, t) in cases {
            let err = db.unit_of_work(now(), |uow| merge(uow, s, t)).unwrap_err();
            assert!(matches!(err, PantryError::InvalidOperation(_)));
        }

        let err = db
            .unit_of_work(now(), |uow| merge(uow, &soup, "missing"))
            .unwrap_err();
        assert!(matches!(err, PantryError::NotFound { .. }));
    }
}
