//! FIFO consumption.
//!
//! A deduction drains only the oldest active container of an ingredient. If
//! it runs dry the shortfall is reported and the caller deducts again; the
//! next call lands on the next container because the drained one is `EMPTY`.

use serde::{Deserialize, Serialize};

use super::status::{self, REASON_OPENED};
use super::{change_status, clamp_to_zero, record, require_positive, write_quantity, QTY_EPSILON};
use crate::db::{container_repo, UnitOfWork};
use crate::error::{render_warnings, LedgerWarning, PantryError, Result};
use crate::model::{ContainerStatus, Operation};
use crate::units;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductRequest {
    pub master_id: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Quantities are in the container's unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionResult {
    pub deducted: f64,
    pub requested: f64,
    pub unit: String,
    pub container_id: String,
    pub remaining_after: f64,
    pub status: ContainerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub fn deduct(
    uow: &UnitOfWork<'_>,
    request: &DeductRequest,
    low_stock_ratio: f64,
) -> Result<DeductionResult> {
    require_positive(request.quantity, "quantity")?;
    let _span = tracing::info_span!("ledger.deduct", master_id = %request.master_id).entered();
    let conn = uow.conn();

    let mut state = container_repo::find_active_for_master(conn, &request.master_id)?
        .into_iter()
        .next()
        .ok_or_else(|| PantryError::not_found("active container", request.master_id.as_str()))?;

    let mut warnings: Vec<LedgerWarning> = Vec::new();
    let unit = state.contents.unit.clone();
    let conversion = units::convert(conn, request.quantity, &request.unit, &unit)?;
    warnings.extend(conversion.warning);
    let requested = conversion.quantity;

    let current = state.contents.remaining_qty;
    let remaining = clamp_to_zero((current - requested).max(0.0));
    let deducted = current - remaining;
    let initial = status::initial_quantity(conn, &state, current)?;

    if state.container.status == ContainerStatus::Sealed {
        change_status(uow, &mut state, ContainerStatus::Open, REASON_OPENED)?;
    }

    write_quantity(uow, &mut state, remaining, &unit)?;
    let reason = request.reason.as_deref().unwrap_or("consumed");
    record(uow, &state.container.id, Operation::Deduct, Some(-deducted), &unit, reason)?;

    let derived = status::derive(state.container.status, remaining, initial, low_stock_ratio);
    if derived.status != state.container.status {
        change_status(uow, &mut state, derived.status, status::reason_for(derived.status))?;
    }

    if deducted + QTY_EPSILON < requested {
        warnings.push(LedgerWarning::Shortfall {
            requested,
            deducted,
            unit: unit.clone(),
        });
    }
    warnings.extend(derived.warning);

    tracing::info!(
        container_id = %state.container.id,
        deducted,
        remaining,
        status = %state.container.status,
        "deducted"
    );

    Ok(DeductionResult {
        deducted,
        requested,
        unit,
        container_id: state.container.id,
        remaining_after: remaining,
        status: state.container.status,
        warning: render_warnings(&warnings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::db::{transaction_repo, Database};
    use crate::ledger::add::{add_container, AddOutcome, NewContainer};
    use crate::resolver::Resolver;
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn stock(db: &Database, name: &str, quantity: f64, unit: &str) -> String {
        let resolver = Resolver::new(&Thresholds::default());
        db.unit_of_work(now(), |uow| {
            let item = NewContainer {
                name: Some(name.to_string()),
                quantity,
                unit: Some(unit.to_string()),
                ..Default::default()
            };
            match add_container(uow, &resolver, &item)? {
                AddOutcome::Added(a) => Ok::<_, PantryError>(a.container_id),
                AddOutcome::Skipped(_) => unreachable!(),
            }
        })
        .unwrap()
    }

    fn take(db: &Database, master: &str, quantity: f64, unit: &str) -> Result<DeductionResult> {
        let request = DeductRequest {
            master_id: master.to_string(),
            quantity,
            unit: unit.to_string(),
            reason: None,
        };
        db.unit_of_work(now(), |uow| deduct(uow, &request, 0.20))
    }

    #[test]
    fn test_first_deduction_opens_sealed_container() {
        let db = Database::open_in_memory().unwrap();
        let id = stock(&db, "flour", 1000.0, "g");
        let result = take(&db, "flour", 100.0, "g").unwrap();
        assert_eq!(result.container_id, id);
        assert_eq!(result.status, ContainerStatus::Open);
        assert_eq!(result.remaining_after, 900.0);
        assert!(result.warning.is_none());

        let log = db
            .with_conn(|conn| transaction_repo::list_for_container(conn, &id))
            .unwrap();
        let ops: Vec<Operation> = log.iter().map(|t| t.operation).collect();
        assert_eq!(
            ops,
            vec![Operation::Add, Operation::StatusChange, Operation::Deduct]
        );
        assert_eq!(log[1].reason, "opened_for_use");
        assert_eq!(log[2].delta, Some(-100.0));
    }

    #[test]
    fn test_converts_into_container_unit() {
        let db = Database::open_in_memory().unwrap();
        stock(&db, "sugar", 1.0, "kg");
        let result = take(&db, "sugar", 250.0, "g").unwrap();
        assert_eq!(result.unit, "kg");
        assert!((result.deducted - 0.25).abs() < 1e-12);
        assert!((result.remaining_after - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_missing_conversion_is_a_warning() {
        let db = Database::open_in_memory().unwrap();
        stock(&db, "rice", 500.0, "g");
        let result = take(&db, "rice", 1.0, "cup").unwrap();
        assert_eq!(result.deducted, 1.0);
        assert_eq!(
            result.warning.as_deref(),
            Some("No conversion from 'cup' to 'g'; quantity used as-is")
        );
    }

    #[test]
    fn test_shortfall_clamps_to_zero() {
        let db = Database::open_in_memory().unwrap();
        stock(&db, "butter", 5.0, "g");
        let result = take(&db, "butter", 100.0, "g").unwrap();
        assert_eq!(result.deducted, 5.0);
        assert_eq!(result.requested, 100.0);
        assert_eq!(result.remaining_after, 0.0);
        assert_eq!(result.status, ContainerStatus::Empty);
        assert_eq!(
            result.warning.as_deref(),
            Some("Only 5 g deducted of 100 g requested")
        );

        let err = take(&db, "butter", 1.0, "g").unwrap_err();
        assert!(matches!(err, PantryError::NotFound { .. }));
    }

    #[test]
    fn test_low_stock_warning() {
        let db = Database::open_in_memory().unwrap();
        stock(&db, "milk", 10.0, "dl");
        let result = take(&db, "milk", 8.0, "dl").unwrap();
        assert_eq!(result.status, ContainerStatus::Low);
        assert_eq!(result.warning.as_deref(), Some("Running low: 20% remaining"));
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let db = Database::open_in_memory().unwrap();
        stock(&db, "salt", 100.0, "g");
        for q in [0.0, -2.0, f64::INFINITY] {
            assert!(matches!(
                take(&db, "salt", q, "g").unwrap_err(),
                PantryError::InvalidOperation(_)
            ));
        }
    }
}
