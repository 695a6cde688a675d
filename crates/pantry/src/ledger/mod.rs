//! Container ledger.
//!
//! Every stock mutation goes through this module. Each function takes a
//! [`UnitOfWork`] so that reading the current state, writing the new state and
//! appending to the transaction log all commit or roll back together.

use uuid::Uuid;

use crate::db::{container_repo, transaction_repo, UnitOfWork};
use crate::error::{PantryError, Result};
use crate::model::{ContainerState, ContainerStatus, Operation, TransactionRecord};

pub mod add;
pub mod adjust;
pub mod audit;
pub mod deduct;
pub mod merge;
pub mod status;

pub use add::{add_container, add_leftover, AddOutcome, AddedContainer, NewContainer, NewLeftover, SkippedItem};
pub use adjust::{soft_delete, update, ContainerUpdate};
pub use audit::{history, verify_projection, ProjectionReport};
pub use deduct::{deduct, DeductRequest, DeductionResult};
pub use merge::{merge, MergeResult};

/// Quantities closer to zero than this are treated as zero.
pub const QTY_EPSILON: f64 = 1e-9;

pub(crate) fn clamp_to_zero(qty: f64) -> f64 {
    if qty.abs() < QTY_EPSILON {
        0.0
    } else {
        qty
    }
}

/// Loads a container or fails with `NotFound`.
pub(crate) fn load(uow: &UnitOfWork<'_>, container_id: &str) -> Result<ContainerState> {
    container_repo::find_by_id(uow.conn(), container_id)?
        .ok_or_else(|| PantryError::not_found("container", container_id))
}

/// Requires a finite, strictly positive quantity.
pub(crate) fn require_positive(quantity: f64, what: &str) -> Result<()> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(PantryError::invalid(format!(
            "{} must be a positive number, got {}",
            what, quantity
        )))
    }
}

/// Appends one audit record stamped with the unit of work's instant.
pub(crate) fn record(
    uow: &UnitOfWork<'_>,
    container_id: &str,
    operation: Operation,
    delta: Option<f64>,
    unit: &str,
    reason: &str,
) -> Result<TransactionRecord> {
    let record = TransactionRecord {
        id: Uuid::new_v4().to_string(),
        container_id: container_id.to_string(),
        operation,
        delta,
        unit: unit.to_string(),
        reason: reason.to_string(),
        created_at: uow.now(),
    };
    transaction_repo::append(uow.conn(), &record)?;
    Ok(record)
}

/// Persists a new quantity and unit, checking the contents version.
///
/// On success `state` reflects what was written, including the bumped
/// version.
pub(crate) fn write_quantity(
    uow: &UnitOfWork<'_>,
    state: &mut ContainerState,
    remaining_qty: f64,
    unit: &str,
) -> Result<()> {
    let id = state.container.id.as_str();
    let written = container_repo::update_contents(
        uow.conn(),
        id,
        remaining_qty,
        unit,
        state.contents.version,
    )?;
    if !written {
        tracing::warn!(container_id = %id, version = state.contents.version, "stale contents version");
        return Err(PantryError::ConcurrencyConflict {
            container_id: id.to_string(),
        });
    }
    container_repo::touch(uow.conn(), id, uow.now())?;

    state.contents.remaining_qty = remaining_qty;
    state.contents.unit = unit.to_string();
    state.contents.version += 1;
    state.container.updated_at = uow.now();
    Ok(())
}

/// Moves a container to `next` and logs a `STATUS_CHANGE`.
///
/// Rejects transitions the state machine does not allow. A no-op when the
/// container is already in `next`.
pub(crate) fn change_status(
    uow: &UnitOfWork<'_>,
    state: &mut ContainerState,
    next: ContainerStatus,
    reason: &str,
) -> Result<()> {
    let current = state.container.status;
    if current == next {
        return Ok(());
    }
    if !current.can_transition_to(next) {
        return Err(PantryError::invalid(format!(
            "container {} cannot move from {} to {}",
            state.container.id, current, next
        )));
    }

    container_repo::update_status(uow.conn(), &state.container.id, next, uow.now())?;
    record(
        uow,
        &state.container.id,
        Operation::StatusChange,
        None,
        &state.contents.unit,
        reason,
    )?;
    tracing::debug!(container_id = %state.container.id, from = %current, to = %next, reason, "status change");

    state.container.status = next;
    state.container.updated_at = uow.now();
    Ok(())
}
