//! Status derivation after a quantity drops.

use rusqlite::Connection;

use crate::db::transaction_repo;
use crate::error::{LedgerWarning, Result};
use crate::model::{ContainerState, ContainerStatus, Operation};
use crate::units;

pub const REASON_OPENED: &str = "opened_for_use";
pub const REASON_LOW: &str = "low_stock";
pub const REASON_DEPLETED: &str = "depleted";

#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    pub status: ContainerStatus,
    pub warning: Option<LedgerWarning>,
}

/// Status implied by `remaining` out of `initial`, never earlier than
/// `current` on the forward chain.
pub fn derive(current: ContainerStatus, remaining: f64, initial: f64, low_stock_ratio: f64) -> Derived {
    if remaining <= 0.0 {
        return Derived {
            status: current.furthest(ContainerStatus::Empty),
            warning: None,
        };
    }

    let ratio = if initial > 0.0 { remaining / initial } else { 1.0 };
    if ratio <= low_stock_ratio {
        Derived {
            status: current.furthest(ContainerStatus::Low),
            warning: Some(LedgerWarning::LowStock {
                percent: (ratio * 100.0).round() as u32,
            }),
        }
    } else {
        Derived {
            status: current.furthest(ContainerStatus::Open),
            warning: None,
        }
    }
}

/// Reason logged with a derived transition into `status`.
pub fn reason_for(status: ContainerStatus) -> &'static str {
    match status {
        ContainerStatus::Empty => REASON_DEPLETED,
        ContainerStatus::Low => REASON_LOW,
        _ => REASON_OPENED,
    }
}

/// Quantity the container started with, in its current unit.
///
/// Taken from the first `ADD` record. Falls back to `fallback` when that
/// record is missing or cannot be projected.
pub fn initial_quantity(conn: &Connection, state: &ContainerState, fallback: f64) -> Result<f64> {
    let Some(first_add) = transaction_repo::find_first(conn, &state.container.id, Operation::Add)? else {
        return Ok(fallback);
    };
    let Some(delta) = first_add.delta.filter(|d| *d > 0.0) else {
        return Ok(fallback);
    };

    let projected = units::convert(conn, delta, &first_add.unit, &state.contents.unit)?;
    if projected.warning.is_some() {
        return Ok(fallback);
    }
    Ok(projected.quantity)
}
