//! Ledger domain types shared by the repositories and the service layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a stored or supplied enum value is not recognised.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` for a closed string enum.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Broad food category of a master ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Produce,
    Protein,
    Dairy,
    Pantry,
    Frozen,
    Beverage,
    Condiment,
    Grain,
    Spice,
    #[default]
    Unknown,
}

string_enum!(Category, "category", {
    Produce => "produce",
    Protein => "protein",
    Dairy => "dairy",
    Pantry => "pantry",
    Frozen => "frozen",
    Beverage => "beverage",
    Condiment => "condiment",
    Grain => "grain",
    Spice => "spice",
    Unknown => "unknown",
});

impl Category {
    /// Lenient parse for caller-supplied hints: anything unrecognised is `Unknown`.
    pub fn from_hint(hint: &str) -> Self {
        hint.trim().to_lowercase().parse().unwrap_or_default()
    }
}

/// Lifecycle state of a container.
///
/// Forward-only: `SEALED → OPEN → LOW → EMPTY`, with `DELETED` reachable
/// from the three active states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    Sealed,
    Open,
    Low,
    Empty,
    Deleted,
}

string_enum!(ContainerStatus, "container status", {
    Sealed => "SEALED",
    Open => "OPEN",
    Low => "LOW",
    Empty => "EMPTY",
    Deleted => "DELETED",
});

impl ContainerStatus {
    pub const ACTIVE: &'static [ContainerStatus] = &[
        ContainerStatus::Sealed,
        ContainerStatus::Open,
        ContainerStatus::Low,
    ];

    /// Whether stock in this state can still be consumed.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ContainerStatus::Sealed | ContainerStatus::Open | ContainerStatus::Low
        )
    }

    fn rank(self) -> u8 {
        match self {
            ContainerStatus::Sealed => 0,
            ContainerStatus::Open => 1,
            ContainerStatus::Low => 2,
            ContainerStatus::Empty => 3,
            ContainerStatus::Deleted => 4,
        }
    }

    /// Whether the state machine permits moving from `self` to `next`.
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(self, next: ContainerStatus) -> bool {
        if self == next {
            return true;
        }
        match next {
            ContainerStatus::Deleted => self.is_active(),
            _ => self.is_active() && next.rank() > self.rank(),
        }
    }

    /// The later of two states along the forward chain.
    pub fn furthest(self, other: ContainerStatus) -> ContainerStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// How a container entered the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContainerSource {
    Vision,
    #[default]
    Manual,
    Cooked,
}

string_enum!(ContainerSource, "container source", {
    Vision => "vision",
    Manual => "manual",
    Cooked => "cooked",
});

/// Who registered an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasSource {
    Agent,
    UserCorrection,
}

string_enum!(AliasSource, "alias source", {
    Agent => "agent",
    UserCorrection => "user_correction",
});

/// Kind of ledger mutation recorded in the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Add,
    Deduct,
    Adjust,
    Merge,
    Delete,
    StatusChange,
}

string_enum!(Operation, "operation", {
    Add => "ADD",
    Deduct => "DEDUCT",
    Adjust => "ADJUST",
    Merge => "MERGE",
    Delete => "DELETE",
    StatusChange => "STATUS_CHANGE",
});

/// Canonical identity of a foodstuff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterIngredient {
    pub id: String,
    pub canonical_name: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_shelf_life_days: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Learned mapping from a normalized raw name to a master ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientAlias {
    pub alias: String,
    pub master_id: String,
    pub source: AliasSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One physical purchase or cooked batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub master_id: Option<String>,
    pub dish_name: Option<String>,
    pub recipe_id: Option<String>,
    pub status: ContainerStatus,
    pub purchase_unit: String,
    pub source: ContainerSource,
    pub confidence: f64,
    pub vision_job_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable quantity state owned by exactly one container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contents {
    pub container_id: String,
    pub remaining_qty: f64,
    pub unit: String,
    pub version: i64,
}

/// A container joined with its contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerState {
    pub container: Container,
    pub contents: Contents,
}

/// Immutable audit record of one ledger mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub container_id: String,
    pub operation: Operation,
    pub delta: Option<f64>,
    pub unit: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_forward_transitions() {
        use ContainerStatus::*;
        assert!(Sealed.can_transition_to(Open));
        assert!(Sealed.can_transition_to(Empty));
        assert!(Open.can_transition_to(Low));
        assert!(Low.can_transition_to(Empty));
        assert!(Low.can_transition_to(Deleted));
        assert!(Sealed.can_transition_to(Deleted));
    }

    #[test]
    fn test_status_never_moves_backwards() {
        use ContainerStatus::*;
        assert!(!Low.can_transition_to(Sealed));
        assert!(!Low.can_transition_to(Open));
        assert!(!Empty.can_transition_to(Open));
        assert!(!Empty.can_transition_to(Deleted));
        for status in ContainerStatus::ALL {
            if *status != Deleted {
                assert!(!Deleted.can_transition_to(*status));
            }
        }
    }

    #[test]
    fn test_furthest_status() {
        use ContainerStatus::*;
        assert_eq!(Low.furthest(Open), Low);
        assert_eq!(Open.furthest(Empty), Empty);
    }

    #[test]
    fn test_enum_text_round_trip_and_serde_names() {
        assert_eq!("STATUS_CHANGE".parse::<Operation>().unwrap(), Operation::StatusChange);
        assert_eq!(
            serde_json::to_string(&AliasSource::UserCorrection).unwrap(),
            "\"user_correction\""
        );
        assert_eq!(serde_json::to_string(&ContainerStatus::Low).unwrap(), "\"LOW\"");
        assert!("sealed".parse::<ContainerStatus>().is_err());
    }

    #[test]
    fn test_category_hint_is_lenient() {
        assert_eq!(Category::from_hint(" Dairy "), Category::Dairy);
        assert_eq!(Category::from_hint("snacks"), Category::Unknown);
    }
}
