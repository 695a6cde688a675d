//! Request and response records of the [`Pantry`](super::Pantry) facade.
//!
//! Everything here is camelCase JSON so an agent's tool calls can be
//! deserialized straight into it.

use serde::{Deserialize, Serialize};

use crate::ledger::{AddOutcome, ContainerUpdate, NewContainer};
use crate::model::{AliasSource, Category};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddInventoryRequest {
    pub items: Vec<NewContainer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddInventoryResult {
    pub added: usize,
    pub skipped: usize,
    pub results: Vec<AddOutcome>,
}

impl AddInventoryResult {
    pub(crate) fn from_outcomes(results: Vec<AddOutcome>) -> Self {
        let skipped = results
            .iter()
            .filter(|r| matches!(r, AddOutcome::Skipped(_)))
            .count();
        Self {
            added: results.len() - skipped,
            skipped,
            results,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryRequest {
    pub container_id: String,
    pub updates: ContainerUpdate,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteInventoryRequest {
    pub container_id: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeInventoryRequest {
    pub source_id: String,
    pub target_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub name: String,
    /// Free text; unrecognised categories are ignored.
    #[serde(default)]
    pub category_hint: Option<String>,
}

impl ResolveRequest {
    pub(crate) fn category(&self) -> Option<Category> {
        self.category_hint
            .as_deref()
            .map(Category::from_hint)
            .filter(|c| *c != Category::Unknown)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAliasRequest {
    pub alias: String,
    pub master_id: String,
    #[serde(default = "default_alias_source")]
    pub source: AliasSource,
}

fn default_alias_source() -> AliasSource {
    AliasSource::Agent
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientRequest {
    pub name: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub default_unit: Option<String>,
    #[serde(default)]
    pub shelf_life_days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectIngredientRequest {
    pub master_id: String,
    #[serde(default)]
    pub canonical_name: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub default_unit: Option<String>,
    #[serde(default)]
    pub default_shelf_life_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub from_unit: String,
    pub to_unit: String,
    pub factor: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContainerStatus;

    #[test]
    fn test_update_request_nests_updates() {
        let req: UpdateInventoryRequest = serde_json::from_str(
            r#"{"containerId": "c1", "updates": {"quantity": 2.5, "status": "LOW"}, "reason": "recount"}"#,
        )
        .unwrap();
        assert_eq!(req.container_id, "c1");
        assert_eq!(req.updates.quantity, Some(2.5));
        assert_eq!(req.updates.status, Some(ContainerStatus::Low));
        assert!(req.updates.unit.is_none());
        assert_eq!(req.reason, "recount");

        // Top-level change fields are not part of the request shape.
        let flat: UpdateInventoryRequest = serde_json::from_str(
            r#"{"containerId": "c1", "updates": {}, "quantity": 2.5}"#,
        )
        .unwrap();
        assert!(flat.updates.is_empty());
        assert!(serde_json::from_str::<UpdateInventoryRequest>(r#"{"containerId": "c1"}"#).is_err());
    }

    #[test]
    fn test_add_request_defaults() {
        let req: AddInventoryRequest = serde_json::from_str(
            r#"{"items": [{"name": "Eggs", "quantity": 12, "unit": "pieces", "visionJobId": "j1"}]}"#,
        )
        .unwrap();
        let item = &req.items[0];
        assert_eq!(item.name.as_deref(), Some("Eggs"));
        assert_eq!(item.quantity, 12.0);
        assert_eq!(item.vision_job_id.as_deref(), Some("j1"));
        assert!(item.status.is_none());
    }

    #[test]
    fn test_alias_source_defaults_to_agent() {
        let req: RegisterAliasRequest =
            serde_json::from_str(r#"{"alias": "spuds", "masterId": "potato"}"#).unwrap();
        assert_eq!(req.source, AliasSource::Agent);
    }

    #[test]
    fn test_resolve_request_ignores_unknown_hint() {
        let req: ResolveRequest =
            serde_json::from_str(r#"{"name": "milk", "categoryHint": " Dairy "}"#).unwrap();
        assert_eq!(req.category(), Some(Category::Dairy));

        let req: ResolveRequest =
            serde_json::from_str(r#"{"name": "milk", "categoryHint": "stuff"}"#).unwrap();
        assert_eq!(req.category(), None);
    }
}
