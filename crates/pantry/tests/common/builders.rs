//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use pantry::{Category, ContainerSource, ContainerStatus, NewContainer, PantryConfig, Thresholds};

/// Builder for `NewContainer` items.
pub struct ItemBuilder {
    item: NewContainer,
}

impl ItemBuilder {
    /// An item resolved by name, in the given unit.
    pub fn named(name: &str, quantity: f64, unit: &str) -> Self {
        Self {
            item: NewContainer {
                name: Some(name.to_string()),
                quantity,
                unit: Some(unit.to_string()),
                ..Default::default()
            },
        }
    }

    /// An item for an existing catalog entry.
    pub fn for_master(master_id: &str, quantity: f64, unit: &str) -> Self {
        Self {
            item: NewContainer {
                master_id: Some(master_id.to_string()),
                quantity,
                unit: Some(unit.to_string()),
                ..Default::default()
            },
        }
    }

    pub fn category(mut self, category: Category) -> Self {
        self.item.category = Some(category);
        self
    }

    pub fn status(mut self, status: ContainerStatus) -> Self {
        self.item.status = Some(status);
        self
    }

    pub fn expires_in_days(mut self, days: i64) -> Self {
        self.item.expires_in_days = Some(days);
        self
    }

    /// Mark the item as coming from a vision job.
    pub fn vision_job(mut self, job: &str) -> Self {
        self.item.vision_job_id = Some(job.to_string());
        self.item.source = ContainerSource::Vision;
        self
    }

    pub fn build(self) -> NewContainer {
        self.item
    }
}

/// Builder for `PantryConfig` instances.
pub struct ConfigBuilder {
    config: PantryConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PantryConfig::default(),
        }
    }

    pub fn low_stock_ratio(mut self, ratio: f64) -> Self {
        self.config.thresholds.low_stock_ratio = ratio;
        self
    }

    pub fn duplicate_window_hours(mut self, hours: i64) -> Self {
        self.config.thresholds.duplicate_window_hours = hours;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    pub fn build(self) -> PantryConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
