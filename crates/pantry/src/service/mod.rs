//! The `Pantry` facade: the operation set external callers use.
//!
//! Each mutating call runs as one unit of work. A unit of work that fails
//! with a retryable error (stale contents version, busy database) is run
//! again once after a short pause before the error reaches the caller.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{self, CatalogIndex, MasterCorrection, NewIngredient};
use crate::clock::{Clock, SystemClock};
use crate::config::loader::validate_config;
use crate::config::PantryConfig;
use crate::db::{default_database_path, Database, UnitOfWork};
use crate::duplicates::{self, DuplicateCheck, DuplicateQuery};
use crate::error::{ConfigError, PantryError, Result};
use crate::ledger::{
    self, AddedContainer, DeductRequest, DeductionResult, MergeResult, NewLeftover, ProjectionReport,
};
use crate::model::{ContainerState, IngredientAlias, MasterIngredient, TransactionRecord};
use crate::resolver::{Resolution, Resolver};
use crate::search::{self, InventoryFilters, InventoryItem};
use crate::units;

pub mod dto;

pub use dto::*;

pub struct Pantry {
    db: Database,
    resolver: Resolver,
    config: PantryConfig,
    clock: Arc<dyn Clock>,
}

impl Pantry {
    /// Opens the database named by the config, or the default location.
    pub fn open(config: PantryConfig) -> Result<Self> {
        validate_config(&config)?;
        let path = match config.database_path.clone() {
            Some(path) => path,
            None => default_database_path().ok_or_else(|| ConfigError::Validation {
                message: "no database_path configured and no home directory found".to_string(),
            })?,
        };
        let db = Database::open(&path, Duration::from_millis(config.busy_timeout_ms))?;
        tracing::info!(path = %path.display(), "pantry opened");
        Ok(Self::with_database(db, config))
    }

    /// A pantry over a fresh in-memory database.
    pub fn in_memory(config: PantryConfig) -> Result<Self> {
        validate_config(&config)?;
        Ok(Self::with_database(Database::open_in_memory()?, config))
    }

    fn with_database(db: Database, config: PantryConfig) -> Self {
        Self {
            db,
            resolver: Resolver::new(&config.thresholds),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_index(mut self, index: Box<dyn CatalogIndex>) -> Self {
        self.resolver = Resolver::with_index(&self.config.thresholds, index);
        self
    }

    pub fn config(&self) -> &PantryConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs `f` as a unit of work, retrying once on a retryable failure.
    fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&UnitOfWork<'_>) -> Result<T>,
    {
        match self.db.unit_of_work(self.clock.now(), &f) {
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "unit of work failed, retrying once");
                std::thread::sleep(Duration::from_millis(self.config.retry_backoff_ms));
                self.db.unit_of_work(self.clock.now(), &f)
            }
            other => other,
        }
    }

    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T>,
    {
        self.db.with_conn(f)
    }

    // Catalog

    pub fn resolve_ingredient(&self, request: &ResolveRequest) -> Result<Resolution> {
        self.read(|conn| self.resolver.resolve(conn, &request.name, request.category()))
    }

    pub fn get_or_create_ingredient(&self, request: &IngredientRequest) -> Result<MasterIngredient> {
        self.write(|uow| {
            catalog::get_or_create(
                uow.conn(),
                &request.name,
                &NewIngredient {
                    category: request.category,
                    default_unit: request.default_unit.as_deref(),
                    shelf_life_days: request.shelf_life_days,
                },
                uow.now(),
            )
        })
    }

    pub fn get_master_ingredient(&self, master_id: &str) -> Result<MasterIngredient> {
        self.read(|conn| catalog::require(conn, master_id))
    }

    pub fn correct_master_ingredient(
        &self,
        request: &CorrectIngredientRequest,
    ) -> Result<MasterIngredient> {
        let correction = MasterCorrection {
            canonical_name: request.canonical_name.clone(),
            category: request.category,
            default_unit: request.default_unit.clone(),
            default_shelf_life_days: request.default_shelf_life_days,
        };
        self.write(|uow| catalog::correct(uow.conn(), &request.master_id, &correction))
    }

    pub fn register_alias(&self, request: &RegisterAliasRequest) -> Result<IngredientAlias> {
        self.write(|uow| {
            catalog::register_alias(
                uow.conn(),
                &request.alias,
                &request.master_id,
                request.source,
                uow.now(),
            )
        })
    }

    pub fn list_aliases(&self, master_id: &str) -> Result<Vec<IngredientAlias>> {
        self.read(|conn| {
            catalog::require(conn, master_id)?;
            Ok(crate::db::catalog_repo::list_aliases(conn, master_id)?)
        })
    }

    pub fn register_conversion(&self, request: &ConversionRequest) -> Result<()> {
        self.write(|uow| {
            units::register_conversion(uow.conn(), &request.from_unit, &request.to_unit, request.factor)
        })
    }

    // Ledger

    /// Adds every item in one unit of work: either all are recorded or none.
    pub fn add_inventory(&self, request: &AddInventoryRequest) -> Result<AddInventoryResult> {
        if request.items.is_empty() {
            return Err(PantryError::invalid("no items to add"));
        }
        let outcomes = self.write(|uow| {
            request
                .items
                .iter()
                .map(|item| ledger::add_container(uow, &self.resolver, item))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(AddInventoryResult::from_outcomes(outcomes))
    }

    pub fn add_leftover(&self, request: &NewLeftover) -> Result<AddedContainer> {
        self.write(|uow| ledger::add_leftover(uow, request, self.config.leftover_shelf_life_days))
    }

    pub fn deduct_inventory(&self, request: &DeductRequest) -> Result<DeductionResult> {
        self.write(|uow| ledger::deduct(uow, request, self.config.thresholds.low_stock_ratio))
    }

    pub fn update_inventory(&self, request: &UpdateInventoryRequest) -> Result<ContainerState> {
        self.write(|uow| {
            ledger::update(
                uow,
                &request.container_id,
                &request.updates,
                &request.reason,
                self.config.thresholds.low_stock_ratio,
            )
        })
    }

    pub fn delete_inventory(&self, request: &DeleteInventoryRequest) -> Result<ContainerState> {
        self.write(|uow| ledger::soft_delete(uow, &request.container_id, &request.reason))
    }

    pub fn merge_inventory(&self, request: &MergeInventoryRequest) -> Result<MergeResult> {
        self.write(|uow| ledger::merge(uow, &request.source_id, &request.target_id))
    }

    pub fn check_duplicates(&self, query: &DuplicateQuery) -> Result<DuplicateCheck> {
        let now = self.clock.now();
        self.read(|conn| duplicates::check(conn, query, now, &self.config.thresholds))
    }

    // Views

    pub fn search_inventory(&self, filters: &InventoryFilters) -> Result<Vec<InventoryItem>> {
        let now = self.clock.now();
        self.read(|conn| search::search(conn, filters, now, self.config.default_search_limit))
    }

    pub fn get_expiring_items(&self, within_days: i64) -> Result<Vec<InventoryItem>> {
        let now = self.clock.now();
        self.read(|conn| search::expiring(conn, within_days, now))
    }

    pub fn container_history(&self, container_id: &str) -> Result<Vec<TransactionRecord>> {
        self.read(|conn| ledger::history(conn, container_id))
    }

    pub fn verify_projection(&self, container_id: &str) -> Result<ProjectionReport> {
        self.read(|conn| ledger::verify_projection(conn, container_id))
    }
}
