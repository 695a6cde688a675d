pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod duplicates;
pub mod error;
pub mod ledger;
pub mod model;
pub mod resolver;
pub mod search;
pub mod service;
pub mod telemetry;
pub mod units;

pub use catalog::{bigram_jaccard, CatalogIndex, LinearScanIndex, ScoredCandidate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, load_config_from_str, LoggingConfig, PantryConfig, Thresholds};
pub use db::{Database, DatabaseError};
pub use duplicates::{DuplicateCheck, DuplicateQuery, DuplicateType, Recommendation};
pub use error::{ConfigError, LedgerWarning, PantryError, Result};
pub use ledger::{
    AddOutcome, AddedContainer, ContainerUpdate, DeductRequest, DeductionResult, MergeResult,
    NewContainer, NewLeftover, ProjectionReport, SkippedItem,
};
pub use model::{
    AliasSource, Category, Container, ContainerSource, ContainerState, ContainerStatus, Contents,
    IngredientAlias, MasterIngredient, Operation, TransactionRecord,
};
pub use resolver::{MatchType, Resolution, Resolver};
pub use search::{InventoryFilters, InventoryItem};
pub use service::{
    AddInventoryRequest, AddInventoryResult, ConversionRequest, CorrectIngredientRequest,
    DeleteInventoryRequest, IngredientRequest, MergeInventoryRequest, Pantry, RegisterAliasRequest,
    ResolveRequest, UpdateInventoryRequest,
};
pub use telemetry::init_tracing;
