pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod format;
pub mod store;

pub use config::Config;
pub use datasource::{
    FallbackLookup, LookupError, MockLookup, PositionLookup, SimulatedLookup, SubgraphLookup,
};
pub use db::{init_db, MemoryRepository, PositionRepository, RepoError, Repository};
pub use domain::{Address, Backup, CreatedKey, Decimal, Horizon, Position, Scope};
pub use error::AppError;
pub use store::{PositionStore, SnapshotFile, SyncStatus};
