//! Persistence for the two position collections.
//!
//! This module provides:
//! - The `PositionRepository` trait the store syncs through
//! - SQLite initialization, pragmas and migrations
//! - `Repository`, the SQLite implementation
//! - `MemoryRepository`, an in-process implementation with a failure switch

pub mod memory;
pub mod migrations;
pub mod repo;

use crate::domain::{CreatedKey, Position, Scope};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub use memory::MemoryRepository;
pub use migrations::init_db;
pub use repo::Repository;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("no stored position with key {0}")]
    NotFound(CreatedKey),
    #[error("a stored position already uses key {0}")]
    Duplicate(CreatedKey),
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

/// Remote copy of the open/closed collections, keyed by `created`.
///
/// Implementations must keep per-collection order: `create` appends to open,
/// `set_closed` moves the record to the front of its new collection, and
/// `bulk_replace` stores both lists in the order given.
#[async_trait]
pub trait PositionRepository: Send + Sync + fmt::Debug {
    async fn list(&self, scope: Scope) -> Result<Vec<Position>, RepoError>;

    async fn create(&self, position: &Position) -> Result<(), RepoError>;

    /// Replace the record stored under `key` (the new record may carry a new key).
    async fn update(&self, key: &CreatedKey, position: &Position) -> Result<(), RepoError>;

    async fn delete(&self, key: &CreatedKey) -> Result<(), RepoError>;

    async fn set_closed(&self, key: &CreatedKey, closed: bool) -> Result<(), RepoError>;

    /// Drop everything and store exactly `open` and `closed`.
    async fn bulk_replace(&self, open: &[Position], closed: &[Position]) -> Result<(), RepoError>;
}
