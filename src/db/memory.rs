//! In-process [`PositionRepository`] with a switch to simulate outages.

use super::{PositionRepository, RepoError};
use crate::domain::{CreatedKey, Position, Scope};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Collections {
    open: Vec<Position>,
    closed: Vec<Position>,
    operations: Vec<String>,
}

impl Collections {
    /// Remove the record stored under `key` from whichever collection holds it.
    fn take(&mut self, key: &CreatedKey) -> Option<Position> {
        if let Some(i) = self.open.iter().position(|p| &p.created == key) {
            return Some(self.open.remove(i));
        }
        let i = self.closed.iter().position(|p| &p.created == key)?;
        Some(self.closed.remove(i))
    }

    fn contains(&self, key: &CreatedKey) -> bool {
        self.open.iter().chain(self.closed.iter()).any(|p| &p.created == key)
    }
}

/// Repository backed by two in-memory vectors.
///
/// Follows the same ordering rules as the SQLite repository. While
/// [`set_failing`](Self::set_failing) is on, every call returns
/// [`RepoError::Unavailable`] without touching the stored data.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: Mutex<Collections>,
    failing: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated with the given collections.
    pub fn with_positions(open: Vec<Position>, closed: Vec<Position>) -> Self {
        Self {
            inner: Mutex::new(Collections {
                open,
                closed,
                operations: Vec::new(),
            }),
            failing: AtomicBool::new(false),
        }
    }

    /// A repository that starts out unreachable.
    pub fn failing() -> Self {
        let repo = Self::new();
        repo.set_failing(true);
        repo
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Names of the successful write operations, oldest first.
    pub async fn operations(&self) -> Vec<String> {
        self.inner.lock().await.operations.clone()
    }

    /// Current contents as `(open, closed)`.
    pub async fn snapshot(&self) -> (Vec<Position>, Vec<Position>) {
        let inner = self.inner.lock().await;
        (inner.open.clone(), inner.closed.clone())
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable("memory repository is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PositionRepository for MemoryRepository {
    async fn list(&self, scope: Scope) -> Result<Vec<Position>, RepoError> {
        self.check()?;
        let inner = self.inner.lock().await;
        Ok(match scope {
            Scope::Open => inner.open.clone(),
            Scope::Closed => inner.closed.clone(),
        })
    }

    async fn create(&self, position: &Position) -> Result<(), RepoError> {
        self.check()?;
        let mut inner = self.inner.lock().await;
        if inner.contains(&position.created) {
            return Err(RepoError::Duplicate(position.created.clone()));
        }
        inner.open.push(position.clone());
        inner.operations.push("create".to_string());
        Ok(())
    }

    async fn update(&self, key: &CreatedKey, position: &Position) -> Result<(), RepoError> {
        self.check()?;
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let slot = inner
            .open
            .iter_mut()
            .chain(inner.closed.iter_mut())
            .find(|p| &p.created == key)
            .ok_or_else(|| RepoError::NotFound(key.clone()))?;
        *slot = position.clone();
        inner.operations.push("update".to_string());
        Ok(())
    }

    async fn delete(&self, key: &CreatedKey) -> Result<(), RepoError> {
        self.check()?;
        let mut inner = self.inner.lock().await;
        inner
            .take(key)
            .ok_or_else(|| RepoError::NotFound(key.clone()))?;
        inner.operations.push("delete".to_string());
        Ok(())
    }

    async fn set_closed(&self, key: &CreatedKey, closed: bool) -> Result<(), RepoError> {
        self.check()?;
        let mut inner = self.inner.lock().await;
        let position = inner
            .take(key)
            .ok_or_else(|| RepoError::NotFound(key.clone()))?;
        if closed {
            inner.closed.insert(0, position);
        } else {
            inner.open.insert(0, position);
        }
        inner.operations.push("set_closed".to_string());
        Ok(())
    }

    async fn bulk_replace(&self, open: &[Position], closed: &[Position]) -> Result<(), RepoError> {
        self.check()?;
        let mut inner = self.inner.lock().await;
        inner.open = open.to_vec();
        inner.closed = closed.to_vec();
        inner.operations.push("bulk_replace".to_string());
        Ok(())
    }
}
