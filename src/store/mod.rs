//! The injectable position store.
//!
//! `PositionStore` owns the [`Book`] and runs every mutation in two stages:
//! the lifecycle transition commits locally (and to the snapshot file, if one
//! is configured), then the resulting [`SyncOp`] is forwarded to the
//! repository. Sync failures are logged and published as a
//! [`SyncStatus::Warning`]; they never undo the local change.
//!
//! The persist stage is serialized by a gate that each mutation takes before
//! it releases the book lock, so snapshot writes and repository calls happen
//! in commit order even when requests run concurrently.

pub mod snapshot;

use crate::db::{PositionRepository, RepoError};
use crate::domain::{Backup, Position, Scope};
use crate::engine::{Book, LifecycleError, SyncOp};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

pub use snapshot::{SnapshotError, SnapshotFile};

pub const SYNC_WARNING: &str = "Failed to sync with server. Changes were saved locally.";
pub const LOAD_WARNING: &str = "Failed to load from server. Showing locally saved positions.";

/// Outcome of the most recent exchange with the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum SyncStatus {
    /// No repository configured.
    LocalOnly,
    Synced,
    Warning(String),
}

impl SyncStatus {
    pub fn is_warning(&self) -> bool {
        matches!(self, SyncStatus::Warning(_))
    }
}

#[derive(Debug)]
pub struct PositionStore {
    book: RwLock<Book>,
    persist_gate: Mutex<()>,
    repo: Option<Arc<dyn PositionRepository>>,
    snapshot: Option<SnapshotFile>,
    status: watch::Sender<SyncStatus>,
}

impl PositionStore {
    /// A store with no repository; every change stays local.
    pub fn local_only() -> Self {
        Self::with_parts(None, None)
    }

    pub fn new(repo: Arc<dyn PositionRepository>) -> Self {
        Self::with_parts(Some(repo), None)
    }

    pub fn with_parts(repo: Option<Arc<dyn PositionRepository>>, snapshot: Option<SnapshotFile>) -> Self {
        let initial = if repo.is_some() {
            SyncStatus::Synced
        } else {
            SyncStatus::LocalOnly
        };
        let (status, _) = watch::channel(initial);
        Self {
            book: RwLock::new(Book::default()),
            persist_gate: Mutex::new(()),
            repo,
            snapshot,
            status,
        }
    }

    /// Seed the book directly, bypassing persistence.
    pub async fn seed(&self, open: Vec<Position>, closed: Vec<Position>) {
        *self.book.write().await = Book::new(open, closed);
    }

    /// Populate the book at startup.
    ///
    /// Reads the local snapshot first, then replaces it with the repository's
    /// collections when the repository answers. A failed remote load keeps the
    /// local data and records a warning.
    pub async fn load(&self) -> SyncStatus {
        if let Some(snapshot) = &self.snapshot {
            match snapshot.read().await {
                Ok(Some(backup)) => {
                    info!(positions = backup.len(), path = %snapshot.path().display(), "Loaded local snapshot");
                    *self.book.write().await = Book::new(backup.positions, backup.closed_positions);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Ignoring unreadable local snapshot"),
            }
        }

        let Some(repo) = &self.repo else {
            return self.publish(SyncStatus::LocalOnly);
        };

        match load_remote(repo.as_ref()).await {
            Ok((open, closed)) => {
                info!(open = open.len(), closed = closed.len(), "Loaded positions from repository");
                let (backup, _gate) = {
                    let mut book = self.book.write().await;
                    *book = Book::new(open, closed);
                    (book.to_backup(), self.persist_gate.lock().await)
                };
                self.write_snapshot(&backup).await;
                self.publish(SyncStatus::Synced)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load positions from repository");
                self.publish(SyncStatus::Warning(LOAD_WARNING.to_string()))
            }
        }
    }

    /// Run one lifecycle transition, then persist it.
    ///
    /// The transition's own error is returned unchanged and nothing is
    /// persisted. On success the returned status describes the sync stage.
    pub async fn apply<F>(&self, transition: F) -> Result<SyncStatus, LifecycleError>
    where
        F: FnOnce(&mut Book) -> Result<SyncOp, LifecycleError>,
    {
        let (op, backup, gate) = {
            let mut book = self.book.write().await;
            let op = transition(&mut book)?;
            (op, book.to_backup(), self.persist_gate.lock().await)
        };
        Ok(self.persist(op, &backup, gate).await)
    }

    /// Replace both collections from a validated backup.
    pub async fn import(&self, backup: Backup) -> SyncStatus {
        let (op, backup, gate) = {
            let mut book = self.book.write().await;
            let op = book.replace_all(backup);
            (op, book.to_backup(), self.persist_gate.lock().await)
        };
        self.persist(op, &backup, gate).await
    }

    pub async fn book(&self) -> Book {
        self.book.read().await.clone()
    }

    pub async fn positions(&self, scope: Scope) -> Vec<Position> {
        self.book.read().await.scope(scope).to_vec()
    }

    pub async fn backup(&self) -> Backup {
        self.book.read().await.to_backup()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Second stage of a mutation. `_gate` is held until the repository answers.
    async fn persist(&self, op: SyncOp, backup: &Backup, _gate: MutexGuard<'_, ()>) -> SyncStatus {
        debug!(op = op.name(), "Applied local transition");
        self.write_snapshot(backup).await;

        let Some(repo) = &self.repo else {
            return self.publish(SyncStatus::LocalOnly);
        };

        let name = op.name();
        match forward(repo.as_ref(), op).await {
            Ok(()) => {
                debug!(op = name, "Synced with repository");
                self.publish(SyncStatus::Synced)
            }
            Err(e) => {
                warn!(op = name, error = %e, "Failed to sync with repository");
                self.publish(SyncStatus::Warning(SYNC_WARNING.to_string()))
            }
        }
    }

    async fn write_snapshot(&self, backup: &Backup) {
        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.write(backup).await {
                warn!(error = %e, path = %snapshot.path().display(), "Failed to write local snapshot");
            }
        }
    }

    fn publish(&self, status: SyncStatus) -> SyncStatus {
        self.status.send_replace(status.clone());
        status
    }
}

async fn load_remote(repo: &dyn PositionRepository) -> Result<(Vec<Position>, Vec<Position>), RepoError> {
    let open = repo.list(Scope::Open).await?;
    let closed = repo.list(Scope::Closed).await?;
    Ok((open, closed))
}

async fn forward(repo: &dyn PositionRepository, op: SyncOp) -> Result<(), RepoError> {
    match op {
        SyncOp::Create(position) => repo.create(&position).await,
        SyncOp::Update { key, position } => repo.update(&key, &position).await,
        SyncOp::Delete(key) => repo.delete(&key).await,
        SyncOp::SetClosed { key, closed } => repo.set_closed(&key, closed).await,
        SyncOp::BulkReplace { open, closed } => repo.bulk_replace(&open, &closed).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use crate::domain::{CreatedKey, Decimal, InlineField};
    use tempfile::TempDir;

    fn position(pool: &str, created: &str) -> Position {
        let mut p = Position::new(pool, CreatedKey::new(created));
        p.invested = Decimal::from_i64(1000);
        p.current = Decimal::from_i64(1050);
        p
    }

    #[tokio::test]
    async fn test_local_only_store() {
        let store = PositionStore::local_only();
        let status = store
            .apply(|book| book.add(position("ETH/USDC", "2025-01-01")))
            .await
            .unwrap();
        assert_eq!(status, SyncStatus::LocalOnly);
        assert_eq!(store.positions(Scope::Open).await.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_forwards_to_repository() {
        let repo = Arc::new(MemoryRepository::new());
        let store = PositionStore::new(repo.clone());

        store.apply(|book| book.add(position("A", "2025-01-01"))).await.unwrap();
        store
            .apply(|book| book.inline_edit(0, InlineField::Collected, Decimal::from_i64(20)))
            .await
            .unwrap();
        let status = store.apply(|book| book.close(0)).await.unwrap();

        assert_eq!(status, SyncStatus::Synced);
        assert_eq!(repo.operations().await, vec!["create", "update", "set_closed"]);
        let (open, closed) = repo.snapshot().await;
        assert!(open.is_empty());
        assert_eq!(closed[0].collected, Decimal::from_i64(20));
    }

    #[tokio::test]
    async fn test_sync_failure_keeps_local_state() {
        let repo = Arc::new(MemoryRepository::failing());
        let store = PositionStore::new(repo.clone());
        let mut rx = store.subscribe();

        let status = store.apply(|book| book.add(position("A", "2025-01-01"))).await.unwrap();

        assert_eq!(status, SyncStatus::Warning(SYNC_WARNING.to_string()));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_warning());
        assert_eq!(store.positions(Scope::Open).await.len(), 1);
        assert!(repo.snapshot().await.0.is_empty());
    }

    #[tokio::test]
    async fn test_transition_error_skips_sync() {
        let repo = Arc::new(MemoryRepository::new());
        let store = PositionStore::new(repo.clone());

        let result = store.apply(|book| book.close(3)).await;
        assert!(matches!(result, Err(LifecycleError::IndexOutOfRange { .. })));
        assert!(repo.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_repository() {
        let repo = Arc::new(MemoryRepository::with_positions(
            vec![position("A", "1")],
            vec![position("B", "2")],
        ));
        let store = PositionStore::new(repo);

        assert_eq!(store.load().await, SyncStatus::Synced);
        assert_eq!(store.positions(Scope::Open).await[0].pool, "A");
        assert_eq!(store.positions(Scope::Closed).await[0].pool, "B");
    }

    #[tokio::test]
    async fn test_load_failure_falls_back_to_snapshot() {
        let temp = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(temp.path().join("positions.json"));
        snapshot
            .write(&Backup::new(vec![position("Local", "1")], vec![]))
            .await
            .unwrap();

        let repo: Arc<dyn PositionRepository> = Arc::new(MemoryRepository::failing());
        let store = PositionStore::with_parts(Some(repo), Some(snapshot));

        let status = store.load().await;
        assert_eq!(status, SyncStatus::Warning(LOAD_WARNING.to_string()));
        assert_eq!(store.positions(Scope::Open).await[0].pool, "Local");
    }

    #[tokio::test]
    async fn test_mutation_writes_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("positions.json");
        let store = PositionStore::with_parts(None, Some(SnapshotFile::new(&path)));

        store.apply(|book| book.add(position("A", "1"))).await.unwrap();

        let saved = SnapshotFile::new(&path).read().await.unwrap().unwrap();
        assert_eq!(saved.positions.len(), 1);
    }

    #[tokio::test]
    async fn test_import_replaces_everything() {
        let repo = Arc::new(MemoryRepository::new());
        let store = PositionStore::new(repo.clone());
        store.apply(|book| book.add(position("Old", "0"))).await.unwrap();

        let status = store
            .import(Backup::new(vec![], vec![position("Z", "9")]))
            .await;
        assert_eq!(status, SyncStatus::Synced);
        assert!(store.positions(Scope::Open).await.is_empty());
        assert_eq!(repo.snapshot().await.1.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_reach_repository_in_commit_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("positions.json");
        let repo = Arc::new(MemoryRepository::new());
        let store = Arc::new(PositionStore::with_parts(
            Some(repo.clone()),
            Some(SnapshotFile::new(&path)),
        ));

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let key = CreatedKey::new(format!("2025-01-01T00:00:00.{:03}Z", i));
                    let added = store
                        .apply(|book| book.add(position("P", key.as_str())))
                        .await
                        .unwrap();
                    let closed = store
                        .apply(|book| {
                            let index = book.open().iter().position(|p| p.created == key).unwrap();
                            book.close(index)
                        })
                        .await
                        .unwrap();
                    (added, closed)
                })
            })
            .collect();

        for task in tasks {
            let (added, closed) = task.await.unwrap();
            assert_eq!(added, SyncStatus::Synced);
            assert_eq!(closed, SyncStatus::Synced);
        }

        let book = store.book().await;
        let (remote_open, remote_closed) = repo.snapshot().await;
        assert!(book.open().is_empty());
        assert!(remote_open.is_empty());
        assert_eq!(book.closed().len(), 32);
        assert_eq!(remote_closed, book.closed().to_vec());

        let saved = SnapshotFile::new(&path).read().await.unwrap().unwrap();
        assert_eq!(saved, store.backup().await);
    }
}
