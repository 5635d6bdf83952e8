//! Position lifecycle: the open and closed collections and the transitions
//! between them.
//!
//! Each transition mutates the [`Book`] in place and returns the [`SyncOp`] the
//! caller should forward to the persistence layer. Transitions never perform I/O.

use crate::domain::{Backup, CreatedKey, Decimal, InlineField, Position, Scope};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Persistence side effect produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOp {
    Create(Position),
    /// `key` is the key the record was stored under before the edit.
    Update { key: CreatedKey, position: Position },
    Delete(CreatedKey),
    SetClosed { key: CreatedKey, closed: bool },
    BulkReplace { open: Vec<Position>, closed: Vec<Position> },
}

impl SyncOp {
    pub fn name(&self) -> &'static str {
        match self {
            SyncOp::Create(_) => "create",
            SyncOp::Update { .. } => "update",
            SyncOp::Delete(_) => "delete",
            SyncOp::SetClosed { .. } => "set_closed",
            SyncOp::BulkReplace { .. } => "bulk_replace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("no {scope} position at index {index} (have {len})")]
    IndexOutOfRange { scope: Scope, index: usize, len: usize },
    #[error("position {0} is tracked from an address and is read-only")]
    ReadOnly(CreatedKey),
    #[error("a position created at {0} already exists")]
    DuplicateKey(CreatedKey),
}

/// The two disjoint, ordered position collections.
///
/// `open` is in insertion order (restores go to the front); `closed` is
/// most-recently-closed first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    open: Vec<Position>,
    closed: Vec<Position>,
}

impl Book {
    pub fn new(open: Vec<Position>, closed: Vec<Position>) -> Self {
        Self { open, closed }
    }

    pub fn open(&self) -> &[Position] {
        &self.open
    }

    pub fn closed(&self) -> &[Position] {
        &self.closed
    }

    pub fn scope(&self, scope: Scope) -> &[Position] {
        match scope {
            Scope::Open => &self.open,
            Scope::Closed => &self.closed,
        }
    }

    /// Open followed by closed.
    pub fn all(&self) -> Vec<Position> {
        self.open.iter().chain(self.closed.iter()).cloned().collect()
    }

    pub fn contains_key(&self, key: &CreatedKey) -> bool {
        self.open
            .iter()
            .chain(self.closed.iter())
            .any(|p| &p.created == key)
    }

    pub fn to_backup(&self) -> Backup {
        Backup::new(self.open.clone(), self.closed.clone())
    }

    /// Append a new position to `open`.
    pub fn add(&mut self, position: Position) -> Result<SyncOp, LifecycleError> {
        if self.contains_key(&position.created) {
            return Err(LifecycleError::DuplicateKey(position.created));
        }
        self.open.push(position.clone());
        Ok(SyncOp::Create(position))
    }

    /// Replace the open position at `index` wholesale.
    ///
    /// `created` is taken from `position`; changing it re-keys the record.
    pub fn edit(&mut self, index: usize, position: Position) -> Result<SyncOp, LifecycleError> {
        let existing = self.mutable_open(index)?;
        let previous_key = existing.created.clone();

        if position.created != previous_key && self.contains_key(&position.created) {
            return Err(LifecycleError::DuplicateKey(position.created));
        }

        self.open[index] = position.clone();
        Ok(SyncOp::Update {
            key: previous_key,
            position,
        })
    }

    /// Overwrite one of current/collected/uncollected on the open position at `index`.
    pub fn inline_edit(
        &mut self,
        index: usize,
        field: InlineField,
        value: Decimal,
    ) -> Result<SyncOp, LifecycleError> {
        let position = self.mutable_open(index)?;
        field.apply(position, value);
        Ok(SyncOp::Update {
            key: position.created.clone(),
            position: position.clone(),
        })
    }

    /// Key for a record created at `now`, pushed forward one millisecond at a
    /// time until no position in either collection uses it.
    pub fn fresh_key(&self, now: DateTime<Utc>) -> CreatedKey {
        let mut at = now;
        let mut key = CreatedKey::from_instant(at);
        while self.contains_key(&key) {
            at += Duration::milliseconds(1);
            key = CreatedKey::from_instant(at);
        }
        key
    }

    /// Append a copy of the open position at `index`, keyed by `fresh_key(now)`.
    pub fn duplicate(&mut self, index: usize, now: DateTime<Utc>) -> Result<SyncOp, LifecycleError> {
        let source = self.mutable_open(index)?.clone();
        let copy = Position {
            created: self.fresh_key(now),
            ..source
        };
        self.open.push(copy.clone());
        Ok(SyncOp::Create(copy))
    }

    /// Move the open position at `index` to the front of `closed`.
    ///
    /// The record always leaves `open`; it is only inserted into `closed` if no
    /// closed position already carries its key.
    pub fn close(&mut self, index: usize) -> Result<SyncOp, LifecycleError> {
        let key = self.mutable_open(index)?.created.clone();
        let position = self.open.remove(index);
        if !self.closed.iter().any(|p| p.created == key) {
            self.closed.insert(0, position);
        }
        Ok(SyncOp::SetClosed { key, closed: true })
    }

    /// Move the closed position at `index` to the front of `open`.
    pub fn restore(&mut self, index: usize) -> Result<SyncOp, LifecycleError> {
        check_index(Scope::Closed, index, self.closed.len())?;
        let position = self.closed.remove(index);
        let key = position.created.clone();
        if !self.open.iter().any(|p| p.created == key) {
            self.open.insert(0, position);
        }
        Ok(SyncOp::SetClosed { key, closed: false })
    }

    /// Delete the position at `index` in `scope`. Tracked positions may be removed.
    pub fn remove(&mut self, scope: Scope, index: usize) -> Result<SyncOp, LifecycleError> {
        let list = match scope {
            Scope::Open => &mut self.open,
            Scope::Closed => &mut self.closed,
        };
        check_index(scope, index, list.len())?;
        let removed = list.remove(index);
        Ok(SyncOp::Delete(removed.created))
    }

    /// Replace both collections, as on import.
    pub fn replace_all(&mut self, backup: Backup) -> SyncOp {
        self.open = backup.positions;
        self.closed = backup.closed_positions;
        SyncOp::BulkReplace {
            open: self.open.clone(),
            closed: self.closed.clone(),
        }
    }

    /// Open position at `index`, rejecting tracked records.
    fn mutable_open(&mut self, index: usize) -> Result<&mut Position, LifecycleError> {
        check_index(Scope::Open, index, self.open.len())?;
        let position = &mut self.open[index];
        if position.is_tracked {
            return Err(LifecycleError::ReadOnly(position.created.clone()));
        }
        Ok(position)
    }
}

fn check_index(scope: Scope, index: usize, len: usize) -> Result<(), LifecycleError> {
    if index >= len {
        return Err(LifecycleError::IndexOutOfRange { scope, index, len });
    }
    Ok(())
}
