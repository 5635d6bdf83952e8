//! Backup interchange format: `{ "positions": [...], "closedPositions": [...] }`.

use crate::domain::Position;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;

/// Full export of both lifecycle collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub positions: Vec<Position>,
    pub closed_positions: Vec<Position>,
}

#[derive(Debug, Error)]
pub enum BackupError {
    /// Payload is not JSON, lacks one of the two arrays, holds malformed records,
    /// or reuses a `created` key.
    #[error("Invalid or corrupted file: {0}")]
    InvalidFile(String),
    #[error("Failed to serialize backup: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Backup {
    pub fn new(positions: Vec<Position>, closed_positions: Vec<Position>) -> Self {
        Self {
            positions,
            closed_positions,
        }
    }

    /// Parse and validate an uploaded backup.
    ///
    /// Both `positions` and `closedPositions` must be present and be arrays;
    /// empty arrays are fine. `created` must be unique across both arrays.
    ///
    /// # Errors
    /// Returns `BackupError::InvalidFile` for anything else.
    pub fn parse(raw: &str) -> Result<Self, BackupError> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| BackupError::InvalidFile(format!("not valid JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| BackupError::InvalidFile("expected a JSON object".to_string()))?;

        for key in ["positions", "closedPositions"] {
            match object.get(key) {
                Some(serde_json::Value::Array(_)) => {}
                Some(_) => {
                    return Err(BackupError::InvalidFile(format!("{} must be an array", key)))
                }
                None => return Err(BackupError::InvalidFile(format!("missing {}", key))),
            }
        }

        let backup: Backup = serde_json::from_value(value)
            .map_err(|e| BackupError::InvalidFile(format!("malformed position: {}", e)))?;
        backup.check_unique_keys()?;
        Ok(backup)
    }

    fn check_unique_keys(&self) -> Result<(), BackupError> {
        let mut seen = HashSet::with_capacity(self.len());
        for position in self.positions.iter().chain(&self.closed_positions) {
            if !seen.insert(&position.created) {
                return Err(BackupError::InvalidFile(format!(
                    "duplicate created key {}",
                    position.created
                )));
            }
        }
        Ok(())
    }

    /// Pretty JSON, two-space indented.
    pub fn to_json_pretty(&self) -> Result<String, BackupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Hex SHA-256 of the serialized form, used as an HTTP entity tag.
    pub fn digest(serialized: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn len(&self) -> usize {
        self.positions.len() + self.closed_positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
