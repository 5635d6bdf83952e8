//! SQLite implementation of [`PositionRepository`].

use super::{PositionRepository, RepoError};
use crate::domain::{CreatedKey, Decimal, Position, Scope};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;
use tracing::{debug, warn};

const SELECT_COLUMNS: &str = r#"
    SELECT created, pool, network, dex, invested, current, collected, uncollected,
           range_min, range_max, entry_price, current_price,
           is_tracked, is_simulated, notes, pool_url
    FROM positions
"#;

/// Positions stored in the `positions` table.
///
/// Both collections live in one table, split by `is_closed` and ordered by
/// `sort_key` ascending.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    async fn insert_row(
        tx: &mut Transaction<'_, Sqlite>,
        position: &Position,
        closed: bool,
        sort_key: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO positions (
                created, pool, network, dex, invested, current, collected, uncollected,
                range_min, range_max, entry_price, current_price,
                is_tracked, is_simulated, notes, pool_url, is_closed, sort_key
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(position.created.as_str())
        .bind(&position.pool)
        .bind(&position.network)
        .bind(&position.dex)
        .bind(position.invested.to_canonical_string())
        .bind(position.current.to_canonical_string())
        .bind(position.collected.to_canonical_string())
        .bind(position.uncollected.to_canonical_string())
        .bind(position.range_min.map(|d| d.to_canonical_string()))
        .bind(position.range_max.map(|d| d.to_canonical_string()))
        .bind(position.entry_price.map(|d| d.to_canonical_string()))
        .bind(position.current_price.map(|d| d.to_canonical_string()))
        .bind(position.is_tracked)
        .bind(position.is_simulated)
        .bind(position.notes.as_deref())
        .bind(position.pool_url.as_deref())
        .bind(closed)
        .bind(sort_key)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PositionRepository for Repository {
    async fn list(&self, scope: Scope) -> Result<Vec<Position>, RepoError> {
        let sql = format!("{} WHERE is_closed = ? ORDER BY sort_key ASC, id ASC", SELECT_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(scope == Scope::Closed)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_position).collect())
    }

    async fn create(&self, position: &Position) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        let (next,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(sort_key), 0) + 1 FROM positions WHERE is_closed = 0",
        )
        .fetch_one(&mut *tx)
        .await?;
        Self::insert_row(&mut tx, position, false, next).await?;
        tx.commit().await?;

        debug!(created = %position.created, "Inserted position");
        Ok(())
    }

    async fn update(&self, key: &CreatedKey, position: &Position) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE positions SET
                created = ?, pool = ?, network = ?, dex = ?,
                invested = ?, current = ?, collected = ?, uncollected = ?,
                range_min = ?, range_max = ?, entry_price = ?, current_price = ?,
                is_tracked = ?, is_simulated = ?, notes = ?, pool_url = ?
            WHERE created = ?
            "#,
        )
        .bind(position.created.as_str())
        .bind(&position.pool)
        .bind(&position.network)
        .bind(&position.dex)
        .bind(position.invested.to_canonical_string())
        .bind(position.current.to_canonical_string())
        .bind(position.collected.to_canonical_string())
        .bind(position.uncollected.to_canonical_string())
        .bind(position.range_min.map(|d| d.to_canonical_string()))
        .bind(position.range_max.map(|d| d.to_canonical_string()))
        .bind(position.entry_price.map(|d| d.to_canonical_string()))
        .bind(position.current_price.map(|d| d.to_canonical_string()))
        .bind(position.is_tracked)
        .bind(position.is_simulated)
        .bind(position.notes.as_deref())
        .bind(position.pool_url.as_deref())
        .bind(key.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(key.clone()));
        }
        Ok(())
    }

    async fn delete(&self, key: &CreatedKey) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM positions WHERE created = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(key.clone()));
        }
        Ok(())
    }

    async fn set_closed(&self, key: &CreatedKey, closed: bool) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE positions SET
                is_closed = ?,
                sort_key = (SELECT COALESCE(MIN(sort_key), 0) - 1 FROM positions WHERE is_closed = ?)
            WHERE created = ?
            "#,
        )
        .bind(closed)
        .bind(closed)
        .bind(key.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(key.clone()));
        }
        Ok(())
    }

    async fn bulk_replace(&self, open: &[Position], closed: &[Position]) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM positions").execute(&mut *tx).await?;

        for (i, position) in open.iter().enumerate() {
            Self::insert_row(&mut tx, position, false, i as i64).await?;
        }
        for (i, position) in closed.iter().enumerate() {
            Self::insert_row(&mut tx, position, true, i as i64).await?;
        }
        tx.commit().await?;

        debug!(open = open.len(), closed = closed.len(), "Replaced all positions");
        Ok(())
    }
}

fn parse_decimal(row: &SqliteRow, column: &str) -> Decimal {
    let raw: String = row.get(column);
    Decimal::from_str(&raw).unwrap_or_else(|_| {
        warn!(column, value = %raw, "Unparseable decimal in positions table, using 0");
        Decimal::default()
    })
}

fn parse_optional_decimal(row: &SqliteRow, column: &str) -> Option<Decimal> {
    let raw: Option<String> = row.get(column);
    raw.and_then(|s| Decimal::from_str(&s).ok())
}

fn row_to_position(row: &SqliteRow) -> Position {
    Position {
        pool: row.get("pool"),
        network: row.get("network"),
        dex: row.get("dex"),
        invested: parse_decimal(row, "invested"),
        current: parse_decimal(row, "current"),
        collected: parse_decimal(row, "collected"),
        uncollected: parse_decimal(row, "uncollected"),
        range_min: parse_optional_decimal(row, "range_min"),
        range_max: parse_optional_decimal(row, "range_max"),
        entry_price: parse_optional_decimal(row, "entry_price"),
        current_price: parse_optional_decimal(row, "current_price"),
        created: CreatedKey::new(row.get::<String, _>("created")),
        is_tracked: row.get("is_tracked"),
        is_simulated: row.get("is_simulated"),
        notes: row.get("notes"),
        pool_url: row.get("pool_url"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(db_path.to_str().unwrap())
            .await
            .expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn position(pool: &str, created: &str) -> Position {
        let mut p = Position::new(pool, CreatedKey::new(created));
        p.invested = Decimal::from_str("1000").unwrap();
        p.current = Decimal::from_str("1050.25").unwrap();
        p.collected = Decimal::from_str("12.5").unwrap();
        p
    }

    fn pools(positions: &[Position]) -> Vec<&str> {
        positions.iter().map(|p| p.pool.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_and_list_preserves_fields() {
        let (repo, _temp) = setup_test_db().await;

        let mut p = position("ETH/USDC", "2025-01-01T00:00:00.000Z");
        p.range_min = Some(Decimal::from_i64(1800));
        p.notes = Some("wide range".to_string());
        p.is_tracked = true;
        repo.create(&p).await.expect("create failed");

        let open = repo.list(Scope::Open).await.expect("list failed");
        assert_eq!(open, vec![p]);
        assert!(repo.list(Scope::Closed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_appends_in_order() {
        let (repo, _temp) = setup_test_db().await;

        repo.create(&position("A", "2025-01-01")).await.unwrap();
        repo.create(&position("B", "2025-01-02")).await.unwrap();
        repo.create(&position("C", "2025-01-03")).await.unwrap();

        let open = repo.list(Scope::Open).await.unwrap();
        assert_eq!(pools(&open), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_duplicate_created_rejected() {
        let (repo, _temp) = setup_test_db().await;

        repo.create(&position("A", "2025-01-01")).await.unwrap();
        let result = repo.create(&position("B", "2025-01-01")).await;
        assert!(matches!(result, Err(RepoError::Db(_))));
    }

    #[tokio::test]
    async fn test_update_by_previous_key() {
        let (repo, _temp) = setup_test_db().await;

        repo.create(&position("A", "2025-01-01")).await.unwrap();
        let edited = position("A2", "2025-02-01");
        repo.update(&CreatedKey::new("2025-01-01"), &edited)
            .await
            .expect("update failed");

        let open = repo.list(Scope::Open).await.unwrap();
        assert_eq!(open, vec![edited]);

        let missing = repo.update(&CreatedKey::new("1999-01-01"), &position("X", "1999-01-01")).await;
        assert!(matches!(missing, Err(RepoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_closed_moves_to_front() {
        let (repo, _temp) = setup_test_db().await;

        for (pool, created) in [("A", "2025-01-01"), ("B", "2025-01-02"), ("C", "2025-01-03")] {
            repo.create(&position(pool, created)).await.unwrap();
        }

        repo.set_closed(&CreatedKey::new("2025-01-01"), true).await.unwrap();
        repo.set_closed(&CreatedKey::new("2025-01-03"), true).await.unwrap();
        assert_eq!(pools(&repo.list(Scope::Closed).await.unwrap()), vec!["C", "A"]);
        assert_eq!(pools(&repo.list(Scope::Open).await.unwrap()), vec!["B"]);

        repo.set_closed(&CreatedKey::new("2025-01-01"), false).await.unwrap();
        assert_eq!(pools(&repo.list(Scope::Open).await.unwrap()), vec!["A", "B"]);
        assert_eq!(pools(&repo.list(Scope::Closed).await.unwrap()), vec!["C"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let (repo, _temp) = setup_test_db().await;

        repo.create(&position("A", "2025-01-01")).await.unwrap();
        repo.delete(&CreatedKey::new("2025-01-01")).await.unwrap();
        assert!(repo.list(Scope::Open).await.unwrap().is_empty());

        let again = repo.delete(&CreatedKey::new("2025-01-01")).await;
        assert!(matches!(again, Err(RepoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_bulk_replace() {
        let (repo, _temp) = setup_test_db().await;

        repo.create(&position("Old", "2024-01-01")).await.unwrap();
        let open = vec![position("B", "2025-01-02"), position("A", "2025-01-01")];
        let closed = vec![position("Z", "2025-03-01")];
        repo.bulk_replace(&open, &closed).await.expect("bulk_replace failed");

        assert_eq!(pools(&repo.list(Scope::Open).await.unwrap()), vec!["B", "A"]);
        assert_eq!(pools(&repo.list(Scope::Closed).await.unwrap()), vec!["Z"]);

        repo.bulk_replace(&[], &[]).await.unwrap();
        assert!(repo.list(Scope::Open).await.unwrap().is_empty());
    }
}
