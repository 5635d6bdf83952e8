use chrono::{TimeZone, Utc};
use pooldash::domain::{Backup, BackupError, CreatedKey, Decimal, InlineField, Position, Scope};
use pooldash::engine::{Book, LifecycleError, SyncOp};

fn position(pool: &str, created: &str) -> Position {
    let mut p = Position::new(pool, CreatedKey::new(created));
    p.invested = Decimal::from_i64(1000);
    p.current = Decimal::from_i64(1050);
    p.collected = Decimal::from_i64(20);
    p.uncollected = Decimal::from_i64(5);
    p
}

fn pools(positions: &[Position]) -> Vec<&str> {
    positions.iter().map(|p| p.pool.as_str()).collect()
}

#[test]
fn test_close_then_restore_round_trip() {
    let mut book = Book::default();
    book.add(position("ETH/USDC", "2025-01-01T00:00:00.000Z")).unwrap();
    let before = book.open()[0].clone();

    book.close(0).unwrap();
    assert!(book.open().is_empty());
    assert_eq!(book.closed(), &[before.clone()]);

    book.restore(0).unwrap();
    assert_eq!(book.open(), &[before]);
    assert!(book.closed().is_empty());
}

#[test]
fn test_close_prepends_and_restore_prepends() {
    let mut book = Book::new(
        vec![
            position("A", "2025-01-01"),
            position("B", "2025-01-02"),
            position("C", "2025-01-03"),
        ],
        vec![],
    );

    book.close(0).unwrap();
    book.close(1).unwrap();
    assert_eq!(pools(book.open()), vec!["B"]);
    assert_eq!(pools(book.closed()), vec!["C", "A"]);

    book.restore(1).unwrap();
    assert_eq!(pools(book.open()), vec!["A", "B"]);
    assert_eq!(pools(book.closed()), vec!["C"]);
}

#[test]
fn test_collections_stay_disjoint() {
    let mut book = Book::new(vec![position("A", "k1")], vec![position("A", "k1")]);

    let op = book.close(0).unwrap();
    assert_eq!(op, SyncOp::SetClosed { key: CreatedKey::new("k1"), closed: true });
    assert!(book.open().is_empty());
    assert_eq!(book.closed().len(), 1);
}

#[test]
fn test_duplicate_differs_only_in_created() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
    let mut book = Book::new(vec![position("ETH/USDC", "2025-01-01")], vec![]);

    book.duplicate(0, now).unwrap();
    book.duplicate(0, now).unwrap();

    let open = book.open();
    assert_eq!(open.len(), 3);
    assert_eq!(open[0].created.as_str(), "2025-01-01");
    assert_eq!(open[1].created.as_str(), "2025-03-01T09:30:00.000Z");
    assert_eq!(open[2].created.as_str(), "2025-03-01T09:30:00.001Z");
    for copy in &open[1..] {
        let normalized = Position {
            created: open[0].created.clone(),
            ..copy.clone()
        };
        assert_eq!(normalized, open[0]);
    }
}

#[test]
fn test_tracked_positions_are_read_only_but_removable() {
    let mut tracked = position("WBTC/ETH", "2025-02-01");
    tracked.is_tracked = true;
    let mut book = Book::new(vec![tracked], vec![]);

    assert!(matches!(book.edit(0, position("X", "2025-02-01")), Err(LifecycleError::ReadOnly(_))));
    assert!(matches!(
        book.inline_edit(0, InlineField::Current, Decimal::from_i64(1)),
        Err(LifecycleError::ReadOnly(_))
    ));
    assert!(matches!(book.duplicate(0, Utc::now()), Err(LifecycleError::ReadOnly(_))));
    assert_eq!(book.open()[0].pool, "WBTC/ETH");

    let op = book.remove(Scope::Open, 0).unwrap();
    assert_eq!(op, SyncOp::Delete(CreatedKey::new("2025-02-01")));
    assert!(book.open().is_empty());
}

#[test]
fn test_out_of_range_index() {
    let mut book = Book::default();
    assert_eq!(
        book.close(0),
        Err(LifecycleError::IndexOutOfRange { scope: Scope::Open, index: 0, len: 0 })
    );
    assert!(matches!(book.restore(2), Err(LifecycleError::IndexOutOfRange { .. })));
    assert!(matches!(book.remove(Scope::Closed, 0), Err(LifecycleError::IndexOutOfRange { .. })));
}

#[test]
fn test_import_accepts_empty_arrays() {
    let backup = Backup::parse(r#"{"positions": [], "closedPositions": []}"#).unwrap();
    let mut book = Book::new(vec![position("A", "1")], vec![]);

    let op = book.replace_all(backup);
    assert_eq!(op, SyncOp::BulkReplace { open: vec![], closed: vec![] });
    assert!(book.open().is_empty());
}

#[test]
fn test_import_rejects_missing_closed_positions() {
    let book = Book::new(vec![position("A", "1")], vec![]);
    let before = book.clone();

    let result = Backup::parse(r#"{"positions": []}"#);
    assert!(matches!(result, Err(BackupError::InvalidFile(_))));
    // Nothing was applied, so the book is untouched.
    assert_eq!(book, before);

    assert!(Backup::parse(r#"{"positions": {}, "closedPositions": []}"#).is_err());
    assert!(Backup::parse("not json").is_err());
}

#[test]
fn test_export_then_import_restores_book() {
    let book = Book::new(
        vec![position("A", "2025-01-01"), position("B", "2025-01-02")],
        vec![position("Z", "2024-12-01")],
    );
    let exported = book.to_backup().to_json_pretty().unwrap();

    let mut restored = Book::default();
    restored.replace_all(Backup::parse(&exported).unwrap());
    assert_eq!(restored, book);
}
