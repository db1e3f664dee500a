//! End-to-end rollup tests against a SQLite database file.
//!
//! Run with: cargo test --test rollup_sqlite --features sqlite
//!
//! Facts enter through the ingestion gateway or straight through the fact
//! store, and the derived tables are checked through the engine and the
//! reporting reader.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tempfile::TempDir;

use sales_rollup::config::{RollupConfig, RetryConfig, SqliteConfig, StorageConfig, StorageType};
use sales_rollup::ingestion::{FactBatch, IngestionGateway};
use sales_rollup::model::{Sale, SaleDetail, YearMonth};
use sales_rollup::reporting::ReportingReader;
use sales_rollup::rollup::RollupEngine;
use sales_rollup::storage::{init_storage, Storage};

struct Harness {
    storage: Storage,
    engine: Arc<RollupEngine>,
    gateway: IngestionGateway,
    reader: ReportingReader,
}

fn storage_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        storage_type: StorageType::Sqlite,
        sqlite: SqliteConfig {
            path: dir
                .path()
                .join("restaurant_sales.db")
                .to_string_lossy()
                .into_owned(),
            max_connections: 4,
        },
    }
}

async fn open(dir: &TempDir) -> Harness {
    let storage = init_storage(&storage_config(dir))
        .await
        .expect("Failed to open SQLite storage");
    let config = RollupConfig {
        checkpoint_batch_size: 2,
        retry: RetryConfig::none(),
        ..Default::default()
    };
    let engine = Arc::new(RollupEngine::from_storage(&storage, config));
    let gateway = IngestionGateway::new(storage.facts.clone(), engine.clone());
    let reader = ReportingReader::new(storage.summaries.clone());
    Harness {
        storage,
        engine,
        gateway,
        reader,
    }
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn ym(s: &str) -> YearMonth {
    s.parse().unwrap()
}

#[allow(clippy::too_many_arguments)]
fn line(
    receipt: &str,
    number: u32,
    when: &str,
    code: i64,
    name: &str,
    category: &str,
    qty: f64,
    charged: f64,
) -> SaleDetail {
    let mut detail = SaleDetail::new(receipt, number, at(when), code);
    detail.menu_name = Some(name.to_string());
    detail.category = Some(category.to_string());
    detail.quantity = qty;
    detail.price_per_unit = 60.0;
    detail.summary_price = charged;
    detail.with_derived_amounts()
}

fn receipt(number: &str, when: &str, lines: Vec<SaleDetail>) -> FactBatch {
    FactBatch {
        sales: vec![Sale::new(number, at(when))],
        details: lines,
    }
}

#[tokio::test]
async fn test_ingest_populates_both_tables() {
    let dir = TempDir::new().unwrap();
    let h = open(&dir).await;

    h.gateway
        .submit(receipt(
            "R1",
            "2024-03-05 12:00:00",
            vec![
                line("R1", 1, "2024-03-05 12:00:00", 101, "Pad Thai", "Noodles", 2.0, 110.0),
                line("R1", 2, "2024-03-05 12:00:00", 202, "Thai Tea", "Drinks", 1.0, 60.0),
            ],
        ))
        .await
        .unwrap();
    h.gateway
        .submit(receipt(
            "R2",
            "2024-04-01 18:30:00",
            vec![line("R2", 1, "2024-04-01 18:30:00", 101, "Pad Thai", "Noodles", 1.0, 60.0)],
        ))
        .await
        .unwrap();

    let pad_thai = h.engine.get_menu_summary(101).await.unwrap().unwrap();
    assert_eq!(pad_thai.total_quantity, 3.0);
    assert_eq!(pad_thai.total_revenue, 180.0);
    assert_eq!(pad_thai.total_discount, 10.0);
    assert_eq!(pad_thai.times_ordered, 2);

    let march = h
        .engine
        .get_monthly_summary(ym("2024-03"), 101)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(march.quantity, 2.0);
    assert_eq!(march.orders, 1);
    assert!(h
        .engine
        .get_monthly_summary(ym("2024-04"), 202)
        .await
        .unwrap()
        .is_none());

    assert!(h.engine.verify().await.unwrap().is_empty());

    let top = h.reader.top_items(1).await.unwrap();
    assert_eq!(top[0].menu_code, 101);
    assert_eq!(
        h.reader.categories().await.unwrap(),
        vec!["Drinks".to_string(), "Noodles".to_string()]
    );
}

#[tokio::test]
async fn test_correction_moves_line_between_months() {
    let dir = TempDir::new().unwrap();
    let h = open(&dir).await;

    h.gateway
        .submit(receipt(
            "R1",
            "2024-01-31 23:30:00",
            vec![line("R1", 1, "2024-01-31 23:30:00", 7, "Som Tam", "Salads", 1.0, 60.0)],
        ))
        .await
        .unwrap();

    let report = h
        .gateway
        .submit(receipt(
            "R1",
            "2024-02-01 00:10:00",
            vec![line("R1", 1, "2024-02-01 00:10:00", 7, "Som Tam", "Salads", 1.0, 60.0)],
        ))
        .await
        .unwrap();

    assert_eq!(report.rollup.monthly_deleted, 1);
    assert!(h
        .engine
        .get_monthly_summary(ym("2024-01"), 7)
        .await
        .unwrap()
        .is_none());
    assert!(h
        .engine
        .get_monthly_summary(ym("2024-02"), 7)
        .await
        .unwrap()
        .is_some());
    assert!(h.engine.verify().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_removing_last_line_deletes_menu_rows() {
    let dir = TempDir::new().unwrap();
    let h = open(&dir).await;

    h.gateway
        .submit(receipt(
            "R1",
            "2024-06-01 12:00:00",
            vec![line("R1", 1, "2024-06-01 12:00:00", 55, "Larb", "Salads", 1.0, 60.0)],
        ))
        .await
        .unwrap();

    let displaced = h
        .storage
        .facts
        .replace_receipt_details("R1", &[])
        .await
        .unwrap();
    let result = h
        .engine
        .ingest_correction(&[], &[], &displaced)
        .await
        .unwrap();

    assert_eq!(result.menu_deleted, 1);
    assert_eq!(result.monthly_deleted, 1);
    assert!(h.engine.get_menu_summary(55).await.unwrap().is_none());
    assert!(h.reader.monthly_trends(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catch_up_applies_direct_fact_writes() {
    let dir = TempDir::new().unwrap();
    let h = open(&dir).await;

    // Facts written without going through the engine.
    let sales: Vec<Sale> = (1..=3)
        .map(|i| Sale::new(format!("R{}", i), at("2024-05-10 12:00:00")))
        .collect();
    h.storage.facts.upsert_sales(&sales).await.unwrap();
    for (i, code) in [(1, 11), (2, 12), (3, 11)] {
        let number = format!("R{}", i);
        let details = vec![line(&number, 1, "2024-05-10 12:00:00", code, "Item", "Mains", 1.0, 60.0)];
        h.storage
            .facts
            .replace_receipt_details(&number, &details)
            .await
            .unwrap();
    }
    assert_eq!(h.engine.verify().await.unwrap().len(), 4, "two menu and two monthly rows missing");

    let result = h.engine.catch_up().await.unwrap();
    assert!(result.menu_updated >= 2);
    assert!(h.engine.verify().await.unwrap().is_empty());
    assert_eq!(
        h.engine.get_menu_summary(11).await.unwrap().unwrap().times_ordered,
        2
    );

    let again = h.engine.catch_up().await.unwrap();
    assert_eq!(again.rows_changed(), 0, "position should be at the log head");
}

#[tokio::test]
async fn test_state_survives_reopen_and_recompute() {
    let dir = TempDir::new().unwrap();

    let before = {
        let h = open(&dir).await;
        for (number, when, qty) in [
            ("R1", "2023-12-31 22:00:00", 1.0),
            ("R2", "2024-01-01 10:00:00", 2.0),
            ("R3", "2024-01-15 10:00:00", 0.5),
        ] {
            h.gateway
                .submit(receipt(
                    number,
                    when,
                    vec![line(number, 1, when, 301, "Mango Sticky Rice", "Desserts", qty, qty * 55.0)],
                ))
                .await
                .unwrap();
        }
        h.reader.monthly_trends(Some("Desserts")).await.unwrap()
    };
    assert_eq!(before.len(), 2);

    let h = open(&dir).await;
    h.engine.recompute_all().await.unwrap();
    let after = h.reader.monthly_trends(Some("Desserts")).await.unwrap();

    assert_eq!(after, before, "full recompute should match the incremental state");
    let menu = h.engine.get_menu_summary(301).await.unwrap().unwrap();
    assert_eq!(menu.total_quantity, 3.5);
    assert_eq!(menu.times_ordered, 3);
}

#[tokio::test]
async fn test_concurrent_submits_same_menu_code() {
    let dir = TempDir::new().unwrap();
    let h = open(&dir).await;

    let first = h.gateway.submit(receipt(
        "R1",
        "2024-07-01 12:00:00",
        vec![line("R1", 1, "2024-07-01 12:00:00", 9, "Khao Soi", "Noodles", 1.0, 60.0)],
    ));
    let second = h.gateway.submit(receipt(
        "R2",
        "2024-07-02 12:00:00",
        vec![line("R2", 1, "2024-07-02 12:00:00", 9, "Khao Soi", "Noodles", 2.0, 120.0)],
    ));
    let (a, b) = tokio::join!(first, second);
    a.unwrap();
    b.unwrap();

    let menu = h.engine.get_menu_summary(9).await.unwrap().unwrap();
    assert_eq!(menu.total_quantity, 3.0);
    assert_eq!(menu.times_ordered, 2);
    assert!(h.engine.verify().await.unwrap().is_empty());
}
