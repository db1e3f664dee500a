//! FactStore interface tests.
//!
//! These tests verify the contract of the FactStore trait.
//! Each storage implementation should run these tests.
//!
//! Every test writes its own receipts and menu codes so that tests can share
//! one store without seeing each other's rows.

use chrono::NaiveDateTime;

use sales_rollup::model::{MonthlyKey, Sale, SaleDetail};
use sales_rollup::storage::FactStore;

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("valid datetime")
}

/// Create a receipt with a payment type.
pub fn make_sale(receipt: &str, datetime: &str) -> Sale {
    let mut sale = Sale::new(receipt, at(datetime));
    sale.payment_type = Some("Cash".to_string());
    sale.summary_price = Some(100.0);
    sale
}

/// Create a line item with derived amounts filled in.
pub fn make_detail(receipt: &str, line: u32, datetime: &str, code: i64, qty: f64) -> SaleDetail {
    let mut detail = SaleDetail::new(receipt, line, at(datetime), code);
    detail.menu_name = Some(format!("Item {}", code));
    detail.category = Some("Mains".to_string());
    detail.quantity = qty;
    detail.price_per_unit = 25.0;
    detail.summary_price = qty * 25.0 - 5.0;
    detail.with_derived_amounts()
}

fn month(key: &str, code: i64) -> MonthlyKey {
    MonthlyKey::new(key.parse().expect("valid month"), code)
}

// =============================================================================
// FactStore::upsert_sales tests
// =============================================================================

pub async fn test_upsert_and_get_sale<S: FactStore>(store: &S) {
    let sale = make_sale("test_fs_sale_1", "2024-03-05 12:30:00");

    store
        .upsert_sales(std::slice::from_ref(&sale))
        .await
        .expect("upsert should succeed");

    let stored = store
        .get_sale("test_fs_sale_1")
        .await
        .expect("get should succeed")
        .expect("sale should exist");
    assert_eq!(stored, sale, "stored sale should match");
}

pub async fn test_get_sale_nonexistent<S: FactStore>(store: &S) {
    let stored = store.get_sale("test_fs_missing").await.unwrap();
    assert!(stored.is_none(), "missing sale should be None");
}

pub async fn test_upsert_replaces_sale<S: FactStore>(store: &S) {
    let mut sale = make_sale("test_fs_sale_2", "2024-03-05 12:30:00");
    store.upsert_sales(std::slice::from_ref(&sale)).await.unwrap();

    sale.payment_type = Some("Card".to_string());
    sale.branch = Some("Silom".to_string());
    store.upsert_sales(std::slice::from_ref(&sale)).await.unwrap();

    let stored = store.get_sale("test_fs_sale_2").await.unwrap().unwrap();
    assert_eq!(stored.payment_type.as_deref(), Some("Card"));
    assert_eq!(stored.branch.as_deref(), Some("Silom"));
}

pub async fn test_existing_receipts<S: FactStore>(store: &S) {
    store
        .upsert_sales(&[
            make_sale("test_fs_exist_a", "2024-01-01 10:00:00"),
            make_sale("test_fs_exist_b", "2024-01-01 11:00:00"),
        ])
        .await
        .unwrap();

    let found = store
        .existing_receipts(&[
            "test_fs_exist_a".to_string(),
            "test_fs_exist_b".to_string(),
            "test_fs_exist_c".to_string(),
        ])
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert!(found.contains("test_fs_exist_a"));
    assert!(found.contains("test_fs_exist_b"));
    assert!(!found.contains("test_fs_exist_c"));
}

pub async fn test_existing_receipts_empty_input<S: FactStore>(store: &S) {
    let found = store.existing_receipts(&[]).await.unwrap();
    assert!(found.is_empty());
}

// =============================================================================
// FactStore::replace_receipt_details tests
// =============================================================================

pub async fn test_replace_details_first_write<S: FactStore>(store: &S) {
    let receipt = "test_fs_lines_1";
    store
        .upsert_sales(&[make_sale(receipt, "2024-03-05 12:00:00")])
        .await
        .unwrap();

    let details = vec![
        make_detail(receipt, 1, "2024-03-05 12:00:00", 9101, 2.0),
        make_detail(receipt, 2, "2024-03-05 12:00:00", 9102, 1.0),
    ];
    let displaced = store
        .replace_receipt_details(receipt, &details)
        .await
        .expect("replace should succeed");

    assert!(displaced.is_empty(), "nothing to displace on first write");
    let stored = store.details_for_receipt(receipt).await.unwrap();
    assert_eq!(stored, details, "stored lines should match, by line number");
}

pub async fn test_replace_details_returns_displaced<S: FactStore>(store: &S) {
    let receipt = "test_fs_lines_2";
    store
        .upsert_sales(&[make_sale(receipt, "2024-03-05 12:00:00")])
        .await
        .unwrap();

    let first = vec![
        make_detail(receipt, 1, "2024-03-05 12:00:00", 9201, 2.0),
        make_detail(receipt, 2, "2024-03-05 12:00:00", 9202, 1.0),
    ];
    store.replace_receipt_details(receipt, &first).await.unwrap();

    let second = vec![make_detail(receipt, 1, "2024-03-05 12:00:00", 9201, 3.0)];
    let displaced = store.replace_receipt_details(receipt, &second).await.unwrap();

    assert_eq!(displaced, first, "previous lines should be returned");
    let stored = store.details_for_receipt(receipt).await.unwrap();
    assert_eq!(stored, second, "only the new lines should remain");
}

pub async fn test_replace_details_with_empty_clears<S: FactStore>(store: &S) {
    let receipt = "test_fs_lines_3";
    store
        .upsert_sales(&[make_sale(receipt, "2024-03-05 12:00:00")])
        .await
        .unwrap();
    store
        .replace_receipt_details(
            receipt,
            &[make_detail(receipt, 1, "2024-03-05 12:00:00", 9301, 1.0)],
        )
        .await
        .unwrap();

    let displaced = store.replace_receipt_details(receipt, &[]).await.unwrap();

    assert_eq!(displaced.len(), 1);
    assert!(store.details_for_receipt(receipt).await.unwrap().is_empty());
}

// =============================================================================
// Read tests
// =============================================================================

pub async fn test_details_for_menu_ordered<S: FactStore>(store: &S) {
    let code = 9401;
    for receipt in ["test_fs_menu_b", "test_fs_menu_a"] {
        store
            .upsert_sales(&[make_sale(receipt, "2024-04-01 09:00:00")])
            .await
            .unwrap();
    }
    store
        .replace_receipt_details(
            "test_fs_menu_b",
            &[make_detail("test_fs_menu_b", 1, "2024-04-01 09:00:00", code, 1.0)],
        )
        .await
        .unwrap();
    store
        .replace_receipt_details(
            "test_fs_menu_a",
            &[
                make_detail("test_fs_menu_a", 2, "2024-04-01 09:00:00", code, 1.0),
                make_detail("test_fs_menu_a", 1, "2024-04-01 09:00:00", 9402, 1.0),
                make_detail("test_fs_menu_a", 3, "2024-04-01 09:00:00", code, 1.0),
            ],
        )
        .await
        .unwrap();

    let lines: Vec<(String, u32)> = store
        .details_for_menu(code)
        .await
        .unwrap()
        .into_iter()
        .map(|d| (d.receipt_number, d.line_number))
        .collect();

    assert_eq!(
        lines,
        vec![
            ("test_fs_menu_a".to_string(), 2),
            ("test_fs_menu_a".to_string(), 3),
            ("test_fs_menu_b".to_string(), 1),
        ],
        "lines should be ordered by receipt then line"
    );
}

pub async fn test_all_details_and_keys<S: FactStore>(store: &S) {
    let receipt = "test_fs_keys";
    store
        .upsert_sales(&[make_sale(receipt, "2024-05-31 23:59:59")])
        .await
        .unwrap();
    store
        .replace_receipt_details(
            receipt,
            &[
                make_detail(receipt, 1, "2024-05-31 23:59:59", 9501, 1.0),
                make_detail(receipt, 2, "2024-06-01 00:00:00", 9501, 1.0),
            ],
        )
        .await
        .unwrap();

    let all = store.all_details().await.unwrap();
    assert!(all
        .iter()
        .any(|d| d.receipt_number == receipt && d.line_number == 2));
    let mut sorted = all.clone();
    sorted.sort_by(|a, b| {
        (a.receipt_number.as_str(), a.line_number).cmp(&(b.receipt_number.as_str(), b.line_number))
    });
    assert_eq!(all, sorted, "all_details should be ordered");

    let keys = store.detail_keys().await.unwrap();
    assert!(keys.contains(&month("2024-05", 9501)));
    assert!(keys.contains(&month("2024-06", 9501)));
}

// =============================================================================
// Change log tests
// =============================================================================

pub async fn test_replace_records_old_and_new_keys<S: FactStore>(store: &S) {
    let receipt = "test_fs_changes_1";
    store
        .upsert_sales(&[make_sale(receipt, "2024-07-10 12:00:00")])
        .await
        .unwrap();
    store
        .replace_receipt_details(
            receipt,
            &[make_detail(receipt, 1, "2024-07-10 12:00:00", 9601, 1.0)],
        )
        .await
        .unwrap();

    let before = store.latest_change().await.unwrap().unwrap_or(0);
    store
        .replace_receipt_details(
            receipt,
            &[make_detail(receipt, 1, "2024-07-10 12:00:00", 9602, 1.0)],
        )
        .await
        .unwrap();

    let changes = store.changes_since(before, 100).await.unwrap();
    let keys: Vec<MonthlyKey> = changes.iter().map(|c| c.key()).collect();
    assert_eq!(keys.len(), 2, "one change per distinct key");
    assert!(keys.contains(&month("2024-07", 9601)), "old key recorded");
    assert!(keys.contains(&month("2024-07", 9602)), "new key recorded");
    assert!(changes.iter().all(|c| c.receipt_number == receipt));
    assert!(changes.iter().all(|c| c.seq > before));
}

pub async fn test_sale_upsert_records_existing_lines<S: FactStore>(store: &S) {
    let receipt = "test_fs_changes_2";
    store
        .upsert_sales(&[make_sale(receipt, "2024-08-01 12:00:00")])
        .await
        .unwrap();
    store
        .replace_receipt_details(
            receipt,
            &[make_detail(receipt, 1, "2024-08-01 12:00:00", 9701, 1.0)],
        )
        .await
        .unwrap();

    let before = store.latest_change().await.unwrap().unwrap_or(0);
    store
        .upsert_sales(&[make_sale(receipt, "2024-08-01 12:00:00")])
        .await
        .unwrap();

    let changes = store.changes_since(before, 100).await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].key(), month("2024-08", 9701));
}

pub async fn test_changes_since_ordered_and_limited<S: FactStore>(store: &S) {
    let receipt = "test_fs_changes_3";
    store
        .upsert_sales(&[make_sale(receipt, "2024-09-01 12:00:00")])
        .await
        .unwrap();

    let before = store.latest_change().await.unwrap().unwrap_or(0);
    store
        .replace_receipt_details(
            receipt,
            &[
                make_detail(receipt, 1, "2024-09-01 12:00:00", 9801, 1.0),
                make_detail(receipt, 2, "2024-09-01 12:00:00", 9802, 1.0),
                make_detail(receipt, 3, "2024-09-01 12:00:00", 9803, 1.0),
            ],
        )
        .await
        .unwrap();

    let first = store.changes_since(before, 2).await.unwrap();
    assert_eq!(first.len(), 2, "limit should be honored");
    assert!(first[0].seq < first[1].seq, "changes should be oldest first");

    let rest = store.changes_since(first[1].seq, 100).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(Some(rest[0].seq), store.latest_change().await.unwrap());
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all FactStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_fact_store_tests {
    ($store:expr) => {
        use $crate::storage::fact_store_tests::*;

        // upsert_sales tests
        test_upsert_and_get_sale($store).await;
        println!("  test_upsert_and_get_sale: PASSED");

        test_get_sale_nonexistent($store).await;
        println!("  test_get_sale_nonexistent: PASSED");

        test_upsert_replaces_sale($store).await;
        println!("  test_upsert_replaces_sale: PASSED");

        test_existing_receipts($store).await;
        println!("  test_existing_receipts: PASSED");

        test_existing_receipts_empty_input($store).await;
        println!("  test_existing_receipts_empty_input: PASSED");

        // replace_receipt_details tests
        test_replace_details_first_write($store).await;
        println!("  test_replace_details_first_write: PASSED");

        test_replace_details_returns_displaced($store).await;
        println!("  test_replace_details_returns_displaced: PASSED");

        test_replace_details_with_empty_clears($store).await;
        println!("  test_replace_details_with_empty_clears: PASSED");

        // read tests
        test_details_for_menu_ordered($store).await;
        println!("  test_details_for_menu_ordered: PASSED");

        test_all_details_and_keys($store).await;
        println!("  test_all_details_and_keys: PASSED");

        // change log tests
        test_replace_records_old_and_new_keys($store).await;
        println!("  test_replace_records_old_and_new_keys: PASSED");

        test_sale_upsert_records_existing_lines($store).await;
        println!("  test_sale_upsert_records_existing_lines: PASSED");

        test_changes_since_ordered_and_limited($store).await;
        println!("  test_changes_since_ordered_and_limited: PASSED");
    };
}
