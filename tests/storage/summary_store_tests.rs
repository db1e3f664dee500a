//! SummaryStore interface tests.
//!
//! These tests verify the contract of the SummaryStore trait.
//! Each storage implementation should run these tests.

use sales_rollup::model::{MenuSummary, MonthlyKey, MonthlySummary, YearMonth};
use sales_rollup::storage::SummaryStore;

pub fn ym(s: &str) -> YearMonth {
    s.parse().expect("valid month")
}

/// Create a lifetime row.
pub fn make_menu(code: i64, category: &str, revenue: f64) -> MenuSummary {
    MenuSummary {
        menu_code: code,
        menu_name: format!("Item {}", code),
        category: category.to_string(),
        total_quantity: 3.0,
        total_revenue: revenue,
        total_discount: 1.5,
        times_ordered: 2,
    }
}

/// Create a monthly row.
pub fn make_monthly(month: &str, code: i64, category: &str, revenue: f64) -> MonthlySummary {
    MonthlySummary {
        year_month: ym(month),
        menu_code: code,
        menu_name: format!("Item {}", code),
        category: category.to_string(),
        quantity: 1.0,
        revenue,
        discount_amount: 0.5,
        orders: 1,
    }
}

// =============================================================================
// menu_summary tests
// =============================================================================

pub async fn test_put_and_get_menu<S: SummaryStore>(store: &S) {
    let row = make_menu(8101, "test_cat_menu", 120.0);

    store.put_menu_summary(&row).await.expect("put should succeed");

    let stored = store
        .get_menu_summary(8101)
        .await
        .expect("get should succeed")
        .expect("row should exist");
    assert_eq!(stored, row);
}

pub async fn test_get_menu_nonexistent<S: SummaryStore>(store: &S) {
    let stored = store.get_menu_summary(8199).await.unwrap();
    assert!(stored.is_none());
}

pub async fn test_put_menu_replaces<S: SummaryStore>(store: &S) {
    store
        .put_menu_summary(&make_menu(8102, "test_cat_menu", 10.0))
        .await
        .unwrap();
    let updated = MenuSummary {
        menu_name: "Renamed".to_string(),
        times_ordered: 9,
        ..make_menu(8102, "test_cat_menu", 99.0)
    };
    store.put_menu_summary(&updated).await.unwrap();

    let stored = store.get_menu_summary(8102).await.unwrap().unwrap();
    assert_eq!(stored, updated, "second put should replace every column");
}

pub async fn test_put_menu_keeps_monthly_children<S: SummaryStore>(store: &S) {
    store
        .put_menu_summary(&make_menu(8103, "test_cat_menu", 10.0))
        .await
        .unwrap();
    store
        .put_monthly_summary(&make_monthly("2024-02", 8103, "test_cat_menu", 10.0))
        .await
        .unwrap();

    store
        .put_menu_summary(&make_menu(8103, "test_cat_menu", 20.0))
        .await
        .expect("replacing a parent row should not disturb its children");

    let months = store.monthly_keys_for_menu(8103).await.unwrap();
    assert_eq!(months, vec![ym("2024-02")]);
}

pub async fn test_delete_menu<S: SummaryStore>(store: &S) {
    store
        .put_menu_summary(&make_menu(8104, "test_cat_menu", 10.0))
        .await
        .unwrap();

    assert!(store.delete_menu_summary(8104).await.unwrap(), "row existed");
    assert!(!store.delete_menu_summary(8104).await.unwrap(), "row is gone");
    assert!(store.get_menu_summary(8104).await.unwrap().is_none());
}

// =============================================================================
// monthly_summary tests
// =============================================================================

pub async fn test_put_and_get_monthly<S: SummaryStore>(store: &S) {
    store
        .put_menu_summary(&make_menu(8201, "test_cat_monthly", 10.0))
        .await
        .unwrap();
    let row = make_monthly("2024-03", 8201, "test_cat_monthly", 10.0);
    store.put_monthly_summary(&row).await.unwrap();

    let stored = store
        .get_monthly_summary(&MonthlyKey::new(ym("2024-03"), 8201))
        .await
        .unwrap()
        .expect("row should exist");
    assert_eq!(stored, row);

    let other_month = store
        .get_monthly_summary(&MonthlyKey::new(ym("2024-04"), 8201))
        .await
        .unwrap();
    assert!(other_month.is_none());
}

pub async fn test_monthly_requires_menu_row<S: SummaryStore>(store: &S) {
    let result = store
        .put_monthly_summary(&make_monthly("2024-03", 8299, "test_cat_monthly", 1.0))
        .await;
    assert!(result.is_err(), "monthly row without a menu row should be rejected");
}

pub async fn test_menu_delete_blocked_by_children<S: SummaryStore>(store: &S) {
    store
        .put_menu_summary(&make_menu(8202, "test_cat_monthly", 10.0))
        .await
        .unwrap();
    store
        .put_monthly_summary(&make_monthly("2024-03", 8202, "test_cat_monthly", 10.0))
        .await
        .unwrap();

    let result = store.delete_menu_summary(8202).await;
    assert!(result.is_err(), "menu row with monthly rows should not be deletable");

    let key = MonthlyKey::new(ym("2024-03"), 8202);
    assert!(store.delete_monthly_summary(&key).await.unwrap());
    assert!(!store.delete_monthly_summary(&key).await.unwrap());
    assert!(store.delete_menu_summary(8202).await.unwrap());
}

pub async fn test_monthly_keys_for_menu_ordered<S: SummaryStore>(store: &S) {
    store
        .put_menu_summary(&make_menu(8203, "test_cat_monthly", 10.0))
        .await
        .unwrap();
    for month in ["2024-11", "2023-12", "2024-01"] {
        store
            .put_monthly_summary(&make_monthly(month, 8203, "test_cat_monthly", 1.0))
            .await
            .unwrap();
    }

    let months = store.monthly_keys_for_menu(8203).await.unwrap();
    assert_eq!(months, vec![ym("2023-12"), ym("2024-01"), ym("2024-11")]);
    assert!(store.monthly_keys_for_menu(8298).await.unwrap().is_empty());
}

// =============================================================================
// List tests
// =============================================================================

pub async fn test_list_menu_by_category<S: SummaryStore>(store: &S) {
    let category = "test_cat_list_menu";
    for code in [8303, 8301, 8302] {
        store
            .put_menu_summary(&make_menu(code, category, code as f64))
            .await
            .unwrap();
    }
    store
        .put_menu_summary(&make_menu(8304, "test_cat_list_other", 1.0))
        .await
        .unwrap();

    let rows = store.list_menu_summaries(Some(category)).await.unwrap();
    let codes: Vec<i64> = rows.iter().map(|r| r.menu_code).collect();
    assert_eq!(codes, vec![8301, 8302, 8303], "filtered and ordered by code");

    let all = store.list_menu_summaries(None).await.unwrap();
    assert!(all.iter().any(|r| r.menu_code == 8304));
}

pub async fn test_list_monthly_filters<S: SummaryStore>(store: &S) {
    let category = "test_cat_list_monthly";
    for code in [8402, 8401] {
        store
            .put_menu_summary(&make_menu(code, category, 1.0))
            .await
            .unwrap();
    }
    for (month, code) in [("2022-06", 8402), ("2022-05", 8401), ("2022-06", 8401)] {
        store
            .put_monthly_summary(&make_monthly(month, code, category, 1.0))
            .await
            .unwrap();
    }

    let keys: Vec<MonthlyKey> = store
        .list_monthly_summaries(None, Some(category))
        .await
        .unwrap()
        .iter()
        .map(MonthlySummary::key)
        .collect();
    assert_eq!(
        keys,
        vec![
            MonthlyKey::new(ym("2022-05"), 8401),
            MonthlyKey::new(ym("2022-06"), 8401),
            MonthlyKey::new(ym("2022-06"), 8402),
        ],
        "ordered by month then code"
    );

    let june = store
        .list_monthly_summaries(Some(ym("2022-06")), Some(category))
        .await
        .unwrap();
    assert_eq!(june.len(), 2);
    assert!(june.iter().all(|r| r.year_month == ym("2022-06")));
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all SummaryStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_summary_store_tests {
    ($store:expr) => {
        use $crate::storage::summary_store_tests::*;

        // menu_summary tests
        test_put_and_get_menu($store).await;
        println!("  test_put_and_get_menu: PASSED");

        test_get_menu_nonexistent($store).await;
        println!("  test_get_menu_nonexistent: PASSED");

        test_put_menu_replaces($store).await;
        println!("  test_put_menu_replaces: PASSED");

        test_put_menu_keeps_monthly_children($store).await;
        println!("  test_put_menu_keeps_monthly_children: PASSED");

        test_delete_menu($store).await;
        println!("  test_delete_menu: PASSED");

        // monthly_summary tests
        test_put_and_get_monthly($store).await;
        println!("  test_put_and_get_monthly: PASSED");

        test_monthly_requires_menu_row($store).await;
        println!("  test_monthly_requires_menu_row: PASSED");

        test_menu_delete_blocked_by_children($store).await;
        println!("  test_menu_delete_blocked_by_children: PASSED");

        test_monthly_keys_for_menu_ordered($store).await;
        println!("  test_monthly_keys_for_menu_ordered: PASSED");

        // list tests
        test_list_menu_by_category($store).await;
        println!("  test_list_menu_by_category: PASSED");

        test_list_monthly_filters($store).await;
        println!("  test_list_monthly_filters: PASSED");
    };
}
