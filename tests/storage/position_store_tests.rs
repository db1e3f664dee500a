//! PositionStore interface tests.
//!
//! These tests verify the contract of the PositionStore trait.
//! Each storage implementation should run these tests.

use sales_rollup::storage::PositionStore;

// =============================================================================
// PositionStore::get tests
// =============================================================================

pub async fn test_get_nonexistent<S: PositionStore>(store: &S) {
    let result = store
        .get("test_handler_missing")
        .await
        .expect("get should succeed");
    assert!(result.is_none(), "nonexistent position should be None");
}

// =============================================================================
// PositionStore::put tests
// =============================================================================

pub async fn test_put_and_get<S: PositionStore>(store: &S) {
    let handler = "test_pos_put_get";

    store.put(handler, 42).await.expect("put should succeed");

    let result = store
        .get(handler)
        .await
        .expect("get should succeed")
        .expect("position should exist");

    assert_eq!(result, 42, "should return stored sequence");
}

pub async fn test_put_update<S: PositionStore>(store: &S) {
    let handler = "test_pos_update";

    store.put(handler, 10).await.unwrap();
    store.put(handler, 25).await.unwrap();

    let result = store.get(handler).await.unwrap().unwrap();
    assert_eq!(result, 25, "should return updated sequence");
}

pub async fn test_put_zero_sequence<S: PositionStore>(store: &S) {
    let handler = "test_pos_zero";

    store.put(handler, 0).await.unwrap();

    let result = store.get(handler).await.unwrap().unwrap();
    assert_eq!(result, 0, "should store sequence 0");
}

pub async fn test_put_large_sequence<S: PositionStore>(store: &S) {
    let handler = "test_pos_large";
    let sequence = u64::from(u32::MAX) + 7;

    store.put(handler, sequence).await.unwrap();

    let result = store.get(handler).await.unwrap().unwrap();
    assert_eq!(result, sequence, "sequences beyond u32 should survive");
}

// =============================================================================
// Isolation tests
// =============================================================================

pub async fn test_handler_isolation<S: PositionStore>(store: &S) {
    store.put("test_handler_a", 10).await.unwrap();
    store.put("test_handler_b", 20).await.unwrap();

    let a = store.get("test_handler_a").await.unwrap().unwrap();
    let b = store.get("test_handler_b").await.unwrap().unwrap();

    assert_eq!(a, 10, "handler_a should be 10");
    assert_eq!(b, 20, "handler_b should be 20");
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all PositionStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_position_store_tests {
    ($store:expr) => {
        use $crate::storage::position_store_tests::*;

        // get tests
        test_get_nonexistent($store).await;
        println!("  test_get_nonexistent: PASSED");

        // put tests
        test_put_and_get($store).await;
        println!("  test_put_and_get: PASSED");

        test_put_update($store).await;
        println!("  test_put_update: PASSED");

        test_put_zero_sequence($store).await;
        println!("  test_put_zero_sequence: PASSED");

        test_put_large_sequence($store).await;
        println!("  test_put_large_sequence: PASSED");

        // isolation tests
        test_handler_isolation($store).await;
        println!("  test_handler_isolation: PASSED");
    };
}
