//! Mock SummaryStore implementation for testing.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{MenuSummary, MonthlyKey, MonthlySummary, YearMonth};
use crate::storage::{Result, StorageError, SummaryStore};

#[derive(Default)]
struct Summaries {
    menus: BTreeMap<i64, MenuSummary>,
    monthly: BTreeMap<MonthlyKey, MonthlySummary>,
}

/// Mock summary store that stores derived rows in memory.
///
/// Mirrors the SQLite foreign key: a monthly row needs its menu row, and a
/// menu row cannot be deleted while monthly rows reference it.
///
/// Failure injection:
/// - `fail_menu_code`: every write touching that menu code is rejected
/// - `fail_monthly_key`: writes of that one monthly row are rejected
/// - `fail_next_writes`: the next N writes fail with a transient error
#[derive(Default)]
pub struct MockSummaryStore {
    rows: RwLock<Summaries>,
    fail_menu_codes: RwLock<HashSet<i64>>,
    fail_monthly_keys: RwLock<HashSet<MonthlyKey>>,
    transient_failures: AtomicU32,
    writes: AtomicUsize,
}

impl MockSummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_menu_code(&self, menu_code: i64) {
        self.fail_menu_codes.write().await.insert(menu_code);
    }

    pub async fn fail_monthly_key(&self, key: MonthlyKey) {
        self.fail_monthly_keys.write().await.insert(key);
    }

    pub fn fail_next_writes(&self, count: u32) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    pub async fn clear_failures(&self) {
        self.fail_menu_codes.write().await.clear();
        self.fail_monthly_keys.write().await.clear();
        self.transient_failures.store(0, Ordering::SeqCst);
    }

    /// Successful puts and deletes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn check_write(&self, menu_code: i64, key: Option<&MonthlyKey>) -> Result<()> {
        let transient = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            return Err(StorageError::Unavailable("injected transient failure".to_string()));
        }
        if self.fail_menu_codes.read().await.contains(&menu_code) {
            return Err(StorageError::Rejected(format!("menu_summary[{}]", menu_code)));
        }
        if let Some(key) = key {
            if self.fail_monthly_keys.read().await.contains(key) {
                return Err(StorageError::Rejected(format!("monthly_summary[{}]", key)));
            }
        }
        Ok(())
    }

    fn written(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SummaryStore for MockSummaryStore {
    async fn get_menu_summary(&self, menu_code: i64) -> Result<Option<MenuSummary>> {
        Ok(self.rows.read().await.menus.get(&menu_code).cloned())
    }

    async fn put_menu_summary(&self, summary: &MenuSummary) -> Result<()> {
        self.check_write(summary.menu_code, None).await?;
        self.rows
            .write()
            .await
            .menus
            .insert(summary.menu_code, summary.clone());
        self.written();
        Ok(())
    }

    async fn delete_menu_summary(&self, menu_code: i64) -> Result<bool> {
        self.check_write(menu_code, None).await?;
        let mut rows = self.rows.write().await;
        if rows.monthly.keys().any(|k| k.menu_code == menu_code) {
            return Err(StorageError::Rejected(format!(
                "menu_summary[{}] still referenced by monthly rows",
                menu_code
            )));
        }
        let existed = rows.menus.remove(&menu_code).is_some();
        self.written();
        Ok(existed)
    }

    async fn get_monthly_summary(&self, key: &MonthlyKey) -> Result<Option<MonthlySummary>> {
        Ok(self.rows.read().await.monthly.get(key).cloned())
    }

    async fn put_monthly_summary(&self, summary: &MonthlySummary) -> Result<()> {
        let key = summary.key();
        self.check_write(summary.menu_code, Some(&key)).await?;
        let mut rows = self.rows.write().await;
        if !rows.menus.contains_key(&summary.menu_code) {
            return Err(StorageError::Rejected(format!(
                "monthly_summary[{}] has no menu_summary row",
                key
            )));
        }
        rows.monthly.insert(key, summary.clone());
        self.written();
        Ok(())
    }

    async fn delete_monthly_summary(&self, key: &MonthlyKey) -> Result<bool> {
        self.check_write(key.menu_code, Some(key)).await?;
        let existed = self.rows.write().await.monthly.remove(key).is_some();
        self.written();
        Ok(existed)
    }

    async fn list_menu_summaries(&self, category: Option<&str>) -> Result<Vec<MenuSummary>> {
        Ok(self
            .rows
            .read()
            .await
            .menus
            .values()
            .filter(|s| category.map_or(true, |c| s.category == c))
            .cloned()
            .collect())
    }

    async fn list_monthly_summaries(
        &self,
        year_month: Option<YearMonth>,
        category: Option<&str>,
    ) -> Result<Vec<MonthlySummary>> {
        Ok(self
            .rows
            .read()
            .await
            .monthly
            .values()
            .filter(|s| year_month.map_or(true, |ym| s.year_month == ym))
            .filter(|s| category.map_or(true, |c| s.category == c))
            .cloned()
            .collect())
    }

    async fn monthly_keys_for_menu(&self, menu_code: i64) -> Result<Vec<YearMonth>> {
        Ok(self
            .rows
            .read()
            .await
            .monthly
            .keys()
            .filter(|k| k.menu_code == menu_code)
            .map(|k| k.year_month)
            .collect())
    }
}
