//! Mock FactStore implementation for testing.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{MonthlyKey, Sale, SaleDetail};
use crate::storage::{FactChange, FactStore, Result, StorageError};

/// Everything behind one lock, so each write is atomic.
#[derive(Default)]
struct Facts {
    sales: HashMap<String, Sale>,
    /// Keyed by (receipt_number, line_number), which is also fold order.
    details: BTreeMap<(String, u32), SaleDetail>,
    changes: Vec<FactChange>,
}

impl Facts {
    fn receipt_details(&self, receipt_number: &str) -> Vec<SaleDetail> {
        self.details
            .range((receipt_number.to_string(), 0)..=(receipt_number.to_string(), u32::MAX))
            .map(|(_, detail)| detail.clone())
            .collect()
    }

    fn record(&mut self, receipt_number: &str, keys: BTreeSet<MonthlyKey>) {
        for key in keys {
            let seq = self.changes.len() as u64 + 1;
            self.changes.push(FactChange {
                seq,
                receipt_number: receipt_number.to_string(),
                menu_code: key.menu_code,
                year_month: key.year_month,
            });
        }
    }
}

/// Mock fact store that stores facts in memory.
///
/// Unlike SQLite, line items are accepted without a parent receipt; callers
/// that need referential integrity must check it themselves.
#[derive(Default)]
pub struct MockFactStore {
    facts: RwLock<Facts>,
    fail_on_write: RwLock<bool>,
    fail_on_read: RwLock<bool>,
}

impl MockFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    /// Number of change-log entries recorded so far.
    pub async fn change_count(&self) -> usize {
        self.facts.read().await.changes.len()
    }

    async fn check_write(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Rejected("fact write".to_string()));
        }
        Ok(())
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(StorageError::Rejected("fact read".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FactStore for MockFactStore {
    async fn upsert_sales(&self, sales: &[Sale]) -> Result<()> {
        self.check_write().await?;
        let mut facts = self.facts.write().await;
        for sale in sales {
            facts
                .sales
                .insert(sale.receipt_number.clone(), sale.clone());
            let keys = facts
                .receipt_details(&sale.receipt_number)
                .iter()
                .map(SaleDetail::monthly_key)
                .collect();
            facts.record(&sale.receipt_number, keys);
        }
        Ok(())
    }

    async fn replace_receipt_details(
        &self,
        receipt_number: &str,
        details: &[SaleDetail],
    ) -> Result<Vec<SaleDetail>> {
        self.check_write().await?;
        let mut facts = self.facts.write().await;

        let displaced = facts.receipt_details(receipt_number);
        for old in &displaced {
            facts
                .details
                .remove(&(old.receipt_number.clone(), old.line_number));
        }
        for detail in details {
            facts.details.insert(
                (detail.receipt_number.clone(), detail.line_number),
                detail.clone(),
            );
        }

        let keys = displaced
            .iter()
            .chain(details)
            .map(SaleDetail::monthly_key)
            .collect();
        facts.record(receipt_number, keys);

        Ok(displaced)
    }

    async fn get_sale(&self, receipt_number: &str) -> Result<Option<Sale>> {
        self.check_read().await?;
        Ok(self.facts.read().await.sales.get(receipt_number).cloned())
    }

    async fn existing_receipts(&self, receipt_numbers: &[String]) -> Result<HashSet<String>> {
        self.check_read().await?;
        let facts = self.facts.read().await;
        Ok(receipt_numbers
            .iter()
            .filter(|r| facts.sales.contains_key(r.as_str()))
            .cloned()
            .collect())
    }

    async fn details_for_receipt(&self, receipt_number: &str) -> Result<Vec<SaleDetail>> {
        self.check_read().await?;
        Ok(self.facts.read().await.receipt_details(receipt_number))
    }

    async fn details_for_menu(&self, menu_code: i64) -> Result<Vec<SaleDetail>> {
        self.check_read().await?;
        Ok(self
            .facts
            .read()
            .await
            .details
            .values()
            .filter(|d| d.menu_code == menu_code)
            .cloned()
            .collect())
    }

    async fn all_details(&self) -> Result<Vec<SaleDetail>> {
        self.check_read().await?;
        Ok(self.facts.read().await.details.values().cloned().collect())
    }

    async fn detail_keys(&self) -> Result<Vec<MonthlyKey>> {
        self.check_read().await?;
        let keys: BTreeSet<MonthlyKey> = self
            .facts
            .read()
            .await
            .details
            .values()
            .map(SaleDetail::monthly_key)
            .collect();
        Ok(keys.into_iter().collect())
    }

    async fn changes_since(&self, after: u64, limit: u32) -> Result<Vec<FactChange>> {
        self.check_read().await?;
        Ok(self
            .facts
            .read()
            .await
            .changes
            .iter()
            .filter(|c| c.seq > after)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn latest_change(&self) -> Result<Option<u64>> {
        self.check_read().await?;
        Ok(self.facts.read().await.changes.last().map(|c| c.seq))
    }
}
