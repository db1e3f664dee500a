//! Rollup engine.
//!
//! Keeps `menu_summary` and `monthly_summary` consistent with the fact
//! tables. Every refresh re-derives a menu code from its full fact set and
//! replaces the stored rows; nothing is ever accumulated into a live row.
//!
//! # Ordering within one menu code
//!
//! The lifetime row is written before any of its monthly rows, and monthly
//! rows are deleted before the lifetime row. All of it runs under the menu
//! code's lock from [`KeyLocks`], so no other writer interleaves.
//!
//! # Failure model
//!
//! Each row is replaced in one atomic storage call, after its new value is
//! fully computed. A failed key keeps its prior row and is reported in
//! [`RollupError::PartialRecomputeFailure`]; other keys are unaffected and
//! the same refresh can be retried from scratch.

mod aggregate;
mod error;
mod key_lock;
mod result;


use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use backon::ExponentialBuilder;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::config::RollupConfig;
use crate::model::{
    DerivedKey, Diagnostic, MenuSummary, MonthlyKey, MonthlySummary, Sale, SaleDetail, YearMonth,
};
use crate::storage::{
    FactChange, FactStore, PositionStore, Storage, StorageError, SummaryStore,
};
use crate::utils::retry::{retry_storage, storage_backoff};

pub use aggregate::{resolve_dimension, rollup_all, rollup_menu, MenuRollup};
pub use error::RollupError;
pub use key_lock::KeyLocks;
pub use result::{Drift, DriftKind, KeyFailure, RollupResult, TouchedKeys};

/// Position store handler name used by [`RollupEngine::catch_up`].
pub const CATCH_UP_HANDLER: &str = "sales-rollup";

/// What one menu code's refresh did.
#[derive(Default)]
struct MenuOutcome {
    result: RollupResult,
    failed: Vec<KeyFailure>,
}

impl MenuOutcome {
    fn fail(&mut self, key: DerivedKey, error: &StorageError) {
        error!(key = %key, error = %error, "Derived row not updated");
        self.failed.push(KeyFailure::new(key, error));
    }

    /// Fail a menu code's lifetime row and the given months.
    fn fail_all(&mut self, menu_code: i64, months: &BTreeSet<YearMonth>, error: &StorageError) {
        self.fail(DerivedKey::menu(menu_code), error);
        for year_month in months {
            self.fail(DerivedKey::monthly(MonthlyKey::new(*year_month, menu_code)), error);
        }
    }
}

/// The rollup engine. Sole writer of the derived tables.
pub struct RollupEngine {
    facts: Arc<dyn FactStore>,
    summaries: Arc<dyn SummaryStore>,
    positions: Arc<dyn PositionStore>,
    config: RollupConfig,
    backoff: ExponentialBuilder,
    locks: KeyLocks,
}

impl RollupEngine {
    pub fn new(
        facts: Arc<dyn FactStore>,
        summaries: Arc<dyn SummaryStore>,
        positions: Arc<dyn PositionStore>,
        config: RollupConfig,
    ) -> Self {
        let backoff = storage_backoff(&config.retry);
        Self {
            facts,
            summaries,
            positions,
            config,
            backoff,
            locks: KeyLocks::new(),
        }
    }

    pub fn from_storage(storage: &Storage, config: RollupConfig) -> Self {
        Self::new(
            storage.facts.clone(),
            storage.summaries.clone(),
            storage.positions.clone(),
            config,
        )
    }

    /// Refresh the keys touched by facts the caller has already stored.
    ///
    /// Each sale delta also touches every stored line of its receipt, since
    /// a late sale row makes those lines count.
    pub async fn ingest(
        &self,
        sale_deltas: &[Sale],
        detail_deltas: &[SaleDetail],
    ) -> Result<RollupResult, RollupError> {
        self.ingest_correction(sale_deltas, detail_deltas, &[]).await
    }

    /// Like [`ingest`](Self::ingest), plus the keys of `displaced` lines.
    ///
    /// `displaced` holds the rows a correction replaced. Their keys may have
    /// lost facts, or all of them, in which case the rows are deleted.
    #[tracing::instrument(
        name = "rollup.ingest",
        skip_all,
        fields(
            sales = sale_deltas.len(),
            details = detail_deltas.len(),
            displaced = displaced.len()
        )
    )]
    pub async fn ingest_correction(
        &self,
        sale_deltas: &[Sale],
        detail_deltas: &[SaleDetail],
        displaced: &[SaleDetail],
    ) -> Result<RollupResult, RollupError> {
        let mut touched = TouchedKeys::new();
        touched.touch_details(detail_deltas);
        touched.touch_details(displaced);

        for sale in sale_deltas {
            let lines = retry_storage(&self.backoff, "details_for_receipt", || {
                self.facts.details_for_receipt(&sale.receipt_number)
            })
            .await?;
            touched.touch_details(&lines);
        }

        self.refresh(&touched).await
    }

    /// Recompute and replace exactly the given keys.
    ///
    /// Menu codes run concurrently up to `max_concurrent_keys`; months of
    /// one menu code run in order under its lock.
    pub async fn refresh(&self, keys: &TouchedKeys) -> Result<RollupResult, RollupError> {
        if keys.is_empty() {
            return Ok(RollupResult::default());
        }

        let outcomes: Vec<MenuOutcome> = stream::iter(keys.iter())
            .map(|(menu_code, months)| self.refresh_menu(menu_code, months))
            .buffer_unordered(self.config.max_concurrent_keys.max(1))
            .collect()
            .await;

        let mut result = RollupResult::default();
        let mut failed = Vec::new();
        for outcome in outcomes {
            result.merge(outcome.result);
            failed.extend(outcome.failed);
        }

        for diagnostic in &result.diagnostics {
            warn!(%diagnostic, "Data quality issue");
        }

        if failed.is_empty() {
            info!(
                menu_codes = keys.len(),
                menu_updated = result.menu_updated,
                menu_deleted = result.menu_deleted,
                monthly_updated = result.monthly_updated,
                monthly_deleted = result.monthly_deleted,
                "Rollup refreshed"
            );
            Ok(result)
        } else {
            failed.sort_by(|a, b| a.key.cmp(&b.key));
            Err(RollupError::PartialRecomputeFailure {
                failed,
                partial: Box::new(result),
            })
        }
    }

    /// Rebuild every derived row from the full fact set.
    ///
    /// Covers every menu code and month present in the facts or in the
    /// derived tables, so rows without facts are removed. On success the
    /// catch-up position moves to the change log head seen at the start.
    #[tracing::instrument(name = "rollup.recompute_all", skip_all)]
    pub async fn recompute_all(&self) -> Result<RollupResult, RollupError> {
        let head = retry_storage(&self.backoff, "latest_change", || {
            self.facts.latest_change()
        })
        .await?;

        let mut touched: TouchedKeys =
            retry_storage(&self.backoff, "detail_keys", || self.facts.detail_keys())
                .await?
                .into_iter()
                .collect();

        let stored_menus = retry_storage(&self.backoff, "list_menu_summaries", || {
            self.summaries.list_menu_summaries(None)
        })
        .await?;
        for summary in &stored_menus {
            touched.touch_menu(summary.menu_code);
        }

        let stored_monthly = retry_storage(&self.backoff, "list_monthly_summaries", || {
            self.summaries.list_monthly_summaries(None, None)
        })
        .await?;
        for summary in &stored_monthly {
            touched.touch(summary.key());
        }

        let result = self.refresh(&touched).await?;

        if let Some(head) = head {
            self.advance_position(head).await?;
        }

        Ok(result)
    }

    /// Pull mode: refresh everything recorded in the change log since the
    /// stored position.
    ///
    /// Works in batches of `checkpoint_batch_size`. The position moves past
    /// a batch only when all of its keys were refreshed, so a failed batch
    /// is re-derived in full on the next call.
    #[tracing::instrument(name = "rollup.catch_up", skip_all)]
    pub async fn catch_up(&self) -> Result<RollupResult, RollupError> {
        let batch_size = self.config.checkpoint_batch_size.max(1);
        let mut position = retry_storage(&self.backoff, "get_position", || {
            self.positions.get(CATCH_UP_HANDLER)
        })
        .await?
        .unwrap_or(0);

        let mut total = RollupResult::default();

        loop {
            let changes = retry_storage(&self.backoff, "changes_since", || {
                self.facts.changes_since(position, batch_size)
            })
            .await?;
            let Some(last) = changes.last().map(|c| c.seq) else {
                break;
            };

            let touched: TouchedKeys = changes.iter().map(FactChange::key).collect();
            match self.refresh(&touched).await {
                Ok(result) => total.merge(result),
                Err(RollupError::PartialRecomputeFailure { failed, partial }) => {
                    total.merge(*partial);
                    warn!(
                        position,
                        failed = failed.len(),
                        "Catch-up batch incomplete, position not advanced"
                    );
                    return Err(RollupError::PartialRecomputeFailure {
                        failed,
                        partial: Box::new(total),
                    });
                }
                Err(e) => return Err(e),
            }

            retry_storage(&self.backoff, "put_position", || {
                self.positions.put(CATCH_UP_HANDLER, last)
            })
            .await?;
            debug!(from = position, to = last, changes = changes.len(), "Catch-up batch applied");
            position = last;

            if changes.len() < batch_size as usize {
                break;
            }
        }

        Ok(total)
    }

    /// Compare the stored derived tables with a rollup of all valid facts.
    ///
    /// Read-only; [`recompute_all`](Self::recompute_all) repairs any drift.
    #[tracing::instrument(name = "rollup.verify", skip_all)]
    pub async fn verify(&self) -> Result<Vec<Drift>, RollupError> {
        let details =
            retry_storage(&self.backoff, "all_details", || self.facts.all_details()).await?;
        let (valid, _) = self.split_orphans(details).await?;
        let expected = rollup_all(&valid);

        let stored_menus = retry_storage(&self.backoff, "list_menu_summaries", || {
            self.summaries.list_menu_summaries(None)
        })
        .await?;
        let stored_monthly = retry_storage(&self.backoff, "list_monthly_summaries", || {
            self.summaries.list_monthly_summaries(None, None)
        })
        .await?;

        let mut drift = diff(
            expected
                .values()
                .map(|r| (r.summary.menu_code, &r.summary))
                .collect(),
            stored_menus.iter().map(|s| (s.menu_code, s)).collect(),
            DerivedKey::menu,
        );
        drift.extend(diff(
            expected
                .values()
                .flat_map(|r| r.monthly.values())
                .map(|m| (m.key(), m))
                .collect(),
            stored_monthly.iter().map(|m| (m.key(), m)).collect(),
            DerivedKey::monthly,
        ));
        drift.sort_by(|a, b| a.key.cmp(&b.key));

        if drift.is_empty() {
            info!("Derived tables match facts");
        } else {
            warn!(rows = drift.len(), "Derived tables drifted from facts");
        }
        Ok(drift)
    }

    pub async fn get_menu_summary(&self, menu_code: i64) -> Result<Option<MenuSummary>, RollupError> {
        Ok(self.summaries.get_menu_summary(menu_code).await?)
    }

    pub async fn get_monthly_summary(
        &self,
        year_month: YearMonth,
        menu_code: i64,
    ) -> Result<Option<MonthlySummary>, RollupError> {
        let key = MonthlyKey::new(year_month, menu_code);
        Ok(self.summaries.get_monthly_summary(&key).await?)
    }

    /// Re-derive one menu code and the given months of it.
    async fn refresh_menu(&self, menu_code: i64, months: &BTreeSet<YearMonth>) -> MenuOutcome {
        let _guard = self.locks.lock(menu_code).await;
        let mut outcome = MenuOutcome::default();

        let (rollup, diagnostics) = match self.load_menu(menu_code).await {
            Ok(loaded) => loaded,
            Err(e) => {
                outcome.fail_all(menu_code, months, &e);
                return outcome;
            }
        };
        outcome.result.diagnostics = diagnostics;

        match rollup {
            Some(rollup) => self.replace_menu(rollup, months, &mut outcome).await,
            None => self.remove_menu(menu_code, &mut outcome).await,
        }
        outcome
    }

    /// Valid lines of one menu code, folded. Orphans become diagnostics.
    async fn load_menu(
        &self,
        menu_code: i64,
    ) -> Result<(Option<MenuRollup>, Vec<Diagnostic>), StorageError> {
        let details = retry_storage(&self.backoff, "details_for_menu", || {
            self.facts.details_for_menu(menu_code)
        })
        .await?;
        let (valid, mut diagnostics) = self.split_orphans(details).await?;

        let rollup = rollup_menu(menu_code, &valid);
        if let Some(rollup) = &rollup {
            diagnostics.extend(rollup.diagnostics.iter().cloned());
        }
        Ok((rollup, diagnostics))
    }

    /// Split lines into those whose receipt has a sale row and the rest.
    async fn split_orphans(
        &self,
        details: Vec<SaleDetail>,
    ) -> Result<(Vec<SaleDetail>, Vec<Diagnostic>), StorageError> {
        let receipts: Vec<String> = details
            .iter()
            .map(|d| d.receipt_number.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        if receipts.is_empty() {
            return Ok((details, Vec::new()));
        }

        let existing = retry_storage(&self.backoff, "existing_receipts", || {
            self.facts.existing_receipts(&receipts)
        })
        .await?;

        let (valid, orphans): (Vec<_>, Vec<_>) = details
            .into_iter()
            .partition(|d| existing.contains(&d.receipt_number));

        let diagnostics = orphans
            .into_iter()
            .map(|d| Diagnostic::ReferentialIntegrityViolation {
                receipt_number: d.receipt_number,
                line_number: d.line_number,
                menu_code: d.menu_code,
            })
            .collect();

        Ok((valid, diagnostics))
    }

    /// Write the lifetime row, then each touched month.
    ///
    /// Monthly rows carry the menu-level name and category, so when either
    /// changed every month of the menu code is rewritten, not only the
    /// touched ones.
    async fn replace_menu(
        &self,
        rollup: MenuRollup,
        touched: &BTreeSet<YearMonth>,
        outcome: &mut MenuOutcome,
    ) {
        let menu_code = rollup.summary.menu_code;

        let stored = retry_storage(&self.backoff, "get_menu_summary", || {
            self.summaries.get_menu_summary(menu_code)
        })
        .await;
        let mut months = touched.clone();
        match stored {
            Ok(stored) => {
                let restamp = stored.map_or(true, |s| {
                    s.menu_name != rollup.summary.menu_name || s.category != rollup.summary.category
                });
                if restamp {
                    months.extend(rollup.monthly.keys().copied());
                }
            }
            Err(e) => {
                outcome.fail_all(menu_code, &months, &e);
                return;
            }
        }

        let written = retry_storage(&self.backoff, "put_menu_summary", || {
            self.summaries.put_menu_summary(&rollup.summary)
        })
        .await;
        if let Err(e) = written {
            // monthly rows stay untouched so they never run ahead of their parent
            outcome.fail_all(menu_code, &months, &e);
            return;
        }
        outcome.result.menu_updated += 1;

        for year_month in &months {
            let key = MonthlyKey::new(*year_month, menu_code);
            match rollup.monthly.get(year_month) {
                Some(row) => {
                    let written = retry_storage(&self.backoff, "put_monthly_summary", || {
                        self.summaries.put_monthly_summary(row)
                    })
                    .await;
                    match written {
                        Ok(()) => outcome.result.monthly_updated += 1,
                        Err(e) => outcome.fail(DerivedKey::monthly(key), &e),
                    }
                }
                None => {
                    let deleted = retry_storage(&self.backoff, "delete_monthly_summary", || {
                        self.summaries.delete_monthly_summary(&key)
                    })
                    .await;
                    match deleted {
                        Ok(true) => outcome.result.monthly_deleted += 1,
                        Ok(false) => {}
                        Err(e) => outcome.fail(DerivedKey::monthly(key), &e),
                    }
                }
            }
        }
    }

    /// Delete every monthly row of a menu code with no valid facts, then
    /// its lifetime row.
    async fn remove_menu(&self, menu_code: i64, outcome: &mut MenuOutcome) {
        let stored = retry_storage(&self.backoff, "monthly_keys_for_menu", || {
            self.summaries.monthly_keys_for_menu(menu_code)
        })
        .await;
        let stored = match stored {
            Ok(stored) => stored,
            Err(e) => {
                outcome.fail(DerivedKey::menu(menu_code), &e);
                return;
            }
        };

        let mut blocked = None;
        for year_month in stored {
            let key = MonthlyKey::new(year_month, menu_code);
            let deleted = retry_storage(&self.backoff, "delete_monthly_summary", || {
                self.summaries.delete_monthly_summary(&key)
            })
            .await;
            match deleted {
                Ok(true) => outcome.result.monthly_deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    outcome.fail(DerivedKey::monthly(key), &e);
                    blocked = Some(e);
                }
            }
        }

        if let Some(e) = blocked {
            // keep the parent while children remain
            outcome.fail(DerivedKey::menu(menu_code), &e);
            return;
        }

        let deleted = retry_storage(&self.backoff, "delete_menu_summary", || {
            self.summaries.delete_menu_summary(menu_code)
        })
        .await;
        match deleted {
            Ok(true) => outcome.result.menu_deleted += 1,
            Ok(false) => {}
            Err(e) => outcome.fail(DerivedKey::menu(menu_code), &e),
        }
    }

    /// Move the catch-up position forward, never backward.
    async fn advance_position(&self, sequence: u64) -> Result<(), RollupError> {
        let current = retry_storage(&self.backoff, "get_position", || {
            self.positions.get(CATCH_UP_HANDLER)
        })
        .await?;
        if current.is_some_and(|current| current >= sequence) {
            return Ok(());
        }
        retry_storage(&self.backoff, "put_position", || {
            self.positions.put(CATCH_UP_HANDLER, sequence)
        })
        .await?;
        Ok(())
    }
}

/// Drift between expected and stored rows sharing one key space.
fn diff<K: Ord + Copy, V: PartialEq>(
    expected: BTreeMap<K, &V>,
    stored: BTreeMap<K, &V>,
    to_key: impl Fn(K) -> DerivedKey,
) -> Vec<Drift> {
    let mut drift = Vec::new();
    for (key, want) in &expected {
        match stored.get(key) {
            None => drift.push(Drift {
                key: to_key(*key),
                kind: DriftKind::Missing,
            }),
            Some(have) if have != want => drift.push(Drift {
                key: to_key(*key),
                kind: DriftKind::Stale,
            }),
            Some(_) => {}
        }
    }
    for key in stored.keys() {
        if !expected.contains_key(key) {
            drift.push(Drift {
                key: to_key(*key),
                kind: DriftKind::Unexpected,
            });
        }
    }
    drift
}
