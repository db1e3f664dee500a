//! Ingestion gateway.
//!
//! Validates fact rows, writes them to the fact store and hands the touched
//! keys to the rollup engine. Raw bill exports are parsed elsewhere; this
//! module only sees typed rows.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{Diagnostic, Sale, SaleDetail, YearMonth};
use crate::rollup::{RollupEngine, RollupError, RollupResult};
use crate::storage::{FactStore, StorageError};


/// Errors returned by [`IngestionGateway::submit`].
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The batch was rejected before anything was written.
    #[error("Invalid fact for receipt '{receipt_number}': {reason}")]
    InvalidFact {
        receipt_number: String,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Facts were stored but some derived keys were not refreshed.
    /// `RollupEngine::catch_up` picks them up from the change log.
    #[error("Rollup error: {0}")]
    Rollup(#[from] RollupError),
}

/// Receipts and line items submitted together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactBatch {
    pub sales: Vec<Sale>,
    pub details: Vec<SaleDetail>,
}

/// What one submitted batch did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub sales_upserted: usize,
    pub details_written: usize,
    /// Receipts whose line items were replaced.
    pub receipts_replaced: usize,
    /// Lines dropped because their receipt has no sale row.
    pub rejected: Vec<Diagnostic>,
    pub rollup: RollupResult,
}

/// Writes facts, then drives the rollup engine.
pub struct IngestionGateway {
    facts: Arc<dyn FactStore>,
    engine: Arc<RollupEngine>,
}

impl IngestionGateway {
    pub fn new(facts: Arc<dyn FactStore>, engine: Arc<RollupEngine>) -> Self {
        Self { facts, engine }
    }

    /// Validate, deduplicate and store a batch, then refresh its keys.
    ///
    /// Every receipt with at least one line in the batch has all of its
    /// stored lines replaced by the batch's lines. A sale without lines in
    /// the batch leaves its stored lines alone.
    #[tracing::instrument(
        name = "ingest.submit",
        skip_all,
        fields(sales = batch.sales.len(), details = batch.details.len())
    )]
    pub async fn submit(&self, batch: FactBatch) -> Result<IngestReport, IngestError> {
        for sale in &batch.sales {
            validate_sale(sale)?;
        }
        for detail in &batch.details {
            validate_detail(detail)?;
        }

        // last occurrence wins
        let sales: BTreeMap<String, Sale> = batch
            .sales
            .into_iter()
            .map(|s| (s.receipt_number.clone(), s))
            .collect();
        let details: BTreeMap<(String, u32), SaleDetail> = batch
            .details
            .into_iter()
            .map(|d| ((d.receipt_number.clone(), d.line_number), d))
            .collect();

        let unknown: Vec<String> = details
            .values()
            .map(|d| d.receipt_number.as_str())
            .filter(|r| !sales.contains_key(*r))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let stored: HashSet<String> = if unknown.is_empty() {
            HashSet::new()
        } else {
            self.facts.existing_receipts(&unknown).await?
        };

        let mut report = IngestReport::default();
        let mut by_receipt: BTreeMap<String, Vec<SaleDetail>> = BTreeMap::new();
        for detail in details.into_values() {
            let known = sales.contains_key(&detail.receipt_number)
                || stored.contains(&detail.receipt_number);
            if known {
                by_receipt
                    .entry(detail.receipt_number.clone())
                    .or_default()
                    .push(detail);
            } else {
                warn!(
                    receipt_number = %detail.receipt_number,
                    line_number = detail.line_number,
                    menu_code = detail.menu_code,
                    "Line item rejected: receipt has no sale"
                );
                report.rejected.push(Diagnostic::ReferentialIntegrityViolation {
                    receipt_number: detail.receipt_number,
                    line_number: detail.line_number,
                    menu_code: detail.menu_code,
                });
            }
        }

        let sales: Vec<Sale> = sales.into_values().collect();
        self.facts.upsert_sales(&sales).await?;
        report.sales_upserted = sales.len();

        let mut written = Vec::new();
        let mut displaced = Vec::new();
        for (receipt_number, lines) in by_receipt {
            displaced.extend(
                self.facts
                    .replace_receipt_details(&receipt_number, &lines)
                    .await?,
            );
            report.receipts_replaced += 1;
            written.extend(lines);
        }
        report.details_written = written.len();

        report.rollup = self
            .engine
            .ingest_correction(&sales, &written, &displaced)
            .await?;

        info!(
            sales = report.sales_upserted,
            details = report.details_written,
            rejected = report.rejected.len(),
            rows_changed = report.rollup.rows_changed(),
            "Batch ingested"
        );
        Ok(report)
    }
}

fn invalid(receipt_number: &str, reason: impl Into<String>) -> IngestError {
    IngestError::InvalidFact {
        receipt_number: receipt_number.to_string(),
        reason: reason.into(),
    }
}

fn validate_sale(sale: &Sale) -> Result<(), IngestError> {
    if sale.receipt_number.trim().is_empty() {
        return Err(invalid(&sale.receipt_number, "blank receipt_number"));
    }
    if YearMonth::checked_of(&sale.datetime).is_none() {
        return Err(invalid(&sale.receipt_number, "datetime year outside 0000-9999"));
    }
    let amounts = [
        ("summary_price", sale.summary_price),
        ("subtotal_bill_discount", sale.subtotal_bill_discount),
        (
            "subtotal_summary_price_discount_by_item",
            sale.subtotal_summary_price_discount_by_item,
        ),
        ("ex_vat", sale.ex_vat),
        (
            "before_vat_subtotal_service_charge",
            sale.before_vat_subtotal_service_charge,
        ),
    ];
    for (name, value) in amounts {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(invalid(&sale.receipt_number, format!("{} is not finite", name)));
        }
    }
    Ok(())
}

fn validate_detail(detail: &SaleDetail) -> Result<(), IngestError> {
    if detail.receipt_number.trim().is_empty() {
        return Err(invalid(&detail.receipt_number, "blank receipt_number"));
    }
    if YearMonth::checked_of(&detail.datetime).is_none() {
        return Err(invalid(
            &detail.receipt_number,
            format!("line {} datetime year outside 0000-9999", detail.line_number),
        ));
    }
    let amounts = [
        ("quantity", detail.quantity),
        ("price_per_unit", detail.price_per_unit),
        ("summary_price", detail.summary_price),
        ("revenue", detail.revenue),
        ("discount_amount", detail.discount_amount),
    ];
    for (name, value) in amounts {
        if !value.is_finite() {
            return Err(invalid(
                &detail.receipt_number,
                format!("line {} {} is not finite", detail.line_number, name),
            ));
        }
    }
    Ok(())
}
