//! Fact rows: receipts and their line items.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::YearMonth;

/// One row per receipt.
///
/// Upserted by `receipt_number`; a second ingestion with the same receipt
/// number replaces the stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub receipt_number: String,
    pub datetime: NaiveDateTime,
    pub payment_type: Option<String>,
    pub table_number: Option<String>,
    pub seat_amount: Option<i64>,
    pub summary_price: Option<f64>,
    pub subtotal_bill_discount: Option<f64>,
    pub subtotal_summary_price_discount_by_item: Option<f64>,
    pub ex_vat: Option<f64>,
    pub before_vat_subtotal_service_charge: Option<f64>,
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub remark: Option<String>,
    pub bill_open_by: Option<String>,
    pub bill_close_by: Option<String>,
    pub branch: Option<String>,
}

impl Sale {
    /// A receipt with only its identity and timestamp set.
    pub fn new(receipt_number: impl Into<String>, datetime: NaiveDateTime) -> Self {
        Self {
            receipt_number: receipt_number.into(),
            datetime,
            payment_type: None,
            table_number: None,
            seat_amount: None,
            summary_price: None,
            subtotal_bill_discount: None,
            subtotal_summary_price_discount_by_item: None,
            ex_vat: None,
            before_vat_subtotal_service_charge: None,
            customer_name: None,
            phone_number: None,
            remark: None,
            bill_open_by: None,
            bill_close_by: None,
            branch: None,
        }
    }
}

/// One row per line item on a receipt.
///
/// `(receipt_number, line_number)` identifies the row. Several lines on the
/// same receipt may carry the same `menu_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleDetail {
    pub receipt_number: String,
    pub line_number: u32,
    pub datetime: NaiveDateTime,
    pub menu_code: i64,
    pub menu_name: Option<String>,
    pub category: Option<String>,
    pub quantity: f64,
    pub price_per_unit: f64,
    pub summary_price: f64,
    pub revenue: f64,
    pub discount_amount: f64,
    pub order_type: Option<String>,
    pub channel: Option<String>,
    pub table_number: Option<String>,
    pub bill_open_by: Option<String>,
    pub bill_close_by: Option<String>,
    pub branch: Option<String>,
}

impl SaleDetail {
    /// A line item with zeroed amounts and no descriptive fields.
    pub fn new(
        receipt_number: impl Into<String>,
        line_number: u32,
        datetime: NaiveDateTime,
        menu_code: i64,
    ) -> Self {
        Self {
            receipt_number: receipt_number.into(),
            line_number,
            datetime,
            menu_code,
            menu_name: None,
            category: None,
            quantity: 0.0,
            price_per_unit: 0.0,
            summary_price: 0.0,
            revenue: 0.0,
            discount_amount: 0.0,
            order_type: None,
            channel: None,
            table_number: None,
            bill_open_by: None,
            bill_close_by: None,
            branch: None,
        }
    }

    /// Fill `revenue` and `discount_amount` from quantity, unit price and
    /// the charged `summary_price`.
    ///
    /// `revenue = quantity * price_per_unit`,
    /// `discount_amount = revenue - summary_price`.
    pub fn with_derived_amounts(mut self) -> Self {
        self.revenue = self.quantity * self.price_per_unit;
        self.discount_amount = self.revenue - self.summary_price;
        self
    }

    /// Monthly bucket of this line.
    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(&self.datetime)
    }

    /// Monthly rollup key this line contributes to.
    pub fn monthly_key(&self) -> super::MonthlyKey {
        super::MonthlyKey::new(self.year_month(), self.menu_code)
    }
}
