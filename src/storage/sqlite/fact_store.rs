//! SQLite FactStore implementation.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use sea_query::{
    Alias, Expr, OnConflict, Order, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::model::{MonthlyKey, Sale, SaleDetail, YearMonth};
use crate::storage::helpers::{
    count_from_i64, format_datetime, line_number_from_i64, parse_datetime,
};
use crate::storage::schema::{FactChanges, Sales, SalesDetail};
use crate::storage::{FactChange, FactStore, Result};

/// Receipt numbers per `IN (...)` clause.
const IN_CHUNK: usize = 500;

const DETAIL_COLUMNS: [SalesDetail; 17] = [
    SalesDetail::Datetime,
    SalesDetail::ReceiptNumber,
    SalesDetail::LineNumber,
    SalesDetail::MenuCode,
    SalesDetail::MenuName,
    SalesDetail::Category,
    SalesDetail::Quantity,
    SalesDetail::PricePerUnit,
    SalesDetail::SummaryPrice,
    SalesDetail::Revenue,
    SalesDetail::DiscountAmount,
    SalesDetail::OrderType,
    SalesDetail::Channel,
    SalesDetail::TableNumber,
    SalesDetail::BillOpenBy,
    SalesDetail::BillCloseBy,
    SalesDetail::Branch,
];

const SALE_COLUMNS: [Sales; 16] = [
    Sales::Datetime,
    Sales::ReceiptNumber,
    Sales::PaymentType,
    Sales::TableNumber,
    Sales::SeatAmount,
    Sales::SummaryPrice,
    Sales::SubtotalBillDiscount,
    Sales::SubtotalSummaryPriceDiscountByItem,
    Sales::ExVat,
    Sales::BeforeVatSubtotalServiceCharge,
    Sales::CustomerName,
    Sales::PhoneNumber,
    Sales::Remark,
    Sales::BillOpenBy,
    Sales::BillCloseBy,
    Sales::Branch,
];

/// SQLite implementation of FactStore.
pub struct SqliteFactStore {
    pool: SqlitePool,
}

impl SqliteFactStore {
    /// Create a new SQLite fact store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn select_details() -> SelectStatement {
        Query::select()
            .columns(DETAIL_COLUMNS)
            .from(SalesDetail::Table)
            .to_owned()
    }

    fn detail_from_row(row: &SqliteRow) -> Result<SaleDetail> {
        let datetime: String = row.try_get("datetime")?;
        let line_number: i64 = row.try_get("line_number")?;
        Ok(SaleDetail {
            receipt_number: row.try_get("receipt_number")?,
            line_number: line_number_from_i64(line_number)?,
            datetime: parse_datetime(&datetime)?,
            menu_code: row.try_get("menu_code")?,
            menu_name: row.try_get("menu_name")?,
            category: row.try_get("category")?,
            quantity: row.try_get("quantity")?,
            price_per_unit: row.try_get("price_per_unit")?,
            summary_price: row.try_get("summary_price")?,
            revenue: row.try_get("revenue")?,
            discount_amount: row.try_get("discount_amount")?,
            order_type: row.try_get("order_type")?,
            channel: row.try_get("channel")?,
            table_number: row.try_get("table_number")?,
            bill_open_by: row.try_get("bill_open_by")?,
            bill_close_by: row.try_get("bill_close_by")?,
            branch: row.try_get("branch")?,
        })
    }

    fn detail_values(detail: &SaleDetail) -> [SimpleExpr; 17] {
        [
            format_datetime(&detail.datetime).into(),
            detail.receipt_number.as_str().into(),
            detail.line_number.into(),
            detail.menu_code.into(),
            detail.menu_name.clone().into(),
            detail.category.clone().into(),
            detail.quantity.into(),
            detail.price_per_unit.into(),
            detail.summary_price.into(),
            detail.revenue.into(),
            detail.discount_amount.into(),
            detail.order_type.clone().into(),
            detail.channel.clone().into(),
            detail.table_number.clone().into(),
            detail.bill_open_by.clone().into(),
            detail.bill_close_by.clone().into(),
            detail.branch.clone().into(),
        ]
    }

    fn sale_from_row(row: &SqliteRow) -> Result<Sale> {
        let datetime: String = row.try_get("datetime")?;
        Ok(Sale {
            receipt_number: row.try_get("receipt_number")?,
            datetime: parse_datetime(&datetime)?,
            payment_type: row.try_get("payment_type")?,
            table_number: row.try_get("table_number")?,
            seat_amount: row.try_get("seat_amount")?,
            summary_price: row.try_get("summary_price")?,
            subtotal_bill_discount: row.try_get("subtotal_bill_discount")?,
            subtotal_summary_price_discount_by_item: row
                .try_get("subtotal_summary_price_discount_by_item")?,
            ex_vat: row.try_get("ex_vat")?,
            before_vat_subtotal_service_charge: row.try_get("before_vat_subtotal_service_charge")?,
            customer_name: row.try_get("customer_name")?,
            phone_number: row.try_get("phone_number")?,
            remark: row.try_get("remark")?,
            bill_open_by: row.try_get("bill_open_by")?,
            bill_close_by: row.try_get("bill_close_by")?,
            branch: row.try_get("branch")?,
        })
    }

    fn sale_values(sale: &Sale) -> [SimpleExpr; 16] {
        [
            format_datetime(&sale.datetime).into(),
            sale.receipt_number.as_str().into(),
            sale.payment_type.clone().into(),
            sale.table_number.clone().into(),
            sale.seat_amount.into(),
            sale.summary_price.into(),
            sale.subtotal_bill_discount.into(),
            sale.subtotal_summary_price_discount_by_item.into(),
            sale.ex_vat.into(),
            sale.before_vat_subtotal_service_charge.into(),
            sale.customer_name.clone().into(),
            sale.phone_number.clone().into(),
            sale.remark.clone().into(),
            sale.bill_open_by.clone().into(),
            sale.bill_close_by.clone().into(),
            sale.branch.clone().into(),
        ]
    }

    async fn fetch_details(
        conn: &mut SqliteConnection,
        receipt_number: &str,
    ) -> Result<Vec<SaleDetail>> {
        let query = Self::select_details()
            .and_where(Expr::col(SalesDetail::ReceiptNumber).eq(receipt_number))
            .order_by(SalesDetail::LineNumber, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;
        rows.iter().map(Self::detail_from_row).collect()
    }

    /// Append one change-log entry per distinct key.
    async fn record_changes(
        conn: &mut SqliteConnection,
        receipt_number: &str,
        keys: &BTreeSet<MonthlyKey>,
    ) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let recorded_at = chrono::Utc::now().to_rfc3339();

        // rendered before the await; the builder is not Send
        let query = {
            let mut insert = Query::insert();
            insert.into_table(FactChanges::Table).columns([
                FactChanges::ReceiptNumber,
                FactChanges::MenuCode,
                FactChanges::YearMonth,
                FactChanges::RecordedAt,
            ]);
            for key in keys {
                insert.values_panic([
                    receipt_number.into(),
                    key.menu_code.into(),
                    key.year_month.to_string().into(),
                    recorded_at.as_str().into(),
                ]);
            }
            insert.to_string(SqliteQueryBuilder)
        };

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(())
    }

    async fn upsert_sales_in_tx(conn: &mut SqliteConnection, sales: &[Sale]) -> Result<()> {
        for sale in sales {
            let query = Query::insert()
                .into_table(Sales::Table)
                .columns(SALE_COLUMNS)
                .values_panic(Self::sale_values(sale))
                .on_conflict(
                    OnConflict::column(Sales::ReceiptNumber)
                        .update_columns(
                            SALE_COLUMNS
                                .into_iter()
                                .filter(|c| !matches!(c, Sales::ReceiptNumber)),
                        )
                        .to_owned(),
                )
                .to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(&mut *conn).await?;

            let existing = Self::fetch_details(conn, &sale.receipt_number).await?;
            let keys: BTreeSet<MonthlyKey> = existing.iter().map(SaleDetail::monthly_key).collect();
            Self::record_changes(conn, &sale.receipt_number, &keys).await?;
        }
        Ok(())
    }

    async fn replace_details_in_tx(
        conn: &mut SqliteConnection,
        receipt_number: &str,
        details: &[SaleDetail],
    ) -> Result<Vec<SaleDetail>> {
        let displaced = Self::fetch_details(conn, receipt_number).await?;

        let delete = Query::delete()
            .from_table(SalesDetail::Table)
            .and_where(Expr::col(SalesDetail::ReceiptNumber).eq(receipt_number))
            .to_string(SqliteQueryBuilder);
        sqlx::query(&delete).execute(&mut *conn).await?;

        if !details.is_empty() {
            let query = {
                let mut insert = Query::insert();
                insert.into_table(SalesDetail::Table).columns(DETAIL_COLUMNS);
                for detail in details {
                    insert.values_panic(Self::detail_values(detail));
                }
                insert.to_string(SqliteQueryBuilder)
            };
            sqlx::query(&query).execute(&mut *conn).await?;
        }

        let keys: BTreeSet<MonthlyKey> = displaced
            .iter()
            .chain(details)
            .map(SaleDetail::monthly_key)
            .collect();
        Self::record_changes(conn, receipt_number, &keys).await?;

        Ok(displaced)
    }
}

#[async_trait]
impl FactStore for SqliteFactStore {
    async fn upsert_sales(&self, sales: &[Sale]) -> Result<()> {
        if sales.is_empty() {
            return Ok(());
        }

        // BEGIN IMMEDIATE acquires the write lock upfront, preventing deadlocks
        // when concurrent DEFERRED transactions race to upgrade from shared to exclusive.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match Self::upsert_sales_in_tx(&mut conn, sales).await {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn replace_receipt_details(
        &self,
        receipt_number: &str,
        details: &[SaleDetail],
    ) -> Result<Vec<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match Self::replace_details_in_tx(&mut conn, receipt_number, details).await {
            Ok(displaced) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(displaced)
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn get_sale(&self, receipt_number: &str) -> Result<Option<Sale>> {
        let query = Query::select()
            .columns(SALE_COLUMNS)
            .from(Sales::Table)
            .and_where(Expr::col(Sales::ReceiptNumber).eq(receipt_number))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::sale_from_row).transpose()
    }

    async fn existing_receipts(&self, receipt_numbers: &[String]) -> Result<HashSet<String>> {
        let mut found = HashSet::new();

        for chunk in receipt_numbers.chunks(IN_CHUNK) {
            let query = Query::select()
                .column(Sales::ReceiptNumber)
                .from(Sales::Table)
                .and_where(Expr::col(Sales::ReceiptNumber).is_in(chunk.iter().map(String::as_str)))
                .to_string(SqliteQueryBuilder);

            let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
            for row in rows {
                found.insert(row.try_get("receipt_number")?);
            }
        }

        Ok(found)
    }

    async fn details_for_receipt(&self, receipt_number: &str) -> Result<Vec<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_details(&mut conn, receipt_number).await
    }

    async fn details_for_menu(&self, menu_code: i64) -> Result<Vec<SaleDetail>> {
        let query = Self::select_details()
            .and_where(Expr::col(SalesDetail::MenuCode).eq(menu_code))
            .order_by(SalesDetail::ReceiptNumber, Order::Asc)
            .order_by(SalesDetail::LineNumber, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::detail_from_row).collect()
    }

    async fn all_details(&self) -> Result<Vec<SaleDetail>> {
        let query = Self::select_details()
            .order_by(SalesDetail::ReceiptNumber, Order::Asc)
            .order_by(SalesDetail::LineNumber, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::detail_from_row).collect()
    }

    async fn detail_keys(&self) -> Result<Vec<MonthlyKey>> {
        let query = Query::select()
            .distinct()
            .column(SalesDetail::MenuCode)
            .column(SalesDetail::Datetime)
            .from(SalesDetail::Table)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut keys = BTreeSet::new();
        for row in rows {
            let menu_code: i64 = row.try_get("menu_code")?;
            let datetime: String = row.try_get("datetime")?;
            let year_month = YearMonth::of(&parse_datetime(&datetime)?);
            keys.insert(MonthlyKey::new(year_month, menu_code));
        }

        Ok(keys.into_iter().collect())
    }

    async fn changes_since(&self, after: u64, limit: u32) -> Result<Vec<FactChange>> {
        let after = i64::try_from(after).unwrap_or(i64::MAX);
        let query = Query::select()
            .columns([
                FactChanges::Seq,
                FactChanges::ReceiptNumber,
                FactChanges::MenuCode,
                FactChanges::YearMonth,
            ])
            .from(FactChanges::Table)
            .and_where(Expr::col(FactChanges::Seq).gt(after))
            .order_by(FactChanges::Seq, Order::Asc)
            .limit(u64::from(limit))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut changes = Vec::with_capacity(rows.len());
        for row in rows {
            let seq: i64 = row.try_get("seq")?;
            let year_month: String = row.try_get("year_month")?;
            changes.push(FactChange {
                seq: count_from_i64("seq", seq)?,
                receipt_number: row.try_get("receipt_number")?,
                menu_code: row.try_get("menu_code")?,
                year_month: year_month.parse()?,
            });
        }

        Ok(changes)
    }

    async fn latest_change(&self) -> Result<Option<u64>> {
        let query = Query::select()
            .expr_as(Expr::col(FactChanges::Seq).max(), Alias::new("latest"))
            .from(FactChanges::Table)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        let latest: Option<i64> = row.try_get("latest")?;
        latest
            .map(|seq| count_from_i64("seq", seq))
            .transpose()
    }
}
