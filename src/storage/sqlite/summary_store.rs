//! SQLite SummaryStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::model::{MenuSummary, MonthlyKey, MonthlySummary, YearMonth};
use crate::storage::helpers::{count_from_i64, count_to_i64};
use crate::storage::schema::{MenuSummaries, MonthlySummaries};
use crate::storage::{Result, SummaryStore};

const MENU_COLUMNS: [MenuSummaries; 7] = [
    MenuSummaries::MenuCode,
    MenuSummaries::MenuName,
    MenuSummaries::Category,
    MenuSummaries::TotalQuantity,
    MenuSummaries::TotalRevenue,
    MenuSummaries::TotalDiscount,
    MenuSummaries::TimesOrdered,
];

const MONTHLY_COLUMNS: [MonthlySummaries; 8] = [
    MonthlySummaries::YearMonth,
    MonthlySummaries::MenuCode,
    MonthlySummaries::MenuName,
    MonthlySummaries::Category,
    MonthlySummaries::Quantity,
    MonthlySummaries::Revenue,
    MonthlySummaries::DiscountAmount,
    MonthlySummaries::Orders,
];

/// SQLite implementation of SummaryStore.
///
/// Each write is a single `INSERT .. ON CONFLICT DO UPDATE` statement, so a
/// row is replaced atomically. `REPLACE` is avoided: it deletes the parent
/// row first, which the `monthly_summary` foreign key would reject.
pub struct SqliteSummaryStore {
    pool: SqlitePool,
}

impl SqliteSummaryStore {
    /// Create a new SQLite summary store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn menu_from_row(row: &SqliteRow) -> Result<MenuSummary> {
        let times_ordered: i64 = row.try_get("times_ordered")?;
        let category: Option<String> = row.try_get("category")?;
        Ok(MenuSummary {
            menu_code: row.try_get("menu_code")?,
            menu_name: row.try_get("menu_name")?,
            category: category.unwrap_or_default(),
            total_quantity: row.try_get("total_quantity")?,
            total_revenue: row.try_get("total_revenue")?,
            total_discount: row.try_get("total_discount")?,
            times_ordered: count_from_i64("times_ordered", times_ordered)?,
        })
    }

    fn monthly_from_row(row: &SqliteRow) -> Result<MonthlySummary> {
        let year_month: String = row.try_get("year_month")?;
        let orders: i64 = row.try_get("orders")?;
        let menu_name: Option<String> = row.try_get("menu_name")?;
        let category: Option<String> = row.try_get("category")?;
        Ok(MonthlySummary {
            year_month: year_month.parse()?,
            menu_code: row.try_get("menu_code")?,
            menu_name: menu_name.unwrap_or_default(),
            category: category.unwrap_or_default(),
            quantity: row.try_get("quantity")?,
            revenue: row.try_get("revenue")?,
            discount_amount: row.try_get("discount_amount")?,
            orders: count_from_i64("orders", orders)?,
        })
    }
}

#[async_trait]
impl SummaryStore for SqliteSummaryStore {
    async fn get_menu_summary(&self, menu_code: i64) -> Result<Option<MenuSummary>> {
        let query = Query::select()
            .columns(MENU_COLUMNS)
            .from(MenuSummaries::Table)
            .and_where(Expr::col(MenuSummaries::MenuCode).eq(menu_code))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::menu_from_row).transpose()
    }

    async fn put_menu_summary(&self, summary: &MenuSummary) -> Result<()> {
        let query = Query::insert()
            .into_table(MenuSummaries::Table)
            .columns(MENU_COLUMNS)
            .values_panic([
                summary.menu_code.into(),
                summary.menu_name.as_str().into(),
                summary.category.as_str().into(),
                summary.total_quantity.into(),
                summary.total_revenue.into(),
                summary.total_discount.into(),
                count_to_i64(summary.times_ordered).into(),
            ])
            .on_conflict(
                OnConflict::column(MenuSummaries::MenuCode)
                    .update_columns([
                        MenuSummaries::MenuName,
                        MenuSummaries::Category,
                        MenuSummaries::TotalQuantity,
                        MenuSummaries::TotalRevenue,
                        MenuSummaries::TotalDiscount,
                        MenuSummaries::TimesOrdered,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_menu_summary(&self, menu_code: i64) -> Result<bool> {
        let query = Query::delete()
            .from_table(MenuSummaries::Table)
            .and_where(Expr::col(MenuSummaries::MenuCode).eq(menu_code))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_monthly_summary(&self, key: &MonthlyKey) -> Result<Option<MonthlySummary>> {
        let query = Query::select()
            .columns(MONTHLY_COLUMNS)
            .from(MonthlySummaries::Table)
            .and_where(Expr::col(MonthlySummaries::YearMonth).eq(key.year_month.to_string()))
            .and_where(Expr::col(MonthlySummaries::MenuCode).eq(key.menu_code))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::monthly_from_row).transpose()
    }

    async fn put_monthly_summary(&self, summary: &MonthlySummary) -> Result<()> {
        let query = Query::insert()
            .into_table(MonthlySummaries::Table)
            .columns(MONTHLY_COLUMNS)
            .values_panic([
                summary.year_month.to_string().into(),
                summary.menu_code.into(),
                summary.menu_name.as_str().into(),
                summary.category.as_str().into(),
                summary.quantity.into(),
                summary.revenue.into(),
                summary.discount_amount.into(),
                count_to_i64(summary.orders).into(),
            ])
            .on_conflict(
                OnConflict::columns([MonthlySummaries::YearMonth, MonthlySummaries::MenuCode])
                    .update_columns([
                        MonthlySummaries::MenuName,
                        MonthlySummaries::Category,
                        MonthlySummaries::Quantity,
                        MonthlySummaries::Revenue,
                        MonthlySummaries::DiscountAmount,
                        MonthlySummaries::Orders,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_monthly_summary(&self, key: &MonthlyKey) -> Result<bool> {
        let query = Query::delete()
            .from_table(MonthlySummaries::Table)
            .and_where(Expr::col(MonthlySummaries::YearMonth).eq(key.year_month.to_string()))
            .and_where(Expr::col(MonthlySummaries::MenuCode).eq(key.menu_code))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_menu_summaries(&self, category: Option<&str>) -> Result<Vec<MenuSummary>> {
        let query = {
            let mut select = Query::select();
            select
                .columns(MENU_COLUMNS)
                .from(MenuSummaries::Table)
                .order_by(MenuSummaries::MenuCode, Order::Asc);
            if let Some(category) = category {
                select.and_where(Expr::col(MenuSummaries::Category).eq(category));
            }
            select.to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::menu_from_row).collect()
    }

    async fn list_monthly_summaries(
        &self,
        year_month: Option<YearMonth>,
        category: Option<&str>,
    ) -> Result<Vec<MonthlySummary>> {
        // rendered before the await; the builder is not Send
        let query = {
            let mut select = Query::select();
            select
                .columns(MONTHLY_COLUMNS)
                .from(MonthlySummaries::Table)
                .order_by(MonthlySummaries::YearMonth, Order::Asc)
                .order_by(MonthlySummaries::MenuCode, Order::Asc);
            if let Some(year_month) = year_month {
                select.and_where(Expr::col(MonthlySummaries::YearMonth).eq(year_month.to_string()));
            }
            if let Some(category) = category {
                select.and_where(Expr::col(MonthlySummaries::Category).eq(category));
            }
            select.to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::monthly_from_row).collect()
    }

    async fn monthly_keys_for_menu(&self, menu_code: i64) -> Result<Vec<YearMonth>> {
        let query = Query::select()
            .column(MonthlySummaries::YearMonth)
            .from(MonthlySummaries::Table)
            .and_where(Expr::col(MonthlySummaries::MenuCode).eq(menu_code))
            .order_by(MonthlySummaries::YearMonth, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut months = Vec::with_capacity(rows.len());
        for row in rows {
            let year_month: String = row.try_get("year_month")?;
            months.push(year_month.parse()?);
        }
        Ok(months)
    }
}
