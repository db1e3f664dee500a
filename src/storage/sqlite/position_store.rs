//! SQLite PositionStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use crate::storage::helpers::{count_from_i64, count_to_i64};
use crate::storage::schema::RollupPositions;
use crate::storage::{PositionStore, Result};

/// SQLite implementation of PositionStore.
pub struct SqlitePositionStore {
    pool: SqlitePool,
}

impl SqlitePositionStore {
    /// Create a new SQLite position store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionStore for SqlitePositionStore {
    async fn get(&self, handler: &str) -> Result<Option<u64>> {
        let query = Query::select()
            .column(RollupPositions::Sequence)
            .from(RollupPositions::Table)
            .and_where(Expr::col(RollupPositions::Handler).eq(handler))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => {
                let sequence: i64 = row.try_get("sequence")?;
                Ok(Some(count_from_i64("sequence", sequence)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, handler: &str, sequence: u64) -> Result<()> {
        let updated_at = chrono::Utc::now().to_rfc3339();

        let query = Query::insert()
            .into_table(RollupPositions::Table)
            .columns([
                RollupPositions::Handler,
                RollupPositions::Sequence,
                RollupPositions::UpdatedAt,
            ])
            .values_panic([
                handler.into(),
                count_to_i64(sequence).into(),
                updated_at.into(),
            ])
            .on_conflict(
                OnConflict::column(RollupPositions::Handler)
                    .update_columns([RollupPositions::Sequence, RollupPositions::UpdatedAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(())
    }
}
