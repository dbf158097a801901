use async_trait::async_trait;
use common::KioskToken;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{FallbackStore, ProductRecord, SyncStatus};
use crate::error::StoreError;

/// PostgreSQL-backed fallback store over the `supplier_products` table.
#[derive(Clone)]
pub struct PostgresFallbackStore {
    pool: PgPool,
}

impl PostgresFallbackStore {
    /// Creates a new PostgreSQL fallback store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<ProductRecord, StoreError> {
        let kiosk_token: String = row.try_get("kiosk_token")?;
        let stock: i64 = row.try_get("stock_quantity")?;
        let stock_quantity = u64::try_from(stock).map_err(|_| StoreError::CorruptRow {
            kiosk_token: kiosk_token.clone(),
            reason: format!("negative stock_quantity {stock}"),
        })?;
        let status: String = row.try_get("last_sync_status")?;

        Ok(ProductRecord {
            kiosk_token: KioskToken::new(kiosk_token),
            name: row.try_get("name")?,
            stock_quantity,
            price: row.try_get::<f64, _>("price")?.max(0.0),
            last_checked_at: row.try_get("last_checked_at")?,
            cached_until: row.try_get("cached_until")?,
            last_sync_status: SyncStatus::parse(&status),
            sync_message: row.try_get("sync_message")?,
        })
    }
}

#[async_trait]
impl FallbackStore for PostgresFallbackStore {
    async fn load(&self, kiosk_token: &KioskToken) -> Result<Option<ProductRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT kiosk_token, name, stock_quantity, price, last_checked_at,
                   cached_until, last_sync_status, sync_message
            FROM supplier_products
            WHERE kiosk_token = $1
            "#,
        )
        .bind(kiosk_token.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn save(&self, record: ProductRecord) -> Result<(), StoreError> {
        let stock = i64::try_from(record.stock_quantity).unwrap_or(i64::MAX);

        sqlx::query(
            r#"
            INSERT INTO supplier_products
                (kiosk_token, name, stock_quantity, price, last_checked_at,
                 cached_until, last_sync_status, sync_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (kiosk_token) DO UPDATE SET
                name = EXCLUDED.name,
                stock_quantity = EXCLUDED.stock_quantity,
                price = EXCLUDED.price,
                last_checked_at = EXCLUDED.last_checked_at,
                cached_until = EXCLUDED.cached_until,
                last_sync_status = EXCLUDED.last_sync_status,
                sync_message = EXCLUDED.sync_message
            "#,
        )
        .bind(record.kiosk_token.as_str())
        .bind(&record.name)
        .bind(stock)
        .bind(record.price.max(0.0))
        .bind(record.last_checked_at)
        .bind(record.cached_until)
        .bind(record.last_sync_status.as_str())
        .bind(&record.sync_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_sync_failure(
        &self,
        kiosk_token: &KioskToken,
        message: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE supplier_products
            SET last_sync_status = $2, sync_message = $3
            WHERE kiosk_token = $1
            "#,
        )
        .bind(kiosk_token.as_str())
        .bind(SyncStatus::Failed.as_str())
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
