//! Repository for the `app_settings` table.

use std::collections::BTreeMap;

use sqlx::PgPool;

use crate::models::setting::AppSetting;

const COLUMNS: &str = "key, value, updated_at";

pub struct SettingRepo;

impl SettingRepo {
    /// List all settings ordered by key.
    pub async fn list(pool: &PgPool) -> Result<Vec<AppSetting>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM app_settings ORDER BY key");
        sqlx::query_as::<_, AppSetting>(&query)
            .fetch_all(pool)
            .await
    }

    /// Read a single setting value.
    pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM app_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Insert or update a batch of already validated settings.
    ///
    /// All rows are written in a single transaction.
    pub async fn bulk_upsert(
        pool: &PgPool,
        settings: &BTreeMap<String, String>,
    ) -> Result<Vec<AppSetting>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut results = Vec::with_capacity(settings.len());

        let query = format!(
            "INSERT INTO app_settings (key, value) \
             VALUES ($1, $2) \
             ON CONFLICT (key) \
             DO UPDATE SET value = EXCLUDED.value, updated_at = NOW() \
             RETURNING {COLUMNS}"
        );

        for (key, value) in settings {
            let row = sqlx::query_as::<_, AppSetting>(&query)
                .bind(key)
                .bind(value)
                .fetch_one(&mut *tx)
                .await?;
            results.push(row);
        }

        tx.commit().await?;
        Ok(results)
    }
}
