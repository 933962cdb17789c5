//! PostgreSQL credential store with connection pooling

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};

use crate::domain::StoreError;
use crate::domain::credential::{
    ApiKeyRecord, CredentialStore, RecordId, RecordStatus, RoleSet, validate_api_key,
    validate_email, validate_roles,
};

const TABLE: &str = "api_key_records";

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/credstore".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}

/// PostgreSQL implementation of [`CredentialStore`]
///
/// Uniqueness among active keys is enforced by a partial unique index, and
/// every mutation is a single statement, so rotation atomicity and rollback
/// on failure are the database's own guarantees. Revocation is a soft
/// delete (`revoked_at`), which keeps ids from ever being reused.
#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    /// Create a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool from configuration
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::storage(format!("failed to connect to PostgreSQL: {e}")))?;

        Ok(Self::new(pool))
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ensures the table and the active-key unique index exist
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {TABLE} (
                id BIGSERIAL PRIMARY KEY,
                api_key VARCHAR(50) NOT NULL,
                email VARCHAR(255) NOT NULL,
                roles VARCHAR(255) NOT NULL,
                revoked_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_used_at TIMESTAMPTZ
            )
            "#
        );

        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::storage(format!("failed to create table: {e}")))?;

        let create_index = format!(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS {TABLE}_active_key
            ON {TABLE} (api_key) WHERE revoked_at IS NULL
            "#
        );

        sqlx::query(&create_index)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::storage(format!("failed to create index: {e}")))?;

        Ok(())
    }

    fn record_from_row(row: &PgRow) -> Result<ApiKeyRecord, StoreError> {
        let id: i64 = Self::column(row, "id")?;
        let api_key: String = Self::column(row, "api_key")?;
        let email: String = Self::column(row, "email")?;
        let roles: String = Self::column(row, "roles")?;
        let revoked_at: Option<DateTime<Utc>> = Self::column(row, "revoked_at")?;
        let created_at: DateTime<Utc> = Self::column(row, "created_at")?;
        let updated_at: DateTime<Utc> = Self::column(row, "updated_at")?;
        let last_used_at: Option<DateTime<Utc>> = Self::column(row, "last_used_at")?;

        let status = if revoked_at.is_some() {
            RecordStatus::Revoked
        } else {
            RecordStatus::Active
        };

        Ok(ApiKeyRecord::from_parts(
            RecordId::new(id),
            api_key,
            email,
            RoleSet::decode(&roles),
            status,
            created_at,
            updated_at,
            last_used_at,
        ))
    }

    fn column<'r, T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>>(
        row: &'r PgRow,
        name: &str,
    ) -> Result<T, StoreError> {
        row.try_get(name)
            .map_err(|e| StoreError::storage(format!("failed to decode column {name}: {e}")))
    }

    fn map_unique_violation(e: sqlx::Error) -> StoreError {
        // The database error text echoes the offending value, so it is
        // dropped on the duplicate path.
        if e.to_string().contains("duplicate key") {
            StoreError::DuplicateKey
        } else {
            StoreError::storage(format!("query failed: {e}"))
        }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn create(
        &self,
        api_key: &str,
        email: &str,
        roles: &RoleSet,
    ) -> Result<RecordId, StoreError> {
        validate_api_key(api_key)?;
        validate_email(email)?;
        validate_roles(roles)?;

        let query = format!("INSERT INTO {TABLE} (api_key, email, roles) VALUES ($1, $2, $3) RETURNING id");

        let row = sqlx::query(&query)
            .bind(api_key)
            .bind(email)
            .bind(roles.encode())
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_unique_violation)?;

        let id: i64 = Self::column(&row, "id")?;
        Ok(RecordId::new(id))
    }

    async fn lookup(&self, api_key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        let query = format!(
            "SELECT id, api_key, email, roles, revoked_at, created_at, updated_at, last_used_at \
             FROM {TABLE} WHERE api_key = $1 AND revoked_at IS NULL"
        );

        let row = sqlx::query(&query)
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::storage(format!("lookup query failed: {e}")))?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn get(&self, id: RecordId) -> Result<Option<ApiKeyRecord>, StoreError> {
        let query = format!(
            "SELECT id, api_key, email, roles, revoked_at, created_at, updated_at, last_used_at \
             FROM {TABLE} WHERE id = $1"
        );

        let row = sqlx::query(&query)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::storage(format!("get query failed: {e}")))?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn update_roles(&self, id: RecordId, roles: &RoleSet) -> Result<(), StoreError> {
        validate_roles(roles)?;

        let query = format!(
            "UPDATE {TABLE} SET roles = $2, updated_at = NOW() \
             WHERE id = $1 AND revoked_at IS NULL"
        );

        let result = sqlx::query(&query)
            .bind(id.as_i64())
            .bind(roles.encode())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::storage(format!("update query failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "no active record with id {id}"
            )));
        }

        Ok(())
    }

    async fn rotate_key(&self, id: RecordId, new_api_key: &str) -> Result<(), StoreError> {
        validate_api_key(new_api_key)?;

        // One statement: the swap commits atomically and the partial unique
        // index arbitrates collisions with concurrent writers.
        let query = format!(
            "UPDATE {TABLE} SET api_key = $2, updated_at = NOW() \
             WHERE id = $1 AND revoked_at IS NULL"
        );

        let result = sqlx::query(&query)
            .bind(id.as_i64())
            .bind(new_api_key)
            .execute(&self.pool)
            .await
            .map_err(Self::map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "no active record with id {id}"
            )));
        }

        Ok(())
    }

    async fn revoke(&self, id: RecordId) -> Result<(), StoreError> {
        let query = format!(
            "UPDATE {TABLE} SET revoked_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND revoked_at IS NULL"
        );

        // Zero affected rows means the record is already revoked or never
        // existed; revoke is idempotent either way.
        sqlx::query(&query)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::storage(format!("revoke query failed: {e}")))?;

        Ok(())
    }

    async fn record_usage(&self, id: RecordId) -> Result<(), StoreError> {
        let query = format!(
            "UPDATE {TABLE} SET last_used_at = NOW() \
             WHERE id = $1 AND revoked_at IS NULL"
        );

        let result = sqlx::query(&query)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::storage(format!("usage query failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "no active record with id {id}"
            )));
        }

        Ok(())
    }

    async fn list(&self, status: Option<RecordStatus>) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let filter = match status {
            Some(RecordStatus::Active) => " WHERE revoked_at IS NULL",
            Some(RecordStatus::Revoked) => " WHERE revoked_at IS NOT NULL",
            None => "",
        };

        let query = format!(
            "SELECT id, api_key, email, roles, revoked_at, created_at, updated_at, last_used_at \
             FROM {TABLE}{filter} ORDER BY id"
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::storage(format!("list query failed: {e}")))?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn count(&self, status: Option<RecordStatus>) -> Result<usize, StoreError> {
        let filter = match status {
            Some(RecordStatus::Active) => " WHERE revoked_at IS NULL",
            Some(RecordStatus::Revoked) => " WHERE revoked_at IS NOT NULL",
            None => "",
        };

        let query = format!("SELECT COUNT(*) AS count FROM {TABLE}{filter}");

        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::storage(format!("count query failed: {e}")))?;

        let count: i64 = Self::column(&row, "count")?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_default() {
        let config = PostgresConfig::default();

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.idle_timeout_secs, 600);
    }

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("postgres://localhost/test")
            .with_max_connections(20)
            .with_min_connections(5)
            .with_connect_timeout(60)
            .with_idle_timeout(300);

        assert_eq!(config.url, "postgres://localhost/test");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.connect_timeout_secs, 60);
        assert_eq!(config.idle_timeout_secs, 300);
    }
}
