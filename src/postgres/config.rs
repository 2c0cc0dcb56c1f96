use deadpool_postgres::{Config as PgConfig, Runtime};
use tokio_postgres::NoTls;
use tracing::debug;

use crate::database::{Database, DatabasePool};
use crate::error::SqlAccessorError;
use crate::types::DatabaseType;

/// Options for configuring a Postgres pool.
///
/// Either `config.url` or all of dbname/host/port/user/password must be set.
#[derive(Debug, Clone, Default)]
pub struct PostgresOptions {
    pub config: PgConfig,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(config: PgConfig) -> Self {
        Self { config }
    }

    /// Options from a `postgres://` connection string.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        let mut config = PgConfig::new();
        config.url = Some(url.into());
        Self { config }
    }

    fn validate(&self) -> Result<(), SqlAccessorError> {
        let cfg = &self.config;
        if cfg.url.is_some() {
            return Ok(());
        }
        let required = [
            ("dbname", cfg.dbname.is_some()),
            ("host", cfg.host.is_some()),
            ("port", cfg.port.is_some()),
            ("user", cfg.user.is_some()),
            ("password", cfg.password.is_some()),
        ];
        match required.iter().find(|(_, present)| !present) {
            Some((field, _)) => Err(SqlAccessorError::ConfigError(format!("{field} is required"))),
            None => Ok(()),
        }
    }
}

/// Fluent builder for Postgres options.
#[derive(Debug, Clone, Default)]
pub struct PostgresOptionsBuilder {
    opts: PostgresOptions,
}

impl PostgresOptionsBuilder {
    #[must_use]
    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.opts.config.dbname = Some(dbname.into());
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.opts.config.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.config.port = Some(port);
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.opts.config.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.opts.config.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> PostgresOptions {
        self.opts
    }

    /// Build a [`Database`] backed by Postgres.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ConfigError` if required fields are missing.
    pub async fn build(self) -> Result<Database, SqlAccessorError> {
        Database::new_postgres(self.finish()).await
    }
}

impl Database {
    #[must_use]
    pub fn postgres_builder() -> PostgresOptionsBuilder {
        PostgresOptionsBuilder::default()
    }

    /// Create a deadpool-postgres pool. Connections are opened lazily.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ConfigError` if required config fields are
    /// missing or `SqlAccessorError::ConnectionError` if pool creation fails.
    #[allow(clippy::unused_async)]
    pub async fn new_postgres(opts: PostgresOptions) -> Result<Self, SqlAccessorError> {
        opts.validate()?;
        let pool = opts
            .config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| {
                SqlAccessorError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
            })?;
        debug!(host = ?opts.config.host, dbname = ?opts.config.dbname, "postgres pool ready");
        Ok(Database::from_parts(DatabasePool::Postgres(pool), DatabaseType::Postgres))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_reported_in_order() {
        let opts = Database::postgres_builder().dbname("app").host("localhost").finish();
        let err = opts.validate().unwrap_err();
        assert!(matches!(err, SqlAccessorError::ConfigError(ref msg) if msg == "port is required"));
    }

    #[test]
    fn url_skips_field_validation() {
        assert!(PostgresOptions::from_url("postgres://u:p@localhost/app").validate().is_ok());
    }
}
