//! Connection pool setup.
//!
//! The pool is created once at startup with [`create_pool`] and then passed
//! (by reference or as a cheap clone) to every data access call. Checked-out
//! connections return to the pool when dropped, so the number of live
//! connections never exceeds `max_size`.

use crate::error::{OrmError, OrmResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use serde::Deserialize;
use tokio_postgres::NoTls;

/// Connection parameters and pool bounds.
///
/// Deserializable, so it can sit inside an application's config file; the
/// credentials and database are required, everything else has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Statements run outside explicit transactions, so this must stay `true`.
    #[serde(default = "default_autocommit")]
    pub autocommit: bool,
    /// Connections opened eagerly by [`create_pool`].
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Async runtime the pool schedules on.
    #[serde(skip, default = "default_runtime")]
    pub runtime: Option<Runtime>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_charset() -> String {
    "UTF8".to_string()
}

fn default_autocommit() -> bool {
    true
}

fn default_min_size() -> usize {
    1
}

fn default_max_size() -> usize {
    10
}

fn default_runtime() -> Option<Runtime> {
    Some(Runtime::Tokio1)
}

impl PoolConfig {
    /// Required parameters; the rest take their defaults.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            charset: default_charset(),
            autocommit: default_autocommit(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            runtime: default_runtime(),
        }
    }

    /// Read `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_DATABASE`,
    /// `DB_CHARSET`, `DB_MIN_SIZE` and `DB_MAX_SIZE`.
    pub fn from_env() -> OrmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| OrmError::config(format!("missing environment variable {key}")))
        };
        let parsed = |key: &str| -> OrmResult<Option<usize>> {
            lookup(key)
                .map(|v| {
                    v.parse()
                        .map_err(|_| OrmError::config(format!("{key} is not a number: {v}")))
                })
                .transpose()
        };

        let mut config = Self::new(
            required("DB_USER")?,
            required("DB_PASSWORD")?,
            required("DB_DATABASE")?,
        );
        if let Some(host) = lookup("DB_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            config.port = port
                .parse()
                .map_err(|_| OrmError::config(format!("DB_PORT is not a port: {port}")))?;
        }
        if let Some(charset) = lookup("DB_CHARSET") {
            config.charset = charset;
        }
        if let Some(n) = parsed("DB_MIN_SIZE")? {
            config.min_size = n;
        }
        if let Some(n) = parsed("DB_MAX_SIZE")? {
            config.max_size = n;
        }
        Ok(config)
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    pub fn min_size(mut self, n: usize) -> Self {
        self.min_size = n;
        self
    }

    pub fn max_size(mut self, n: usize) -> Self {
        self.max_size = n;
        self
    }

    pub fn runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Check pool bounds and unsupported settings.
    pub fn validate(&self) -> OrmResult<()> {
        if self.max_size == 0 {
            return Err(OrmError::config("max_size must be at least 1"));
        }
        if self.min_size > self.max_size {
            return Err(OrmError::config(format!(
                "min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if !self.autocommit {
            return Err(OrmError::config(
                "autocommit = false is not supported: statements are never committed explicitly",
            ));
        }
        Ok(())
    }

    /// Driver-level connection settings.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.database)
            .options(&format!("-c client_encoding={}", self.charset));
        pg
    }
}

/// Create the connection pool and open `min_size` connections up front.
///
/// # Example
///
/// ```ignore
/// let pool = rowmap::create_pool(PoolConfig::new("www-data", "www-data", "awesome")).await?;
/// let user = User::find(&pool, 1).await?;
/// ```
pub async fn create_pool(config: PoolConfig) -> OrmResult<Pool> {
    config.validate()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        max_size = config.max_size,
        "create database connection pool"
    );

    let manager = Manager::from_config(
        config.pg_config(),
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    let mut builder = Pool::builder(manager).max_size(config.max_size);
    if let Some(runtime) = config.runtime {
        builder = builder.runtime(runtime);
    }
    let pool = builder.build().map_err(|e| OrmError::Connection(e.to_string()))?;

    // Hold all warm connections at once so each one is a fresh connect.
    let mut warm = Vec::with_capacity(config.min_size);
    for _ in 0..config.min_size {
        warm.push(pool.get().await?);
    }
    drop(warm);

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn new_applies_defaults() {
        let config = PoolConfig::new("www-data", "secret", "awesome");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.charset, "UTF8");
        assert!(config.autocommit);
        assert_eq!((config.min_size, config.max_size), (1, 10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: PoolConfig = serde_json::from_value(serde_json::json!({
            "user": "www-data",
            "password": "secret",
            "database": "awesome",
            "max_size": 4
        }))
        .unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.max_size, 4);
        assert!(matches!(config.runtime, Some(Runtime::Tokio1)));
    }

    #[test]
    fn credentials_are_required() {
        let err = serde_json::from_value::<PoolConfig>(serde_json::json!({"user": "u"}));
        assert!(err.is_err());

        let err = PoolConfig::from_lookup(lookup(&[("DB_USER", "u")])).unwrap_err();
        assert!(err.to_string().contains("DB_PASSWORD"));
    }

    #[test]
    fn reads_environment() {
        let config = PoolConfig::from_lookup(lookup(&[
            ("DB_USER", "u"),
            ("DB_PASSWORD", "p"),
            ("DB_DATABASE", "d"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6432"),
            ("DB_MAX_SIZE", "3"),
        ]))
        .unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6432);
        assert_eq!(config.max_size, 3);
        assert_eq!(config.min_size, 1);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = PoolConfig::from_lookup(lookup(&[
            ("DB_USER", "u"),
            ("DB_PASSWORD", "p"),
            ("DB_DATABASE", "d"),
            ("DB_MIN_SIZE", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
    }

    #[test]
    fn validate_checks_bounds_and_autocommit() {
        let base = PoolConfig::new("u", "p", "d");
        assert!(base.clone().max_size(0).validate().is_err());
        assert!(base.clone().min_size(5).max_size(2).validate().is_err());
        assert!(base.clone().autocommit(false).validate().is_err());
        assert!(base.min_size(0).max_size(1).validate().is_ok());
    }

    #[test]
    fn pg_config_carries_connection_parameters() {
        let pg = PoolConfig::new("u", "p", "d")
            .host("db")
            .port(6543)
            .charset("LATIN1")
            .pg_config();
        assert_eq!(pg.get_user(), Some("u"));
        assert_eq!(pg.get_dbname(), Some("d"));
        assert_eq!(pg.get_ports(), &[6543]);
        assert_eq!(pg.get_options(), Some("-c client_encoding=LATIN1"));
    }

    #[tokio::test]
    async fn invalid_config_fails_before_connecting() {
        let err = create_pool(PoolConfig::new("u", "p", "d").max_size(0))
            .await
            .unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
    }
}
