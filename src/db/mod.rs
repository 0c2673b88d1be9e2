//! Database layer
//!
//! Storage for the Gazette content store. Two backends are supported:
//! - SQLite (default, single-binary deployment)
//! - MySQL (larger deployments)
//!
//! Repositories hold a `DynDatabasePool` and dispatch on its driver through
//! [`on_pool!`]. SQL is written once with `?` placeholders, which both
//! backends accept.
//!
//! # Usage
//!
//! ```ignore
//! use gazette::config::DatabaseConfig;
//! use gazette::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod query;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
pub use query::{PostFilter, PostOrder, PostQuery, SqlValue};

/// Run `$body` against the concrete pool behind a `DynDatabasePool`.
///
/// The body is expanded once per backend with `$conn` bound to
/// `&SqlitePool` or `&MySqlPool`, so query builders and row types resolve
/// to the right driver by inference.
macro_rules! on_pool {
    ($pool:expr, |$conn:ident| $body:expr) => {{
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $conn = $pool
                    .as_sqlite()
                    .ok_or_else(|| ::anyhow::anyhow!("SQLite pool unavailable"))?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $conn = $pool
                    .as_mysql()
                    .ok_or_else(|| ::anyhow::anyhow!("MySQL pool unavailable"))?;
                $body
            }
        }
    }};
}

/// Bind a slice of [`SqlValue`]s onto a query in order.
macro_rules! bind_values {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                $crate::db::SqlValue::Int(v) => query.bind(*v),
                $crate::db::SqlValue::Text(v) => query.bind(v.clone()),
                $crate::db::SqlValue::Timestamp(v) => query.bind(*v),
            };
        }
        query
    }};
}

pub(crate) use bind_values;
pub(crate) use on_pool;

/// Row id produced by an INSERT, for either backend.
pub trait LastInsertId {
    fn last_id(&self) -> i64;
}

impl LastInsertId for sqlx::sqlite::SqliteQueryResult {
    fn last_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl LastInsertId for sqlx::mysql::MySqlQueryResult {
    fn last_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}
