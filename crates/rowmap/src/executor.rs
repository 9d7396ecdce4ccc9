//! Query execution against pooled or held connections.
//!
//! [`Executor`] is the seam between models and the driver: models render SQL
//! with `?` markers and hand it over together with their arguments. The
//! implementations here translate markers to `$n`, bind the arguments and
//! shape results into [`Record`]s. Driver errors come back unchanged as
//! [`OrmError::Query`](crate::OrmError::Query); nothing is retried.

use crate::error::OrmResult;
use crate::placeholder;
use crate::record::Record;
use crate::value::Value;
use futures_util::{TryStreamExt, pin_mut};
use tokio_postgres::types::ToSql;

/// Something that can run `SELECT`s and statements.
///
/// Implemented for a [`deadpool_postgres::Pool`] (one checkout per call), and
/// for connections already held by the caller.
pub trait Executor: Send + Sync {
    /// Run a query and return its rows.
    ///
    /// `size` caps the number of rows fetched; `None` (or `Some(0)`) fetches
    /// all of them.
    fn select(
        &self,
        sql: &str,
        args: &[Value],
        size: Option<usize>,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;
}

async fn select_on(
    client: &tokio_postgres::Client,
    sql: &str,
    args: &[Value],
    size: Option<usize>,
) -> OrmResult<Vec<Record>> {
    tracing::debug!(target: "rowmap.sql", sql = %sql, param_count = args.len(), "SQL");
    let exec_sql = placeholder::translate(sql);
    let max_rows = size.filter(|n| *n > 0).unwrap_or(usize::MAX);

    let stream = client.query_raw(exec_sql.as_str(), args.iter()).await?;
    pin_mut!(stream);

    let mut records = Vec::new();
    while records.len() < max_rows {
        let Some(row) = stream.try_next().await? else {
            break;
        };
        records.push(Record::from_row(&row)?);
    }

    tracing::info!(target: "rowmap.sql", rows = records.len(), "rows returned");
    Ok(records)
}

async fn execute_on(client: &tokio_postgres::Client, sql: &str, args: &[Value]) -> OrmResult<u64> {
    tracing::debug!(target: "rowmap.sql", sql = %sql, param_count = args.len(), "SQL");
    let exec_sql = placeholder::translate(sql);
    let params: Vec<&(dyn ToSql + Sync)> = args.iter().map(|v| v as _).collect();
    Ok(client.execute(exec_sql.as_str(), &params).await?)
}

impl Executor for deadpool_postgres::Pool {
    async fn select(&self, sql: &str, args: &[Value], size: Option<usize>) -> OrmResult<Vec<Record>> {
        // The checked-out connection goes back to the pool when `client` drops.
        let client = self.get().await?;
        select_on(&client, sql, args, size).await
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        let client = self.get().await?;
        execute_on(&client, sql, args).await
    }
}

impl Executor for deadpool_postgres::Client {
    async fn select(&self, sql: &str, args: &[Value], size: Option<usize>) -> OrmResult<Vec<Record>> {
        select_on(self, sql, args, size).await
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        execute_on(self, sql, args).await
    }
}

impl Executor for tokio_postgres::Client {
    async fn select(&self, sql: &str, args: &[Value], size: Option<usize>) -> OrmResult<Vec<Record>> {
        select_on(self, sql, args, size).await
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        execute_on(self, sql, args).await
    }
}

impl<E: Executor> Executor for &E {
    fn select(
        &self,
        sql: &str,
        args: &[Value],
        size: Option<usize>,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send {
        (**self).select(sql, args, size)
    }

    fn execute(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, args)
    }
}
