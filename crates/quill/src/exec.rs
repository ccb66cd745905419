use crate::{db::PoolConnection, QueryPlugin};

use quill_core::{
    driver::{
        operation::{RawSql, Transaction},
        NestingTracker, Response, RowSet, Rows,
    },
    stmt::Statement,
    Error, Result,
};

use std::sync::Arc;

/// Runs statements for one client call on a single pooled connection.
///
/// Every statement passes through the plugin pipeline before it reaches the
/// driver. Multi-statement calls bracket their work with [`begin`] and
/// [`finish`]; nested brackets become savepoints.
///
/// [`begin`]: Executor::begin
/// [`finish`]: Executor::finish
pub(crate) struct Executor<'a> {
    connection: PoolConnection,
    plugins: &'a [Arc<dyn QueryPlugin>],
    transaction: NestingTracker,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(connection: PoolConnection, plugins: &'a [Arc<dyn QueryPlugin>]) -> Self {
        Executor {
            connection,
            plugins,
            transaction: NestingTracker::default(),
        }
    }

    fn prepare(&self, stmt: Statement) -> Result<Statement> {
        self.plugins
            .iter()
            .try_fold(stmt, |stmt, plugin| plugin.transform_query(stmt))
    }

    fn finalize(&self, rows: RowSet) -> Result<RowSet> {
        self.plugins
            .iter()
            .rev()
            .try_fold(rows, |rows, plugin| plugin.transform_result(rows))
    }

    /// Executes a statement that yields rows.
    pub(crate) async fn query(&mut self, stmt: impl Into<Statement>) -> Result<RowSet> {
        let stmt = self.prepare(stmt.into())?;
        let response = self.connection.exec(stmt.into()).await?;

        match response.rows {
            Rows::Values(rows) => self.finalize(rows),
            Rows::Count(_) => Err(Error::internal("expected rows, driver returned a count")),
        }
    }

    /// Executes a statement for its effect, returning the driver response.
    pub(crate) async fn execute(&mut self, stmt: impl Into<Statement>) -> Result<Response> {
        let stmt = self.prepare(stmt.into())?;
        let response = self.connection.exec(stmt.into()).await?;

        Ok(match response.rows {
            Rows::Values(rows) => Response {
                rows: Rows::Values(self.finalize(rows)?),
                last_insert_id: response.last_insert_id,
            },
            rows @ Rows::Count(_) => Response {
                rows,
                last_insert_id: response.last_insert_id,
            },
        })
    }

    /// Executes caller-provided SQL; plugins do not see raw statements.
    pub(crate) async fn raw(&mut self, op: RawSql) -> Result<Response> {
        self.connection.exec(op.into()).await
    }

    pub(crate) async fn begin(&mut self) -> Result<()> {
        let op = self.transaction.begin();
        self.transaction_op(op).await
    }

    async fn commit(&mut self) -> Result<()> {
        let op = self.transaction.commit();
        self.transaction_op(op).await
    }

    async fn rollback(&mut self) -> Result<()> {
        let op = self.transaction.rollback();
        self.transaction_op(op).await
    }

    /// Commits the innermost transaction when `result` is `Ok`, rolls it back
    /// otherwise, and passes `result` through.
    pub(crate) async fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(error = %rollback_err, cause = %err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn transaction_op(&mut self, op: Transaction) -> Result<()> {
        self.connection.exec(op.into()).await?;
        Ok(())
    }
}
