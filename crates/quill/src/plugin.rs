//! Hooks run around every statement the client executes.

use quill_core::{driver::RowSet, stmt::Statement, Result};

use std::fmt::Debug;

/// Rewrites statements before execution and rows after it.
///
/// Plugins registered on the builder run in registration order on the way
/// in and in reverse order on the way out. The name mapper always runs last
/// on the way in, so plugins see logical model and field names.
pub trait QueryPlugin: Debug + Send + Sync + 'static {
    fn name(&self) -> &str;

    fn transform_query(&self, stmt: Statement) -> Result<Statement> {
        Ok(stmt)
    }

    fn transform_result(&self, rows: RowSet) -> Result<RowSet> {
        Ok(rows)
    }
}
