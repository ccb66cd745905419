mod query_sql;
pub use query_sql::QuerySql;

mod raw_sql;
pub use raw_sql::RawSql;

mod transaction;
pub use transaction::Transaction;

#[derive(Debug, Clone)]
pub enum Operation {
    /// Execute a SQL statement built by the query builder
    QuerySql(QuerySql),

    /// Execute caller-provided SQL text
    RawSql(RawSql),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::QuerySql(op) => op.stmt.kind(),
            Operation::RawSql(_) => "raw",
            Operation::Transaction(_) => "transaction",
        }
    }
}
