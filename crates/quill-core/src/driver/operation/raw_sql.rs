use super::Operation;
use crate::stmt::Value;

#[derive(Debug, Clone)]
pub struct RawSql {
    /// SQL text using the provider's own placeholder syntax
    pub sql: String,

    pub params: Vec<Value>,

    /// When `true` the rows produced by the statement are returned,
    /// otherwise the affected row count.
    pub returns_rows: bool,
}

impl From<RawSql> for Operation {
    fn from(value: RawSql) -> Self {
        Self::RawSql(value)
    }
}
