use super::{Expr, SelectItem, TableName};

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: TableName,
    pub filter: Option<Expr>,

    /// Only emitted on providers that accept `DELETE .. LIMIT`
    pub limit: Option<u64>,

    pub returning: Vec<SelectItem>,
}
