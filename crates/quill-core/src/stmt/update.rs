use super::{Expr, SelectItem, TableName};

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: TableName,
    pub assignments: Vec<Assignment>,
    pub filter: Option<Expr>,

    /// Only emitted on providers that accept `UPDATE .. LIMIT`
    pub limit: Option<u64>,

    pub returning: Vec<SelectItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Unqualified column name
    pub column: String,
    pub value: Expr,
}
