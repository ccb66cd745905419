mod delete;
pub use delete::Delete;

mod expr;
pub use expr::{
    BinaryOp, CastType, Expr, ExprBinaryOp, ExprCase, ExprCast, ExprColumn, ExprFunc,
    ExprInList, ExprInSubquery, ExprIsNull, ExprJsonObject, ExprLike,
};

mod insert;
pub use insert::{Insert, OnConflict};

mod select;
pub use select::{
    Direction, Distinct, Join, JoinKind, NullsOrder, OrderByExpr, Select, SelectItem, TableName,
    TableRef,
};

mod update;
pub use update::{Assignment, Update};

mod value;
pub use value::Value;

mod visit;
pub use visit::{for_each_expr, for_each_table, Visit};

/// A SQL statement ready to be serialized by a dialect flavor.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    /// `true` if executing the statement yields rows.
    pub fn returns_rows(&self) -> bool {
        match self {
            Statement::Query(_) => true,
            Statement::Insert(stmt) => !stmt.returning.is_empty(),
            Statement::Update(stmt) => !stmt.returning.is_empty(),
            Statement::Delete(stmt) => !stmt.returning.is_empty(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Query(_) => "select",
            Statement::Insert(_) => "insert",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
        }
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Statement::Query(value)
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Statement::Insert(value)
    }
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Statement::Update(value)
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Statement::Delete(value)
    }
}
