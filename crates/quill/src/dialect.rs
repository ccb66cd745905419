//! Provider-specific SQL construction and value conversion.
//!
//! The query builder produces provider-neutral [`stmt`] trees and asks the
//! active [`Dialect`] for the pieces that differ: how values are encoded,
//! how JSON is navigated, and what native array operators exist.

mod mysql;
pub use mysql::MySql;

mod postgresql;
pub use postgresql::PostgreSql;

mod sqlite;
pub use sqlite::Sqlite;

pub(crate) mod subselect;

mod value;
pub use value::{ScalarType, ValueType};
pub(crate) use value::parse_datetime;

use quill_core::{
    driver::Capability,
    schema::Provider,
    stmt::{self, CastType, Expr},
    Error, Result, Value,
};

use std::{fmt::Debug, sync::Arc};

/// One step of a JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),

    /// Array element; negative indices count from the end.
    Index(i64),
}

/// Operators on native scalar-list columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayOp {
    Has,
    HasEvery,
    HasSome,
}

impl ArrayOp {
    pub fn name(self) -> &'static str {
        match self {
            ArrayOp::Has => "has",
            ArrayOp::HasEvery => "hasEvery",
            ArrayOp::HasSome => "hasSome",
        }
    }
}

pub trait Dialect: Debug + Send + Sync + 'static {
    fn provider(&self) -> Provider;

    fn capability(&self) -> &'static Capability;

    /// Encodes an application value for a column of type `ty`.
    fn transform_input(&self, value: &Value, ty: &ValueType<'_>) -> Result<stmt::Value>;

    /// Decodes a column value read back from the database.
    fn transform_output(&self, value: stmt::Value, ty: &ValueType<'_>) -> Result<Value> {
        value::output(value, ty)
    }

    /// Decodes a value that was read inside a JSON object, as produced for
    /// nested relation selections.
    fn transform_json_output(&self, json: serde_json::Value, ty: &ValueType<'_>) -> Result<Value> {
        value::json_output(json, ty)
    }

    /// Wraps a column so it survives embedding in a JSON object.
    fn json_embed(&self, expr: Expr, ty: &ValueType<'_>) -> Expr;

    /// Marks `expr` as JSON so nesting it in another JSON value does not
    /// turn it into a string.
    fn json_value(&self, expr: Expr) -> Expr {
        expr
    }

    /// The empty JSON array, used when a to-many relation has no rows.
    fn empty_json_array(&self) -> Expr;

    /// Extracts the JSON value at `path`.
    fn json_get(&self, expr: Expr, path: &[PathSegment]) -> Expr;

    /// Extracts the value at `path` as unquoted text.
    fn json_get_text(&self, expr: Expr, path: &[PathSegment]) -> Expr;

    /// Compares a JSON-typed expression with a JSON literal.
    fn json_equals(&self, lhs: Expr, value: &serde_json::Value) -> Expr {
        let lhs = self.json_value(lhs);
        let rhs = Expr::cast(
            Expr::value(stmt::Value::Json(value.clone())),
            CastType::Json,
        );
        Expr::eq(lhs, rhs)
    }

    /// `true` when the JSON array at `path` contains every element of
    /// `values`.
    fn json_array_contains(
        &self,
        expr: Expr,
        path: &[PathSegment],
        values: &[serde_json::Value],
    ) -> Expr;

    /// Applies an operator to a native scalar-list column.
    fn array_filter(&self, column: Expr, op: ArrayOp, values: stmt::Value) -> Result<Expr> {
        let _ = (column, values);
        Err(Error::not_supported(
            format!("array filter \"{}\"", op.name()),
            self.provider().name(),
        ))
    }

    /// Tests a scalar-list column for emptiness.
    fn array_is_empty(&self, column: Expr, empty: bool) -> Result<Expr> {
        let _ = (column, empty);
        Err(Error::not_supported(
            "array filter \"isEmpty\"",
            self.provider().name(),
        ))
    }

    /// Appends `values` to a scalar-list column.
    fn array_push(&self, column: Expr, values: Vec<stmt::Value>) -> Result<Expr>;
}

/// Picks the dialect for `provider`.
pub fn for_provider(provider: Provider) -> Arc<dyn Dialect> {
    match provider {
        Provider::Sqlite => Arc::new(Sqlite),
        Provider::Postgresql => Arc::new(PostgreSql),
        Provider::Mysql => Arc::new(MySql),
    }
}

/// Renders `path` in the `$.a.b[0]` form SQLite and MySQL share. They
/// differ only in how an index from the end is spelled.
fn dollar_path(path: &[PathSegment], provider: Provider) -> String {
    let mut ret = String::from("$");
    for segment in path {
        match segment {
            PathSegment::Key(key) if key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                ret.push('.');
                ret.push_str(key);
            }
            PathSegment::Key(key) => {
                ret.push_str(".\"");
                ret.push_str(&key.replace('"', "\\\""));
                ret.push('"');
            }
            PathSegment::Index(index) if *index >= 0 => ret.push_str(&format!("[{index}]")),
            PathSegment::Index(-1) if provider == Provider::Mysql => ret.push_str("[last]"),
            PathSegment::Index(index) if provider == Provider::Mysql => {
                ret.push_str(&format!("[last-{}]", -index - 1))
            }
            PathSegment::Index(index) => ret.push_str(&format!("[#{index}]")),
        }
    }
    ret
}
