use quill_core::{stmt, Error, Result};
use rusqlite::{
    types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef},
    Row,
};

/// A wire value as bound to, or read from, a SQLite statement.
#[derive(Debug)]
pub struct Value(stmt::Value);

impl From<stmt::Value> for Value {
    fn from(value: stmt::Value) -> Self {
        Self(value)
    }
}

impl Value {
    pub fn into_inner(self) -> stmt::Value {
        self.0
    }

    /// Reads column `index` of `row`.
    ///
    /// SQLite only has five storage classes; converting into the field's
    /// application type is left to the dialect.
    pub fn from_sql(row: &Row, index: usize) -> Result<Self> {
        let value: SqlValue = row.get(index).map_err(Error::driver_operation_failed)?;

        Ok(Value(match value {
            SqlValue::Null => stmt::Value::Null,
            SqlValue::Integer(value) => stmt::Value::I64(value),
            SqlValue::Real(value) => stmt::Value::F64(value),
            SqlValue::Text(value) => stmt::Value::String(value),
            SqlValue::Blob(value) => stmt::Value::Bytes(value),
        }))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use stmt::Value::*;

        match &self.0 {
            Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
            Bool(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v as i64))),
            I64(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v))),
            F64(v) => Ok(ToSqlOutput::Owned(SqlValue::Real(*v))),
            String(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
            Bytes(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&v[..]))),
            Decimal(v) => Ok(ToSqlOutput::Owned(SqlValue::Text(v.to_string()))),
            DateTime(v) => Ok(ToSqlOutput::Owned(SqlValue::Text(
                v.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ))),
            Json(v) => Ok(ToSqlOutput::Owned(SqlValue::Text(v.to_string()))),
            List(_) => Err(rusqlite::Error::ToSqlConversionFailure(
                "SQLite has no array type".into(),
            )),
        }
    }
}
