use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use postgres::types::{private::BytesMut, to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use quill_core::{stmt, Error, Result};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use std::str::FromStr;
use tokio_postgres::Row;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// A wire value bound to a PostgreSQL statement.
///
/// The server infers each parameter's type from the statement, so the value
/// is converted to whatever type the placeholder was prepared with.
#[derive(Debug, Clone)]
pub struct Value(stmt::Value);

impl From<stmt::Value> for Value {
    fn from(value: stmt::Value) -> Self {
        Self(value)
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        if let Kind::Enum(_) = ty.kind() {
            return match &self.0 {
                stmt::Value::Null => Ok(IsNull::Yes),
                stmt::Value::String(value) => {
                    out.extend_from_slice(value.as_bytes());
                    Ok(IsNull::No)
                }
                value => Err(mismatch(value, ty)),
            };
        }

        match &self.0 {
            stmt::Value::Null => Ok(IsNull::Yes),
            stmt::Value::Bool(value) => match *ty {
                Type::BOOL => value.to_sql(ty, out),
                Type::INT2 => (*value as i16).to_sql(ty, out),
                Type::INT4 => (*value as i32).to_sql(ty, out),
                Type::INT8 => (*value as i64).to_sql(ty, out),
                _ => Err(mismatch(&self.0, ty)),
            },
            stmt::Value::I64(value) => match *ty {
                Type::INT2 => i16::try_from(*value)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*value)?.to_sql(ty, out),
                Type::INT8 => value.to_sql(ty, out),
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::FLOAT8 => (*value as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*value).to_sql(ty, out),
                Type::BOOL => (*value != 0).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => Err(mismatch(&self.0, ty)),
            },
            stmt::Value::F64(value) => match *ty {
                Type::FLOAT8 => value.to_sql(ty, out),
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::from_f64(*value)
                    .ok_or_else(|| mismatch(&self.0, ty))?
                    .to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => Err(mismatch(&self.0, ty)),
            },
            stmt::Value::String(value) => match *ty {
                Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.clone()))
                    .to_sql(ty, out),
                Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(value)?
                    .with_timezone(&Utc)
                    .to_sql(ty, out),
                Type::TIMESTAMP => DateTime::parse_from_rfc3339(value)?
                    .naive_utc()
                    .to_sql(ty, out),
                Type::NUMERIC => Decimal::from_str(value)?.to_sql(ty, out),
                Type::INT8 => value.parse::<i64>()?.to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            stmt::Value::Bytes(value) => value.to_sql(ty, out),
            stmt::Value::Decimal(value) => match *ty {
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            stmt::Value::DateTime(value) => match *ty {
                Type::TIMESTAMP => value.naive_utc().to_sql(ty, out),
                Type::DATE => value.date_naive().to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
                    .to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            stmt::Value::Json(value) => match *ty {
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            stmt::Value::List(values) => {
                let values: Vec<Value> = values.iter().cloned().map(Value).collect();
                values.to_sql(ty, out)
            }
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn mismatch(value: &stmt::Value, ty: &Type) -> BoxError {
    format!("cannot bind {} to a parameter of type {ty}", value.variant_name()).into()
}

/// Reads the raw text of an enum (or any text-encoded) column.
struct RawText(String);

impl<'a> FromSql<'a> for RawText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        Ok(RawText(String::from_utf8(raw.to_vec())?))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, index: usize) -> Result<Option<T>> {
    row.try_get(index).map_err(Error::driver_operation_failed)
}

fn list<'a, T>(row: &'a Row, index: usize, f: impl Fn(T) -> stmt::Value) -> Result<stmt::Value>
where
    T: FromSql<'a>,
{
    Ok(get::<Vec<T>>(row, index)?
        .map(|items| stmt::Value::List(items.into_iter().map(f).collect()))
        .unwrap_or_default())
}

/// Converts column `index` of `row` into a wire value.
pub(crate) fn from_row(row: &Row, index: usize, ty: &Type) -> Result<stmt::Value> {
    fn opt<T>(value: Option<T>, f: impl FnOnce(T) -> stmt::Value) -> stmt::Value {
        value.map(f).unwrap_or_default()
    }

    if let Kind::Enum(_) = ty.kind() {
        return Ok(opt(get::<RawText>(row, index)?, |v| stmt::Value::String(v.0)));
    }

    Ok(match *ty {
        Type::BOOL => opt(get::<bool>(row, index)?, stmt::Value::Bool),
        Type::INT2 => opt(get::<i16>(row, index)?, |v| stmt::Value::I64(v.into())),
        Type::INT4 => opt(get::<i32>(row, index)?, |v| stmt::Value::I64(v.into())),
        Type::INT8 => opt(get::<i64>(row, index)?, stmt::Value::I64),
        Type::FLOAT4 => opt(get::<f32>(row, index)?, |v| stmt::Value::F64(v.into())),
        Type::FLOAT8 => opt(get::<f64>(row, index)?, stmt::Value::F64),
        Type::NUMERIC => opt(get::<Decimal>(row, index)?, stmt::Value::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            opt(get::<String>(row, index)?, stmt::Value::String)
        }
        Type::BYTEA => opt(get::<Vec<u8>>(row, index)?, stmt::Value::Bytes),
        Type::TIMESTAMPTZ => opt(get::<DateTime<Utc>>(row, index)?, stmt::Value::DateTime),
        Type::TIMESTAMP => opt(get::<NaiveDateTime>(row, index)?, |v| {
            stmt::Value::DateTime(v.and_utc())
        }),
        Type::DATE => opt(get::<NaiveDate>(row, index)?, |v| {
            stmt::Value::DateTime(v.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
        }),
        Type::JSON | Type::JSONB => opt(get::<serde_json::Value>(row, index)?, stmt::Value::Json),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => list(row, index, stmt::Value::String)?,
        Type::INT4_ARRAY => list(row, index, |v: i32| stmt::Value::I64(v.into()))?,
        Type::INT8_ARRAY => list(row, index, stmt::Value::I64)?,
        Type::FLOAT8_ARRAY => list(row, index, stmt::Value::F64)?,
        Type::BOOL_ARRAY => list(row, index, stmt::Value::Bool)?,
        Type::NUMERIC_ARRAY => list(row, index, stmt::Value::Decimal)?,
        Type::TIMESTAMPTZ_ARRAY => list(row, index, stmt::Value::DateTime)?,
        _ => opt(get::<RawText>(row, index)?, |v| stmt::Value::String(v.0)),
    })
}
