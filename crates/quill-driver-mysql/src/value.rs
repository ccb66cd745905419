use chrono::{NaiveDate, SecondsFormat};
use mysql_async::{consts::ColumnType, prelude::ToValue, Column, Row};
use quill_core::{stmt, Error, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Charset number MySQL reports for binary strings.
const BINARY_CHARSET: u16 = 63;

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

    /// Takes column `index` out of `row`.
    ///
    /// Strings, decimals and JSON all arrive as bytes; the column metadata
    /// decides which wire value they become.
    pub fn from_sql(index: usize, row: &mut Row, column: &Column) -> Result<Self> {
        let value: mysql_async::Value = row
            .take(index)
            .ok_or_else(|| Error::internal(format!("row has no column {index}")))?;

        let ret = match value {
            mysql_async::Value::NULL => stmt::Value::Null,
            mysql_async::Value::Int(v) => match column.column_type() {
                ColumnType::MYSQL_TYPE_TINY if column.column_length() == 1 => {
                    stmt::Value::Bool(v != 0)
                }
                _ => stmt::Value::I64(v),
            },
            mysql_async::Value::UInt(v) => stmt::Value::I64(i64::try_from(v).map_err(|_| {
                Error::type_conversion(stmt::Value::String(v.to_string()), "i64")
            })?),
            mysql_async::Value::Float(v) => stmt::Value::F64(v.into()),
            mysql_async::Value::Double(v) => stmt::Value::F64(v),
            mysql_async::Value::Bytes(bytes) => match column.column_type() {
                ColumnType::MYSQL_TYPE_NEWDECIMAL | ColumnType::MYSQL_TYPE_DECIMAL => {
                    let text = String::from_utf8(bytes).map_err(Error::driver_operation_failed)?;
                    stmt::Value::Decimal(Decimal::from_str(&text)?)
                }
                _ if column.character_set() == BINARY_CHARSET
                    && column.column_type() != ColumnType::MYSQL_TYPE_JSON =>
                {
                    stmt::Value::Bytes(bytes)
                }
                _ => stmt::Value::String(
                    String::from_utf8(bytes).map_err(Error::driver_operation_failed)?,
                ),
            },
            mysql_async::Value::Date(year, month, day, hour, minute, second, micros) => {
                let datetime = NaiveDate::from_ymd_opt(year.into(), month.into(), day.into())
                    .and_then(|date| {
                        date.and_hms_micro_opt(hour.into(), minute.into(), second.into(), micros)
                    })
                    .ok_or_else(|| Error::internal("MySQL returned an invalid date"))?;
                stmt::Value::DateTime(datetime.and_utc())
            }
            mysql_async::Value::Time(..) => {
                return Err(Error::not_supported("TIME columns", "mysql"));
            }
        };

        Ok(Value(ret))
    }
}

impl ToValue for Value {
    fn to_value(&self) -> mysql_async::Value {
        match &self.0 {
            stmt::Value::Null => mysql_async::Value::NULL,
            stmt::Value::Bool(value) => value.to_value(),
            stmt::Value::I64(value) => value.to_value(),
            stmt::Value::F64(value) => value.to_value(),
            stmt::Value::String(value) => value.to_value(),
            stmt::Value::Bytes(value) => value.to_value(),
            stmt::Value::Decimal(value) => value.to_string().to_value(),
            stmt::Value::DateTime(value) => value
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string()
                .to_value(),
            stmt::Value::Json(value) => value.to_string().to_value(),
            stmt::Value::List(values) => serde_json_list(values).to_value(),
        }
    }
}

/// MySQL has no array type; lists are bound as JSON text.
fn serde_json_list(values: &[stmt::Value]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|value| match value {
            stmt::Value::Null => "null".to_string(),
            stmt::Value::Bool(v) => v.to_string(),
            stmt::Value::I64(v) => v.to_string(),
            stmt::Value::F64(v) => v.to_string(),
            stmt::Value::String(v) => format!("{v:?}"),
            stmt::Value::Decimal(v) => format!("\"{v}\""),
            stmt::Value::DateTime(v) => format!("\"{}\"", v.to_rfc3339_opts(SecondsFormat::Millis, true)),
            stmt::Value::Json(v) => v.to_string(),
            stmt::Value::Bytes(_) | stmt::Value::List(_) => "null".to_string(),
        })
        .collect();
    format!("[{}]", items.join(","))
}
