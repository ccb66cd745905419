use quill_core::{
    schema::{BuiltinType, EnumDef, FieldDef, FieldKind, TypeDefDef},
    stmt, Error, Result, Schema, Value,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// What a stored field's values are, resolved against the schema.
#[derive(Debug, Clone, Copy)]
pub enum ScalarType<'a> {
    Builtin(BuiltinType),
    Enum(&'a EnumDef),
    TypeDef(&'a TypeDefDef),
}

#[derive(Debug, Clone, Copy)]
pub struct ValueType<'a> {
    pub scalar: ScalarType<'a>,

    /// A scalar list
    pub array: bool,
}

impl<'a> ValueType<'a> {
    pub fn of(schema: &'a Schema, field: &'a FieldDef) -> Result<ValueType<'a>> {
        let scalar = match schema.field_kind(field) {
            FieldKind::Scalar(builtin) => ScalarType::Builtin(builtin),
            FieldKind::Enum(def) => ScalarType::Enum(def),
            FieldKind::TypeDef(def) => ScalarType::TypeDef(def),
            FieldKind::Relation(_) => {
                return Err(Error::internal(format!(
                    "field `{}` is a relation, not a value",
                    field.name
                )))
            }
            FieldKind::Unknown(ty) => {
                return Err(Error::invalid_schema(format!(
                    "field `{}` has unknown type `{ty}`",
                    field.name
                )))
            }
        };

        Ok(ValueType {
            scalar,
            array: field.array,
        })
    }

    pub fn builtin(ty: BuiltinType) -> ValueType<'static> {
        ValueType {
            scalar: ScalarType::Builtin(ty),
            array: false,
        }
    }

    /// The type of one element of a list.
    pub fn element(&self) -> ValueType<'a> {
        ValueType {
            scalar: self.scalar,
            array: false,
        }
    }

    /// Stored as JSON: free-form `Json` and typed JSON.
    pub fn is_json(&self) -> bool {
        matches!(
            self.scalar,
            ScalarType::Builtin(BuiltinType::Json) | ScalarType::TypeDef(_)
        )
    }

    pub fn as_builtin(&self) -> Option<BuiltinType> {
        match self.scalar {
            ScalarType::Builtin(builtin) => Some(builtin),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self.scalar {
            ScalarType::Builtin(builtin) => builtin.name(),
            ScalarType::Enum(_) => "enum",
            ScalarType::TypeDef(_) => "type",
        }
    }
}

/// Converts an application value into the provider-neutral wire form.
/// Dialects adjust the result to what their columns store.
pub(super) fn input(value: &Value, ty: &ValueType<'_>) -> Result<stmt::Value> {
    match value {
        Value::Null | Value::DbNull => return Ok(stmt::Value::Null),
        Value::AnyNull => {
            return Err(crate::err!("`AnyNull` can only be used in filters"));
        }
        Value::JsonNull if ty.is_json() => return Ok(stmt::Value::Json(serde_json::Value::Null)),
        Value::JsonNull => {
            return Err(crate::err!("`JsonNull` can only be written to JSON fields"));
        }
        _ => {}
    }

    if ty.array {
        let Value::List(items) = value else {
            return Err(mismatch(value, ty));
        };
        let items = items
            .iter()
            .map(|item| input(item, &ty.element()))
            .collect::<Result<Vec<_>>>()?;
        return Ok(stmt::Value::List(items));
    }

    let ret = match (ty.scalar, value) {
        (ScalarType::Builtin(BuiltinType::String), Value::String(v)) => stmt::Value::String(v.clone()),
        (ScalarType::Builtin(BuiltinType::Boolean), Value::Bool(v)) => stmt::Value::Bool(*v),
        (ScalarType::Builtin(BuiltinType::Int | BuiltinType::BigInt), v) => match v {
            Value::Int(v) | Value::BigInt(v) => stmt::Value::I64(*v),
            Value::String(s) => stmt::Value::I64(s.parse().map_err(|_| mismatch(value, ty))?),
            v => stmt::Value::I64(v.as_i64().ok_or_else(|| mismatch(value, ty))?),
        },
        (ScalarType::Builtin(BuiltinType::Float), v) => match v {
            Value::Float(v) => stmt::Value::F64(*v),
            Value::Int(v) | Value::BigInt(v) => stmt::Value::F64(*v as f64),
            Value::Decimal(v) => stmt::Value::F64(
                f64::try_from(*v).map_err(|_| mismatch(value, ty))?,
            ),
            _ => return Err(mismatch(value, ty)),
        },
        (ScalarType::Builtin(BuiltinType::Decimal), v) => match v {
            Value::Decimal(v) => stmt::Value::Decimal(*v),
            Value::Int(v) | Value::BigInt(v) => stmt::Value::Decimal(Decimal::from(*v)),
            Value::Float(v) => {
                stmt::Value::Decimal(Decimal::try_from(*v).map_err(|_| mismatch(value, ty))?)
            }
            Value::String(s) => {
                stmt::Value::Decimal(Decimal::from_str(s).map_err(|_| mismatch(value, ty))?)
            }
            _ => return Err(mismatch(value, ty)),
        },
        (ScalarType::Builtin(BuiltinType::DateTime), v) => match v {
            Value::DateTime(v) => stmt::Value::DateTime(*v),
            Value::String(s) => {
                stmt::Value::DateTime(parse_datetime(s).ok_or_else(|| mismatch(value, ty))?)
            }
            _ => return Err(mismatch(value, ty)),
        },
        (ScalarType::Builtin(BuiltinType::Bytes), Value::Bytes(v)) => stmt::Value::Bytes(v.clone()),
        (ScalarType::Builtin(BuiltinType::Json) | ScalarType::TypeDef(_), v) => {
            stmt::Value::Json(v.to_json())
        }
        (ScalarType::Enum(def), Value::String(v)) if def.contains(v) => stmt::Value::String(v.clone()),
        _ => return Err(mismatch(value, ty)),
    };

    Ok(ret)
}

/// Re-encodes a scalar list as a JSON document, for providers that keep
/// lists in JSON or text columns.
pub(super) fn list_to_json(value: stmt::Value) -> stmt::Value {
    match value {
        stmt::Value::List(items) => {
            stmt::Value::Json(serde_json::Value::Array(items.into_iter().map(to_json).collect()))
        }
        value => value,
    }
}

fn to_json(value: stmt::Value) -> serde_json::Value {
    use stmt::Value as V;

    match value {
        V::Null => serde_json::Value::Null,
        V::Bool(v) => v.into(),
        V::I64(v) => v.into(),
        V::F64(v) => serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        V::String(v) => v.into(),
        V::Bytes(v) => hex::encode(v).into(),
        V::Decimal(v) => v.to_string().into(),
        V::DateTime(v) => v
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            .into(),
        V::Json(v) => v,
        V::List(items) => serde_json::Value::Array(items.into_iter().map(to_json).collect()),
    }
}

fn mismatch(value: &Value, ty: &ValueType<'_>) -> Error {
    crate::err!(
        "cannot use a {} value for a {} field",
        value.type_name(),
        ty.name()
    )
}

/// Decodes a column value. Accepts every representation a provider may use
/// for the type: integers for booleans, text for dates and decimals, JSON
/// text for lists.
pub(super) fn output(value: stmt::Value, ty: &ValueType<'_>) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    if ty.array {
        return match value {
            stmt::Value::List(items) => items
                .into_iter()
                .map(|item| output(item, &ty.element()))
                .collect(),
            stmt::Value::Json(json) => json_output(json, ty),
            stmt::Value::String(text) => {
                let json = serde_json::from_str(&text)?;
                json_output(json, ty)
            }
            value => Err(Error::type_conversion(value, "list")),
        };
    }

    let ret = match ty.scalar {
        ScalarType::Builtin(builtin) => output_builtin(value, builtin)?,
        ScalarType::Enum(_) => match value {
            stmt::Value::String(v) => Value::String(v),
            value => return Err(Error::type_conversion(value, "enum")),
        },
        ScalarType::TypeDef(_) => output_builtin(value, BuiltinType::Json)?,
    };

    Ok(ret)
}

fn output_builtin(value: stmt::Value, ty: BuiltinType) -> Result<Value> {
    use stmt::Value as V;

    let ret = match (ty, value) {
        (BuiltinType::String, V::String(v)) => Value::String(v),
        (BuiltinType::String, V::I64(v)) => Value::String(v.to_string()),

        (BuiltinType::Boolean, V::Bool(v)) => Value::Bool(v),
        (BuiltinType::Boolean, V::I64(v)) => Value::Bool(v != 0),
        (BuiltinType::Boolean, V::String(v)) if v == "true" || v == "1" => Value::Bool(true),
        (BuiltinType::Boolean, V::String(v)) if v == "false" || v == "0" => Value::Bool(false),

        (BuiltinType::Int, value) => Value::Int(as_i64(value, "Int")?),
        (BuiltinType::BigInt, value) => Value::BigInt(as_i64(value, "BigInt")?),

        (BuiltinType::Float, V::F64(v)) => Value::Float(v),
        (BuiltinType::Float, V::I64(v)) => Value::Float(v as f64),
        (BuiltinType::Float, V::Decimal(v)) => Value::Float(
            f64::try_from(v).map_err(|_| Error::type_conversion(V::Decimal(v), "Float"))?,
        ),
        (BuiltinType::Float, V::String(v)) => match v.parse() {
            Ok(parsed) => Value::Float(parsed),
            Err(_) => return Err(Error::type_conversion(V::String(v), "Float")),
        },

        (BuiltinType::Decimal, V::Decimal(v)) => Value::Decimal(v),
        (BuiltinType::Decimal, V::I64(v)) => Value::Decimal(Decimal::from(v)),
        (BuiltinType::Decimal, V::F64(v)) => match Decimal::try_from(v) {
            Ok(decimal) => Value::Decimal(decimal),
            Err(_) => return Err(Error::type_conversion(V::F64(v), "Decimal")),
        },
        (BuiltinType::Decimal, V::String(v)) => Value::Decimal(
            Decimal::from_str(&v).or_else(|_| Decimal::from_scientific(&v))?,
        ),

        (BuiltinType::DateTime, V::DateTime(v)) => Value::DateTime(v),
        (BuiltinType::DateTime, V::String(v)) => match parse_datetime(&v) {
            Some(parsed) => Value::DateTime(parsed),
            None => return Err(Error::type_conversion(V::String(v), "DateTime")),
        },
        (BuiltinType::DateTime, V::I64(v)) => match Utc.timestamp_millis_opt(v).single() {
            Some(parsed) => Value::DateTime(parsed),
            None => return Err(Error::type_conversion(V::I64(v), "DateTime")),
        },

        (BuiltinType::Bytes, V::Bytes(v)) => Value::Bytes(v),
        (BuiltinType::Bytes, V::String(v)) => match hex::decode(&v) {
            Ok(bytes) => Value::Bytes(bytes),
            Err(_) => return Err(Error::type_conversion(V::String(v), "Bytes")),
        },

        (BuiltinType::Json, V::Json(v)) => Value::Json(v),
        (BuiltinType::Json, V::String(v)) => match serde_json::from_str(&v) {
            Ok(json) => Value::Json(json),
            Err(_) => Value::Json(serde_json::Value::String(v)),
        },
        (BuiltinType::Json, V::I64(v)) => Value::Json(v.into()),
        (BuiltinType::Json, V::F64(v)) => Value::Json(v.into()),
        (BuiltinType::Json, V::Bool(v)) => Value::Json(v.into()),

        (ty, value) => return Err(Error::type_conversion(value, ty.name())),
    };

    Ok(ret)
}

fn as_i64(value: stmt::Value, ty: &'static str) -> Result<i64> {
    match value.as_i64() {
        Some(v) => Ok(v),
        None => Err(Error::type_conversion(value, ty)),
    }
}

/// Decodes a value read out of a JSON document built by the database.
pub(super) fn json_output(json: serde_json::Value, ty: &ValueType<'_>) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    if ty.array {
        return match json {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| json_output(item, &ty.element()))
                .collect(),
            // Lists kept in text columns come through as a JSON string
            serde_json::Value::String(text) => {
                let json = serde_json::from_str(&text)?;
                json_output(json, ty)
            }
            json => Err(Error::type_conversion(stmt::Value::Json(json), "list")),
        };
    }

    if ty.is_json() {
        return Ok(Value::Json(json));
    }

    let value = match json {
        serde_json::Value::Bool(v) => stmt::Value::Bool(v),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(v) => stmt::Value::I64(v),
            None => stmt::Value::F64(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(v) => stmt::Value::String(v),
        json => stmt::Value::Json(json),
    };

    output(value, ty)
}

/// Parses the date formats the providers produce: RFC 3339, and naive
/// `YYYY-MM-DD[ T]HH:MM:SS[.fff]` or plain dates, read as UTC.
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(s, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|parsed| parsed.and_utc())
}
