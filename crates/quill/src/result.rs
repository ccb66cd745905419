//! Turns driver rows into application values.

use crate::{
    dialect::{Dialect, ValueType},
    query::{AggregateKind, AggregatePlan, DescendantPlan, OutputColumn, PlanItem, SelectionPlan, DELEGATE_PREFIX},
};

use quill_core::{
    driver::RowSet,
    schema::{BuiltinType, FieldDef},
    stmt, Error, Result, Schema, Value,
};

use indexmap::IndexMap;

pub(crate) struct ResultProcessor<'a> {
    schema: &'a Schema,
    dialect: &'a dyn Dialect,
}

impl<'a> ResultProcessor<'a> {
    pub(crate) fn new(schema: &'a Schema, dialect: &'a dyn Dialect) -> Self {
        ResultProcessor { schema, dialect }
    }

    /// Decodes the rows of a read compiled from `plan`.
    pub(crate) fn rows(&self, rows: RowSet, plan: &SelectionPlan<'a>, reverse: bool) -> Result<Vec<Value>> {
        let RowSet { columns, rows } = rows;

        let mut out = rows
            .into_iter()
            .map(|row| {
                let cells = columns.iter().map(String::as_str).zip(row).collect();
                self.row(cells, plan)
            })
            .collect::<Result<Vec<_>>>()?;

        if reverse {
            out.reverse();
        }
        Ok(out)
    }

    fn row(&self, mut cells: IndexMap<&str, stmt::Value>, plan: &SelectionPlan<'a>) -> Result<Value> {
        let mut out = IndexMap::new();

        for item in &plan.items {
            let key = item.key();
            let cell = cells
                .shift_remove(key)
                .ok_or_else(|| Error::internal(format!("result is missing column `{key}`")))?;

            let value = match item {
                PlanItem::Field(field) => self.dialect.transform_output(cell, &self.value_type(field)?)?,
                PlanItem::Relation { field, plan, args } => {
                    self.relation(into_json(cell)?, field, plan, args)?
                }
                PlanItem::Count(_) => counts(into_json(cell)?)?,
            };
            out.insert(key.to_string(), value);
        }

        for descendant in &plan.descendants {
            let key = format!("{DELEGATE_PREFIX}{}", descendant.model.name);
            if let Some(cell) = cells.shift_remove(key.as_str()) {
                self.merge_descendant(&mut out, into_json(cell)?, descendant)?;
            }
        }

        Ok(Value::Object(out))
    }

    /// Decodes one JSON object built by the database for a related row.
    fn object(&self, json: serde_json::Value, plan: &SelectionPlan<'a>) -> Result<Value> {
        let serde_json::Value::Object(mut map) = json else {
            return Err(Error::type_conversion(stmt::Value::Json(json), "object"));
        };

        let mut out = IndexMap::new();
        for item in &plan.items {
            let key = item.key();
            let json = map.remove(key).unwrap_or(serde_json::Value::Null);

            let value = match item {
                PlanItem::Field(field) => {
                    self.dialect.transform_json_output(json, &self.value_type(field)?)?
                }
                PlanItem::Relation { field, plan, args } => self.relation(json, field, plan, args)?,
                PlanItem::Count(_) => counts(json)?,
            };
            out.insert(key.to_string(), value);
        }

        for descendant in &plan.descendants {
            let key = format!("{DELEGATE_PREFIX}{}", descendant.model.name);
            if let Some(json) = map.remove(&key) {
                self.merge_descendant(&mut out, json, descendant)?;
            }
        }

        Ok(Value::Object(out))
    }

    fn relation(
        &self,
        json: serde_json::Value,
        field: &FieldDef,
        plan: &SelectionPlan<'a>,
        args: &Value,
    ) -> Result<Value> {
        // Nested JSON may arrive as text when a provider embeds it as a string
        let json = match json {
            serde_json::Value::String(text) => serde_json::from_str(&text)?,
            json => json,
        };

        if !field.array {
            return match json {
                serde_json::Value::Null => Ok(Value::Null),
                json => self.object(json, plan),
            };
        }

        let items = match json {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Null => vec![],
            json => return Err(Error::type_conversion(stmt::Value::Json(json), "list")),
        };

        let mut out = items
            .into_iter()
            .map(|item| self.object(item, plan))
            .collect::<Result<Vec<_>>>()?;

        if args.get("take").and_then(Value::as_i64).is_some_and(|take| take < 0) {
            out.reverse();
        }
        Ok(Value::List(out))
    }

    /// Merges the fields packed for a delegate sub-model into `out` when the
    /// row belongs to that sub-model.
    fn merge_descendant(
        &self,
        out: &mut IndexMap<String, Value>,
        json: serde_json::Value,
        descendant: &DescendantPlan<'a>,
    ) -> Result<()> {
        let json = match json {
            serde_json::Value::String(text) => serde_json::from_str(&text)?,
            json => json,
        };
        let serde_json::Value::Object(mut map) = json else {
            return Ok(());
        };

        for field in &descendant.fields {
            if let Some(json) = map.remove(&field.name) {
                let value = self.dialect.transform_json_output(json, &self.value_type(field)?)?;
                out.insert(field.name.clone(), value);
            }
        }
        Ok(())
    }

    /// Decodes the rows of `aggregate`, `count` and `groupBy`. Aggregates
    /// are nested under their kind: `{ _sum: { views: 10 } }`.
    pub(crate) fn aggregate_rows(&self, rows: RowSet, plan: &AggregatePlan<'a>) -> Result<Vec<Value>> {
        let indices = plan
            .columns
            .iter()
            .map(|(alias, _)| {
                rows.column_index(alias)
                    .ok_or_else(|| Error::internal(format!("result is missing column `{alias}`")))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out = vec![];
        for mut row in rows.rows {
            let mut object = IndexMap::new();

            for ((_, column), index) in plan.columns.iter().zip(&indices) {
                let cell = std::mem::replace(&mut row[*index], stmt::Value::Null);

                match column {
                    OutputColumn::Group(field) => {
                        let value = self.dialect.transform_output(cell, &self.value_type(field)?)?;
                        object.insert(field.name.clone(), value);
                    }
                    OutputColumn::Aggregate { kind, field } => {
                        let value = self.aggregate_value(cell, *kind, *field)?;
                        let bucket = object
                            .entry(kind.key().to_string())
                            .or_insert_with(Value::object);
                        if let Some(bucket) = bucket.as_object_mut() {
                            let name = field.map_or("_all", |field| field.name.as_str());
                            bucket.insert(name.to_string(), value);
                        }
                    }
                }
            }

            out.push(Value::Object(object));
        }

        if plan.reverse {
            out.reverse();
        }
        Ok(out)
    }

    fn aggregate_value(&self, cell: stmt::Value, kind: AggregateKind, field: Option<&'a FieldDef>) -> Result<Value> {
        let ty = match (kind, field) {
            (AggregateKind::Count, _) | (_, None) => ValueType::builtin(BuiltinType::Int),
            (AggregateKind::Avg, Some(field)) if field.builtin() == Some(BuiltinType::Decimal) => {
                ValueType::builtin(BuiltinType::Decimal)
            }
            (AggregateKind::Avg, Some(_)) => ValueType::builtin(BuiltinType::Float),
            (_, Some(field)) => self.value_type(field)?,
        };

        if kind == AggregateKind::Count && cell.is_null() {
            return Ok(Value::Int(0));
        }
        self.dialect.transform_output(cell, &ty)
    }

    fn value_type(&self, field: &'a FieldDef) -> Result<ValueType<'a>> {
        ValueType::of(self.schema, field)
    }
}

/// A JSON column or subquery result as a JSON tree.
fn into_json(cell: stmt::Value) -> Result<serde_json::Value> {
    Ok(match cell {
        stmt::Value::Null => serde_json::Value::Null,
        stmt::Value::Json(json) => json,
        stmt::Value::String(text) => serde_json::from_str(&text)?,
        stmt::Value::Bytes(bytes) => serde_json::from_slice(&bytes)?,
        cell => return Err(Error::type_conversion(cell, "Json")),
    })
}

/// `_count` objects hold integers; some providers produce them as strings.
fn counts(json: serde_json::Value) -> Result<Value> {
    let json = match json {
        serde_json::Value::String(text) => serde_json::from_str(&text)?,
        json => json,
    };
    let serde_json::Value::Object(map) = json else {
        return Err(Error::type_conversion(stmt::Value::Json(json), "_count"));
    };

    let mut out = IndexMap::new();
    for (key, value) in map {
        let count = match &value {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            serde_json::Value::String(text) => text.parse().ok(),
            serde_json::Value::Null => Some(0),
            _ => None,
        };
        let count = count.ok_or_else(|| Error::type_conversion(stmt::Value::Json(value), "Int"))?;
        out.insert(key, Value::Int(count));
    }
    Ok(Value::Object(out))
}
