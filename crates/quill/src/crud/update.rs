use super::{batch, selection_args, single, Crud};
use crate::query::ModelRef;

use quill_core::{
    schema::ModelDef,
    stmt::{Assignment, Expr},
    Error, Result, Value,
};

use async_recursion::async_recursion;
use chrono::Utc;
use indexmap::IndexMap;

impl<'a> Crud<'a> {
    pub(super) async fn update(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let filter = args.get("where").unwrap_or(&Value::Null);
        let id = self
            .find_id(model, filter)
            .await?
            .ok_or_else(|| Error::not_found(&model.name, "update"))?;

        let data = args.get("data").unwrap_or(&Value::Null);
        let id = self.update_record(model, &id, data).await?;
        self.read_back(model, &id, args, "update").await
    }

    pub(super) async fn upsert(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let filter = args.get("where").unwrap_or(&Value::Null);

        let id = match self.find_id(model, filter).await? {
            Some(id) => {
                let data = args.get("update").unwrap_or(&Value::Null);
                self.update_record(model, &id, data).await?
            }
            None => {
                let data = args.get("create").unwrap_or(&Value::Null);
                self.create_record(model, data).await?
            }
        };
        self.read_back(model, &id, args, "upsert").await
    }

    pub(super) async fn update_many(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let mut data = args
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        if data.is_empty() {
            return Ok(batch(0));
        }
        touch(model, &mut data);

        let limit = args.get("limit").and_then(Value::as_i64).map(|limit| limit.max(0) as u64);
        let delegated = !self.schema.ancestors(&model.name).is_empty();
        if delegated {
            let ids = self.find_ids(model, &limited(args, limit)).await?;
            let count = self.update_rows(model, &ids, &data).await?;
            return Ok(batch(count));
        }

        let target = ModelRef::new(model, model.name.clone());
        let mut filter = match args.get("where") {
            Some(filter) => self.builder.filter(&target, filter)?,
            None => Expr::TRUE,
        };

        let mut native_limit = None;
        if let Some(limit) = limit {
            if self.capability.update_with_limit {
                native_limit = Some(limit);
            } else {
                let ids = self.builder.select_ids(model, &limited(args, Some(limit)))?;
                let columns = target.id_fields()?.into_iter().map(|field| target.column(field)).collect();
                filter = Expr::in_subquery(columns, ids);
            }
        }

        let assignments = self.assignments(model, model, &data)?;
        let mut stmt = self.builder.update(model, assignments, filter);
        stmt.limit = native_limit;

        let count = self.exec.execute(stmt).await?.rows.count();
        Ok(batch(count))
    }

    pub(super) async fn update_many_and_return(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let mut data = args
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let limit = args.get("limit").and_then(Value::as_i64).map(|limit| limit.max(0) as u64);

        let ids = self.find_ids(model, &limited(args, limit)).await?;
        if ids.is_empty() {
            return Ok(Value::List(vec![]));
        }
        if !data.is_empty() {
            touch(model, &mut data);
            self.update_rows(model, &ids, &data).await?;
        }

        let filter = single("OR", Value::List(ids));
        let records = self.read_records(model, &selection_args(args, filter), false).await?;
        Ok(Value::List(records))
    }

    /// Applies an update payload, including nested relation writes, to the
    /// record identified by `id`. Returns the record's id after the update.
    #[async_recursion]
    pub(super) async fn update_record(&mut self, model: &'a ModelDef, id: &Value, data: &Value) -> Result<Value> {
        let mut scalars = IndexMap::new();
        let mut nested = vec![];

        if let Some(entries) = data.as_object() {
            for (name, payload) in entries {
                let field = model.get_field(name)?;
                match &field.relation {
                    None => {
                        scalars.insert(name.clone(), payload.clone());
                    }
                    Some(relation) if relation.owns_foreign_key() => {
                        let keys = self.update_owned(model, id, field, payload).await?;
                        scalars.extend(keys);
                    }
                    Some(_) => nested.push((field, payload)),
                }
            }
        }

        if !scalars.is_empty() {
            touch(model, &mut scalars);
            self.update_rows(model, std::slice::from_ref(id), &scalars).await?;
        }

        let mut new_id = id.clone();
        if let Some(new_id) = new_id.as_object_mut() {
            for name in &model.id_fields {
                if let Some(value) = scalars.get(name).and_then(assigned_value) {
                    new_id.insert(name.clone(), value.clone());
                }
            }
        }

        for (field, payload) in nested {
            self.write_related(model, &new_id, field, payload).await?;
        }
        Ok(new_id)
    }

    /// Writes `data`, a map of field names to update payloads, to the
    /// records identified by `ids`. Each table of a delegate chain gets its
    /// own statement. Returns the number of records updated.
    pub(super) async fn update_rows(
        &mut self,
        model: &'a ModelDef,
        ids: &[Value],
        data: &IndexMap<String, Value>,
    ) -> Result<u64> {
        if ids.is_empty() || data.is_empty() {
            return Ok(0);
        }

        let mut chain = self.schema.ancestors(&model.name);
        chain.push(model);

        let mut count = 0;
        for table in chain {
            let assignments = self.assignments(model, table, data)?;
            if assignments.is_empty() {
                continue;
            }

            let target = ModelRef::new(table, table.name.clone());
            let filter = self.builder.id_filter(&target, ids)?;
            let stmt = self.builder.update(table, assignments, filter);
            count = count.max(self.exec.execute(stmt).await?.rows.count());
        }
        Ok(count)
    }

    /// Assignments for the fields of `data` stored in `table`, one of the
    /// tables of `model`'s delegate chain.
    fn assignments(
        &self,
        model: &'a ModelDef,
        table: &'a ModelDef,
        data: &IndexMap<String, Value>,
    ) -> Result<Vec<Assignment>> {
        let target = ModelRef::new(table, table.name.clone());
        let mut out = vec![];

        for (name, payload) in data {
            let field = model.get_field(name)?;
            let owner = field.origin_model.as_deref().unwrap_or(&model.name);
            if owner != table.name {
                continue;
            }

            let column = table.get_field(name)?;
            out.push(Assignment {
                column: name.clone(),
                value: self.builder.update_value(&target, column, payload)?,
            });
        }
        Ok(out)
    }
}

/// Sets `@updatedAt` fields the payload leaves out.
fn touch(model: &ModelDef, data: &mut IndexMap<String, Value>) {
    let now = Utc::now();
    for field in model.fields.values().filter(|field| field.updated_at) {
        data.entry(field.name.clone()).or_insert(Value::DateTime(now));
    }
}

/// The value an update payload assigns outright: a literal or `{ set }`.
fn assigned_value(payload: &Value) -> Option<&Value> {
    match payload {
        Value::Object(ops) if ops.len() == 1 => ops.get("set"),
        Value::Object(_) => None,
        value => Some(value),
    }
}

/// `{ where, take: limit }` from a batch operation's arguments.
fn limited(args: &Value, limit: Option<u64>) -> Value {
    let mut out = IndexMap::new();
    if let Some(filter) = args.get("where") {
        out.insert("where".to_string(), filter.clone());
    }
    if let Some(limit) = limit {
        out.insert("take".to_string(), Value::Int(limit as i64));
    }
    Value::Object(out)
}
