use super::{batch, id_of, Crud};
use crate::query::ModelRef;

use quill_core::{schema::ModelDef, stmt::Expr, Error, Result, Value};

use indexmap::IndexMap;

impl<'a> Crud<'a> {
    /// Deletes one record and returns it as it was before deletion.
    pub(super) async fn delete(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let record = self.find_one(model, args).await?;
        if record.is_null() {
            return Err(Error::not_found(&model.name, "delete"));
        }

        // The selection may leave out the id; look it up by the filter.
        let id = if model.id_fields.iter().all(|name| record.get(name).is_some()) {
            id_of(model, &record)
        } else {
            let filter = args.get("where").unwrap_or(&Value::Null);
            self.find_id(model, filter)
                .await?
                .ok_or_else(|| Error::not_found(&model.name, "delete"))?
        };

        self.delete_records(model, &[id]).await?;
        Ok(record)
    }

    pub(super) async fn delete_many(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let limit = args.get("limit").and_then(Value::as_i64).map(|limit| limit.max(0) as u64);
        let delegated = !self.schema.ancestors(&model.name).is_empty()
            || !self.schema.descendants(&model.name).is_empty();

        if delegated {
            let mut select_args = IndexMap::new();
            if let Some(filter) = args.get("where") {
                select_args.insert("where".to_string(), filter.clone());
            }
            if let Some(limit) = limit {
                select_args.insert("take".to_string(), Value::Int(limit as i64));
            }
            let ids = self.find_ids(model, &Value::Object(select_args)).await?;
            let count = self.delete_records(model, &ids).await?;
            return Ok(batch(count));
        }

        let target = ModelRef::new(model, model.name.clone());
        let mut filter = match args.get("where") {
            Some(filter) => self.builder.filter(&target, filter)?,
            None => Expr::TRUE,
        };

        let mut native_limit = None;
        if let Some(limit) = limit {
            if self.capability.delete_with_limit {
                native_limit = Some(limit);
            } else {
                let mut select_args = IndexMap::new();
                if let Some(where_) = args.get("where") {
                    select_args.insert("where".to_string(), where_.clone());
                }
                select_args.insert("take".to_string(), Value::Int(limit as i64));
                let ids = self.builder.select_ids(model, &Value::Object(select_args))?;
                let columns = target.id_fields()?.into_iter().map(|field| target.column(field)).collect();
                filter = Expr::in_subquery(columns, ids);
            }
        }

        let mut stmt = self.builder.delete(model, filter);
        stmt.limit = native_limit;
        let count = self.exec.execute(stmt).await?.rows.count();
        Ok(batch(count))
    }

    /// Deletes the records identified by `ids` from every table of their
    /// delegate chain: sub-model tables first, then the model's own table,
    /// then its ancestors. Returns the number of records deleted.
    pub(super) async fn delete_records(&mut self, model: &'a ModelDef, ids: &[Value]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tables = self.schema.descendants(&model.name);
        tables.reverse();
        let first_own = tables.len();
        tables.push(model);
        tables.extend(self.schema.ancestors(&model.name).into_iter().rev());

        let mut count = 0;
        for (index, table) in tables.into_iter().enumerate() {
            let target = ModelRef::new(table, table.name.clone());
            let filter = self.builder.id_filter(&target, ids)?;
            let deleted = self.exec.execute(self.builder.delete(table, filter)).await?.rows.count();
            if index == first_own {
                count = deleted;
            }
        }
        Ok(count)
    }
}
