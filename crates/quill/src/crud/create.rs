use super::{batch, id_of, selection_args, single, Crud};
use crate::query::{list_arg, Row};

use quill_core::{
    schema::{FieldDef, FieldDefault, ModelDef},
    Error, Result, Value,
};

use async_recursion::async_recursion;
use chrono::Utc;
use indexmap::IndexMap;

impl<'a> Crud<'a> {
    pub(super) async fn create(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let data = args.get("data").unwrap_or(&Value::Null);
        let id = self.create_record(model, data).await?;
        self.read_back(model, &id, args, "create").await
    }

    pub(super) async fn create_many(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let (count, _) = self.insert_many(model, args, false).await?;
        Ok(batch(count))
    }

    pub(super) async fn create_many_and_return(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let (_, ids) = self.insert_many(model, args, true).await?;
        if ids.is_empty() {
            return Ok(Value::List(vec![]));
        }

        let filter = single("OR", Value::List(ids));
        let records = self.read_records(model, &selection_args(args, filter), false).await?;
        Ok(Value::List(records))
    }

    /// Creates one record from a create payload, including its nested
    /// relation writes, and returns its id.
    #[async_recursion]
    pub(super) async fn create_record(&mut self, model: &'a ModelDef, data: &Value) -> Result<Value> {
        let mut scalars = IndexMap::new();
        let mut nested = vec![];

        if let Some(entries) = data.as_object() {
            for (name, payload) in entries {
                let field = model.get_field(name)?;
                match &field.relation {
                    None => {
                        scalars.insert(name.clone(), payload.clone());
                    }
                    // The foreign key lives in this row, so the related
                    // record must exist first.
                    Some(relation) if relation.owns_foreign_key() => {
                        let keys = self.link_owned(field, payload).await?;
                        scalars.extend(keys);
                    }
                    Some(_) => nested.push((field, payload)),
                }
            }
        }

        apply_defaults(model, &mut scalars);
        let id = self.insert_record(model, scalars).await?;

        for (field, payload) in nested {
            self.write_related(model, &id, field, payload).await?;
        }
        Ok(id)
    }

    /// Inserts a row into every table of `model`'s delegate chain, root
    /// first, and returns the id of the new record.
    async fn insert_record(&mut self, model: &'a ModelDef, mut scalars: IndexMap<String, Value>) -> Result<Value> {
        let mut chain = self.schema.ancestors(&model.name);
        chain.push(model);

        for pair in chain.windows(2) {
            let (base, sub) = (pair[0], pair[1]);
            let discriminator = base
                .fields
                .values()
                .find(|field| field.is_discriminator && field.origin_model.is_none());
            if let Some(field) = discriminator {
                scalars.insert(field.name.clone(), Value::from(sub.name.as_str()));
            }
        }

        for table in chain {
            let mut row = Row::new();
            for (name, value) in &scalars {
                let field = model.get_field(name)?;
                let owner = field.origin_model.as_deref().unwrap_or(&model.name);
                if owner == table.name || model.is_id_field(name) {
                    row.insert(name.clone(), self.builder.param(table.get_field(name)?, value)?);
                }
            }

            let missing = table
                .id_fields
                .iter()
                .filter(|name| !scalars.contains_key(*name))
                .map(|name| table.get_field(name))
                .collect::<Result<Vec<_>>>()?;
            let returning: &[&FieldDef] = if self.capability.returning { &missing } else { &[] };
            let insert = self.builder.insert(table, vec![row], false, returning);

            if returning.is_empty() {
                let response = self.exec.execute(insert).await?;
                if let ([field], Some(id)) = (&missing[..], response.last_insert_id) {
                    scalars.insert(field.name.clone(), Value::Int(id as i64));
                }
            } else {
                let rows = self.exec.query(insert).await?;
                let generated = self
                    .decode(table, rows)?
                    .into_iter()
                    .next()
                    .and_then(Value::into_object)
                    .ok_or_else(|| Error::internal(format!("insert into `{}` returned no row", table.name)))?;
                scalars.extend(generated);
            }
        }

        if let Some(name) = model.id_fields.iter().find(|name| !scalars.contains_key(*name)) {
            return Err(Error::internal(format!(
                "could not determine `{}.{name}` of the created record",
                model.name
            )));
        }
        Ok(id_of(model, &Value::Object(scalars)))
    }

    /// Inserts the rows of a `createMany` payload. Returns the number of
    /// rows written and, with `want_ids`, their ids.
    async fn insert_many(
        &mut self,
        model: &'a ModelDef,
        args: &Value,
        want_ids: bool,
    ) -> Result<(u64, Vec<Value>)> {
        let data = list_arg(args.get("data").unwrap_or(&Value::Null));
        let skip_duplicates = args.get("skipDuplicates").is_some_and(Value::is_truthy);

        // Delegate chains span several tables, and without RETURNING only
        // single-row inserts report their generated id.
        let row_by_row = !self.schema.ancestors(&model.name).is_empty()
            || (want_ids && !self.capability.returning);
        if row_by_row {
            let mut ids = vec![];
            for item in data {
                if skip_duplicates && self.is_duplicate(model, item).await? {
                    continue;
                }
                ids.push(self.create_record(model, item).await?);
            }
            return Ok((ids.len() as u64, ids));
        }

        let mut rows = vec![];
        for item in data {
            let mut scalars = item.as_object().cloned().unwrap_or_default();
            apply_defaults(model, &mut scalars);

            let mut row = Row::new();
            for (name, value) in &scalars {
                row.insert(name.clone(), self.builder.param(model.get_field(name)?, value)?);
            }
            rows.push(row);
        }

        let returning = if want_ids {
            model
                .id_fields
                .iter()
                .map(|name| model.get_field(name))
                .collect::<Result<Vec<_>>>()?
        } else {
            vec![]
        };

        let mut count = 0;
        let mut ids = vec![];
        for group in self.insert_groups(rows) {
            let insert = self.builder.insert(model, group, skip_duplicates, &returning);
            if want_ids {
                let rows = self.exec.query(insert).await?;
                count += rows.len() as u64;
                ids.extend(self.decode(model, rows)?);
            } else {
                count += self.exec.execute(insert).await?.rows.count();
            }
        }
        Ok((count, ids))
    }

    /// Splits rows into statements the provider can express: rows leaving
    /// out different columns need separate statements unless `DEFAULT` is
    /// allowed in a `VALUES` row, and `DEFAULT VALUES` inserts one row.
    fn insert_groups(&self, rows: Vec<Row>) -> Vec<Vec<Row>> {
        let mut groups: Vec<(Vec<String>, Vec<Row>)> = vec![];

        for row in rows {
            let key: Vec<String> = if self.capability.default_as_field_value {
                vec![]
            } else {
                row.keys().cloned().collect()
            };
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, group)) => group.push(row),
                None => groups.push((key, vec![row])),
            }
        }

        let mut out = vec![];
        for (_, group) in groups {
            let all_default = group.iter().all(|row| row.is_empty());
            if all_default && self.capability.insert_default_values {
                out.extend(group.into_iter().map(|row| vec![row]));
            } else {
                out.push(group);
            }
        }
        out
    }

    /// `true` when a record sharing a unique field set with `data` exists.
    pub(super) async fn is_duplicate(&mut self, model: &'a ModelDef, data: &Value) -> Result<bool> {
        for (_, fields) in self.schema.unique_sets(&model.name)? {
            let mut filter = IndexMap::new();
            for name in &fields {
                match data.get(name) {
                    Some(value) if !value.is_null() => {
                        filter.insert(name.clone(), value.clone());
                    }
                    _ => break,
                }
            }
            if filter.len() == fields.len() && self.find_id(model, &Value::Object(filter)).await?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Fills in generated values the create payload left out: `@updatedAt`,
/// `now()`, `uuid()` and `cuid()`. Literal and autoincrement defaults are
/// left to the database.
pub(super) fn apply_defaults(model: &ModelDef, scalars: &mut IndexMap<String, Value>) {
    let now = Utc::now();

    for field in model.fields.values() {
        if !field.is_stored() || scalars.contains_key(&field.name) {
            continue;
        }

        let value = match (&field.default, field.updated_at) {
            (Some(FieldDefault::Now), _) | (_, true) => Value::DateTime(now),
            (Some(FieldDefault::Uuid), _) => Value::String(uuid::Uuid::new_v4().to_string()),
            (Some(FieldDefault::Cuid), _) => Value::String(cuid()),
            _ => continue,
        };
        scalars.insert(field.name.clone(), value);
    }
}

/// A collision-resistant id in the cuid format: `c`, a base-36 timestamp
/// and random base-36 characters.
fn cuid() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let random = uuid::Uuid::new_v4().as_u128();

    let mut id = String::from("c");
    id.push_str(&base36(millis, 8));
    id.push_str(&base36(random, 16));
    id
}

/// The `width` least significant base-36 digits of `n`.
fn base36(mut n: u128, width: usize) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = vec![b'0'; width];
    for slot in out.iter_mut().rev() {
        *slot = DIGITS[(n % 36) as usize];
        n /= 36;
    }
    out.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::schema::{Provider, Schema};

    #[test]
    fn generated_defaults() {
        let schema = Schema::new(Provider::Sqlite)
            .model(
                ModelDef::new("Doc")
                    .field(FieldDef::new("id", "String").id().default(FieldDefault::Uuid))
                    .field(FieldDef::new("slug", "String").default(FieldDefault::Cuid))
                    .field(FieldDef::new("createdAt", "DateTime").default(FieldDefault::Now))
                    .field(FieldDef::new("updatedAt", "DateTime").updated_at())
                    .field(FieldDef::new("views", "Int").default(FieldDefault::Value(0.into()))),
            )
            .build()
            .unwrap();
        let doc = schema.get_model("Doc").unwrap();

        let mut scalars = IndexMap::new();
        scalars.insert("slug".to_string(), Value::from("given"));
        apply_defaults(doc, &mut scalars);

        assert_eq!(scalars["slug"], Value::from("given"));
        assert_eq!(scalars["id"].as_str().map(str::len), Some(36));
        assert!(matches!(scalars["createdAt"], Value::DateTime(_)));
        assert!(matches!(scalars["updatedAt"], Value::DateTime(_)));
        assert!(!scalars.contains_key("views"));
    }

    #[test]
    fn cuids_are_distinct() {
        let a = cuid();
        let b = cuid();
        assert_eq!(a.len(), 25);
        assert!(a.starts_with('c'));
        assert_ne!(a, b);
    }

    #[test]
    fn base36_pads() {
        assert_eq!(base36(35, 3), "00z");
        assert_eq!(base36(36, 2), "10");
    }
}
