//! Nested relation writes inside `create` and `update` payloads.

use super::{and_filters, single, Crud};
use crate::query::list_arg;

use quill_core::{
    err,
    schema::{FieldDef, ManyToMany, ModelDef, RelationInfo},
    stmt::{Delete, Expr, Insert, OnConflict, TableName},
    Error, Result, Value,
};

use async_recursion::async_recursion;
use indexmap::IndexMap;

/// How records of a relation's target model are tied to a parent record.
enum Link<'a> {
    /// The target holds foreign keys to the parent; field name to the value
    /// pointing at the parent.
    ForeignKey(IndexMap<String, Value>),

    /// Rows of an implicit join table.
    JoinTable {
        m2m: ManyToMany,
        parent: &'a ModelDef,
        parent_id: Value,
    },
}

/// Verbs on relations whose foreign keys live on the other side, in the
/// order they are applied.
const VERBS: [&str; 11] = [
    "set",
    "disconnect",
    "delete",
    "deleteMany",
    "update",
    "updateMany",
    "upsert",
    "create",
    "createMany",
    "connect",
    "connectOrCreate",
];

fn relation_of(field: &FieldDef) -> Result<&RelationInfo> {
    field
        .relation
        .as_ref()
        .ok_or_else(|| Error::internal(format!("field `{}` is not a relation", field.name)))
}

fn join_table(m2m: &ManyToMany) -> TableName {
    TableName {
        name: m2m.join_table.clone(),
        schema: None,
        alias: None,
    }
}

/// Splits a to-one `update` payload into its filter and data: either
/// `{ where, data }` or the data itself.
fn unwrap_update(payload: &Value) -> (Option<&Value>, &Value) {
    match payload.as_object() {
        Some(map) if map.contains_key("data") && map.keys().all(|k| k == "data" || k == "where") => {
            (map.get("where"), &map["data"])
        }
        _ => (None, payload),
    }
}

impl<'a> Crud<'a> {
    /// Resolves `create`, `connect` or `connectOrCreate` on a relation whose
    /// foreign keys live in the record being created. Returns the foreign
    /// key values pointing at the related record.
    #[async_recursion]
    pub(super) async fn link_owned(
        &mut self,
        field: &'a FieldDef,
        payload: &Value,
    ) -> Result<IndexMap<String, Value>> {
        let target = self.schema.get_model(&field.ty)?;
        let mut related = None;

        if let Some(data) = payload.get("create") {
            related = Some(self.create_record(target, data).await?);
        }
        if let Some(filter) = payload.get("connect") {
            related = Some(self.connect_target(target, filter).await?);
        }
        if let Some(arg) = payload.get("connectOrCreate") {
            let where_ = arg.get("where").unwrap_or(&Value::Null);
            related = Some(match self.find_id(target, where_).await? {
                Some(id) => id,
                None => self.create_record(target, arg.get("create").unwrap_or(&Value::Null)).await?,
            });
        }

        match related {
            Some(id) => self.foreign_keys(field, &id).await,
            None => Ok(IndexMap::new()),
        }
    }

    /// Applies a nested write on an owned to-one relation during an update
    /// and returns the foreign key assignments it implies.
    #[async_recursion]
    pub(super) async fn update_owned(
        &mut self,
        model: &'a ModelDef,
        id: &Value,
        field: &'a FieldDef,
        payload: &Value,
    ) -> Result<IndexMap<String, Value>> {
        let relation = relation_of(field)?;
        let target = self.schema.get_model(&field.ty)?;
        let current = self.current_related(model, id, field).await?;

        let mut keys = self.link_owned(field, payload).await?;

        if let Some(disconnect) = payload.get("disconnect") {
            let matches = match disconnect {
                Value::Object(_) => match &current {
                    Some(related) => {
                        let filter = and_filters(related.clone(), Some(disconnect));
                        self.find_id(target, &filter).await?.is_some()
                    }
                    None => false,
                },
                flag => flag.is_truthy(),
            };
            if matches {
                keys.extend(relation.fields.iter().map(|fk| (fk.clone(), Value::Null)));
            }
        }

        if let Some(update) = payload.get("update") {
            let (filter, data) = unwrap_update(update);
            let related = match &current {
                Some(related) => self.find_id(target, &and_filters(related.clone(), filter)).await?,
                None => None,
            };
            let related = related.ok_or_else(|| Error::not_found(&target.name, "update"))?;
            let updated = self.update_record(target, &related, data).await?;
            if updated != related {
                keys.extend(self.foreign_keys(field, &updated).await?);
            }
        }

        if let Some(upsert) = payload.get("upsert") {
            let related = match &current {
                Some(related) => {
                    self.find_id(target, &and_filters(related.clone(), upsert.get("where")))
                        .await?
                }
                None => None,
            };
            match related {
                Some(related) => {
                    let data = upsert.get("update").unwrap_or(&Value::Null);
                    self.update_record(target, &related, data).await?;
                }
                None => {
                    let data = upsert.get("create").unwrap_or(&Value::Null);
                    let created = self.create_record(target, data).await?;
                    keys.extend(self.foreign_keys(field, &created).await?);
                }
            }
        }

        if let Some(delete) = payload.get("delete") {
            let filter = match delete {
                Value::Object(_) => Some(delete),
                flag if flag.is_truthy() => None,
                _ => return Ok(keys),
            };
            let related = match &current {
                Some(related) => self.find_id(target, &and_filters(related.clone(), filter)).await?,
                None => None,
            };
            let related = related.ok_or_else(|| Error::not_found(&target.name, "delete"))?;

            // Unlink first so the parent's foreign key never dangles.
            if field.optional {
                let unlink = relation.fields.iter().map(|fk| (fk.clone(), Value::Null)).collect();
                self.update_rows(model, &[id.clone()], &unlink).await?;
            }
            self.delete_records(target, &[related]).await?;
        }

        Ok(keys)
    }

    /// Applies the nested writes on a relation whose foreign keys live on
    /// the related model or in a join table.
    #[async_recursion]
    pub(super) async fn write_related(
        &mut self,
        model: &'a ModelDef,
        id: &Value,
        field: &'a FieldDef,
        payload: &Value,
    ) -> Result<()> {
        let target = self.schema.get_model(&field.ty)?;
        let link = self.link(model, id, field).await?;
        let belongs = self.belongs_filter(model, id, field, &link)?;

        for verb in VERBS {
            let Some(arg) = payload.get(verb) else {
                continue;
            };

            match verb {
                "set" => {
                    self.detach(target, &link, &belongs, None).await?;
                    for filter in list_arg(arg) {
                        let child = self.connect_target(target, filter).await?;
                        self.attach(target, &link, &child).await?;
                    }
                }
                "disconnect" => {
                    if field.array {
                        for filter in list_arg(arg) {
                            self.detach(target, &link, &belongs, Some(filter)).await?;
                        }
                    } else if let Value::Object(_) = arg {
                        self.detach(target, &link, &belongs, Some(arg)).await?;
                    } else if arg.is_truthy() {
                        self.detach(target, &link, &belongs, None).await?;
                    }
                }
                "delete" => {
                    let filters = if field.array {
                        list_arg(arg)
                    } else if let Value::Object(_) = arg {
                        vec![arg]
                    } else if arg.is_truthy() {
                        vec![&Value::Null]
                    } else {
                        vec![]
                    };
                    for filter in filters {
                        let child = self
                            .find_id(target, &and_filters(belongs.clone(), Some(filter)))
                            .await?
                            .ok_or_else(|| Error::not_found(&target.name, "delete"))?;
                        self.delete_records(target, &[child]).await?;
                    }
                }
                "deleteMany" => {
                    for filter in list_arg(arg) {
                        let args = single("where", and_filters(belongs.clone(), Some(filter)));
                        let children = self.find_ids(target, &args).await?;
                        self.delete_records(target, &children).await?;
                    }
                }
                "update" => {
                    let updates = if field.array { list_arg(arg) } else { vec![arg] };
                    for update in updates {
                        let (filter, data) = unwrap_update(update);
                        let child = self
                            .find_id(target, &and_filters(belongs.clone(), filter))
                            .await?
                            .ok_or_else(|| Error::not_found(&target.name, "update"))?;
                        self.update_record(target, &child, data).await?;
                    }
                }
                "updateMany" => {
                    for update in list_arg(arg) {
                        let filter = and_filters(belongs.clone(), update.get("where"));
                        let children = self.find_ids(target, &single("where", filter)).await?;
                        let data = update
                            .get("data")
                            .and_then(Value::as_object)
                            .ok_or_else(|| err!("`updateMany` on `{}` requires `data`", field.name))?;
                        self.update_rows(target, &children, data).await?;
                    }
                }
                "upsert" => {
                    let upserts = if field.array { list_arg(arg) } else { vec![arg] };
                    for upsert in upserts {
                        let filter = and_filters(belongs.clone(), upsert.get("where"));
                        match self.find_id(target, &filter).await? {
                            Some(child) => {
                                let data = upsert.get("update").unwrap_or(&Value::Null);
                                self.update_record(target, &child, data).await?;
                            }
                            None => {
                                let data = upsert.get("create").unwrap_or(&Value::Null);
                                self.create_linked(target, &link, data).await?;
                            }
                        }
                    }
                }
                "create" => {
                    for data in list_arg(arg) {
                        self.create_linked(target, &link, data).await?;
                    }
                }
                "createMany" => {
                    let skip_duplicates = arg.get("skipDuplicates").is_some_and(Value::is_truthy);
                    for data in list_arg(arg.get("data").unwrap_or(&Value::Null)) {
                        if skip_duplicates && self.is_duplicate(target, &with_keys(data, &link)).await? {
                            continue;
                        }
                        self.create_linked(target, &link, data).await?;
                    }
                }
                "connect" => {
                    for filter in list_arg(arg) {
                        let child = self.connect_target(target, filter).await?;
                        self.attach(target, &link, &child).await?;
                    }
                }
                "connectOrCreate" => {
                    for item in list_arg(arg) {
                        let filter = item.get("where").unwrap_or(&Value::Null);
                        match self.find_id(target, filter).await? {
                            Some(child) => self.attach(target, &link, &child).await?,
                            None => {
                                let data = item.get("create").unwrap_or(&Value::Null);
                                self.create_linked(target, &link, data).await?;
                            }
                        }
                    }
                }
                verb => return Err(Error::internal(format!("unhandled nested write `{verb}`"))),
            }
        }

        Ok(())
    }

    /// The id of the record matching `filter`, for `connect`.
    async fn connect_target(&mut self, target: &'a ModelDef, filter: &Value) -> Result<Value> {
        self.find_id(target, filter)
            .await?
            .ok_or_else(|| Error::not_found(&target.name, "connect"))
    }

    /// Foreign key values of owned relation `field` pointing at the record
    /// of the target model identified by `related`.
    async fn foreign_keys(&mut self, field: &'a FieldDef, related: &Value) -> Result<IndexMap<String, Value>> {
        let relation = relation_of(field)?;
        let target = self.schema.get_model(&field.ty)?;
        let values = self.values_of(target, related, &relation.references).await?;

        Ok(relation
            .fields
            .iter()
            .zip(&relation.references)
            .map(|(fk, reference)| (fk.clone(), values.get(reference).cloned().unwrap_or_default()))
            .collect())
    }

    /// A filter matching the record currently linked through owned relation
    /// `field`, or `None` when nothing is linked.
    async fn current_related(&mut self, model: &'a ModelDef, id: &Value, field: &'a FieldDef) -> Result<Option<Value>> {
        let relation = relation_of(field)?;
        let Some(keys) = self.fetch_fields(model, id, &relation.fields).await? else {
            return Err(Error::not_found(&model.name, "update"));
        };

        let mut filter = IndexMap::new();
        for (fk, reference) in relation.fields.iter().zip(&relation.references) {
            match keys.get(fk) {
                Some(value) if !value.is_null() => {
                    filter.insert(reference.clone(), value.clone());
                }
                _ => return Ok(None),
            }
        }
        Ok(Some(Value::Object(filter)))
    }

    async fn link(&mut self, model: &'a ModelDef, id: &Value, field: &'a FieldDef) -> Result<Link<'a>> {
        if self.schema.is_many_to_many(&model.name, field) {
            let m2m = self.schema.many_to_many(&model.name, field)?;
            let values = self.values_of(model, id, std::slice::from_ref(&m2m.parent_id)).await?;
            let parent_id = values.get(&m2m.parent_id).cloned().unwrap_or_default();
            return Ok(Link::JoinTable {
                m2m,
                parent: model,
                parent_id,
            });
        }

        let opposite = self.schema.opposite_field(&model.name, field)?;
        let relation = relation_of(opposite)?;
        let values = self.values_of(model, id, &relation.references).await?;

        Ok(Link::ForeignKey(
            relation
                .fields
                .iter()
                .zip(&relation.references)
                .map(|(fk, reference)| (fk.clone(), values.get(reference).cloned().unwrap_or_default()))
                .collect(),
        ))
    }

    /// Matches the target records linked to the parent.
    fn belongs_filter(&self, model: &'a ModelDef, id: &Value, field: &'a FieldDef, link: &Link<'a>) -> Result<Value> {
        Ok(match link {
            Link::ForeignKey(keys) => Value::Object(keys.clone()),
            Link::JoinTable { .. } => {
                let opposite = self.schema.opposite_field(&model.name, field)?;
                single(&opposite.name, single("some", id.clone()))
            }
        })
    }

    async fn create_linked(&mut self, target: &'a ModelDef, link: &Link<'a>, data: &Value) -> Result<Value> {
        match link {
            Link::ForeignKey(_) => self.create_record(target, &with_keys(data, link)).await,
            Link::JoinTable { .. } => {
                let child = self.create_record(target, data).await?;
                self.attach(target, link, &child).await?;
                Ok(child)
            }
        }
    }

    async fn attach(&mut self, target: &'a ModelDef, link: &Link<'a>, child: &Value) -> Result<()> {
        match link {
            Link::ForeignKey(keys) => {
                self.update_rows(target, std::slice::from_ref(child), keys).await?;
            }
            Link::JoinTable { m2m, parent, parent_id } => {
                let parent_field = parent.get_field(&m2m.parent_id)?;
                let other_field = target.get_field(&m2m.other_id)?;
                let other_id = child.get(&m2m.other_id).unwrap_or(&Value::Null);

                let insert = Insert {
                    table: join_table(m2m),
                    columns: vec![m2m.parent_column.clone(), m2m.other_column.clone()],
                    rows: vec![vec![
                        self.builder.param(parent_field, parent_id)?,
                        self.builder.param(other_field, other_id)?,
                    ]],
                    on_conflict: Some(OnConflict::Ignore),
                    returning: vec![],
                };
                self.exec.execute(insert).await?;
            }
        }
        Ok(())
    }

    /// Unlinks the target records matching `filter` (all linked records
    /// without one) from the parent.
    async fn detach(&mut self, target: &'a ModelDef, link: &Link<'a>, belongs: &Value, filter: Option<&Value>) -> Result<()> {
        let args = single("where", and_filters(belongs.clone(), filter));
        let children = self.find_ids(target, &args).await?;
        if children.is_empty() {
            return Ok(());
        }

        match link {
            Link::ForeignKey(keys) => {
                let unlink = keys.keys().map(|fk| (fk.clone(), Value::Null)).collect();
                self.update_rows(target, &children, &unlink).await?;
            }
            Link::JoinTable { m2m, parent, parent_id } => {
                let parent_field = parent.get_field(&m2m.parent_id)?;
                let other_field = target.get_field(&m2m.other_id)?;
                let table = join_table(m2m);

                let others = children
                    .iter()
                    .map(|child| self.builder.param(other_field, child.get(&m2m.other_id).unwrap_or(&Value::Null)))
                    .collect::<Result<Vec<_>>>()?;
                let filter = Expr::and([
                    Expr::eq(
                        Expr::column(&table.name, &m2m.parent_column),
                        self.builder.param(parent_field, parent_id)?,
                    ),
                    Expr::in_list(Expr::column(&table.name, &m2m.other_column), others),
                ]);

                self.exec
                    .execute(Delete {
                        table,
                        filter: Some(filter),
                        limit: None,
                        returning: vec![],
                    })
                    .await?;
            }
        }
        Ok(())
    }
}

/// `data` with the foreign keys of a foreign-key link filled in.
fn with_keys(data: &Value, link: &Link<'_>) -> Value {
    let mut data = data.as_object().cloned().unwrap_or_default();
    if let Link::ForeignKey(keys) = link {
        for (fk, value) in keys {
            data.insert(fk.clone(), value.clone());
        }
    }
    Value::Object(data)
}
