use super::{id_of, selection_args, Crud};

use quill_core::{
    schema::ModelDef,
    stmt::{Expr, SelectItem},
    Error, Result, Value,
};

use indexmap::IndexMap;

impl<'a> Crud<'a> {
    pub(super) async fn find_many(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        Ok(Value::List(self.read_records(model, args, false).await?))
    }

    /// `findUnique` and `findFirst`: the first matching record or null.
    pub(super) async fn find_one(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let records = self.read_records(model, args, true).await?;
        Ok(records.into_iter().next().unwrap_or_default())
    }

    pub(super) async fn exists(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let select = self.builder.exists(model, args.get("where"))?;
        let rows = self.exec.query(select).await?;
        Ok(Value::Bool(!rows.is_empty()))
    }

    pub(super) async fn read_records(
        &mut self,
        model: &'a ModelDef,
        args: &Value,
        first: bool,
    ) -> Result<Vec<Value>> {
        let query = self.builder.find(model, args, first)?;
        let rows = self.exec.query(query.select).await?;
        self.processor.rows(rows, &query.plan, query.reverse)
    }

    /// Ids of the records matching `args` (`where` plus pagination).
    pub(super) async fn find_ids(&mut self, model: &'a ModelDef, args: &Value) -> Result<Vec<Value>> {
        let select = self.builder.select_ids(model, args)?;
        let rows = self.exec.query(select).await?;
        self.decode(model, rows)
    }

    /// The id of the single record matching `filter`, if any.
    pub(super) async fn find_id(&mut self, model: &'a ModelDef, filter: &Value) -> Result<Option<Value>> {
        let mut args = IndexMap::new();
        args.insert("where".to_string(), filter.clone());
        args.insert("take".to_string(), Value::Int(1));
        let ids = self.find_ids(model, &Value::Object(args)).await?;
        Ok(ids.into_iter().next())
    }

    /// Reads plain `fields` of the record matching `filter`.
    pub(super) async fn fetch_fields(
        &mut self,
        model: &'a ModelDef,
        filter: &Value,
        fields: &[String],
    ) -> Result<Option<Value>> {
        let (mut select, target) = self.builder.from_model(model, model.name.clone(), &[]);
        select.and_filter(self.builder.filter(&target, filter)?);
        select.items = fields
            .iter()
            .map(|name| {
                let field = target.field(name)?;
                Ok(SelectItem::aliased(target.column(field), &field.name))
            })
            .collect::<Result<Vec<_>>>()?;
        if select.items.is_empty() {
            select.items.push(SelectItem::expr(Expr::value(1)));
        }
        select.limit = Some(1);

        let rows = self.exec.query(select).await?;
        if fields.is_empty() {
            return Ok((!rows.is_empty()).then(Value::object));
        }
        Ok(self.decode(model, rows)?.into_iter().next())
    }

    /// `fields` of the record identified by `id`, reusing `id` when it
    /// already holds them.
    pub(super) async fn values_of(
        &mut self,
        model: &'a ModelDef,
        id: &Value,
        fields: &[String],
    ) -> Result<Value> {
        if fields.iter().all(|name| id.get(name).is_some()) {
            return Ok(id.clone());
        }
        self.fetch_fields(model, id, fields)
            .await?
            .ok_or_else(|| Error::not_found(&model.name, "read"))
    }

    /// Reads back a record written by `operation`, shaped by the selection
    /// arguments of `args`. A record the read cannot see fails the write,
    /// which is then rolled back.
    pub(super) async fn read_back(
        &mut self,
        model: &'a ModelDef,
        id: &Value,
        args: &Value,
        operation: &str,
    ) -> Result<Value> {
        let args = selection_args(args, id_of(model, id));
        let records = self.read_records(model, &args, true).await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| Error::rejected_by_policy(&model.name, operation))
    }
}
