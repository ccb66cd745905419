use super::Crud;

use quill_core::{schema::ModelDef, Error, Result, Value};

impl<'a> Crud<'a> {
    /// A number, or with `select` an object of per-field counts.
    pub(super) async fn count(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let (select, plan) = self.builder.count(model, args)?;
        let rows = self.exec.query(select).await?;
        let row = self.single_row(self.processor.aggregate_rows(rows, &plan)?)?;
        let counts = row.get("_count").cloned().unwrap_or_default();

        if args.get("select").is_some_and(|select| select.as_object().is_some()) {
            return Ok(counts);
        }
        Ok(counts.get("_all").cloned().unwrap_or(Value::Int(0)))
    }

    pub(super) async fn aggregate(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let (select, plan) = self.builder.aggregate(model, args)?;
        let rows = self.exec.query(select).await?;
        let mut row = self.single_row(self.processor.aggregate_rows(rows, &plan)?)?;
        flatten_count(args, &mut row);
        Ok(row)
    }

    pub(super) async fn group_by(&mut self, model: &'a ModelDef, args: &Value) -> Result<Value> {
        let (select, plan) = self.builder.group_by(model, args)?;
        let rows = self.exec.query(select).await?;
        let mut groups = self.processor.aggregate_rows(rows, &plan)?;
        for group in &mut groups {
            flatten_count(args, group);
        }
        Ok(Value::List(groups))
    }

    fn single_row(&self, rows: Vec<Value>) -> Result<Value> {
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::internal("aggregate query returned no row"))
    }
}

/// `_count: true` asks for a plain row count rather than an object.
fn flatten_count(args: &Value, row: &mut Value) {
    if !matches!(args.get("_count"), Some(Value::Bool(true))) {
        return;
    }
    if let Some(map) = row.as_object_mut() {
        if let Some(all) = map.get("_count").and_then(|count| count.get("_all")).cloned() {
            map.insert("_count".to_string(), all);
        }
    }
}
