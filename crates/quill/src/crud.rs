//! Operation handlers.
//!
//! Every operation compiles its arguments with the query builder, runs the
//! resulting statements through the executor and decodes rows with the
//! result processor. Writes run inside a transaction; nested writes share
//! it through savepoints.

mod aggregate;
mod create;
mod delete;
mod find;
mod nested;
mod update;

use crate::{exec::Executor, query::QueryBuilder, result::ResultProcessor};

use quill_core::{
    driver::{Capability, RowSet},
    err,
    schema::ModelDef,
    Error, Result, Schema, Value,
};

use indexmap::IndexMap;
use std::{fmt, str::FromStr};

/// The operations a model supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindUnique,
    FindUniqueOrThrow,
    FindFirst,
    FindFirstOrThrow,
    FindMany,
    Exists,
    Create,
    CreateMany,
    CreateManyAndReturn,
    Update,
    UpdateMany,
    UpdateManyAndReturn,
    Upsert,
    Delete,
    DeleteMany,
    Count,
    Aggregate,
    GroupBy,
}

impl Operation {
    pub const ALL: [Operation; 18] = [
        Operation::FindUnique,
        Operation::FindUniqueOrThrow,
        Operation::FindFirst,
        Operation::FindFirstOrThrow,
        Operation::FindMany,
        Operation::Exists,
        Operation::Create,
        Operation::CreateMany,
        Operation::CreateManyAndReturn,
        Operation::Update,
        Operation::UpdateMany,
        Operation::UpdateManyAndReturn,
        Operation::Upsert,
        Operation::Delete,
        Operation::DeleteMany,
        Operation::Count,
        Operation::Aggregate,
        Operation::GroupBy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::FindUnique => "findUnique",
            Operation::FindUniqueOrThrow => "findUniqueOrThrow",
            Operation::FindFirst => "findFirst",
            Operation::FindFirstOrThrow => "findFirstOrThrow",
            Operation::FindMany => "findMany",
            Operation::Exists => "exists",
            Operation::Create => "create",
            Operation::CreateMany => "createMany",
            Operation::CreateManyAndReturn => "createManyAndReturn",
            Operation::Update => "update",
            Operation::UpdateMany => "updateMany",
            Operation::UpdateManyAndReturn => "updateManyAndReturn",
            Operation::Upsert => "upsert",
            Operation::Delete => "delete",
            Operation::DeleteMany => "deleteMany",
            Operation::Count => "count",
            Operation::Aggregate => "aggregate",
            Operation::GroupBy => "groupBy",
        }
    }

    pub fn from_name(name: &str) -> Option<Operation> {
        Operation::ALL.into_iter().find(|op| op.name() == name)
    }

    /// `true` for operations that never write.
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Operation::FindUnique
                | Operation::FindUniqueOrThrow
                | Operation::FindFirst
                | Operation::FindFirstOrThrow
                | Operation::FindMany
                | Operation::Exists
                | Operation::Count
                | Operation::Aggregate
                | Operation::GroupBy
        )
    }

    /// `true` for operations whose `where` must identify a single record.
    pub fn takes_unique_filter(self) -> bool {
        matches!(
            self,
            Operation::FindUnique
                | Operation::FindUniqueOrThrow
                | Operation::Update
                | Operation::Upsert
                | Operation::Delete
        )
    }

    /// `true` for operations returning `{ count }`.
    pub fn is_batch(self) -> bool {
        matches!(
            self,
            Operation::CreateMany | Operation::UpdateMany | Operation::DeleteMany
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Operation> {
        Operation::from_name(s).ok_or_else(|| err!("unknown operation `{s}`"))
    }
}

/// Runs operations for one client call.
pub(crate) struct Crud<'a> {
    schema: &'a Schema,
    builder: QueryBuilder<'a>,
    processor: ResultProcessor<'a>,
    exec: Executor<'a>,
    capability: &'static Capability,
}

impl<'a> Crud<'a> {
    pub(crate) fn new(
        schema: &'a Schema,
        builder: QueryBuilder<'a>,
        processor: ResultProcessor<'a>,
        exec: Executor<'a>,
    ) -> Crud<'a> {
        let capability = builder.dialect.capability();
        Crud {
            schema,
            builder,
            processor,
            exec,
            capability,
        }
    }

    /// Runs `op` on `model`. Arguments are expected to be validated.
    pub(crate) async fn run(&mut self, model: &str, op: Operation, args: &Value) -> Result<Value> {
        let model = self.schema.get_model(model)?;
        tracing::debug!(model = %model.name, operation = %op, "running operation");

        if op.is_read() {
            return self.read(model, op, args).await;
        }

        self.exec.begin().await?;
        let result = self.write(model, op, args).await;
        self.exec.finish(result).await
    }

    async fn read(&mut self, model: &'a ModelDef, op: Operation, args: &Value) -> Result<Value> {
        match op {
            Operation::FindMany => self.find_many(model, args).await,
            Operation::FindUnique | Operation::FindFirst => self.find_one(model, args).await,
            Operation::FindUniqueOrThrow | Operation::FindFirstOrThrow => {
                match self.find_one(model, args).await? {
                    Value::Null => Err(Error::not_found(&model.name, op.name())),
                    record => Ok(record),
                }
            }
            Operation::Exists => self.exists(model, args).await,
            Operation::Count => self.count(model, args).await,
            Operation::Aggregate => self.aggregate(model, args).await,
            Operation::GroupBy => self.group_by(model, args).await,
            op => Err(Error::internal(format!("`{op}` is not a read"))),
        }
    }

    async fn write(&mut self, model: &'a ModelDef, op: Operation, args: &Value) -> Result<Value> {
        match op {
            Operation::Create => self.create(model, args).await,
            Operation::CreateMany => self.create_many(model, args).await,
            Operation::CreateManyAndReturn => self.create_many_and_return(model, args).await,
            Operation::Update => self.update(model, args).await,
            Operation::UpdateMany => self.update_many(model, args).await,
            Operation::UpdateManyAndReturn => self.update_many_and_return(model, args).await,
            Operation::Upsert => self.upsert(model, args).await,
            Operation::Delete => self.delete(model, args).await,
            Operation::DeleteMany => self.delete_many(model, args).await,
            op => Err(Error::internal(format!("`{op}` is not a write"))),
        }
    }

    /// Decodes rows holding plain columns of `model`, keyed by field name.
    fn decode(&self, model: &'a ModelDef, rows: RowSet) -> Result<Vec<Value>> {
        let fields = rows
            .columns
            .iter()
            .map(|column| model.get_field(column))
            .collect::<Result<Vec<_>>>()?;

        rows.rows
            .into_iter()
            .map(|row| {
                let mut object = IndexMap::new();
                for (field, cell) in fields.iter().zip(row) {
                    let ty = self.builder.value_type(field)?;
                    object.insert(field.name.clone(), self.builder.dialect.transform_output(cell, &ty)?);
                }
                Ok(Value::Object(object))
            })
            .collect()
    }
}

/// The id fields of `record`, as an object usable as a unique filter.
fn id_of(model: &ModelDef, record: &Value) -> Value {
    let mut id = IndexMap::new();
    for name in &model.id_fields {
        id.insert(name.clone(), record.get(name).cloned().unwrap_or_default());
    }
    Value::Object(id)
}

/// Copies the selection arguments (`select`, `include`, `omit`) of `args`
/// and filters by `filter`.
fn selection_args(args: &Value, filter: Value) -> Value {
    let mut out = IndexMap::new();
    out.insert("where".to_string(), filter);
    for key in ["select", "include", "omit"] {
        if let Some(value) = args.get(key) {
            out.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(out)
}

/// `{ key: value }`
fn single(key: &str, value: Value) -> Value {
    let mut map = IndexMap::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// `{ AND: [a, b] }`, or whichever side is present.
fn and_filters(a: Value, b: Option<&Value>) -> Value {
    match b {
        None | Some(Value::Null) => a,
        Some(b) => single("AND", Value::List(vec![a, b.clone()])),
    }
}

/// `{ count: n }`
fn batch(count: u64) -> Value {
    single("count", Value::Int(count as i64))
}
