use crate::{
    crud::{Crud, Operation},
    db::{Connect, Pool, PoolConfig},
    dialect::{self, Dialect},
    exec::Executor,
    query::QueryBuilder,
    result::ResultProcessor,
    shape::{ResultShape, Shape},
    ComputedContext, NameMapper, Options, QueryPlugin, Validator,
};

use quill_core::{
    driver::{operation::RawSql, Driver, Rows},
    stmt::{self, Expr},
    Error, Result, Schema, Value,
};

use indexmap::IndexMap;
use std::sync::Arc;

/// Configures and creates a [`Client`].
#[derive(Default)]
pub struct Builder {
    schema: Option<Schema>,
    options: Options,
    plugins: Vec<Arc<dyn QueryPlugin>>,
    pool: PoolConfig,
}

/// Runs model operations against one database.
///
/// Cloning is cheap; clones share the schema, the validator's rule cache and
/// the connection pool.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

struct Shared {
    schema: Arc<Schema>,
    options: Options,
    dialect: Arc<dyn Dialect>,

    /// User plugins in registration order, then the name mapper
    plugins: Vec<Arc<dyn QueryPlugin>>,

    validator: Validator,
    pool: Pool,
}

/// Operations on one model.
#[derive(Clone, Copy)]
pub struct ModelClient<'a> {
    client: &'a Client,
    model: &'a str,
}

impl Builder {
    pub fn schema(&mut self, schema: Schema) -> &mut Self {
        self.schema = Some(schema);
        self
    }

    /// Leaves `model.field` out of results unless a query selects it.
    pub fn omit(&mut self, model: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.options.omit(model, field);
        self
    }

    /// Provides the SQL expression of a computed field.
    pub fn computed_field(
        &mut self,
        model: impl Into<String>,
        field: impl Into<String>,
        f: impl Fn(&ComputedContext<'_>) -> Expr + Send + Sync + 'static,
    ) -> &mut Self {
        self.options.computed_field(model, field, f);
        self
    }

    pub fn plugin(&mut self, plugin: impl QueryPlugin) -> &mut Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn max_connections(&mut self, max: usize) -> &mut Self {
        self.pool.max_size = max;
        self
    }

    /// Connects to the database `url` points at.
    pub async fn connect(&mut self, url: &str) -> Result<Client> {
        self.build(Connect::new(url)?)
    }

    pub fn build(&mut self, driver: impl Driver) -> Result<Client> {
        let schema = self
            .schema
            .take()
            .ok_or_else(|| Error::config("a schema is required to build a client"))?
            .build()?;

        let schema = Arc::new(schema);
        let mut plugins = std::mem::take(&mut self.plugins);
        plugins.push(Arc::new(NameMapper::new(schema.clone())));

        tracing::debug!(
            provider = schema.provider.name(),
            models = schema.models.len(),
            plugins = plugins.len(),
            "building client"
        );

        Ok(Client {
            shared: Arc::new(Shared {
                dialect: dialect::for_provider(schema.provider),
                validator: Validator::new(schema.clone()),
                pool: Pool::new(driver, self.pool.clone())?,
                options: std::mem::take(&mut self.options),
                plugins,
                schema,
            }),
        })
    }
}

impl Client {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.shared.schema
    }

    pub fn model<'a>(&'a self, model: &'a str) -> ModelClient<'a> {
        ModelClient { client: self, model }
    }

    /// Validates `args`, then runs `operation` on its own pooled connection.
    pub async fn run(&self, model: &str, operation: Operation, args: impl Into<Value>) -> Result<Value> {
        let args = args.into();
        let shared = &*self.shared;

        shared.validator.validate(model, operation, &args)?;

        let connection = shared.pool.get().await?;
        let exec = Executor::new(connection, &shared.plugins);
        let builder = QueryBuilder::new(&shared.schema, &*shared.dialect, &shared.options);
        let processor = ResultProcessor::new(&shared.schema, &*shared.dialect);

        Crud::new(&shared.schema, builder, processor, exec)
            .run(model, operation, &args)
            .await
    }

    /// The shape of what `operation` returns for `args`.
    pub fn shape(&self, model: &str, operation: Operation, args: &Value) -> Result<Shape> {
        ResultShape::of_operation(&self.shared.schema, &self.shared.options, operation, model, args)
    }

    /// Runs a statement written in the provider's SQL, returning the number
    /// of affected rows.
    pub async fn execute_raw(&self, sql: &str, params: Vec<Value>) -> Result<u64> {
        let response = self.raw(sql, params, false).await?;
        match response.rows {
            Rows::Count(count) => Ok(count),
            Rows::Values(rows) => Ok(rows.rows.len() as u64),
        }
    }

    /// Runs a query written in the provider's SQL, returning one object per
    /// row keyed by column name.
    pub async fn query_raw(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Value>> {
        let response = self.raw(sql, params, true).await?;
        let Rows::Values(rows) = response.rows else {
            return Err(Error::internal("raw query returned a count instead of rows"));
        };

        Ok(rows
            .rows
            .into_iter()
            .map(|row| {
                let object: IndexMap<String, Value> = rows
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.into_iter().map(raw_output))
                    .collect();
                Value::Object(object)
            })
            .collect())
    }

    async fn raw(&self, sql: &str, params: Vec<Value>, returns_rows: bool) -> Result<quill_core::driver::Response> {
        tracing::debug!(sql, params = params.len(), "running raw sql");

        let params = params.into_iter().map(raw_input).collect::<Result<Vec<_>>>()?;
        let connection = self.shared.pool.get().await?;
        let mut exec = Executor::new(connection, &self.shared.plugins);
        exec.raw(RawSql {
            sql: sql.to_string(),
            params,
            returns_rows,
        })
        .await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("provider", &self.shared.schema.provider)
            .field("options", &self.shared.options)
            .field("plugins", &self.shared.plugins)
            .finish_non_exhaustive()
    }
}

/// Raw parameters carry no field type, so values bind as they are.
fn raw_input(value: Value) -> Result<stmt::Value> {
    Ok(match value {
        Value::Null | Value::DbNull | Value::JsonNull => stmt::Value::Null,
        Value::Bool(v) => stmt::Value::Bool(v),
        Value::Int(v) | Value::BigInt(v) => stmt::Value::I64(v),
        Value::Float(v) => stmt::Value::F64(v),
        Value::Decimal(v) => stmt::Value::Decimal(v),
        Value::String(v) => stmt::Value::String(v),
        Value::DateTime(v) => stmt::Value::DateTime(v),
        Value::Bytes(v) => stmt::Value::Bytes(v),
        Value::Json(v) => stmt::Value::Json(v),
        value @ Value::Object(_) => stmt::Value::Json(value.to_json()),
        Value::List(items) => stmt::Value::List(items.into_iter().map(raw_input).collect::<Result<_>>()?),
        Value::AnyNull => {
            return Err(Error::invalid_input(
                "",
                "executeRaw",
                vec![quill_core::Violation::new("params", "`AnyNull` can only be used in filters")],
            ))
        }
    })
}

fn raw_output(value: stmt::Value) -> Value {
    match value {
        stmt::Value::Null => Value::Null,
        stmt::Value::Bool(v) => Value::Bool(v),
        stmt::Value::I64(v) => Value::Int(v),
        stmt::Value::F64(v) => Value::Float(v),
        stmt::Value::String(v) => Value::String(v),
        stmt::Value::Bytes(v) => Value::Bytes(v),
        stmt::Value::Decimal(v) => Value::Decimal(v),
        stmt::Value::DateTime(v) => Value::DateTime(v),
        stmt::Value::Json(v) => Value::Json(v),
        stmt::Value::List(items) => Value::List(items.into_iter().map(raw_output).collect()),
    }
}

macro_rules! operations {
    ( $( $(#[$attr:meta])* $name:ident => $operation:ident; )* ) => {
        impl ModelClient<'_> {
            $(
                $(#[$attr])*
                pub async fn $name(&self, args: impl Into<Value>) -> Result<Value> {
                    self.client.run(self.model, Operation::$operation, args).await
                }
            )*
        }
    };
}

operations! {
    /// The row matching a unique filter, or `null`.
    find_unique => FindUnique;
    find_unique_or_throw => FindUniqueOrThrow;
    /// The first matching row, or `null`.
    find_first => FindFirst;
    find_first_or_throw => FindFirstOrThrow;
    find_many => FindMany;
    /// `true` if any row matches.
    exists => Exists;
    create => Create;
    /// Inserts rows without reading them back; returns `{ count }`.
    create_many => CreateMany;
    create_many_and_return => CreateManyAndReturn;
    update => Update;
    update_many => UpdateMany;
    update_many_and_return => UpdateManyAndReturn;
    upsert => Upsert;
    delete => Delete;
    delete_many => DeleteMany;
    count => Count;
    aggregate => Aggregate;
    group_by => GroupBy;
}

impl ModelClient<'_> {
    pub fn name(&self) -> &str {
        self.model
    }

    /// The shape of what `operation` returns for `args` on this model.
    pub fn shape(&self, operation: Operation, args: impl Into<Value>) -> Result<Shape> {
        self.client.shape(self.model, operation, &args.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_params_bind_untyped() {
        let object = Value::from(serde_json::json!({ "a": 1 }));
        assert_eq!(raw_input(object).unwrap(), stmt::Value::Json(serde_json::json!({ "a": 1 })));
        assert_eq!(raw_input(Value::BigInt(7)).unwrap(), stmt::Value::I64(7));
        assert_eq!(raw_input(Value::DbNull).unwrap(), stmt::Value::Null);
        assert!(raw_input(Value::AnyNull).unwrap_err().is_invalid_input());
    }

    #[test]
    fn building_requires_a_schema() {
        let err = Client::builder().build(quill_driver_sqlite::Sqlite::in_memory()).unwrap_err();
        assert!(err.is_config(), "{err}");
    }
}
