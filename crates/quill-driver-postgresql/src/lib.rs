mod statement_cache;
use statement_cache::StatementCache;

mod value;
pub(crate) use value::Value;

use postgres::types::ToSql;
use quill_core::{
    async_trait,
    driver::{
        operation::{Operation, RawSql},
        Capability, Driver, Response, RowSet,
    },
    stmt, Error, Result,
};
use quill_sql::Serializer;
use tokio_postgres::{Client, Config};
use url::Url;

#[derive(Debug)]
pub struct PostgreSQL {
    config: Config,
}

impl PostgreSQL {
    /// Creates a driver from a `postgresql://` (or `postgres://`) connection URL.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(|err| {
            Error::invalid_connection_url(format!("{err}; url={url_str}"))
        })?;

        if !matches!(url.scheme(), "postgresql" | "postgres") {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `postgresql` scheme; url={url}"
            )));
        }

        let host = url.host_str().ok_or_else(|| {
            Error::invalid_connection_url(format!("missing host in connection URL; url={url}"))
        })?;

        if url.path().is_empty() || url.path() == "/" {
            return Err(Error::invalid_connection_url(format!(
                "no database specified - missing path in connection URL; url={url}"
            )));
        }

        let mut config = Config::new();
        config.host(host);
        config.dbname(url.path().trim_start_matches('/'));

        if let Some(port) = url.port() {
            config.port(port);
        }

        if !url.username().is_empty() {
            config.user(url.username());
        }

        if let Some(password) = url.password() {
            config.password(password);
        }

        Ok(Self::with_config(config))
    }

    /// Creates a driver from a [`tokio_postgres::Config`].
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Driver for PostgreSQL {
    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }

    async fn connect(&self) -> Result<Box<dyn quill_core::driver::Connection>> {
        let (client, connection) = self
            .config
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(Error::driver_operation_failed)?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "postgresql connection error");
            }
        });

        Ok(Box::new(Connection::new(client)))
    }
}

#[derive(Debug)]
pub struct Connection {
    client: Client,
    statement_cache: StatementCache,
}

impl Connection {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            statement_cache: StatementCache::new(),
        }
    }

    async fn execute(&mut self, sql: &str, params: &[Value], returns_rows: bool) -> Result<Response> {
        tracing::debug!(target: "quill::sql", sql = %sql, params = params.len(), "postgresql exec");

        let statement = self
            .statement_cache
            .prepare(&self.client, sql)
            .await
            .map_err(Error::driver_operation_failed)?;

        let args = params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();

        if !returns_rows {
            let count = self
                .client
                .execute(&statement, &args)
                .await
                .map_err(Error::driver_operation_failed)?;
            return Ok(Response::count(count));
        }

        let columns = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let rows = self
            .client
            .query(&statement, &args)
            .await
            .map_err(Error::driver_operation_failed)?;

        let mut ret = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut items = Vec::with_capacity(row.len());
            for (index, column) in row.columns().iter().enumerate() {
                items.push(value::from_row(row, index, column.type_())?);
            }
            ret.push(items);
        }

        Ok(Response::values(RowSet { columns, rows: ret }))
    }
}

#[async_trait]
impl quill_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(op) => {
                let mut params: Vec<stmt::Value> = vec![];
                let sql = Serializer::postgresql().serialize(&op.stmt, &mut params);
                let params: Vec<_> = params.into_iter().map(Value::from).collect();
                self.execute(&sql, &params, op.stmt.returns_rows()).await
            }
            Operation::RawSql(RawSql {
                sql,
                params,
                returns_rows,
            }) => {
                let params: Vec<_> = params.into_iter().map(Value::from).collect();
                self.execute(&sql, &params, returns_rows).await
            }
            Operation::Transaction(op) => {
                let sql = Serializer::postgresql().serialize_transaction(&op);
                tracing::debug!(target: "quill::sql", sql = %sql, "postgresql transaction");
                self.client
                    .batch_execute(&sql)
                    .await
                    .map_err(Error::driver_operation_failed)?;
                Ok(Response::count(0))
            }
        }
    }
}
