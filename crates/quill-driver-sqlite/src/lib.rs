mod value;
pub(crate) use value::Value;

use quill_core::{
    async_trait,
    driver::{
        operation::{Operation, RawSql},
        Capability, Driver, Response, RowSet,
    },
    stmt, Error, Result,
};
use quill_sql::Serializer;
use rusqlite::Connection as RusqliteConnection;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver from a `sqlite:` connection URL.
    ///
    /// `sqlite::memory:` opens an in-memory database; any other path names a
    /// database file.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(Error::driver_operation_failed)?;

        if url.scheme() != "sqlite" {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            )));
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn connect(&self) -> Result<Box<dyn quill_core::driver::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }

    /// Every in-memory connection is its own database, so the pool must hand
    /// out the same one.
    fn max_connections(&self) -> Option<usize> {
        matches!(self, Self::InMemory).then_some(1)
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection =
            RusqliteConnection::open_in_memory().map_err(Error::driver_operation_failed)?;
        Self::init(connection)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver_operation_failed)?;
        Self::init(connection)
    }

    fn init(connection: RusqliteConnection) -> Result<Self> {
        connection
            .execute_batch("PRAGMA foreign_keys = ON")
            .map_err(Error::driver_operation_failed)?;
        Ok(Self { connection })
    }

    fn execute(&mut self, sql: &str, params: &[Value], returns_rows: bool) -> Result<Response> {
        tracing::debug!(target: "quill::sql", sql = %sql, params = params.len(), "sqlite exec");

        let mut stmt = self
            .connection
            .prepare_cached(sql)
            .map_err(Error::driver_operation_failed)?;

        if !returns_rows {
            let count = stmt
                .execute(rusqlite::params_from_iter(params.iter()))
                .map_err(Error::driver_operation_failed)?;

            return Ok(Response::count(count as u64));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver_operation_failed)?;

        let mut ret = vec![];

        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut items = Vec::with_capacity(width);
                    for index in 0..width {
                        items.push(Value::from_sql(row, index)?.into_inner());
                    }
                    ret.push(items);
                }
                Ok(None) => break,
                Err(err) => return Err(Error::driver_operation_failed(err)),
            }
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
                let sql = Serializer::sqlite().serialize(&op.stmt, &mut params);
                let params: Vec<_> = params.into_iter().map(Value::from).collect();
                self.execute(&sql, &params, op.stmt.returns_rows())
            }
            Operation::RawSql(RawSql {
                sql,
                params,
                returns_rows,
            }) => {
                let params: Vec<_> = params.into_iter().map(Value::from).collect();
                self.execute(&sql, &params, returns_rows)
            }
            Operation::Transaction(op) => {
                let sql = Serializer::sqlite().serialize_transaction(&op);
                tracing::debug!(target: "quill::sql", sql = %sql, "sqlite transaction");
                self.connection
                    .execute_batch(&sql)
                    .map_err(Error::driver_operation_failed)?;
                Ok(Response::count(0))
            }
        }
    }
}
