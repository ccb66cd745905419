mod value;
pub(crate) use value::Value;

use mysql_async::{
    prelude::{Queryable, ToValue},
    Conn, Pool,
};
use quill_core::{
    async_trait,
    driver::{
        operation::{Operation, RawSql},
        Capability, Driver, Response, RowSet,
    },
    stmt, Error, Result,
};
use quill_sql::Serializer;
use url::Url;

#[derive(Debug)]
pub struct MySQL {
    pool: Pool,
}

impl MySQL {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(|err| {
            Error::invalid_connection_url(format!("{err}; url={url_str}"))
        })?;

        if url.scheme() != "mysql" {
            return Err(Error::invalid_connection_url(format!(
                "connection url does not have a `mysql` scheme; url={url}"
            )));
        }

        url.host_str().ok_or_else(|| {
            Error::invalid_connection_url(format!("missing host in connection URL; url={url}"))
        })?;

        if url.path().is_empty() || url.path() == "/" {
            return Err(Error::invalid_connection_url(format!(
                "no database specified - missing path in connection URL; url={url}"
            )));
        }

        let opts = mysql_async::Opts::from_url(url.as_ref())
            .map_err(|err| Error::invalid_connection_url(err.to_string()))?;
        let opts = mysql_async::OptsBuilder::from_opts(opts).client_found_rows(true);

        Ok(Self {
            pool: Pool::new(opts),
        })
    }
}

impl From<Pool> for MySQL {
    fn from(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Driver for MySQL {
    fn capability(&self) -> &'static Capability {
        &Capability::MYSQL
    }

    async fn connect(&self) -> Result<Box<dyn quill_core::driver::Connection>> {
        let conn = self
            .pool
            .get_conn()
            .await
            .map_err(Error::driver_operation_failed)?;
        Ok(Box::new(Connection::new(conn)))
    }
}

#[derive(Debug)]
pub struct Connection {
    conn: Conn,
}

impl Connection {
    pub fn new(conn: Conn) -> Self {
        Self { conn }
    }

    async fn execute(&mut self, sql: &str, params: &[Value], returns_rows: bool) -> Result<Response> {
        tracing::debug!(target: "quill::sql", sql = %sql, params = params.len(), "mysql exec");

        let args = params
            .iter()
            .map(|param| param.to_value())
            .collect::<Vec<_>>();

        let statement = self
            .conn
            .prep(sql)
            .await
            .map_err(Error::driver_operation_failed)?;

        if !returns_rows {
            let result = self
                .conn
                .exec_iter(&statement, mysql_async::Params::Positional(args))
                .await
                .map_err(Error::driver_operation_failed)?;
            let count = result.affected_rows();
            let last_insert_id = result.last_insert_id();
            drop(result);

            return Ok(Response::count(count).with_last_insert_id(last_insert_id));
        }

        let columns = statement
            .columns()
            .iter()
            .map(|column| column.name_str().into_owned())
            .collect();

        let rows: Vec<mysql_async::Row> = self
            .conn
            .exec(&statement, mysql_async::Params::Positional(args))
            .await
            .map_err(Error::driver_operation_failed)?;

        let mut ret = Vec::with_capacity(rows.len());
        for mut row in rows {
            let mut items = Vec::with_capacity(row.len());
            for index in 0..row.len() {
                let column = row.columns_ref()[index].clone();
                items.push(Value::from_sql(index, &mut row, &column)?.into_inner());
            }
            ret.push(items);
        }

        Ok(Response::values(RowSet { columns, rows: ret }))
    }
}

impl From<Conn> for Connection {
    fn from(conn: Conn) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl quill_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(op) => {
                let mut params: Vec<stmt::Value> = vec![];
                let sql = Serializer::mysql().serialize(&op.stmt, &mut params);
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
                let sql = Serializer::mysql().serialize_transaction(&op);
                tracing::debug!(target: "quill::sql", sql = %sql, "mysql transaction");
                self.conn
                    .query_drop(sql)
                    .await
                    .map_err(Error::driver_operation_failed)?;
                Ok(Response::count(0))
            }
        }
    }
}
