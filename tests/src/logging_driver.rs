use quill_core::{
    async_trait,
    driver::{Capability, Connection, Driver, Operation, Response},
    stmt, Result,
};
use quill_sql::Serializer;

use std::sync::{Arc, Mutex, PoisonError};

/// Wraps a driver and records the SQL of every statement it runs.
#[derive(Debug)]
pub struct LoggingDriver {
    inner: Box<dyn Driver>,
    log: SqlLog,
}

/// Handle on the statements a [`LoggingDriver`] executed, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SqlLog {
    statements: Arc<Mutex<Vec<String>>>,
}

impl LoggingDriver {
    pub fn new(driver: impl Driver) -> Self {
        Self {
            inner: Box::new(driver),
            log: SqlLog::default(),
        }
    }

    pub fn log(&self) -> SqlLog {
        self.log.clone()
    }
}

impl SqlLog {
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, sql: String) {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql);
    }
}

#[async_trait]
impl Driver for LoggingDriver {
    fn capability(&self) -> &'static Capability {
        self.inner.capability()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(LoggingConnection {
            inner: self.inner.connect().await?,
            log: self.log.clone(),
        }))
    }

    fn max_connections(&self) -> Option<usize> {
        self.inner.max_connections()
    }
}

#[derive(Debug)]
struct LoggingConnection {
    inner: Box<dyn Connection>,
    log: SqlLog,
}

#[async_trait]
impl Connection for LoggingConnection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        let sql = match &op {
            Operation::QuerySql(query) => {
                let mut params: Vec<stmt::Value> = vec![];
                Serializer::sqlite().serialize(&query.stmt, &mut params)
            }
            Operation::RawSql(raw) => raw.sql.clone(),
            Operation::Transaction(transaction) => Serializer::sqlite().serialize_transaction(transaction),
        };
        self.log.push(sql);

        self.inner.exec(op).await
    }
}
