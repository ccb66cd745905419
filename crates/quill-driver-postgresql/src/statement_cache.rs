use std::collections::HashMap;

use tokio_postgres::{Client, Error, Statement};

/// Prepared statements of one connection, keyed by SQL text.
#[derive(Debug, Default)]
pub struct StatementCache {
    map: HashMap<String, Statement>,
}

impl StatementCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn prepare(&mut self, client: &Client, query: &str) -> Result<Statement, Error> {
        if let Some(statement) = self.map.get(query) {
            return Ok(statement.clone());
        }

        let statement = client.prepare(query).await?;
        self.map.insert(query.to_string(), statement.clone());
        Ok(statement)
    }
}
