use crate::stmt::Value;

#[derive(Debug)]
pub struct Response {
    pub rows: Rows,

    /// Id generated by the last insert, on providers without `RETURNING`
    pub last_insert_id: Option<u64>,
}

#[derive(Debug)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Rows produced by the operation
    Values(RowSet),
}

/// Rows returned by a statement, with the column names they were selected as.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
            last_insert_id: None,
        }
    }

    pub fn values(rows: RowSet) -> Self {
        Self {
            rows: Rows::Values(rows),
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: Option<u64>) -> Self {
        self.last_insert_id = id;
        self
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Self::Values(_))
    }

    /// Affected rows, or the number of returned rows.
    pub fn count(&self) -> u64 {
        match self {
            Rows::Count(count) => *count,
            Rows::Values(values) => values.rows.len() as u64,
        }
    }

    pub fn into_values(self) -> RowSet {
        match self {
            Rows::Count(_) => RowSet::default(),
            Rows::Values(values) => values,
        }
    }
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}
