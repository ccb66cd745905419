use super::{Expr, SelectItem, TableName};

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: TableName,

    pub columns: Vec<String>,

    /// One entry per inserted row, each matching `columns`. An empty column
    /// list with a single empty row inserts a row of defaults.
    pub rows: Vec<Vec<Expr>>,

    pub on_conflict: Option<OnConflict>,

    pub returning: Vec<SelectItem>,
}

/// What to do with rows that violate a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Skip them silently (`ON CONFLICT DO NOTHING` / `INSERT IGNORE`)
    Ignore,
}

impl Insert {
    pub fn is_default_values(&self) -> bool {
        self.columns.is_empty()
    }
}
