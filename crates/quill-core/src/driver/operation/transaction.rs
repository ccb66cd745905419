use super::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Start a transaction
    Start,

    /// Commit a transaction
    Commit,

    /// Rollback a transaction
    Rollback,

    /// Create a savepoint named `sp_{n}`
    Savepoint(u32),

    /// Release the savepoint `sp_{n}`
    ReleaseSavepoint(u32),

    /// Roll back to the savepoint `sp_{n}`
    RollbackToSavepoint(u32),
}

impl From<Transaction> for Operation {
    fn from(value: Transaction) -> Self {
        Self::Transaction(value)
    }
}
