use super::operation::Transaction;

/// Tracks transaction nesting depth on one connection and picks the
/// transaction operation for each begin, commit or rollback.
///
/// The outermost level is a real transaction; every level inside it is a
/// savepoint named after its depth.
#[derive(Debug, Default)]
pub struct NestingTracker {
    depth: u32,
}

impl NestingTracker {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// `Start` at depth zero, `Savepoint(n)` otherwise. Increments depth.
    pub fn begin(&mut self) -> Transaction {
        let op = if self.depth == 0 {
            Transaction::Start
        } else {
            Transaction::Savepoint(self.depth)
        };
        self.depth += 1;
        op
    }

    /// `Commit` for the outermost level, `ReleaseSavepoint(n)` otherwise.
    /// Decrements depth.
    pub fn commit(&mut self) -> Transaction {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            Transaction::Commit
        } else {
            Transaction::ReleaseSavepoint(self.depth)
        }
    }

    /// `Rollback` for the outermost level, `RollbackToSavepoint(n)`
    /// otherwise. Decrements depth.
    pub fn rollback(&mut self) -> Transaction {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            Transaction::Rollback
        } else {
            Transaction::RollbackToSavepoint(self.depth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_levels_use_savepoints() {
        let mut tracker = NestingTracker::new();
        assert_eq!(tracker.begin(), Transaction::Start);
        assert_eq!(tracker.begin(), Transaction::Savepoint(1));
        assert_eq!(tracker.begin(), Transaction::Savepoint(2));
        assert_eq!(tracker.rollback(), Transaction::RollbackToSavepoint(2));
        assert_eq!(tracker.commit(), Transaction::ReleaseSavepoint(1));
        assert_eq!(tracker.commit(), Transaction::Commit);
        assert_eq!(tracker.depth(), 0);
    }
}
