mod capability;
pub use capability::{Capability, InsertIgnore};

pub mod operation;
pub use operation::Operation;

mod response;
pub use response::{Response, RowSet, Rows};

mod transaction;
pub use transaction::NestingTracker;

use crate::{async_trait, Result};

use std::fmt::Debug;

/// A database backend able to open connections.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Describes the driver's capability, which informs query construction.
    fn capability(&self) -> &'static Capability;

    /// Opens a new connection.
    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Upper bound on simultaneously open connections, if the backend has one.
    fn max_connections(&self) -> Option<usize> {
        None
    }
}

/// A single open database connection.
#[async_trait]
pub trait Connection: Debug + Send + 'static {
    /// Execute a database operation
    async fn exec(&mut self, op: Operation) -> Result<Response>;
}
