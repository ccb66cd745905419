pub mod driver;

mod error;
pub use error::{Error, IntoError, Violation};

pub mod schema;
pub use schema::Schema;

pub mod stmt;

mod value;
pub use value::Value;

pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
