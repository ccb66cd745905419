pub mod serializer;
pub use serializer::{Flavor, Params, Placeholder, Serializer};

pub use quill_core::stmt::{self, Statement};
