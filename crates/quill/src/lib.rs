mod client;
pub use client::{Builder, Client, ModelClient};

pub mod crud;
pub use crud::Operation;

pub mod db;

pub mod dialect;
pub use dialect::Dialect;

mod exec;

pub mod name_mapper;
pub use name_mapper::NameMapper;

mod options;
pub use options::{ComputedContext, ComputedField, Options};

pub mod plugin;
pub use plugin::QueryPlugin;

mod query;

mod result;

pub mod shape;
pub use shape::{ResultShape, Shape};

pub mod validator;
pub use validator::Validator;

pub use quill_core::{bail, driver, err, schema, stmt, Error, Result, Schema, Value};
