use super::FieldDef;
use crate::{Error, Result};

use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDef {
    #[serde(default)]
    pub name: String,

    pub fields: IndexMap<String, FieldDef>,

    #[serde(default)]
    pub id_fields: Vec<String>,

    #[serde(default)]
    pub unique_fields: IndexMap<String, UniqueDef>,

    /// Delegate base this model extends.
    #[serde(default)]
    pub base_model: Option<String>,

    #[serde(default)]
    pub is_delegate: bool,

    /// Direct delegate sub-models, derived when the schema is built.
    #[serde(skip)]
    pub sub_models: Vec<String>,

    /// Table name (`@@map`).
    #[serde(default)]
    pub db_name: Option<String>,

    /// Database schema the table lives in (`@@schema`).
    #[serde(default)]
    pub db_schema: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UniqueDef {
    Single(String),
    Compound(Vec<String>),
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> ModelDef {
        ModelDef {
            name: name.into(),
            fields: IndexMap::new(),
            id_fields: vec![],
            unique_fields: IndexMap::new(),
            base_model: None,
            is_delegate: false,
            sub_models: vec![],
            db_name: None,
            db_schema: None,
        }
    }

    pub fn field(mut self, field: FieldDef) -> ModelDef {
        if field.id && !self.id_fields.contains(&field.name) {
            self.id_fields.push(field.name.clone());
        }
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn id(mut self, fields: &[&str]) -> ModelDef {
        self.id_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn unique(mut self, name: impl Into<String>, fields: &[&str]) -> ModelDef {
        self.unique_fields.insert(
            name.into(),
            UniqueDef::Compound(fields.iter().map(|f| f.to_string()).collect()),
        );
        self
    }

    pub fn map(mut self, table: impl Into<String>) -> ModelDef {
        self.db_name = Some(table.into());
        self
    }

    pub fn db_schema(mut self, schema: impl Into<String>) -> ModelDef {
        self.db_schema = Some(schema.into());
        self
    }

    pub fn delegate(mut self) -> ModelDef {
        self.is_delegate = true;
        self
    }

    pub fn extends(mut self, base: impl Into<String>) -> ModelDef {
        self.base_model = Some(base.into());
        self
    }

    pub fn get_field(&self, name: &str) -> Result<&FieldDef> {
        self.fields.get(name).ok_or_else(|| {
            Error::internal(format!("model `{}` has no field `{name}`", self.name))
        })
    }

    pub fn table_name(&self) -> &str {
        self.db_name.as_deref().unwrap_or(&self.name)
    }

    /// Fields backed by a column, in declaration order.
    pub fn stored_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values().filter(|field| field.is_stored())
    }

    /// Fields stored in this model's own table.
    pub fn own_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.stored_fields()
            .filter(|field| field.origin_model.is_none() || self.id_fields.contains(&field.name))
    }

    pub fn relation_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values().filter(|field| field.is_relation())
    }

    pub fn is_id_field(&self, name: &str) -> bool {
        self.id_fields.iter().any(|id| id == name)
    }

    /// `true` if any field or the table itself is stored under another name.
    pub fn has_mapped_names(&self) -> bool {
        self.db_name.is_some() || self.fields.values().any(|field| field.db_name.is_some())
    }
}
