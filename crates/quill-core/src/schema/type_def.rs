use super::FieldDef;

use indexmap::IndexMap;
use serde::Deserialize;

/// A named shape stored in a JSON column.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefDef {
    #[serde(default)]
    pub name: String,

    pub fields: IndexMap<String, FieldDef>,
}

impl TypeDefDef {
    pub fn new(name: impl Into<String>) -> TypeDefDef {
        TypeDefDef {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> TypeDefDef {
        self.fields.insert(field.name.clone(), field);
        self
    }
}
