use super::{BuiltinType, EnumDef, ModelDef, RelationInfo, TypeDefDef};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    #[serde(default)]
    pub name: String,

    /// Builtin scalar name, enum name, type-def name or model name.
    #[serde(rename = "type")]
    pub ty: String,

    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub array: bool,

    #[serde(default)]
    pub id: bool,

    #[serde(default)]
    pub unique: bool,

    /// Set to the current time on create and on every update.
    #[serde(default)]
    pub updated_at: bool,

    #[serde(default)]
    pub default: Option<FieldDefault>,

    #[serde(default)]
    pub relation: Option<RelationInfo>,

    /// Relation fields this scalar is a foreign key for.
    #[serde(default)]
    pub foreign_key_for: Vec<String>,

    /// Set when the field is inherited from a delegate base model.
    #[serde(default)]
    pub origin_model: Option<String>,

    #[serde(default)]
    pub computed: bool,

    /// Excluded from results unless explicitly selected.
    #[serde(default)]
    pub omit: bool,

    #[serde(default)]
    pub is_discriminator: bool,

    /// Column name (`@map`).
    #[serde(default)]
    pub db_name: Option<String>,
}

/// A default value applied when a create payload leaves the field out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FieldDefault {
    /// A literal, applied by the database.
    Value(serde_json::Value),
    Now,
    Autoincrement,
    Uuid,
    Cuid,
    /// An arbitrary database-side expression.
    DbGenerated,
}

/// What a field's declared type resolves to.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind<'a> {
    Scalar(BuiltinType),
    Enum(&'a EnumDef),
    TypeDef(&'a TypeDefDef),
    Relation(&'a ModelDef),
    Unknown(&'a str),
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> FieldDef {
        FieldDef {
            name: name.into(),
            ty: ty.into(),
            optional: false,
            array: false,
            id: false,
            unique: false,
            updated_at: false,
            default: None,
            relation: None,
            foreign_key_for: vec![],
            origin_model: None,
            computed: false,
            omit: false,
            is_discriminator: false,
            db_name: None,
        }
    }

    pub fn id(mut self) -> FieldDef {
        self.id = true;
        self
    }

    pub fn optional(mut self) -> FieldDef {
        self.optional = true;
        self
    }

    pub fn array(mut self) -> FieldDef {
        self.array = true;
        self
    }

    pub fn unique(mut self) -> FieldDef {
        self.unique = true;
        self
    }

    pub fn updated_at(mut self) -> FieldDef {
        self.updated_at = true;
        self
    }

    pub fn default(mut self, default: FieldDefault) -> FieldDef {
        self.default = Some(default);
        self
    }

    pub fn relation(mut self, relation: RelationInfo) -> FieldDef {
        self.relation = Some(relation);
        self
    }

    pub fn foreign_key_for(mut self, relation: impl Into<String>) -> FieldDef {
        self.foreign_key_for.push(relation.into());
        self
    }

    pub fn computed(mut self) -> FieldDef {
        self.computed = true;
        self
    }

    pub fn omit(mut self) -> FieldDef {
        self.omit = true;
        self
    }

    pub fn discriminator(mut self) -> FieldDef {
        self.is_discriminator = true;
        self
    }

    pub fn map(mut self, column: impl Into<String>) -> FieldDef {
        self.db_name = Some(column.into());
        self
    }

    pub fn column_name(&self) -> &str {
        self.db_name.as_deref().unwrap_or(&self.name)
    }

    pub fn builtin(&self) -> Option<BuiltinType> {
        BuiltinType::from_name(&self.ty)
    }

    pub fn is_relation(&self) -> bool {
        self.relation.is_some()
    }

    /// A field backed by a column of the model's own table (or of a delegate
    /// ancestor's table).
    pub fn is_stored(&self) -> bool {
        !self.is_relation() && !self.computed
    }

    pub fn is_foreign_key(&self) -> bool {
        !self.foreign_key_for.is_empty()
    }

    /// `true` if a create payload may leave this field out.
    pub fn has_default(&self) -> bool {
        self.default.is_some() || self.updated_at
    }
}
