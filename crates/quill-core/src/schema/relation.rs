use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationInfo {
    /// Explicit relation name, used to pair fields and to name join tables.
    #[serde(default)]
    pub name: Option<String>,

    /// Foreign key fields on the owning side.
    #[serde(default)]
    pub fields: Vec<String>,

    /// Fields on the referenced model matching `fields`.
    #[serde(default)]
    pub references: Vec<String>,

    #[serde(default)]
    pub opposite: Option<String>,

    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,

    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    NoAction,
    SetNull,
    SetDefault,
}

/// A `parent.field = target.field` pair correlating two models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPair {
    pub parent: String,
    pub target: String,
}

/// The implicit join table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManyToMany {
    pub join_table: String,

    /// Join table column holding the parent's id.
    pub parent_column: String,

    /// Join table column holding the related model's id.
    pub other_column: String,

    pub parent_id: String,
    pub other_id: String,
}

impl RelationInfo {
    /// The owning side of a relation, holding `fields` that reference `references`.
    pub fn new(fields: &[&str], references: &[&str]) -> RelationInfo {
        RelationInfo {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            references: references.iter().map(|f| f.to_string()).collect(),
            ..RelationInfo::default()
        }
    }

    /// The non-owning side of a relation.
    pub fn back() -> RelationInfo {
        RelationInfo::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> RelationInfo {
        self.name = Some(name.into());
        self
    }

    pub fn opposite(mut self, opposite: impl Into<String>) -> RelationInfo {
        self.opposite = Some(opposite.into());
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> RelationInfo {
        self.on_delete = Some(action);
        self
    }

    pub fn owns_foreign_key(&self) -> bool {
        !self.fields.is_empty()
    }
}
