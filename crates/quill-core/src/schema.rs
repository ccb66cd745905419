mod builtin;
pub use builtin::BuiltinType;

mod enum_def;
pub use enum_def::{EnumDef, EnumValue};

mod field;
pub use field::{FieldDef, FieldDefault, FieldKind};

mod model;
pub use model::{ModelDef, UniqueDef};

mod provider;
pub use provider::Provider;

mod relation;
pub use relation::{JoinPair, ManyToMany, ReferentialAction, RelationInfo};

mod type_def;
pub use type_def::TypeDefDef;

mod verify;

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;

/// Static description of the data model a client operates on.
///
/// A schema is produced once (either through the builder methods or by
/// deserializing the JSON form emitted by the schema compiler), finalized,
/// verified and then shared read-only by every operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub provider: Provider,

    #[serde(default)]
    pub models: IndexMap<String, ModelDef>,

    #[serde(default)]
    pub enums: IndexMap<String, EnumDef>,

    #[serde(default)]
    pub type_defs: IndexMap<String, TypeDefDef>,
}

impl Schema {
    pub fn new(provider: Provider) -> Schema {
        Schema {
            provider,
            models: IndexMap::new(),
            enums: IndexMap::new(),
            type_defs: IndexMap::new(),
        }
    }

    /// Parses the JSON form of a schema, then finalizes and verifies it.
    pub fn from_json(json: &str) -> Result<Schema> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.build()
    }

    pub fn model(mut self, model: ModelDef) -> Schema {
        self.models.insert(model.name.clone(), model);
        self
    }

    pub fn enum_def(mut self, def: EnumDef) -> Schema {
        self.enums.insert(def.name.clone(), def);
        self
    }

    pub fn type_def(mut self, def: TypeDefDef) -> Schema {
        self.type_defs.insert(def.name.clone(), def);
        self
    }

    /// Fills in derived information (names from map keys, inherited delegate
    /// fields, sub-model lists) and verifies the result.
    pub fn build(mut self) -> Result<Schema> {
        self.finalize_names();
        self.inherit_delegate_fields()?;
        verify::verify(&self)?;
        Ok(self)
    }

    fn finalize_names(&mut self) {
        for (name, model) in &mut self.models {
            model.name = name.clone();
            for (field_name, field) in &mut model.fields {
                field.name = field_name.clone();
            }
            if model.id_fields.is_empty() {
                model.id_fields = model
                    .fields
                    .values()
                    .filter(|field| field.id)
                    .map(|field| field.name.clone())
                    .collect();
            }
        }

        for (name, def) in &mut self.enums {
            def.name = name.clone();
        }

        for (name, def) in &mut self.type_defs {
            def.name = name.clone();
            for (field_name, field) in &mut def.fields {
                field.name = field_name.clone();
            }
        }
    }

    /// Copies base-model fields into each delegate sub-model, root first, and
    /// records which model each inherited field originates from.
    fn inherit_delegate_fields(&mut self) -> Result<()> {
        let names: Vec<String> = self.models.keys().cloned().collect();

        for name in &names {
            let chain = self.ancestor_names(name)?;
            if chain.is_empty() {
                continue;
            }

            let mut inherited = IndexMap::new();
            let mut id_fields = vec![];
            let mut unique_fields = IndexMap::new();

            for ancestor in &chain {
                let base = &self.models[ancestor.as_str()];
                for (field_name, field) in &base.fields {
                    if field.origin_model.is_some() || inherited.contains_key(field_name) {
                        continue;
                    }
                    let mut field = field.clone();
                    field.origin_model = Some(ancestor.clone());
                    inherited.insert(field_name.clone(), field);
                }
                if id_fields.is_empty() {
                    id_fields = base.id_fields.clone();
                }
                for (key, unique) in &base.unique_fields {
                    unique_fields.insert(key.clone(), unique.clone());
                }
            }

            let model = self
                .models
                .get_mut(name.as_str())
                .ok_or_else(|| Error::internal(format!("model `{name}` disappeared")))?;

            for (field_name, field) in std::mem::take(&mut model.fields) {
                if field.origin_model.is_none() {
                    inherited.insert(field_name, field);
                } else {
                    inherited.entry(field_name).or_insert(field);
                }
            }
            model.fields = inherited;

            if model.id_fields.is_empty() {
                model.id_fields = id_fields;
            }
            for (key, unique) in unique_fields {
                model.unique_fields.entry(key).or_insert(unique);
            }
        }

        for name in &names {
            let base = self.models[name.as_str()].base_model.clone();
            if let Some(base) = base {
                if let Some(base) = self.models.get_mut(base.as_str()) {
                    if !base.sub_models.contains(name) {
                        base.sub_models.push(name.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Names of the delegate ancestors of `model`, root first.
    fn ancestor_names(&self, model: &str) -> Result<Vec<String>> {
        let mut chain = vec![];
        let mut current = self
            .models
            .get(model)
            .and_then(|model| model.base_model.clone());

        while let Some(base) = current {
            if chain.contains(&base) {
                return Err(Error::invalid_schema(format!(
                    "delegate inheritance cycle through `{base}`"
                )));
            }
            let Some(def) = self.models.get(base.as_str()) else {
                return Err(Error::invalid_schema(format!(
                    "model `{model}` extends unknown model `{base}`"
                )));
            };
            current = def.base_model.clone();
            chain.push(base);
        }

        chain.reverse();
        Ok(chain)
    }

    pub fn get_model(&self, name: &str) -> Result<&ModelDef> {
        self.models
            .get(name)
            .ok_or_else(|| Error::internal(format!("unknown model `{name}`")))
    }

    pub fn get_field(&self, model: &str, field: &str) -> Result<&FieldDef> {
        self.get_model(model)?.get_field(field)
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    pub fn get_type_def(&self, name: &str) -> Option<&TypeDefDef> {
        self.type_defs.get(name)
    }

    /// Classifies a field by what its declared type refers to.
    pub fn field_kind<'a>(&'a self, field: &'a FieldDef) -> FieldKind<'a> {
        if let Some(builtin) = BuiltinType::from_name(&field.ty) {
            FieldKind::Scalar(builtin)
        } else if let Some(def) = self.enums.get(&field.ty) {
            FieldKind::Enum(def)
        } else if let Some(def) = self.type_defs.get(&field.ty) {
            FieldKind::TypeDef(def)
        } else if let Some(model) = self.models.get(&field.ty) {
            FieldKind::Relation(model)
        } else {
            FieldKind::Unknown(&field.ty)
        }
    }

    /// Delegate ancestors of `model`, root first.
    pub fn ancestors(&self, model: &str) -> Vec<&ModelDef> {
        let mut chain = vec![];
        let mut current = self.models.get(model).and_then(|m| m.base_model.as_deref());
        while let Some(base) = current {
            let Some(def) = self.models.get(base) else {
                break;
            };
            chain.push(def);
            current = def.base_model.as_deref();
        }
        chain.reverse();
        chain
    }

    /// All delegate descendants of `model`, breadth first.
    pub fn descendants(&self, model: &str) -> Vec<&ModelDef> {
        let mut out = vec![];
        let mut queue: Vec<&str> = self
            .models
            .get(model)
            .map(|m| m.sub_models.iter().map(String::as_str).collect())
            .unwrap_or_default();

        while !queue.is_empty() {
            let mut next = vec![];
            for name in queue {
                if let Some(def) = self.models.get(name) {
                    out.push(def);
                    next.extend(def.sub_models.iter().map(String::as_str));
                }
            }
            queue = next;
        }
        out
    }

    /// The discriminator field of the root delegate of `model`, if any.
    pub fn discriminator(&self, model: &str) -> Option<&FieldDef> {
        let model = self.models.get(model)?;
        model.fields.values().find(|field| field.is_discriminator)
    }

    /// The field on the other side of a relation.
    pub fn opposite_field(&self, model: &str, field: &FieldDef) -> Result<&FieldDef> {
        let relation = field.relation.as_ref().ok_or_else(|| {
            Error::internal(format!("field `{model}.{}` is not a relation", field.name))
        })?;
        let target = self.get_model(&field.ty)?;

        if let Some(opposite) = &relation.opposite {
            return target.get_field(opposite);
        }

        target
            .fields
            .values()
            .find(|candidate| {
                candidate.ty == model
                    && candidate.name != field.name
                    && candidate
                        .relation
                        .as_ref()
                        .is_some_and(|r| r.name == relation.name)
            })
            .ok_or_else(|| {
                Error::invalid_schema(format!(
                    "relation `{model}.{}` has no opposite field on `{}`",
                    field.name, field.ty
                ))
            })
    }

    /// `true` when both sides of the relation are lists and neither side owns
    /// foreign key fields, i.e. the relation lives in an implicit join table.
    pub fn is_many_to_many(&self, model: &str, field: &FieldDef) -> bool {
        if !field.array || field.relation.as_ref().map_or(true, |r| !r.fields.is_empty()) {
            return false;
        }
        self.opposite_field(model, field)
            .map(|opposite| {
                opposite.array && opposite.relation.as_ref().map_or(true, |r| r.fields.is_empty())
            })
            .unwrap_or(false)
    }

    /// Column pairs correlating a parent row of `model` with rows of the
    /// relation's target model.
    pub fn join_pairs(&self, model: &str, field: &FieldDef) -> Result<Vec<JoinPair>> {
        let relation = field.relation.as_ref().ok_or_else(|| {
            Error::internal(format!("field `{model}.{}` is not a relation", field.name))
        })?;

        if !relation.fields.is_empty() {
            return Ok(relation
                .fields
                .iter()
                .zip(&relation.references)
                .map(|(parent, target)| JoinPair {
                    parent: parent.clone(),
                    target: target.clone(),
                })
                .collect());
        }

        let opposite = self.opposite_field(model, field)?;
        let Some(opposite_relation) = opposite.relation.as_ref() else {
            return Err(Error::invalid_schema(format!(
                "relation `{model}.{}` has no foreign key on either side",
                field.name
            )));
        };

        Ok(opposite_relation
            .references
            .iter()
            .zip(&opposite_relation.fields)
            .map(|(parent, target)| JoinPair {
                parent: parent.clone(),
                target: target.clone(),
            })
            .collect())
    }

    /// Describes the implicit join table backing a many-to-many relation.
    pub fn many_to_many(&self, model: &str, field: &FieldDef) -> Result<ManyToMany> {
        let opposite = self.opposite_field(model, field)?;
        let parent = self.get_model(model)?;
        let target = self.get_model(&field.ty)?;

        let (parent_id, other_id) = match (&parent.id_fields[..], &target.id_fields[..]) {
            ([parent_id], [other_id]) => (parent_id.clone(), other_id.clone()),
            _ => {
                return Err(Error::internal(format!(
                    "many-to-many relation `{model}.{}` requires single-field ids on both sides",
                    field.name
                )))
            }
        };

        let mut sorted_models = [model, field.ty.as_str()];
        sorted_models.sort();

        let parent_is_a = if model != field.ty {
            sorted_models[0] == model
        } else {
            let mut sorted_fields = [field.name.as_str(), opposite.name.as_str()];
            sorted_fields.sort();
            sorted_fields[0] == field.name
        };

        let join_table = match field.relation.as_ref().and_then(|r| r.name.as_deref()) {
            Some(name) => format!("_{name}"),
            None => format!("_{}To{}", sorted_models[0], sorted_models[1]),
        };

        let (parent_column, other_column) = if parent_is_a { ("A", "B") } else { ("B", "A") };

        Ok(ManyToMany {
            join_table,
            parent_column: parent_column.to_string(),
            other_column: other_column.to_string(),
            parent_id,
            other_id,
        })
    }

    /// Every field set that uniquely identifies a row of `model`: the id
    /// fields first, then single-field and compound uniques.
    pub fn unique_sets(&self, model: &str) -> Result<Vec<(String, Vec<String>)>> {
        let model = self.get_model(model)?;
        let mut sets = vec![];

        match &model.id_fields[..] {
            [single] => sets.push((single.clone(), vec![single.clone()])),
            fields => sets.push((fields.join("_"), fields.to_vec())),
        }

        for (name, unique) in &model.unique_fields {
            let fields = match unique {
                UniqueDef::Single(field) => vec![field.clone()],
                UniqueDef::Compound(fields) => fields.clone(),
            };
            if !sets.iter().any(|(key, _)| key == name) {
                sets.push((name.clone(), fields));
            }
        }

        for field in model.fields.values() {
            if field.unique && !sets.iter().any(|(key, _)| key == &field.name) {
                sets.push((field.name.clone(), vec![field.name.clone()]));
            }
        }

        Ok(sets)
    }

    /// `true` if any model, field or enum value carries a storage name that
    /// differs from its logical name.
    pub fn has_name_mapping(&self) -> bool {
        self.models.values().any(|model| {
            model.db_name.is_some()
                || model.db_schema.is_some()
                || model.fields.values().any(|field| field.db_name.is_some())
        }) || self
            .enums
            .values()
            .any(|def| def.values.iter().any(|value| value.db_name.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog() -> Schema {
        Schema::new(Provider::Sqlite)
            .model(
                ModelDef::new("User")
                    .field(FieldDef::new("id", "Int").id())
                    .field(FieldDef::new("email", "String").unique())
                    .field(FieldDef::new("posts", "Post").array().relation(RelationInfo::back()))
                    .field(FieldDef::new("tags", "Tag").array().relation(RelationInfo::back())),
            )
            .model(
                ModelDef::new("Post")
                    .field(FieldDef::new("id", "Int").id())
                    .field(
                        FieldDef::new("author", "User")
                            .relation(RelationInfo::new(&["authorId"], &["id"])),
                    )
                    .field(FieldDef::new("authorId", "Int").foreign_key_for("author")),
            )
            .model(
                ModelDef::new("Tag")
                    .field(FieldDef::new("id", "Int").id())
                    .field(FieldDef::new("users", "User").array().relation(RelationInfo::back())),
            )
    }

    #[test]
    fn join_pairs_from_either_side() {
        let schema = blog().build().unwrap();
        let posts = schema.get_field("User", "posts").unwrap();
        let author = schema.get_field("Post", "author").unwrap();

        assert_eq!(
            schema.join_pairs("User", posts).unwrap(),
            vec![JoinPair {
                parent: "id".into(),
                target: "authorId".into()
            }]
        );
        assert_eq!(
            schema.join_pairs("Post", author).unwrap(),
            vec![JoinPair {
                parent: "authorId".into(),
                target: "id".into()
            }]
        );
    }

    #[test]
    fn many_to_many_join_table() {
        let schema = blog().build().unwrap();
        let tags = schema.get_field("User", "tags").unwrap();
        let users = schema.get_field("Tag", "users").unwrap();

        assert!(schema.is_many_to_many("User", tags));
        assert!(!schema.is_many_to_many("User", schema.get_field("User", "posts").unwrap()));

        let m2m = schema.many_to_many("User", tags).unwrap();
        assert_eq!(m2m.join_table, "_TagToUser");
        assert_eq!(m2m.parent_column, "B");
        assert_eq!(m2m.other_column, "A");

        let m2m = schema.many_to_many("Tag", users).unwrap();
        assert_eq!(m2m.parent_column, "A");
    }

    #[test]
    fn delegate_fields_are_inherited_with_origin() {
        let schema = Schema::new(Provider::Sqlite)
            .model(
                ModelDef::new("Asset")
                    .delegate()
                    .field(FieldDef::new("id", "Int").id())
                    .field(FieldDef::new("assetType", "String").discriminator()),
            )
            .model(
                ModelDef::new("Video")
                    .extends("Asset")
                    .field(FieldDef::new("duration", "Int")),
            )
            .build()
            .unwrap();

        let video = schema.get_model("Video").unwrap();
        let names: Vec<_> = video.fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["id", "assetType", "duration"]);
        assert_eq!(video.fields["id"].origin_model.as_deref(), Some("Asset"));
        assert_eq!(video.fields["duration"].origin_model, None);
        assert_eq!(video.id_fields, ["id"]);
        assert_eq!(schema.get_model("Asset").unwrap().sub_models, ["Video"]);
        assert_eq!(schema.discriminator("Video").unwrap().name, "assetType");
    }

    #[test]
    fn unique_sets_include_compound_keys() {
        let schema = Schema::new(Provider::Sqlite)
            .model(
                ModelDef::new("Member")
                    .field(FieldDef::new("orgId", "Int").id())
                    .field(FieldDef::new("userId", "Int").id())
                    .field(FieldDef::new("handle", "String").unique())
                    .id(&["orgId", "userId"]),
            )
            .build()
            .unwrap();

        let sets = schema.unique_sets("Member").unwrap();
        assert_eq!(sets[0], ("orgId_userId".to_string(), vec!["orgId".to_string(), "userId".to_string()]));
        assert_eq!(sets[1], ("handle".to_string(), vec!["handle".to_string()]));
    }

    #[test]
    fn unknown_relation_target_is_rejected() {
        let err = Schema::new(Provider::Sqlite)
            .model(
                ModelDef::new("Post")
                    .field(FieldDef::new("id", "Int").id())
                    .field(FieldDef::new("author", "Person").relation(RelationInfo::new(&["authorId"], &["id"])))
                    .field(FieldDef::new("authorId", "Int")),
            )
            .build()
            .unwrap_err();
        assert!(err.is_invalid_schema());
    }

    #[test]
    fn schema_from_json() {
        let schema = Schema::from_json(
            r#"{
                "provider": "postgresql",
                "models": {
                    "User": {
                        "dbName": "users",
                        "fields": {
                            "id": { "type": "Int", "id": true, "default": { "kind": "autoincrement" } },
                            "fullName": { "type": "String", "dbName": "full_name" },
                            "role": { "type": "Role", "default": { "kind": "value", "value": "USER" } }
                        },
                        "idFields": ["id"]
                    }
                },
                "enums": {
                    "Role": { "values": [{ "name": "USER" }, { "name": "ADMIN", "dbName": "admin" }] }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(schema.provider, Provider::Postgresql);
        let user = schema.get_model("User").unwrap();
        assert_eq!(user.table_name(), "users");
        assert_eq!(user.fields["fullName"].column_name(), "full_name");
        assert!(matches!(
            schema.field_kind(&user.fields["role"]),
            FieldKind::Enum(def) if def.db_value("ADMIN") == Some("admin")
        ));
        assert!(schema.has_name_mapping());
    }
}
