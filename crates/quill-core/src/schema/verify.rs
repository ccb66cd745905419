use super::{BuiltinType, FieldKind, Schema, UniqueDef};
use crate::{Error, Result};

/// Checks the structural consistency of a finalized schema.
pub(super) fn verify(schema: &Schema) -> Result<()> {
    for model in schema.models.values() {
        if model.id_fields.is_empty() {
            return Err(Error::invalid_schema(format!(
                "model `{}` has no id fields",
                model.name
            )));
        }

        for id in &model.id_fields {
            if !model.fields.contains_key(id) {
                return Err(Error::invalid_schema(format!(
                    "id field `{}.{id}` does not exist",
                    model.name
                )));
            }
        }

        for (name, unique) in &model.unique_fields {
            let fields = match unique {
                UniqueDef::Single(field) => std::slice::from_ref(field),
                UniqueDef::Compound(fields) => &fields[..],
            };
            if let Some(missing) = fields.iter().find(|f| !model.fields.contains_key(*f)) {
                return Err(Error::invalid_schema(format!(
                    "unique constraint `{}.{name}` references unknown field `{missing}`",
                    model.name
                )));
            }
        }

        if let Some(base) = &model.base_model {
            let base_def = schema.get_model(base)?;
            if !base_def.is_delegate {
                return Err(Error::invalid_schema(format!(
                    "model `{}` extends `{base}`, which is not a delegate model",
                    model.name
                )));
            }
        }

        if model.is_delegate && schema.discriminator(&model.name).is_none() {
            return Err(Error::invalid_schema(format!(
                "delegate model `{}` has no discriminator field",
                model.name
            )));
        }

        for field in model.fields.values() {
            match schema.field_kind(field) {
                FieldKind::Unknown(ty) => {
                    return Err(Error::invalid_schema(format!(
                        "field `{}.{}` has unknown type `{ty}`",
                        model.name, field.name
                    )))
                }
                FieldKind::Relation(target) => {
                    let Some(relation) = &field.relation else {
                        return Err(Error::invalid_schema(format!(
                            "field `{}.{}` references model `{}` without relation info",
                            model.name, field.name, target.name
                        )));
                    };

                    if relation.fields.len() != relation.references.len() {
                        return Err(Error::invalid_schema(format!(
                            "relation `{}.{}` has mismatched fields and references",
                            model.name, field.name
                        )));
                    }

                    for fk in &relation.fields {
                        if !model.fields.contains_key(fk) {
                            return Err(Error::invalid_schema(format!(
                                "relation `{}.{}` uses unknown foreign key `{fk}`",
                                model.name, field.name
                            )));
                        }
                    }

                    for reference in &relation.references {
                        if !target.fields.contains_key(reference) {
                            return Err(Error::invalid_schema(format!(
                                "relation `{}.{}` references unknown field `{}.{reference}`",
                                model.name, field.name, target.name
                            )));
                        }
                    }

                    schema.opposite_field(&model.name, field)?;
                }
                FieldKind::Scalar(BuiltinType::Json) | FieldKind::TypeDef(_) if field.id => {
                    return Err(Error::invalid_schema(format!(
                        "field `{}.{}` cannot be an id",
                        model.name, field.name
                    )))
                }
                _ => {}
            }
        }
    }

    for def in schema.type_defs.values() {
        for field in def.fields.values() {
            let unsupported = match schema.field_kind(field) {
                FieldKind::Unknown(ty) => Some(ty),
                FieldKind::Relation(target) => Some(target.name.as_str()),
                _ => None,
            };
            if let Some(ty) = unsupported {
                return Err(Error::invalid_schema(format!(
                    "type `{}` field `{}` has unsupported type `{ty}`",
                    def.name, field.name
                )));
            }
        }
    }

    Ok(())
}
