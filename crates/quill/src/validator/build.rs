use super::{
    rule::{ObjectRule, Rule, Scalar},
    Kind, RuleKey, AGGREGATES,
};
use crate::crud::Operation;

use quill_core::{
    err,
    schema::{BuiltinType, FieldDef, FieldKind, ModelDef, TypeDefDef},
    Result, Schema,
};

/// Derives rules from the schema.
pub(super) struct Build<'a> {
    schema: &'a Schema,
}

const DIRECTIONS: &[&str] = &["asc", "desc"];

fn reference(model: &str, kind: Kind) -> Rule {
    Rule::Ref(RuleKey {
        model: model.to_string(),
        kind,
    })
}

fn object() -> ObjectRule {
    ObjectRule::default()
}

fn is_numeric(field: &FieldDef) -> bool {
    matches!(
        field.builtin(),
        Some(BuiltinType::Int | BuiltinType::BigInt | BuiltinType::Float | BuiltinType::Decimal)
    ) && !field.array
}

impl<'a> Build<'a> {
    pub(super) fn new(schema: &'a Schema) -> Build<'a> {
        Build { schema }
    }

    pub(super) fn rule(&self, key: &RuleKey) -> Result<Rule> {
        let name = key.model.as_str();
        let model = || self.schema.get_model(name);
        Ok(match &key.kind {
            Kind::Args(operation) => self.args(model()?, *operation),
            Kind::Where => self.filter(model()?, false)?,
            Kind::WhereUnique => self.filter(model()?, true)?,
            Kind::FieldFilter(field) => self.field_filter(name, field)?,
            Kind::TypeDefFilter => self.type_def_filter(self.type_def(name)?),
            Kind::TypeDefValue => self.type_def_value(self.type_def(name)?),
            Kind::Select => self.select(model()?, true),
            Kind::Include => self.select(model()?, false),
            Kind::Omit => self.omit(model()?),
            Kind::OrderBy => self.order_by(model()?),
            Kind::GroupByOrderBy => self.group_by_order(model()?),
            Kind::Create { without } => self.create(model()?, without.as_deref())?,
            Kind::CreateMany { without } => self.create_many(model()?, without.as_deref())?,
            Kind::Update { without } => self.update(model()?, without.as_deref())?,
            Kind::UpdateMany => self.update_many(model()?),
        })
    }

    fn type_def(&self, name: &str) -> Result<&'a TypeDefDef> {
        self.schema
            .get_type_def(name)
            .ok_or_else(|| err!("unknown type `{name}`"))
    }

    fn args(&self, model: &ModelDef, operation: Operation) -> Rule {
        let name = &model.name;
        let selection = |rule: ObjectRule| {
            rule.field("select", reference(name, Kind::Select))
                .field("include", reference(name, Kind::Include))
                .field("omit", reference(name, Kind::Omit))
                .exclusive("select", "include")
                .exclusive("select", "omit")
        };
        let unique = reference(name, Kind::WhereUnique);
        let filter = reference(name, Kind::Where);
        let pagination = |rule: ObjectRule| {
            rule.field("where", filter.clone())
                .field("orderBy", reference(name, Kind::OrderBy).one_or_many())
                .field("cursor", unique.clone())
                .field("take", Rule::Scalar(Scalar::Int))
                .field("skip", Rule::Scalar(Scalar::NonNegativeInt))
        };
        let create = reference(name, Kind::Create { without: None });
        let update = reference(name, Kind::Update { without: None });

        let rule = match operation {
            Operation::FindUnique | Operation::FindUniqueOrThrow => {
                selection(object()).field("where", unique).require("where")
            }
            Operation::FindFirst | Operation::FindFirstOrThrow | Operation::FindMany => {
                selection(pagination(object())).field("distinct", self.scalar_names(model).one_or_many())
            }
            Operation::Exists => object().field("where", filter),
            Operation::Create => selection(object()).field("data", create).require("data"),
            Operation::CreateMany | Operation::CreateManyAndReturn => {
                let rule = object()
                    .field("data", reference(name, Kind::CreateMany { without: None }).one_or_many())
                    .field("skipDuplicates", Rule::boolean())
                    .require("data");
                if operation == Operation::CreateManyAndReturn {
                    selection(rule)
                } else {
                    rule
                }
            }
            Operation::Update => selection(object())
                .field("where", unique)
                .field("data", update)
                .require("where")
                .require("data"),
            Operation::UpdateMany | Operation::UpdateManyAndReturn => {
                let rule = object()
                    .field("where", filter)
                    .field("data", reference(name, Kind::UpdateMany))
                    .field("limit", Rule::Scalar(Scalar::NonNegativeInt))
                    .require("data");
                if operation == Operation::UpdateManyAndReturn {
                    selection(rule)
                } else {
                    rule
                }
            }
            Operation::Upsert => selection(object())
                .field("where", unique)
                .field("create", create)
                .field("update", update)
                .require("where")
                .require("create")
                .require("update"),
            Operation::Delete => selection(object()).field("where", unique).require("where"),
            Operation::DeleteMany => object()
                .field("where", filter)
                .field("limit", Rule::Scalar(Scalar::NonNegativeInt)),
            Operation::Count => {
                let mut fields = object().field("_all", Rule::boolean());
                for field in model.stored_fields() {
                    fields = fields.field(&field.name, Rule::boolean());
                }
                pagination(object()).field("select", Rule::Either(vec![Rule::boolean(), fields.into_rule()]))
            }
            Operation::Aggregate => self.aggregates(model, pagination(object())),
            Operation::GroupBy => self
                .aggregates(model, object())
                .field("by", self.scalar_names(model).one_or_many())
                .field("where", filter)
                .field("having", reference(name, Kind::Where))
                .field("orderBy", reference(name, Kind::GroupByOrderBy).one_or_many())
                .field("take", Rule::Scalar(Scalar::Int))
                .field("skip", Rule::Scalar(Scalar::NonNegativeInt))
                .require("by"),
        };
        rule.into_rule()
    }

    /// `_count`, `_avg`, `_sum`, `_min` and `_max` selections.
    fn aggregates(&self, model: &ModelDef, mut rule: ObjectRule) -> ObjectRule {
        for key in AGGREGATES {
            let mut fields = object();
            if key == "_count" {
                fields = fields.field("_all", Rule::boolean());
            }
            for field in model.stored_fields() {
                let allowed = match key {
                    "_avg" | "_sum" => is_numeric(field),
                    "_min" | "_max" => !field.array,
                    _ => true,
                };
                if allowed {
                    fields = fields.field(&field.name, Rule::boolean());
                }
            }

            let value = if key == "_count" {
                Rule::Either(vec![Rule::boolean(), fields.into_rule()])
            } else {
                fields.into_rule()
            };
            rule = rule.field(key, value);
        }
        rule
    }

    fn scalar_names(&self, model: &ModelDef) -> Rule {
        Rule::OneOf(model.stored_fields().map(|field| field.name.clone()).collect())
    }

    /// The type of a single element of `field`.
    fn element(&self, field: &FieldDef, filter: bool) -> Rule {
        match self.schema.field_kind(field) {
            FieldKind::Scalar(builtin) => Rule::Scalar(match builtin {
                BuiltinType::String => Scalar::String,
                BuiltinType::Boolean => Scalar::Boolean,
                BuiltinType::Int => Scalar::Int,
                BuiltinType::BigInt => Scalar::BigInt,
                BuiltinType::Float => Scalar::Float,
                BuiltinType::Decimal => Scalar::Decimal,
                BuiltinType::DateTime => Scalar::DateTime,
                BuiltinType::Json => Scalar::Json { filter },
                BuiltinType::Bytes => Scalar::Bytes,
            }),
            FieldKind::Enum(def) => Rule::Scalar(Scalar::Enum {
                name: def.name.clone(),
                keys: def.values.iter().map(|value| value.name.clone()).collect(),
            }),
            FieldKind::TypeDef(def) => reference(&def.name, Kind::TypeDefValue),
            FieldKind::Relation(_) | FieldKind::Unknown(_) => Rule::Any,
        }
    }

    /// A value written to, or compared with, `field`.
    fn value(&self, field: &FieldDef, filter: bool) -> Rule {
        let element = self.element(field, filter);
        let rule = if field.array { element.list() } else { element };
        if field.optional {
            rule.nullable()
        } else {
            rule
        }
    }

    fn filter(&self, model: &ModelDef, unique: bool) -> Result<Rule> {
        let name = &model.name;
        let nested = reference(name, Kind::Where);
        let mut rule = object()
            .field("AND", nested.clone().one_or_many())
            .field("OR", nested.clone().list())
            .field("NOT", nested.one_or_many());

        for field in model.fields.values() {
            let field_rule = match &field.relation {
                Some(_) => self.relation_filter(field),
                None => self.field_where(name, field),
            };
            rule = rule.field(&field.name, field_rule);
        }

        for (key, fields) in self.schema.unique_sets(name)? {
            if fields.len() > 1 {
                let mut compound = object();
                for field in &fields {
                    compound = compound
                        .field(field, self.value(model.get_field(field)?, true))
                        .require(field);
                }
                rule = rule.field(&key, compound.into_rule());
            }

            if unique {
                if fields.len() > 1 {
                    rule.unique.push(vec![key]);
                }
                rule.unique.push(fields);
            }
        }

        Ok(rule.into_rule())
    }

    fn field_where(&self, owner: &str, field: &FieldDef) -> Rule {
        let ops = reference(owner, Kind::FieldFilter(field.name.clone()));
        match self.schema.field_kind(field) {
            FieldKind::TypeDef(def) if !field.array => reference(&def.name, Kind::TypeDefFilter).nullable(),
            _ if field.array || field.builtin() == Some(BuiltinType::Json) => ops,
            _ => Rule::Either(vec![self.value(field, true), ops]),
        }
    }

    fn relation_filter(&self, field: &FieldDef) -> Rule {
        let target = reference(&field.ty, Kind::Where);
        if field.array {
            return object()
                .field("some", target.clone())
                .field("every", target.clone())
                .field("none", target)
                .into_rule();
        }

        let presence = object()
            .field("is", target.clone().nullable())
            .field("isNot", target.clone().nullable());
        Rule::Either(vec![presence.into_rule(), target]).nullable()
    }

    /// Operators on the field `name` of a model or type definition.
    fn field_filter(&self, owner: &str, name: &str) -> Result<Rule> {
        let field = match self.schema.models.get(owner) {
            Some(model) => model.get_field(name)?,
            None => self
                .type_def(owner)?
                .fields
                .get(name)
                .ok_or_else(|| err!("unknown field `{owner}.{name}`"))?,
        };

        let element = self.element(field, true);
        if field.array {
            return Ok(object()
                .field("equals", element.clone().list().nullable())
                .field("has", element.clone())
                .field("hasEvery", element.clone().list())
                .field("hasSome", element.list())
                .field("isEmpty", Rule::boolean())
                .into_rule());
        }

        if field.builtin() == Some(BuiltinType::Json) {
            let json = Rule::Scalar(Scalar::Json { filter: true });
            let ops = object()
                .field("path", Rule::Either(vec![Rule::Scalar(Scalar::String), Rule::Scalar(Scalar::String).list()]))
                .field("mode", Rule::one_of(&["default", "insensitive"]))
                .field("equals", json.clone())
                .field("not", json.clone())
                .field("string_contains", Rule::Scalar(Scalar::String))
                .field("string_starts_with", Rule::Scalar(Scalar::String))
                .field("string_ends_with", Rule::Scalar(Scalar::String))
                .field("array_contains", json.clone())
                .field("array_starts_with", json.clone())
                .field("array_ends_with", json.clone());
            return Ok(Rule::Either(vec![ops.into_rule(), json]));
        }

        let value = if field.optional { element.clone().nullable() } else { element.clone() };
        let again = reference(owner, Kind::FieldFilter(name.to_string()));
        let mut ops = object()
            .field("equals", value.clone())
            .field("in", element.clone().list())
            .field("notIn", element.clone().list())
            .field("not", Rule::Either(vec![value, again.clone()]));

        let ordered = matches!(
            field.builtin(),
            Some(
                BuiltinType::String
                    | BuiltinType::Int
                    | BuiltinType::BigInt
                    | BuiltinType::Float
                    | BuiltinType::Decimal
                    | BuiltinType::DateTime
            )
        );
        if ordered {
            for op in ["lt", "lte", "gt", "gte"] {
                ops = ops.field(op, element.clone());
            }
        }

        if field.builtin() == Some(BuiltinType::String) {
            for op in ["contains", "startsWith", "endsWith"] {
                ops = ops.field(op, Rule::Scalar(Scalar::String));
            }
            ops = ops.field("mode", Rule::one_of(&["default", "insensitive"]));
        }

        // Aggregate filters, used by `having`.
        ops = ops.field("_count", self.count_filter());
        ops = ops.field("_min", again.clone()).field("_max", again.clone());
        if is_numeric(field) {
            ops = ops.field("_avg", again.clone()).field("_sum", again);
        }

        Ok(ops.into_rule())
    }

    fn count_filter(&self) -> Rule {
        let int = Rule::Scalar(Scalar::Int);
        let mut ops = object()
            .field("equals", int.clone())
            .field("in", int.clone().list())
            .field("notIn", int.clone().list())
            .field("not", int.clone());
        for op in ["lt", "lte", "gt", "gte"] {
            ops = ops.field(op, int.clone());
        }
        ops.into_rule()
    }

    fn type_def_filter(&self, def: &TypeDefDef) -> Rule {
        let nested = reference(&def.name, Kind::TypeDefFilter);
        let mut rule = object()
            .field("is", nested.clone())
            .field("isNot", nested.clone())
            .field("AND", nested.clone().one_or_many())
            .field("OR", nested.clone().one_or_many())
            .field("NOT", nested.one_or_many());
        for field in def.fields.values() {
            rule = rule.field(&field.name, self.field_where(&def.name, field));
        }
        rule.into_rule()
    }

    fn type_def_value(&self, def: &TypeDefDef) -> Rule {
        let mut rule = object();
        for field in def.fields.values() {
            rule = rule.field(&field.name, self.value(field, false));
            if !field.optional && !field.array && !field.has_default() {
                rule = rule.require(&field.name);
            }
        }
        rule.into_rule()
    }

    /// `select` when `scalars`, otherwise `include`.
    fn select(&self, model: &ModelDef, scalars: bool) -> Rule {
        let mut rule = object();
        for field in model.fields.values() {
            if field.is_relation() {
                let read = self.relation_read(field).into_rule();
                rule = rule.field(&field.name, Rule::Either(vec![Rule::boolean(), read]));
            } else if scalars {
                rule = rule.field(&field.name, Rule::boolean());
            }
        }

        let mut counts = object();
        for field in model.relation_fields().filter(|field| field.array) {
            let filtered = object().field("where", reference(&field.ty, Kind::Where));
            counts = counts.field(&field.name, Rule::Either(vec![Rule::boolean(), filtered.into_rule()]));
        }
        let count = object().field("select", counts.into_rule());
        rule = rule.field("_count", Rule::Either(vec![Rule::boolean(), count.into_rule()]));

        rule.into_rule()
    }

    /// Arguments of a relation selected or included in a read.
    fn relation_read(&self, field: &FieldDef) -> ObjectRule {
        let target = &field.ty;
        let rule = object()
            .field("select", reference(target, Kind::Select))
            .field("include", reference(target, Kind::Include))
            .field("omit", reference(target, Kind::Omit))
            .exclusive("select", "include")
            .exclusive("select", "omit");
        if !field.array {
            return rule;
        }

        let names = self
            .schema
            .models
            .get(target)
            .map(|model| self.scalar_names(model))
            .unwrap_or(Rule::Any);
        rule.field("where", reference(target, Kind::Where))
            .field("orderBy", reference(target, Kind::OrderBy).one_or_many())
            .field("cursor", reference(target, Kind::WhereUnique))
            .field("take", Rule::Scalar(Scalar::Int))
            .field("skip", Rule::Scalar(Scalar::NonNegativeInt))
            .field("distinct", names.one_or_many())
    }

    fn omit(&self, model: &ModelDef) -> Rule {
        let mut rule = object();
        for field in model.fields.values().filter(|field| !field.is_relation()) {
            rule = rule.field(&field.name, Rule::boolean());
        }
        rule.into_rule()
    }

    fn sort(&self) -> Rule {
        let detailed = object()
            .field("sort", Rule::one_of(DIRECTIONS))
            .field("nulls", Rule::one_of(&["first", "last"]))
            .require("sort");
        Rule::Either(vec![Rule::one_of(DIRECTIONS), detailed.into_rule()])
    }

    fn order_by(&self, model: &ModelDef) -> Rule {
        let mut rule = object();
        for field in model.fields.values() {
            let order = match &field.relation {
                Some(_) if field.array => object().field("_count", self.sort()).into_rule(),
                Some(_) => reference(&field.ty, Kind::OrderBy),
                None if field.array => continue,
                None => self.sort(),
            };
            rule = rule.field(&field.name, order);
        }
        rule.into_rule()
    }

    fn group_by_order(&self, model: &ModelDef) -> Rule {
        let mut rule = object();
        for field in model.stored_fields().filter(|field| !field.array) {
            rule = rule.field(&field.name, self.sort());
        }

        for key in AGGREGATES {
            let mut fields = object();
            if key == "_count" {
                fields = fields.field("_all", self.sort());
            }
            for field in model.stored_fields().filter(|field| !field.array) {
                if matches!(key, "_avg" | "_sum") && !is_numeric(field) {
                    continue;
                }
                fields = fields.field(&field.name, self.sort());
            }
            rule = rule.field(key, fields.into_rule());
        }
        rule.into_rule()
    }

    /// The relation a nested payload is written under and the foreign key
    /// fields it owns. Both are filled in by the nested write.
    fn excluded(&self, model: &ModelDef, without: Option<&str>) -> Result<Vec<String>> {
        let Some(name) = without else {
            return Ok(vec![]);
        };
        let field = model.get_field(name)?;
        let mut out = vec![field.name.clone()];
        if let Some(relation) = &field.relation {
            out.extend(relation.fields.iter().cloned());
        }
        Ok(out)
    }

    /// Relations owning foreign keys in `model`, paired with their keys.
    fn owned_relations<'m>(&self, model: &'m ModelDef, excluded: &[String]) -> Vec<(&'m FieldDef, Vec<String>)> {
        model
            .relation_fields()
            .filter(|field| !excluded.contains(&field.name))
            .filter_map(|field| {
                let relation = field.relation.as_ref()?;
                relation.owns_foreign_key().then(|| (field, relation.fields.clone()))
            })
            .collect()
    }

    /// Scalar fields a payload may write.
    fn writable<'m>(&self, model: &'m ModelDef, excluded: &'m [String]) -> impl Iterator<Item = &'m FieldDef> {
        model.stored_fields().filter(move |field| {
            !field.is_discriminator && !excluded.contains(&field.name)
        })
    }

    fn is_required(&self, field: &FieldDef) -> bool {
        !field.optional && !field.array && !field.has_default() && !field.is_foreign_key()
    }

    fn create(&self, model: &ModelDef, without: Option<&str>) -> Result<Rule> {
        let excluded = self.excluded(model, without)?;
        let mut rule = object();

        for field in self.writable(model, &excluded) {
            rule = rule.field(&field.name, self.value(field, false));
            if self.is_required(field) {
                rule = rule.require(&field.name);
            }
        }

        for field in model.relation_fields().filter(|field| !excluded.contains(&field.name)) {
            rule = rule.field(&field.name, self.nested_create(model, field)?);
        }

        for (field, keys) in self.owned_relations(model, &excluded) {
            if !field.optional {
                let mut group = vec![field.name.clone()];
                group.extend(keys.iter().cloned());
                rule.required_any.push(group);
            }
            rule.foreign_keys.push((field.name.clone(), keys));
        }

        Ok(rule.into_rule())
    }

    fn create_many(&self, model: &ModelDef, without: Option<&str>) -> Result<Rule> {
        let excluded = self.excluded(model, without)?;
        let mut rule = object();

        for field in self.writable(model, &excluded) {
            rule = rule.field(&field.name, self.value(field, false));
            if self.is_required(field) {
                rule = rule.require(&field.name);
            }
        }

        for (field, keys) in self.owned_relations(model, &excluded) {
            if !field.optional {
                for key in keys {
                    rule = rule.require(key);
                }
            }
        }

        Ok(rule.into_rule())
    }

    fn nested_create(&self, model: &ModelDef, field: &FieldDef) -> Result<Rule> {
        let (create, unique) = self.nested_targets(model, field)?;
        let connect_or_create = object()
            .field("where", unique.clone())
            .field("create", create.clone())
            .require("where")
            .require("create")
            .into_rule();

        let rule = if field.array {
            object()
                .field("create", create.one_or_many())
                .field("createMany", self.nested_create_many(model, field)?)
                .field("connect", unique.one_or_many())
                .field("connectOrCreate", connect_or_create.one_or_many())
        } else {
            object()
                .field("create", create)
                .field("connect", unique)
                .field("connectOrCreate", connect_or_create)
        };
        Ok(rule.into_rule())
    }

    fn nested_create_many(&self, model: &ModelDef, field: &FieldDef) -> Result<Rule> {
        let without = self.opposite(model, field)?;
        Ok(object()
            .field("data", reference(&field.ty, Kind::CreateMany { without }).one_or_many())
            .field("skipDuplicates", Rule::boolean())
            .require("data")
            .into_rule())
    }

    fn opposite(&self, model: &ModelDef, field: &FieldDef) -> Result<Option<String>> {
        Ok(self
            .schema
            .opposite_field(&model.name, field)
            .ok()
            .map(|opposite| opposite.name.clone()))
    }

    /// Create payload and unique filter of a relation's target.
    fn nested_targets(&self, model: &ModelDef, field: &FieldDef) -> Result<(Rule, Rule)> {
        let without = self.opposite(model, field)?;
        Ok((
            reference(&field.ty, Kind::Create { without }),
            reference(&field.ty, Kind::WhereUnique),
        ))
    }

    fn update_value(&self, field: &FieldDef) -> Rule {
        let value = self.value(field, false);

        if field.array {
            let element = self.element(field, false);
            let ops = object()
                .field("set", value.clone())
                .field("push", Rule::Either(vec![element.clone(), element.list()]))
                .exactly_one();
            return Rule::Either(vec![value, ops.into_rule()]);
        }

        match self.schema.field_kind(field) {
            FieldKind::Scalar(BuiltinType::Json) | FieldKind::TypeDef(_) => value,
            _ if is_numeric(field) => {
                let element = self.element(field, false);
                let mut ops = object().field("set", value.clone());
                for op in ["increment", "decrement", "multiply", "divide"] {
                    ops = ops.field(op, element.clone());
                }
                Rule::Either(vec![value, ops.exactly_one().into_rule()])
            }
            _ => {
                let ops = object().field("set", value.clone()).exactly_one();
                Rule::Either(vec![value, ops.into_rule()])
            }
        }
    }

    fn update(&self, model: &ModelDef, without: Option<&str>) -> Result<Rule> {
        let excluded = self.excluded(model, without)?;
        let mut rule = object();

        for field in self.writable(model, &excluded) {
            rule = rule.field(&field.name, self.update_value(field));
        }

        for field in model.relation_fields().filter(|field| !excluded.contains(&field.name)) {
            rule = rule.field(&field.name, self.nested_update(model, field)?);
        }

        for (field, keys) in self.owned_relations(model, &excluded) {
            rule.foreign_keys.push((field.name.clone(), keys));
        }

        Ok(rule.into_rule())
    }

    fn update_many(&self, model: &ModelDef) -> Rule {
        let mut rule = object();
        for field in self.writable(model, &[]) {
            rule = rule.field(&field.name, self.update_value(field));
        }
        rule.into_rule()
    }

    fn nested_update(&self, model: &ModelDef, field: &FieldDef) -> Result<Rule> {
        let (create, unique) = self.nested_targets(model, field)?;
        let without = self.opposite(model, field)?;
        let update = reference(&field.ty, Kind::Update { without });
        let filter = reference(&field.ty, Kind::Where);

        let Rule::Object(mut rule) = self.nested_create(model, field)? else {
            return Err(err!("nested create of `{}.{}` is not an object", model.name, field.name));
        };

        if field.array {
            let targeted = object()
                .field("where", unique.clone())
                .field("data", update.clone())
                .require("where")
                .require("data");
            let many = object()
                .field("where", filter.clone())
                .field("data", reference(&field.ty, Kind::UpdateMany))
                .require("data");
            let upsert = object()
                .field("where", unique.clone())
                .field("create", create)
                .field("update", update)
                .require("where")
                .require("create")
                .require("update");

            rule = rule
                .field("set", unique.clone().one_or_many())
                .field("disconnect", unique.clone().one_or_many())
                .field("delete", unique.one_or_many())
                .field("update", targeted.into_rule().one_or_many())
                .field("updateMany", many.into_rule().one_or_many())
                .field("upsert", upsert.into_rule().one_or_many())
                .field("deleteMany", filter.one_or_many());
        } else {
            let wrapped = object()
                .field("where", filter.clone())
                .field("data", update.clone())
                .require("data");
            let upsert = object()
                .field("where", filter.clone())
                .field("create", create)
                .field("update", update.clone())
                .require("create")
                .require("update");

            rule = rule
                .field("update", Rule::Either(vec![wrapped.into_rule(), update]))
                .field("upsert", upsert.into_rule());
            if field.optional {
                let flag_or_filter = Rule::Either(vec![Rule::boolean(), filter]);
                rule = rule
                    .field("disconnect", flag_or_filter.clone())
                    .field("delete", flag_or_filter);
            }
        }

        Ok(rule.into_rule())
    }
}
