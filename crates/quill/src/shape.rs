//! The shape of an operation's result.
//!
//! Shapes are computed from the selection plan the query builder compiles,
//! so a shape always describes exactly the rows a query produces. They are
//! useful to generate types for a client and to check results in tests.

use crate::{
    crud::Operation,
    dialect,
    query::{AggregateKind, AggregatePlan, OutputColumn, PlanItem, QueryBuilder, SelectionPlan},
    Options,
};

use quill_core::{
    schema::{BuiltinType, FieldDef, FieldKind},
    Error, Result, Schema, Value, Violation,
};

use indexmap::IndexMap;
use std::fmt;

/// The type of a value returned by an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Scalar(ScalarKind),

    /// `null` or the inner shape
    Nullable(Box<Shape>),

    List(Box<Shape>),

    Object(IndexMap<String, Shape>),

    /// A row of a delegate model. Rows of a sub-model carry the sub-model's
    /// own fields in addition to the common ones.
    Union {
        discriminator: Option<String>,
        common: IndexMap<String, Shape>,
        variants: IndexMap<String, IndexMap<String, Shape>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarKind {
    String,
    Boolean,
    Int,
    BigInt,
    Float,
    Decimal,
    DateTime,
    Bytes,
    Json,
    Enum { name: String, keys: Vec<String> },
}

/// Computes result shapes for a schema.
#[derive(Debug)]
pub struct ResultShape;

impl ResultShape {
    /// The shape of whatever `operation` returns.
    pub fn of_operation(
        schema: &Schema,
        options: &Options,
        operation: Operation,
        model: &str,
        args: &Value,
    ) -> Result<Shape> {
        use Operation::*;

        Ok(match operation {
            FindUnique | FindFirst => ResultShape::of_find(schema, options, model, args)?.nullable(),
            FindMany | CreateManyAndReturn | UpdateManyAndReturn => {
                ResultShape::of_find(schema, options, model, args)?.list()
            }
            FindUniqueOrThrow | FindFirstOrThrow | Create | Update | Upsert | Delete => {
                ResultShape::of_find(schema, options, model, args)?
            }
            Exists => Shape::Scalar(ScalarKind::Boolean),
            CreateMany | UpdateMany | DeleteMany => ResultShape::of_batch(),
            Count => ResultShape::of_count(schema, model, args)?,
            Aggregate => ResultShape::of_aggregate(schema, options, model, args)?,
            GroupBy => ResultShape::of_group_by(schema, options, model, args)?,
        })
    }

    /// The shape of one row read with `args`.
    pub fn of_find(schema: &Schema, options: &Options, model: &str, args: &Value) -> Result<Shape> {
        let def = schema.get_model(model)?;
        let dialect = dialect::for_provider(schema.provider);
        let builder = QueryBuilder::new(schema, &*dialect, options);
        let plan = builder.plan(def, args)?;
        Ok(Shapes { schema }.row(&plan))
    }

    pub fn of_count(schema: &Schema, model: &str, args: &Value) -> Result<Shape> {
        let def = schema.get_model(model)?;
        let Some(select) = args.get("select").and_then(Value::as_object) else {
            return Ok(Shape::Scalar(ScalarKind::Int));
        };

        let mut fields = IndexMap::new();
        for (name, flag) in select {
            if !flag.is_truthy() {
                continue;
            }
            if name != "_all" {
                def.get_field(name)?;
            }
            fields.insert(name.clone(), Shape::Scalar(ScalarKind::Int));
        }
        Ok(Shape::Object(fields))
    }

    pub fn of_aggregate(schema: &Schema, options: &Options, model: &str, args: &Value) -> Result<Shape> {
        let def = schema.get_model(model)?;
        let dialect = dialect::for_provider(schema.provider);
        let builder = QueryBuilder::new(schema, &*dialect, options);
        let (_, plan) = builder.aggregate(def, args)?;
        Ok(Shapes { schema }.aggregate(&plan, args))
    }

    /// A list with one object per group.
    pub fn of_group_by(schema: &Schema, options: &Options, model: &str, args: &Value) -> Result<Shape> {
        let def = schema.get_model(model)?;
        let dialect = dialect::for_provider(schema.provider);
        let builder = QueryBuilder::new(schema, &*dialect, options);
        let (_, plan) = builder.group_by(def, args)?;
        Ok(Shapes { schema }.aggregate(&plan, args).list())
    }

    /// `{ count }` returned by batch writes.
    pub fn of_batch() -> Shape {
        let mut fields = IndexMap::new();
        fields.insert("count".to_string(), Shape::Scalar(ScalarKind::Int));
        Shape::Object(fields)
    }
}

struct Shapes<'a> {
    schema: &'a Schema,
}

impl Shapes<'_> {
    fn row(&self, plan: &SelectionPlan<'_>) -> Shape {
        let mut common = IndexMap::new();
        for item in &plan.items {
            let shape = match item {
                PlanItem::Field(field) => self.field(field),
                PlanItem::Relation { field, plan, .. } => {
                    let row = self.row(plan);
                    if field.array {
                        row.list()
                    } else if field.optional {
                        row.nullable()
                    } else {
                        row
                    }
                }
                PlanItem::Count(items) => Shape::Object(
                    items
                        .iter()
                        .map(|item| (item.field.name.clone(), Shape::Scalar(ScalarKind::Int)))
                        .collect(),
                ),
            };
            common.insert(item.key().to_string(), shape);
        }

        if plan.descendants.is_empty() {
            return Shape::Object(common);
        }

        let variants = plan
            .descendants
            .iter()
            .map(|descendant| {
                let fields = descendant
                    .fields
                    .iter()
                    .map(|field| (field.name.clone(), self.field(field)))
                    .collect();
                (descendant.model.name.clone(), fields)
            })
            .collect();

        Shape::Union {
            discriminator: self
                .schema
                .discriminator(&plan.model.name)
                .map(|field| field.name.clone()),
            common,
            variants,
        }
    }

    fn field(&self, field: &FieldDef) -> Shape {
        let scalar = Shape::Scalar(self.scalar(field));
        let shape = if field.array { scalar.list() } else { scalar };
        if field.optional {
            shape.nullable()
        } else {
            shape
        }
    }

    fn scalar(&self, field: &FieldDef) -> ScalarKind {
        match self.schema.field_kind(field) {
            FieldKind::Scalar(builtin) => ScalarKind::from(builtin),
            FieldKind::Enum(def) => ScalarKind::Enum {
                name: def.name.clone(),
                keys: def.values.iter().map(|value| value.name.clone()).collect(),
            },
            FieldKind::TypeDef(_) | FieldKind::Relation(_) | FieldKind::Unknown(_) => ScalarKind::Json,
        }
    }

    /// Aggregates nest under their kind, group fields sit at the top.
    fn aggregate(&self, plan: &AggregatePlan<'_>, args: &Value) -> Shape {
        let mut out: IndexMap<String, Shape> = IndexMap::new();

        for (_, column) in &plan.columns {
            match column {
                OutputColumn::Group(field) => {
                    out.insert(field.name.clone(), self.field(field));
                }
                OutputColumn::Aggregate { kind, field } => {
                    let shape = match (kind, field) {
                        (AggregateKind::Count, _) | (_, None) => Shape::Scalar(ScalarKind::Int),
                        (AggregateKind::Avg, Some(field)) if field.builtin() == Some(BuiltinType::Decimal) => {
                            Shape::Scalar(ScalarKind::Decimal).nullable()
                        }
                        (AggregateKind::Avg, Some(_)) => Shape::Scalar(ScalarKind::Float).nullable(),
                        (_, Some(field)) => Shape::Scalar(self.scalar(field)).nullable(),
                    };

                    let entry = out
                        .entry(kind.key().to_string())
                        .or_insert_with(|| Shape::Object(IndexMap::new()));
                    if let Shape::Object(fields) = entry {
                        fields.insert(field.map_or("_all", |field| &field.name).to_string(), shape);
                    }
                }
            }
        }

        if matches!(args.get("_count"), Some(Value::Bool(true))) {
            out.insert("_count".to_string(), Shape::Scalar(ScalarKind::Int));
        }
        Shape::Object(out)
    }
}

impl From<BuiltinType> for ScalarKind {
    fn from(builtin: BuiltinType) -> ScalarKind {
        match builtin {
            BuiltinType::String => ScalarKind::String,
            BuiltinType::Boolean => ScalarKind::Boolean,
            BuiltinType::Int => ScalarKind::Int,
            BuiltinType::BigInt => ScalarKind::BigInt,
            BuiltinType::Float => ScalarKind::Float,
            BuiltinType::Decimal => ScalarKind::Decimal,
            BuiltinType::DateTime => ScalarKind::DateTime,
            BuiltinType::Json => ScalarKind::Json,
            BuiltinType::Bytes => ScalarKind::Bytes,
        }
    }
}

impl ScalarKind {
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ScalarKind::Json, _) => true,
            (ScalarKind::String, Value::String(_)) => true,
            (ScalarKind::Boolean, Value::Bool(_)) => true,
            (ScalarKind::Int, Value::Int(_)) => true,
            (ScalarKind::BigInt, Value::BigInt(_) | Value::Int(_)) => true,
            (ScalarKind::Float, Value::Float(_) | Value::Int(_)) => true,
            (ScalarKind::Decimal, Value::Decimal(_)) => true,
            (ScalarKind::DateTime, Value::DateTime(_)) => true,
            (ScalarKind::Bytes, Value::Bytes(_)) => true,
            (ScalarKind::Enum { keys, .. }, Value::String(key)) => keys.contains(key),
            _ => false,
        }
    }
}

impl Shape {
    pub fn nullable(self) -> Shape {
        if matches!(self, Shape::Nullable(_)) {
            self
        } else {
            Shape::Nullable(Box::new(self))
        }
    }

    pub fn list(self) -> Shape {
        Shape::List(Box::new(self))
    }

    /// Checks that `value` has this shape.
    pub fn check(&self, value: &Value) -> Result<()> {
        let mut mismatches = vec![];
        self.walk(value, "", &mut mismatches);

        match mismatches.first() {
            None => Ok(()),
            Some(first) => Err(Error::internal(format!(
                "result does not match its shape ({} mismatches); first at {first}",
                mismatches.len()
            ))),
        }
    }

    fn walk(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        match self {
            Shape::Scalar(kind) => {
                if !kind.accepts(value) {
                    out.push(Violation::new(path, format!("expected {kind}, got {}", value.type_name())));
                }
            }
            Shape::Nullable(inner) => {
                if !value.is_null() {
                    inner.walk(value, path, out);
                }
            }
            Shape::List(item) => match value {
                Value::List(items) => {
                    for (i, value) in items.iter().enumerate() {
                        item.walk(value, &format!("{path}[{i}]"), out);
                    }
                }
                value => out.push(Violation::new(path, format!("expected a list, got {}", value.type_name()))),
            },
            Shape::Object(fields) => walk_fields(fields, value, path, true, out),
            Shape::Union {
                discriminator,
                common,
                variants,
            } => {
                walk_fields(common, value, path, false, out);
                let Some(entries) = value.as_object() else {
                    return;
                };

                let own = discriminator
                    .as_ref()
                    .and_then(|key| entries.get(key))
                    .and_then(Value::as_str)
                    .and_then(|name| variants.get(name));
                if let Some(fields) = own {
                    for (key, shape) in fields {
                        match entries.get(key) {
                            Some(value) => shape.walk(value, &join(path, key), out),
                            None => out.push(Violation::new(join(path, key), "is missing")),
                        }
                    }
                }

                for (key, value) in entries {
                    if common.contains_key(key) {
                        continue;
                    }
                    match variants.values().find_map(|fields| fields.get(key)) {
                        Some(shape) => shape.walk(value, &join(path, key), out),
                        None => out.push(Violation::new(join(path, key), "is not part of the result")),
                    }
                }
            }
        }
    }
}

fn walk_fields(fields: &IndexMap<String, Shape>, value: &Value, path: &str, closed: bool, out: &mut Vec<Violation>) {
    let Some(entries) = value.as_object() else {
        out.push(Violation::new(path, format!("expected an object, got {}", value.type_name())));
        return;
    };

    for (key, shape) in fields {
        match entries.get(key) {
            Some(value) => shape.walk(value, &join(path, key), out),
            None => out.push(Violation::new(join(path, key), "is missing")),
        }
    }

    if closed {
        for key in entries.keys().filter(|key| !fields.contains_key(*key)) {
            out.push(Violation::new(join(path, key), "is not part of the result"));
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => f.write_str("String"),
            ScalarKind::Boolean => f.write_str("Boolean"),
            ScalarKind::Int => f.write_str("Int"),
            ScalarKind::BigInt => f.write_str("BigInt"),
            ScalarKind::Float => f.write_str("Float"),
            ScalarKind::Decimal => f.write_str("Decimal"),
            ScalarKind::DateTime => f.write_str("DateTime"),
            ScalarKind::Bytes => f.write_str("Bytes"),
            ScalarKind::Json => f.write_str("Json"),
            ScalarKind::Enum { name, .. } => f.write_str(name),
        }
    }
}

/// A TypeScript-like rendering, e.g. `{ id: Int, posts: { title: String }[] }`.
impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fields(f: &mut fmt::Formatter<'_>, fields: &IndexMap<String, Shape>) -> fmt::Result {
            f.write_str("{ ")?;
            for (i, (key, shape)) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: {shape}")?;
            }
            f.write_str(" }")
        }

        match self {
            Shape::Scalar(kind) => write!(f, "{kind}"),
            Shape::Nullable(inner) => write!(f, "{inner} | null"),
            Shape::List(item) => match **item {
                Shape::Nullable(_) | Shape::Union { .. } => write!(f, "({item})[]"),
                _ => write!(f, "{item}[]"),
            },
            Shape::Object(map) => fields(f, map),
            Shape::Union { common, variants, .. } => {
                fields(f, common)?;
                for (name, extra) in variants {
                    write!(f, " & ({name}: ")?;
                    fields(f, extra)?;
                    f.write_str(")?")?;
                }
                Ok(())
            }
        }
    }
}
