use super::{list_arg, ModelRef, QueryBuilder};
use crate::dialect::{ArrayOp, PathSegment, ScalarType, ValueType};

use quill_core::{
    bail, err,
    schema::{BuiltinType, FieldDef, FieldKind, Provider, TypeDefDef},
    stmt::{BinaryOp, CastType, Expr},
    Result, Value,
};

/// Something a filter can compare against: a column, a computed field, an
/// aggregate over a column or a value extracted from a JSON document.
#[derive(Debug, Clone)]
struct Operand<'a> {
    expr: Expr,
    ty: ValueType<'a>,
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Contains,
    StartsWith,
    EndsWith,
}

const JSON_OPERATORS: &[&str] = &[
    "path",
    "mode",
    "equals",
    "not",
    "string_contains",
    "string_starts_with",
    "string_ends_with",
    "array_contains",
    "array_starts_with",
    "array_ends_with",
];

impl<'a> QueryBuilder<'a> {
    /// Folds a `where` object into a boolean expression over `target`.
    ///
    /// Sibling keys are AND-ed. `AND`, `OR` and `NOT` take a single filter
    /// or a list of them.
    pub(crate) fn filter(&self, target: &ModelRef<'a>, filter: &Value) -> Result<Expr> {
        let entries = match filter {
            Value::Null => return Ok(Expr::TRUE),
            Value::Object(entries) => entries,
            other => bail!("filter must be an object, got {}", other.type_name()),
        };

        let mut exprs = vec![];
        for (key, value) in entries {
            let expr = match key.as_str() {
                "AND" => Expr::and(self.filter_list(target, value)?),
                "OR" => Expr::or(self.filter_list(target, value)?),
                "NOT" => Expr::not(Expr::and(self.filter_list(target, value)?)),
                key => self.field_filter(target, key, value)?,
            };
            exprs.push(expr);
        }

        Ok(Expr::and(exprs))
    }

    fn filter_list(&self, target: &ModelRef<'a>, value: &Value) -> Result<Vec<Expr>> {
        list_arg(value)
            .into_iter()
            .map(|filter| self.filter(target, filter))
            .collect()
    }

    fn field_filter(&self, target: &ModelRef<'a>, key: &str, payload: &Value) -> Result<Expr> {
        let model = target.model;

        if let Some(field) = model.fields.get(key) {
            if field.is_relation() {
                return self.relation_filter(target, field, payload);
            }

            let operand = Operand {
                expr: self.field_expr(target, field)?,
                ty: self.value_type(field)?,
            };
            return self.operand_filter(&operand, payload);
        }

        // Compound unique keys: `{ orgId_email: { orgId: 1, email: "a" } }`
        let sets = self.schema.unique_sets(&model.name)?;
        let Some((_, fields)) = sets.iter().find(|(name, fields)| name == key && fields.len() > 1)
        else {
            bail!("unknown filter field `{}.{key}`", model.name);
        };

        let mut exprs = vec![];
        for name in fields {
            let field = target.field(name)?;
            let value = payload
                .get(name)
                .ok_or_else(|| err!("compound unique `{key}` is missing `{name}`"))?;
            exprs.push(Expr::eq(target.column(field), self.param(field, value)?));
        }
        Ok(Expr::and(exprs))
    }

    fn operand_filter(&self, operand: &Operand<'a>, payload: &Value) -> Result<Expr> {
        if operand.ty.array {
            return self.list_filter(operand, payload);
        }

        match operand.ty.scalar {
            ScalarType::Builtin(BuiltinType::Json) => self.json_filter(&operand.expr, payload),
            ScalarType::TypeDef(def) => self.typed_json_filter(&operand.expr, &[], def, payload),
            _ => self.scalar_filter(operand, payload, false),
        }
    }

    fn encode(&self, operand: &Operand<'a>, value: &Value) -> Result<Expr> {
        Ok(Expr::Value(self.dialect.transform_input(value, &operand.ty)?))
    }

    fn scalar_filter(&self, operand: &Operand<'a>, payload: &Value, insensitive: bool) -> Result<Expr> {
        let Value::Object(ops) = payload else {
            return self.equals(operand, payload, insensitive);
        };

        let insensitive =
            insensitive || ops.get("mode").and_then(Value::as_str) == Some("insensitive");

        let mut exprs = vec![];
        for (op, value) in ops {
            let expr = match op.as_str() {
                "equals" => self.equals(operand, value, insensitive)?,
                "not" => match value {
                    Value::Object(_) => Expr::not(self.scalar_filter(operand, value, insensitive)?),
                    Value::Null => Expr::is_not_null(operand.expr.clone()),
                    value => Expr::not(self.equals(operand, value, insensitive)?),
                },
                "in" => self.in_list(operand, value, insensitive, false)?,
                "notIn" => self.in_list(operand, value, insensitive, true)?,
                "lt" => self.compare(operand, BinaryOp::Lt, value, insensitive)?,
                "lte" => self.compare(operand, BinaryOp::Le, value, insensitive)?,
                "gt" => self.compare(operand, BinaryOp::Gt, value, insensitive)?,
                "gte" => self.compare(operand, BinaryOp::Ge, value, insensitive)?,
                "contains" => self.pattern(operand, Pattern::Contains, value, insensitive)?,
                "startsWith" => self.pattern(operand, Pattern::StartsWith, value, insensitive)?,
                "endsWith" => self.pattern(operand, Pattern::EndsWith, value, insensitive)?,
                "_count" | "_avg" | "_sum" | "_min" | "_max" => {
                    self.aggregate_filter(operand, op, value)?
                }
                "mode" => continue,
                op => bail!("unknown filter operator `{op}`"),
            };
            exprs.push(expr);
        }

        Ok(Expr::and(exprs))
    }

    fn equals(&self, operand: &Operand<'a>, value: &Value, insensitive: bool) -> Result<Expr> {
        if matches!(value, Value::Null | Value::DbNull) {
            return Ok(Expr::is_null(operand.expr.clone()));
        }

        if insensitive && is_text(operand) {
            if self.dialect.capability().ilike {
                let Some(text) = value.as_str() else {
                    bail!("insensitive comparison requires a string");
                };
                return Ok(Expr::like(
                    operand.expr.clone(),
                    Expr::value(escape_like(text)),
                    true,
                ));
            }
            return Ok(Expr::eq(
                Expr::lower(operand.expr.clone()),
                Expr::lower(self.encode(operand, value)?),
            ));
        }

        Ok(Expr::eq(operand.expr.clone(), self.encode(operand, value)?))
    }

    fn in_list(&self, operand: &Operand<'a>, value: &Value, insensitive: bool, negate: bool) -> Result<Expr> {
        let fold = insensitive && is_text(operand);
        let lhs = if fold {
            Expr::lower(operand.expr.clone())
        } else {
            operand.expr.clone()
        };

        let items = list_arg(value)
            .into_iter()
            .map(|item| {
                let item = self.encode(operand, item)?;
                Ok(if fold { Expr::lower(item) } else { item })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(if negate {
            Expr::not_in_list(lhs, items)
        } else {
            Expr::in_list(lhs, items)
        })
    }

    fn compare(&self, operand: &Operand<'a>, op: BinaryOp, value: &Value, insensitive: bool) -> Result<Expr> {
        let rhs = self.encode(operand, value)?;
        if insensitive && is_text(operand) {
            return Ok(Expr::binary(Expr::lower(operand.expr.clone()), op, Expr::lower(rhs)));
        }
        Ok(Expr::binary(operand.expr.clone(), op, rhs))
    }

    fn pattern(&self, operand: &Operand<'a>, kind: Pattern, value: &Value, insensitive: bool) -> Result<Expr> {
        let Some(text) = value.as_str() else {
            bail!("string filter requires a string, got {}", value.type_name());
        };
        Ok(self.like(operand.expr.clone(), kind, text, insensitive))
    }

    fn like(&self, expr: Expr, kind: Pattern, text: &str, insensitive: bool) -> Expr {
        let escaped = escape_like(text);
        let pattern = match kind {
            Pattern::Contains => format!("%{escaped}%"),
            Pattern::StartsWith => format!("{escaped}%"),
            Pattern::EndsWith => format!("%{escaped}"),
        };

        if !insensitive {
            Expr::like(expr, Expr::value(pattern), false)
        } else if self.dialect.capability().ilike {
            Expr::like(expr, Expr::value(pattern), true)
        } else {
            Expr::like(Expr::lower(expr), Expr::lower(Expr::value(pattern)), false)
        }
    }

    /// Aggregate conditions inside `having`: `{ views: { _avg: { gt: 10 } } }`
    fn aggregate_filter(&self, operand: &Operand<'a>, op: &str, payload: &Value) -> Result<Expr> {
        let (func, ty) = match op {
            "_count" => ("COUNT", ValueType::builtin(BuiltinType::Int)),
            "_avg" if operand.ty.as_builtin() == Some(BuiltinType::Decimal) => {
                ("AVG", operand.ty.clone())
            }
            "_avg" => ("AVG", ValueType::builtin(BuiltinType::Float)),
            "_sum" => ("SUM", operand.ty.clone()),
            "_min" => ("MIN", operand.ty.clone()),
            _ => ("MAX", operand.ty.clone()),
        };

        let aggregate = Operand {
            expr: Expr::func(func, vec![operand.expr.clone()]),
            ty,
        };
        self.scalar_filter(&aggregate, payload, false)
    }

    /// Filters on scalar-list columns.
    fn list_filter(&self, operand: &Operand<'a>, payload: &Value) -> Result<Expr> {
        let Value::Object(ops) = payload else {
            return self.list_equals(operand, payload);
        };

        let element = operand.ty.element();
        let mut exprs = vec![];
        for (op, value) in ops {
            let expr = match op.as_str() {
                "equals" => self.list_equals(operand, value)?,
                "has" => {
                    if value.is_null() {
                        bail!("`has` requires a value");
                    }
                    let value = self.dialect.transform_input(value, &element)?;
                    self.dialect.array_filter(operand.expr.clone(), ArrayOp::Has, value)?
                }
                "hasEvery" | "hasSome" => {
                    let op = if op == "hasEvery" { ArrayOp::HasEvery } else { ArrayOp::HasSome };
                    let values = Value::List(list_arg(value).into_iter().cloned().collect());
                    let values = self.dialect.transform_input(&values, &operand.ty)?;
                    self.dialect.array_filter(operand.expr.clone(), op, values)?
                }
                "isEmpty" => {
                    let empty = value.as_bool().ok_or_else(|| err!("`isEmpty` requires a boolean"))?;
                    self.dialect.array_is_empty(operand.expr.clone(), empty)?
                }
                op => bail!("unknown list filter operator `{op}`"),
            };
            exprs.push(expr);
        }
        Ok(Expr::and(exprs))
    }

    fn list_equals(&self, operand: &Operand<'a>, value: &Value) -> Result<Expr> {
        if value.is_null() {
            return Ok(Expr::is_null(operand.expr.clone()));
        }
        Ok(Expr::eq(operand.expr.clone(), self.encode(operand, value)?))
    }

    /// Filters on a `Json` document.
    fn json_filter(&self, expr: &Expr, payload: &Value) -> Result<Expr> {
        let ops = match payload {
            Value::Object(ops) if ops.keys().all(|key| JSON_OPERATORS.contains(&key.as_str())) => ops,
            value => return Ok(self.json_equals(expr, &[], value)),
        };

        let path = match ops.get("path") {
            Some(path) => parse_json_path(path)?,
            None => vec![],
        };
        let insensitive = ops.get("mode").and_then(Value::as_str) == Some("insensitive");

        let mut exprs = vec![];
        for (op, value) in ops {
            let expr = match op.as_str() {
                "equals" => self.json_equals(expr, &path, value),
                "not" => Expr::not(self.json_equals(expr, &path, value)),
                "string_contains" | "string_starts_with" | "string_ends_with" => {
                    let Some(text) = value.as_str() else {
                        bail!("`{op}` requires a string");
                    };
                    let kind = match op.as_str() {
                        "string_contains" => Pattern::Contains,
                        "string_starts_with" => Pattern::StartsWith,
                        _ => Pattern::EndsWith,
                    };
                    let text_expr = self.dialect.json_get_text(expr.clone(), &path);
                    self.like(text_expr, kind, text, insensitive)
                }
                "array_contains" => {
                    let values = match value {
                        Value::List(items) => items.iter().map(Value::to_json).collect(),
                        value => vec![value.to_json()],
                    };
                    self.dialect.json_array_contains(expr.clone(), &path, &values)
                }
                "array_starts_with" | "array_ends_with" => {
                    let index = if op == "array_starts_with" { 0 } else { -1 };
                    let mut element = path.clone();
                    element.push(PathSegment::Index(index));
                    let target = self.dialect.json_get(expr.clone(), &element);
                    self.dialect.json_equals(target, &value.to_json())
                }
                _ => continue,
            };
            exprs.push(expr);
        }
        Ok(Expr::and(exprs))
    }

    fn json_equals(&self, expr: &Expr, path: &[PathSegment], value: &Value) -> Expr {
        let target = self.dialect.json_get(expr.clone(), path);
        match value {
            Value::Null | Value::DbNull => Expr::is_null(target),
            Value::JsonNull => self.dialect.json_equals(target, &serde_json::Value::Null),
            Value::AnyNull => Expr::or([
                Expr::is_null(target.clone()),
                self.dialect.json_equals(target, &serde_json::Value::Null),
            ]),
            value => self.dialect.json_equals(target, &value.to_json()),
        }
    }

    /// Filters on a JSON column typed by a type definition, field by field.
    fn typed_json_filter(
        &self,
        expr: &Expr,
        path: &[PathSegment],
        def: &'a TypeDefDef,
        payload: &Value,
    ) -> Result<Expr> {
        let entries = match payload {
            Value::Null | Value::DbNull => {
                return Ok(Expr::is_null(self.dialect.json_get(expr.clone(), path)))
            }
            Value::Object(entries) => entries,
            other => bail!("filter on type `{}` must be an object, got {}", def.name, other.type_name()),
        };

        let mut exprs = vec![];
        for (key, value) in entries {
            let expr = match key.as_str() {
                "is" => self.typed_json_filter(expr, path, def, value)?,
                "isNot" => Expr::not(self.typed_json_filter(expr, path, def, value)?),
                "AND" | "OR" | "NOT" => {
                    let parts = list_arg(value)
                        .into_iter()
                        .map(|part| self.typed_json_filter(expr, path, def, part))
                        .collect::<Result<Vec<_>>>()?;
                    match key.as_str() {
                        "AND" => Expr::and(parts),
                        "OR" => Expr::or(parts),
                        _ => Expr::not(Expr::and(parts)),
                    }
                }
                name => {
                    let field = def
                        .fields
                        .get(name)
                        .ok_or_else(|| err!("unknown field `{}.{name}`", def.name))?;
                    let mut path = path.to_vec();
                    path.push(PathSegment::Key(name.to_string()));
                    self.typed_field_filter(expr, &path, field, value)?
                }
            };
            exprs.push(expr);
        }
        Ok(Expr::and(exprs))
    }

    fn typed_field_filter(&self, expr: &Expr, path: &[PathSegment], field: &'a FieldDef, payload: &Value) -> Result<Expr> {
        let ty = self.value_type(field)?;

        match self.schema.field_kind(field) {
            FieldKind::TypeDef(def) if !field.array => self.typed_json_filter(expr, path, def, payload),
            _ if field.array || ty.is_json() => {
                self.json_filter(&self.dialect.json_get(expr.clone(), path), payload)
            }
            FieldKind::Scalar(BuiltinType::Boolean) => self.typed_bool_filter(expr, path, payload),
            _ => {
                let text = self.dialect.json_get_text(expr.clone(), path);
                let operand = Operand {
                    expr: match self.json_cast(&ty) {
                        Some(cast) => Expr::cast(text, cast),
                        None => text,
                    },
                    ty,
                };
                self.scalar_filter(&operand, payload, false)
            }
        }
    }

    /// Booleans are compared as JSON values; their text form differs across
    /// providers.
    fn typed_bool_filter(&self, expr: &Expr, path: &[PathSegment], payload: &Value) -> Result<Expr> {
        let Value::Object(ops) = payload else {
            return Ok(self.json_equals(expr, path, payload));
        };

        let mut exprs = vec![];
        for (op, value) in ops {
            exprs.push(match op.as_str() {
                "equals" => self.json_equals(expr, path, value),
                "not" => match value {
                    Value::Object(_) => Expr::not(self.typed_bool_filter(expr, path, value)?),
                    value => Expr::not(self.json_equals(expr, path, value)),
                },
                op => bail!("unknown boolean filter operator `{op}`"),
            });
        }
        Ok(Expr::and(exprs))
    }

    /// How text extracted from a JSON document is cast before comparing.
    fn json_cast(&self, ty: &ValueType<'_>) -> Option<CastType> {
        match ty.as_builtin()? {
            BuiltinType::Int | BuiltinType::BigInt => Some(CastType::Integer),
            BuiltinType::Float => Some(CastType::Float),
            BuiltinType::Decimal => Some(CastType::Decimal),
            BuiltinType::DateTime if self.dialect.provider() != Provider::Sqlite => {
                Some(CastType::Timestamp)
            }
            _ => None,
        }
    }

    /// Filters on a relation field.
    fn relation_filter(&self, parent: &ModelRef<'a>, field: &'a FieldDef, payload: &Value) -> Result<Expr> {
        let zero = || Expr::value(0);

        if field.array {
            let Value::Object(ops) = payload else {
                bail!("filter on list relation `{}` must be an object", field.name);
            };

            let mut exprs = vec![];
            for (op, value) in ops {
                exprs.push(match op.as_str() {
                    "some" => Expr::gt(self.relation_count(parent, field, Some(value), false)?, zero()),
                    "none" => Expr::eq(self.relation_count(parent, field, Some(value), false)?, zero()),
                    "every" => Expr::eq(self.relation_count(parent, field, Some(value), true)?, zero()),
                    op => bail!("unknown list relation filter `{op}`"),
                });
            }
            return Ok(Expr::and(exprs));
        }

        match payload {
            Value::Null => self.relation_is_null(parent, field),
            Value::Object(ops) if ops.contains_key("is") || ops.contains_key("isNot") => {
                let mut exprs = vec![];
                for (op, value) in ops {
                    let present = if value.is_null() {
                        self.relation_count(parent, field, None, false)?
                    } else {
                        self.relation_count(parent, field, Some(value), false)?
                    };
                    exprs.push(match (op.as_str(), value.is_null()) {
                        ("is", true) => Expr::eq(present, zero()),
                        ("is", false) => Expr::gt(present, zero()),
                        ("isNot", true) => Expr::gt(present, zero()),
                        ("isNot", false) => Expr::eq(present, zero()),
                        (op, _) => bail!("unknown relation filter `{op}`"),
                    });
                }
                Ok(Expr::and(exprs))
            }
            filter => Ok(Expr::gt(self.relation_count(parent, field, Some(filter), false)?, zero())),
        }
    }

    fn relation_is_null(&self, parent: &ModelRef<'a>, field: &'a FieldDef) -> Result<Expr> {
        match &field.relation {
            Some(relation) if relation.owns_foreign_key() => {
                let exprs = relation
                    .fields
                    .iter()
                    .map(|fk| Ok(Expr::is_null(parent.column(parent.field(fk)?))))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::and(exprs))
            }
            _ => Ok(Expr::eq(
                self.relation_count(parent, field, None, false)?,
                Expr::value(0),
            )),
        }
    }
}

fn is_text(operand: &Operand<'_>) -> bool {
    matches!(
        operand.ty.scalar,
        ScalarType::Builtin(BuiltinType::String) | ScalarType::Enum(_)
    )
}

/// Escapes `LIKE` metacharacters; patterns are serialized with `ESCAPE '\'`.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Parses a JSON filter `path`: either a list of keys (`["a", "0"]`) or a
/// JSONPath-like string (`"$.a[0]"`).
pub(crate) fn parse_json_path(path: &Value) -> Result<Vec<PathSegment>> {
    match path {
        Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::String(key) => Ok(match key.parse::<i64>() {
                    Ok(index) => PathSegment::Index(index),
                    Err(_) => PathSegment::Key(key.clone()),
                }),
                Value::Int(index) => Ok(PathSegment::Index(*index)),
                other => Err(err!("invalid JSON path segment of type {}", other.type_name())),
            })
            .collect(),
        Value::String(path) => parse_dollar_path(path),
        other => bail!("JSON path must be a string or a list, got {}", other.type_name()),
    }
}

fn parse_dollar_path(path: &str) -> Result<Vec<PathSegment>> {
    let rest = path.strip_prefix('$').unwrap_or(path);
    let mut segments = vec![];
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                let mut key = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '[' {
                        break;
                    }
                    key.push(next);
                    chars.next();
                }
                if key.is_empty() {
                    bail!("invalid JSON path `{path}`");
                }
                segments.push(PathSegment::Key(key));
            }
            '[' => {
                let mut index = String::new();
                for next in chars.by_ref() {
                    if next == ']' {
                        break;
                    }
                    index.push(next);
                }
                let index = index
                    .trim()
                    .parse()
                    .map_err(|_| err!("invalid JSON path index in `{path}`"))?;
                segments.push(PathSegment::Index(index));
            }
            _ if segments.is_empty() && path == rest => {
                // a bare key such as `"a.b"`
                return Ok(rest.split('.').map(|key| PathSegment::Key(key.to_string())).collect());
            }
            _ => bail!("invalid JSON path `{path}`"),
        }
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::{PostgreSql, Sqlite},
        query::tests::{blog, sql_for},
        Options,
    };

    use quill_core::stmt::{Select, TableRef};
    use serde_json::json;

    fn compile(dialect: &dyn crate::Dialect, model: &str, filter: serde_json::Value) -> String {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, dialect, &options);
        let model = schema.get_model(model).unwrap();

        let target = ModelRef::new(model, model.name.clone());
        let mut select = Select::from(TableRef::table(&model.name, None)).item(Expr::value(1), None);
        select.and_filter(builder.filter(&target, &Value::from(filter)).unwrap());
        sql_for(dialect, select)
    }

    #[test]
    fn equality_and_null() {
        assert_eq!(
            compile(&Sqlite, "User", json!({ "email": "a@b.c", "name": null })),
            r#"SELECT ?1 FROM "User" WHERE ("User"."email" = ?2 AND "User"."name" IS NULL)"#
        );
    }

    #[test]
    fn not_null_and_ranges() {
        assert_eq!(
            compile(&Sqlite, "Post", json!({ "views": { "gte": 1, "lt": 10 }, "title": { "not": null } })),
            r#"SELECT ?1 FROM "Post" WHERE ("Post"."views" >= ?2 AND "Post"."views" < ?3 AND "Post"."title" IS NOT NULL)"#
        );
    }

    #[test]
    fn empty_in_matches_nothing() {
        assert_eq!(
            compile(&Sqlite, "User", json!({ "id": { "in": [] } })),
            r#"SELECT ?1 FROM "User" WHERE FALSE"#
        );
    }

    #[test]
    fn contains_escapes_wildcards() {
        let schema = blog();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &Sqlite, &options);
        let user = schema.get_model("User").unwrap();
        let target = ModelRef::new(user, "User");

        let expr = builder
            .filter(&target, &Value::from(json!({ "email": { "contains": "50%_off" } })))
            .unwrap();
        let Expr::Like(like) = expr else {
            panic!("expected LIKE, got {expr:?}");
        };
        assert_eq!(*like.pattern, Expr::value("%50\\%\\_off%"));
        assert!(!like.insensitive);
    }

    #[test]
    fn insensitive_mode_uses_ilike_on_postgres_and_lower_elsewhere() {
        let filter = json!({ "email": { "startsWith": "AL", "mode": "insensitive" } });
        assert_eq!(
            compile(&PostgreSql, "User", filter.clone()),
            r#"SELECT $1 FROM "User" WHERE "User"."email" ILIKE $2 ESCAPE '\'"#
        );
        assert_eq!(
            compile(&Sqlite, "User", filter),
            r#"SELECT ?1 FROM "User" WHERE LOWER("User"."email") LIKE LOWER(?2) ESCAPE '\'"#
        );
    }

    #[test]
    fn to_many_relation_filters_count_related_rows() {
        assert_eq!(
            compile(&Sqlite, "User", json!({ "posts": { "every": { "views": { "gt": 0 } } } })),
            concat!(
                r#"SELECT ?1 FROM "User" WHERE (SELECT COUNT(*) FROM "Post" AS "$t1" "#,
                r#"WHERE ("$t1"."authorId" = "User"."id" AND NOT ("$t1"."views" > ?2))) = ?3"#
            )
        );
    }

    #[test]
    fn to_one_null_uses_the_foreign_key_when_owned() {
        assert_eq!(
            compile(&Sqlite, "Post", json!({ "author": null })),
            r#"SELECT ?1 FROM "Post" WHERE "Post"."authorId" IS NULL"#
        );
        assert_eq!(
            compile(&Sqlite, "User", json!({ "profile": { "is": null } })),
            concat!(
                r#"SELECT ?1 FROM "User" WHERE (SELECT COUNT(*) FROM "Profile" AS "$t1" "#,
                r#"WHERE "$t1"."userId" = "User"."id") = ?2"#
            )
        );
    }

    #[test]
    fn json_path_strings() {
        assert_eq!(
            parse_json_path(&Value::from("$.a.b[2]")).unwrap(),
            [
                PathSegment::Key("a".into()),
                PathSegment::Key("b".into()),
                PathSegment::Index(2)
            ]
        );
        assert_eq!(
            parse_json_path(&Value::from(json!(["a", "0"]))).unwrap(),
            [PathSegment::Key("a".into()), PathSegment::Index(0)]
        );
    }

    #[test]
    fn json_null_sentinels() {
        assert_eq!(
            compile(&Sqlite, "Post", json!({ "meta": { "equals": { "$type": "DbNull" } } })),
            r#"SELECT ?1 FROM "Post" WHERE "Post"."meta" IS NULL"#
        );
        assert_eq!(
            compile(&Sqlite, "Post", json!({ "meta": { "equals": { "$type": "JsonNull" } } })),
            r#"SELECT ?1 FROM "Post" WHERE json("Post"."meta") = json(?2)"#
        );
    }

    #[test]
    fn compound_unique_keys_expand() {
        let schema = quill_core::Schema::new(quill_core::schema::Provider::Sqlite)
            .model(
                quill_core::schema::ModelDef::new("Member")
                    .field(FieldDef::new("orgId", "Int"))
                    .field(FieldDef::new("userId", "Int"))
                    .id(&["orgId", "userId"]),
            )
            .build()
            .unwrap();
        let options = Options::default();
        let builder = QueryBuilder::new(&schema, &Sqlite, &options);
        let member = schema.get_model("Member").unwrap();
        let target = ModelRef::new(member, "Member");

        let expr = builder
            .filter(&target, &Value::from(json!({ "orgId_userId": { "orgId": 1, "userId": 2 } })))
            .unwrap();
        assert_eq!(
            expr,
            Expr::and([
                Expr::eq(Expr::column("Member", "orgId"), Expr::value(1i64)),
                Expr::eq(Expr::column("Member", "userId"), Expr::value(2i64)),
            ])
        );
    }
}
