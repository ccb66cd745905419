//! Rewrites logical model, field and enum names into their storage names.
//!
//! Statements are built against the schema's logical names. Right before
//! execution the mapper renames tables and columns declared with `@@map` /
//! `@map`, translates enum literals declared with a stored value, and aliases
//! selected columns back to their logical names so decoded rows keep using
//! field names.

use crate::plugin::QueryPlugin;

use quill_core::{
    schema::{FieldDef, FieldKind, ModelDef},
    stmt::{
        self, Assignment, Delete, Distinct, Expr, ExprBinaryOp, ExprCase, ExprCast, ExprColumn,
        ExprFunc, ExprInList, ExprInSubquery, ExprIsNull, ExprJsonObject, ExprLike, Insert, Join,
        OrderByExpr, Select, SelectItem, Statement, TableName, TableRef, Update,
    },
    Error, Result, Schema,
};

use std::sync::Arc;

#[derive(Debug)]
pub struct NameMapper {
    schema: Arc<Schema>,
}

/// A table visible to the expressions of a statement.
#[derive(Debug, Clone)]
struct Scope<'a> {
    /// What columns of the table are qualified with.
    qualifier: String,

    /// `None` for derived tables, table functions and join tables.
    model: Option<&'a ModelDef>,

    /// Nesting depth of the `SELECT` that introduced the table.
    level: usize,
}

struct Mapper<'a> {
    schema: &'a Schema,
}

impl NameMapper {
    pub fn new(schema: Arc<Schema>) -> NameMapper {
        NameMapper { schema }
    }

    pub fn map(&self, stmt: Statement) -> Result<Statement> {
        if !self.schema.has_name_mapping() || !self.touches_mapped_model(&stmt) {
            return Ok(stmt);
        }
        Mapper { schema: &self.schema }.statement(stmt)
    }

    /// `true` if any table of `stmt` is a model stored under other names or
    /// holding mapped enum values.
    fn touches_mapped_model(&self, stmt: &Statement) -> bool {
        let mut mapped = false;
        stmt::for_each_table(stmt, |table| {
            let Ok(model) = self.schema.get_model(&table.name) else {
                return;
            };
            mapped |= model.has_mapped_names()
                || model.db_schema.is_some()
                || model.fields.values().any(|field| {
                    matches!(self.schema.field_kind(field), FieldKind::Enum(def) if def.has_mapped_values())
                });
        });
        mapped
    }
}

impl QueryPlugin for NameMapper {
    fn name(&self) -> &str {
        "name-mapper"
    }

    fn transform_query(&self, stmt: Statement) -> Result<Statement> {
        self.map(stmt)
    }
}

impl<'a> Mapper<'a> {
    fn statement(&self, stmt: Statement) -> Result<Statement> {
        Ok(match stmt {
            Statement::Query(select) => Statement::Query(self.select(select, &[])?),
            Statement::Insert(insert) => Statement::Insert(self.insert(insert)?),
            Statement::Update(update) => Statement::Update(self.update(update)?),
            Statement::Delete(delete) => Statement::Delete(self.delete(delete)?),
        })
    }

    fn select(&self, select: Select, outer: &[Scope<'a>]) -> Result<Select> {
        let level = outer.last().map_or(0, |scope| scope.level + 1);
        let mut scopes = outer.to_vec();

        let mut from = Vec::with_capacity(select.from.len());
        for table in select.from {
            let (table, scope) = self.table_ref(table, outer, level)?;
            scopes.push(scope);
            from.push(table);
        }

        let mut pending = Vec::with_capacity(select.joins.len());
        for join in select.joins {
            let (table, scope) = self.table_ref(join.table, outer, level)?;
            scopes.push(scope);
            pending.push((join.kind, table, join.on));
        }
        let joins = pending
            .into_iter()
            .map(|(kind, table, on)| {
                Ok(Join {
                    kind,
                    table,
                    on: self.expr(on, &scopes)?,
                })
            })
            .collect::<Result<_>>()?;

        let distinct = match select.distinct {
            Distinct::On(exprs) => Distinct::On(self.exprs(exprs, &scopes)?),
            distinct => distinct,
        };

        Ok(Select {
            distinct,
            items: self.select_items(select.items, &scopes)?,
            from,
            joins,
            filter: self.opt_expr(select.filter, &scopes)?,
            group_by: self.exprs(select.group_by, &scopes)?,
            having: self.opt_expr(select.having, &scopes)?,
            order_by: select
                .order_by
                .into_iter()
                .map(|order| {
                    Ok(OrderByExpr {
                        expr: self.expr(order.expr, &scopes)?,
                        ..order
                    })
                })
                .collect::<Result<_>>()?,
            limit: select.limit,
            offset: select.offset,
        })
    }

    fn table_ref(&self, table: TableRef, outer: &[Scope<'a>], level: usize) -> Result<(TableRef, Scope<'a>)> {
        match table {
            TableRef::Table(name) => {
                let (name, scope) = self.table_name(name, level);
                Ok((TableRef::Table(name), scope))
            }
            TableRef::Derived { query, alias } => {
                let query = self.select(*query, outer)?;
                let scope = Scope {
                    qualifier: alias.clone(),
                    model: None,
                    level,
                };
                Ok((
                    TableRef::Derived {
                        query: Box::new(query),
                        alias,
                    },
                    scope,
                ))
            }
            TableRef::Function { func, alias } => {
                let func = ExprFunc {
                    args: self.exprs(func.args, outer)?,
                    ..func
                };
                let scope = Scope {
                    qualifier: alias.clone(),
                    model: None,
                    level,
                };
                Ok((TableRef::Function { func, alias }, scope))
            }
        }
    }

    /// Renames a model's table. Columns keep being qualified with the
    /// logical name, so a renamed table without an alias gets one.
    fn table_name(&self, table: TableName, level: usize) -> (TableName, Scope<'a>) {
        let qualifier = table.alias.clone().unwrap_or_else(|| table.name.clone());
        let model = self
            .schema
            .models
            .get(&table.name)
            .filter(|_| table.schema.is_none());

        let Some(model) = model else {
            let scope = Scope {
                qualifier,
                model: None,
                level,
            };
            return (table, scope);
        };

        let mapped = TableName {
            name: model.table_name().to_string(),
            schema: model.db_schema.clone(),
            alias: Some(qualifier.clone()),
        };
        let scope = Scope {
            qualifier,
            model: Some(model),
            level,
        };
        (mapped, scope)
    }

    fn insert(&self, insert: Insert) -> Result<Insert> {
        let (table, scope) = self.table_name(insert.table, 0);
        let scopes = [scope];

        let fields: Vec<Option<&'a FieldDef>> = insert
            .columns
            .iter()
            .map(|column| self.field_of(&scopes[0], column))
            .collect();

        let rows = insert
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&fields)
                    .map(|(value, field)| {
                        let value = self.expr(value, &scopes)?;
                        Ok(match field {
                            Some(field) => self.enum_literal(field, value),
                            None => value,
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<_>>()?;

        let columns = insert
            .columns
            .into_iter()
            .zip(&fields)
            .map(|(column, field)| match field {
                Some(field) => field.column_name().to_string(),
                None => column,
            })
            .collect();

        Ok(Insert {
            // `INSERT INTO` never carries an alias.
            table: TableName { alias: None, ..table },
            columns,
            rows,
            on_conflict: insert.on_conflict,
            returning: self.select_items(insert.returning, &scopes)?,
        })
    }

    fn update(&self, update: Update) -> Result<Update> {
        let (table, scope) = self.table_name(update.table, 0);
        let scopes = [scope];

        let assignments = update
            .assignments
            .into_iter()
            .map(|assignment| {
                let value = self.expr(assignment.value, &scopes)?;
                Ok(match self.field_of(&scopes[0], &assignment.column) {
                    Some(field) => Assignment {
                        column: field.column_name().to_string(),
                        value: self.enum_literal(field, value),
                    },
                    None => Assignment {
                        column: assignment.column,
                        value,
                    },
                })
            })
            .collect::<Result<_>>()?;

        Ok(Update {
            table,
            assignments,
            filter: self.opt_expr(update.filter, &scopes)?,
            limit: update.limit,
            returning: self.select_items(update.returning, &scopes)?,
        })
    }

    fn delete(&self, delete: Delete) -> Result<Delete> {
        let (table, scope) = self.table_name(delete.table, 0);
        let scopes = [scope];

        Ok(Delete {
            table,
            filter: self.opt_expr(delete.filter, &scopes)?,
            limit: delete.limit,
            returning: self.select_items(delete.returning, &scopes)?,
        })
    }

    fn select_items(&self, items: Vec<SelectItem>, scopes: &[Scope<'a>]) -> Result<Vec<SelectItem>> {
        let mut out = Vec::with_capacity(items.len());

        for item in items {
            match item {
                SelectItem::All => {
                    let level = scopes.last().map_or(0, |scope| scope.level);
                    for scope in scopes.iter().filter(|scope| scope.level == level) {
                        self.expand(scope, &mut out);
                    }
                }
                SelectItem::AllFrom(qualifier) => {
                    match scopes.iter().rev().find(|scope| scope.qualifier == qualifier) {
                        Some(scope) => self.expand(scope, &mut out),
                        None => out.push(SelectItem::AllFrom(qualifier)),
                    }
                }
                SelectItem::Expr { expr, alias } => {
                    let field = self.resolve_expr(&expr, scopes)?;
                    let expr = self.expr(expr, scopes)?;
                    out.push(match field {
                        Some(field) => SelectItem::Expr {
                            expr: self.enum_output(field, expr),
                            alias: alias.or_else(|| renamed(field)),
                        },
                        None => SelectItem::Expr { expr, alias },
                    });
                }
            }
        }
        Ok(out)
    }

    /// Replaces `scope.*` with the table's columns when any of them is
    /// stored under another name or holds mapped enum values.
    fn expand(&self, scope: &Scope<'a>, out: &mut Vec<SelectItem>) {
        let Some(model) = scope.model else {
            out.push(SelectItem::AllFrom(scope.qualifier.clone()));
            return;
        };

        let needs_expansion = model
            .own_fields()
            .any(|field| field.db_name.is_some() || self.mapped_enum(field));
        if !needs_expansion {
            out.push(SelectItem::AllFrom(scope.qualifier.clone()));
            return;
        }

        for field in model.own_fields() {
            let column = Expr::column(&scope.qualifier, field.column_name());
            out.push(SelectItem::Expr {
                expr: self.enum_output(field, column),
                alias: Some(field.name.clone()),
            });
        }
    }

    fn opt_expr(&self, expr: Option<Expr>, scopes: &[Scope<'a>]) -> Result<Option<Expr>> {
        expr.map(|expr| self.expr(expr, scopes)).transpose()
    }

    fn exprs(&self, exprs: Vec<Expr>, scopes: &[Scope<'a>]) -> Result<Vec<Expr>> {
        exprs.into_iter().map(|expr| self.expr(expr, scopes)).collect()
    }

    fn expr(&self, expr: Expr, scopes: &[Scope<'a>]) -> Result<Expr> {
        Ok(match expr {
            Expr::And(operands) => Expr::And(self.exprs(operands, scopes)?),
            Expr::Or(operands) => Expr::Or(self.exprs(operands, scopes)?),
            Expr::Not(operand) => Expr::Not(Box::new(self.expr(*operand, scopes)?)),
            Expr::BinaryOp(ExprBinaryOp { lhs, op, rhs }) => {
                let lhs_field = self.resolve_expr(&lhs, scopes)?;
                let rhs_field = self.resolve_expr(&rhs, scopes)?;
                let mut lhs = self.expr(*lhs, scopes)?;
                let mut rhs = self.expr(*rhs, scopes)?;
                if let Some(field) = lhs_field {
                    rhs = self.enum_literal(field, rhs);
                }
                if let Some(field) = rhs_field {
                    lhs = self.enum_literal(field, lhs);
                }
                Expr::BinaryOp(ExprBinaryOp {
                    lhs: Box::new(lhs),
                    op,
                    rhs: Box::new(rhs),
                })
            }
            Expr::Case(ExprCase {
                operand,
                whens,
                otherwise,
            }) => Expr::Case(ExprCase {
                operand: operand
                    .map(|operand| self.expr(*operand, scopes).map(Box::new))
                    .transpose()?,
                whens: whens
                    .into_iter()
                    .map(|(when, then)| Ok((self.expr(when, scopes)?, self.expr(then, scopes)?)))
                    .collect::<Result<_>>()?,
                otherwise: otherwise
                    .map(|otherwise| self.expr(*otherwise, scopes).map(Box::new))
                    .transpose()?,
            }),
            Expr::Cast(ExprCast { expr, ty }) => Expr::Cast(ExprCast {
                expr: Box::new(self.expr(*expr, scopes)?),
                ty,
            }),
            Expr::Column(column) => match self.resolve(&column, scopes)? {
                Some(field) => Expr::Column(ExprColumn {
                    table: column.table,
                    name: field.column_name().to_string(),
                }),
                None => Expr::Column(column),
            },
            Expr::Exists(query) => Expr::Exists(Box::new(self.select(*query, scopes)?)),
            Expr::Subquery(query) => Expr::Subquery(Box::new(self.select(*query, scopes)?)),
            Expr::InList(ExprInList { expr, list, negate }) => {
                let field = self.resolve_expr(&expr, scopes)?;
                let list = self.exprs(list, scopes)?;
                Expr::InList(ExprInList {
                    expr: Box::new(self.expr(*expr, scopes)?),
                    list: match field {
                        Some(field) => list
                            .into_iter()
                            .map(|item| self.enum_literal(field, item))
                            .collect(),
                        None => list,
                    },
                    negate,
                })
            }
            Expr::InSubquery(ExprInSubquery {
                exprs,
                query,
                negate,
            }) => Expr::InSubquery(ExprInSubquery {
                exprs: self.exprs(exprs, scopes)?,
                query: Box::new(self.select(*query, scopes)?),
                negate,
            }),
            Expr::IsNull(ExprIsNull { expr, negate }) => Expr::IsNull(ExprIsNull {
                expr: Box::new(self.expr(*expr, scopes)?),
                negate,
            }),
            Expr::Like(ExprLike {
                expr,
                pattern,
                insensitive,
                negate,
            }) => Expr::Like(ExprLike {
                expr: Box::new(self.expr(*expr, scopes)?),
                pattern: Box::new(self.expr(*pattern, scopes)?),
                insensitive,
                negate,
            }),
            Expr::Func(func) => Expr::Func(ExprFunc {
                args: self.exprs(func.args, scopes)?,
                ..func
            }),
            Expr::JsonAgg(expr) => Expr::JsonAgg(Box::new(self.expr(*expr, scopes)?)),
            Expr::JsonObject(ExprJsonObject { fields }) => Expr::JsonObject(ExprJsonObject {
                fields: fields
                    .into_iter()
                    .map(|(key, value)| {
                        let field = self.resolve_expr(&value, scopes)?;
                        let value = self.expr(value, scopes)?;
                        Ok(match field {
                            Some(field) => (key, self.enum_output(field, value)),
                            None => (key, value),
                        })
                    })
                    .collect::<Result<_>>()?,
            }),
            expr @ (Expr::Default | Expr::Star | Expr::Value(_)) => expr,
        })
    }

    /// The field `expr` reads when it is a plain column reference.
    fn resolve_expr(&self, expr: &Expr, scopes: &[Scope<'a>]) -> Result<Option<&'a FieldDef>> {
        match expr {
            Expr::Column(column) => self.resolve(column, scopes),
            _ => Ok(None),
        }
    }

    /// Finds the field a column refers to. Qualified columns are looked up
    /// innermost-out by qualifier; unqualified ones only among the tables
    /// of the innermost statement.
    fn resolve(&self, column: &ExprColumn, scopes: &[Scope<'a>]) -> Result<Option<&'a FieldDef>> {
        match &column.table {
            Some(qualifier) => {
                let scope = scopes
                    .iter()
                    .rev()
                    .find(|scope| &scope.qualifier == qualifier)
                    .ok_or_else(|| {
                        Error::internal(format!(
                            "column `{qualifier}.{}` refers to a table not in scope",
                            column.name
                        ))
                    })?;
                Ok(self.field_of(scope, &column.name))
            }
            None => {
                let level = scopes.last().map_or(0, |scope| scope.level);
                Ok(scopes
                    .iter()
                    .rev()
                    .take_while(|scope| scope.level == level)
                    .find_map(|scope| self.field_of(scope, &column.name)))
            }
        }
    }

    fn field_of(&self, scope: &Scope<'a>, name: &str) -> Option<&'a FieldDef> {
        scope
            .model?
            .fields
            .get(name)
            .filter(|field| field.is_stored())
    }

    fn mapped_enum(&self, field: &FieldDef) -> bool {
        matches!(self.schema.field_kind(field), FieldKind::Enum(def) if def.has_mapped_values())
    }

    /// Translates enum keys in a literal into their stored values.
    fn enum_literal(&self, field: &FieldDef, expr: Expr) -> Expr {
        let FieldKind::Enum(def) = self.schema.field_kind(field) else {
            return expr;
        };
        if !def.has_mapped_values() {
            return expr;
        }

        let map = |value: stmt::Value| match value {
            stmt::Value::String(key) => {
                let stored = def.db_value(&key).map(str::to_string).unwrap_or(key);
                stmt::Value::String(stored)
            }
            value => value,
        };

        match expr {
            Expr::Value(stmt::Value::List(items)) => {
                Expr::Value(stmt::Value::List(items.into_iter().map(map).collect()))
            }
            Expr::Value(value) => Expr::Value(map(value)),
            expr => expr,
        }
    }

    /// Reads a mapped enum column back as enum keys.
    fn enum_output(&self, field: &FieldDef, column: Expr) -> Expr {
        let FieldKind::Enum(def) = self.schema.field_kind(field) else {
            return column;
        };
        if !def.has_mapped_values() || !matches!(column, Expr::Column(_)) {
            return column;
        }

        let whens = def
            .mapped_pairs()
            .map(|(stored, key)| {
                (
                    Expr::eq(column.clone(), Expr::value(stored)),
                    Expr::value(key),
                )
            })
            .collect();
        Expr::case(whens, Some(column))
    }
}

/// The logical name to alias a selected column with, if it is stored
/// under another one.
fn renamed(field: &FieldDef) -> Option<String> {
    (field.column_name() != field.name).then(|| field.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::Sqlite,
        query::tests::{sql, sql_for},
    };

    use quill_core::schema::{EnumDef, FieldDefault, Provider};
    use quill_sql::Serializer;

    fn schema() -> Arc<Schema> {
        let schema = Schema::new(Provider::Sqlite)
            .model(
                ModelDef::new("User")
                    .map("users")
                    .field(FieldDef::new("id", "Int").id().default(FieldDefault::Autoincrement))
                    .field(FieldDef::new("email", "String").map("email_address"))
                    .field(FieldDef::new("role", "Role")),
            )
            .model(
                ModelDef::new("Tag")
                    .field(FieldDef::new("id", "Int").id())
                    .field(FieldDef::new("label", "String")),
            )
            .enum_def(EnumDef::new("Role", &["USER", "ADMIN"]).map("ADMIN", "admin"))
            .build()
            .unwrap();
        Arc::new(schema)
    }

    fn map(stmt: impl Into<Statement>) -> Statement {
        NameMapper::new(schema()).map(stmt.into()).unwrap()
    }

    #[test]
    fn renames_tables_and_columns() {
        let select = Select::from(TableRef::table("User", None))
            .item(Expr::column("User", "id"), None)
            .item(Expr::column("User", "email"), None);
        let mut select = select;
        select.and_filter(Expr::eq(Expr::column("User", "email"), Expr::value("a@b.c")));

        assert_eq!(
            sql(map(select)),
            concat!(
                r#"SELECT "User"."id", "User"."email_address" AS "email" FROM "users" AS "User" "#,
                r#"WHERE "User"."email_address" = ?1"#
            )
        );
    }

    #[test]
    fn enum_values_are_translated_both_ways() {
        let mut select =
            Select::from(TableRef::table("User", Some("$t1".into()))).item(Expr::column("$t1", "role"), None);
        select.and_filter(Expr::eq(Expr::column("$t1", "role"), Expr::value("ADMIN")));

        let Statement::Query(mapped) = map(select) else {
            panic!("expected a query");
        };
        assert_eq!(
            mapped.items[0],
            SelectItem::Expr {
                expr: Expr::case(
                    vec![(
                        Expr::eq(Expr::column("$t1", "role"), Expr::value("admin")),
                        Expr::value("ADMIN"),
                    )],
                    Some(Expr::column("$t1", "role")),
                ),
                alias: None,
            }
        );
        assert_eq!(
            mapped.filter,
            Some(Expr::eq(Expr::column("$t1", "role"), Expr::value("admin")))
        );
    }

    #[test]
    fn insert_columns_and_returning() {
        let insert = Insert {
            table: TableName {
                name: "User".into(),
                schema: None,
                alias: None,
            },
            columns: vec!["email".into(), "role".into()],
            rows: vec![vec![Expr::value("a@b.c"), Expr::value("ADMIN")]],
            on_conflict: None,
            returning: vec![SelectItem::expr(Expr::unqualified("id"))],
        };

        let Statement::Insert(mapped) = map(insert) else {
            panic!("expected an insert");
        };
        assert_eq!(mapped.table.name, "users");
        assert_eq!(mapped.table.alias, None);
        assert_eq!(mapped.columns, ["email_address", "role"]);
        assert_eq!(mapped.rows[0][1], Expr::value("admin"));
        assert_eq!(
            sql_for(&Sqlite, mapped),
            r#"INSERT INTO "users" ("email_address", "role") VALUES (?1, ?2) RETURNING "id""#
        );
    }

    #[test]
    fn update_assignments_are_renamed() {
        let update = Update {
            table: TableName {
                name: "User".into(),
                schema: None,
                alias: None,
            },
            assignments: vec![Assignment {
                column: "email".into(),
                value: Expr::value("x@y.z"),
            }],
            filter: Some(Expr::eq(Expr::column("User", "id"), Expr::value(1i64))),
            limit: None,
            returning: vec![],
        };

        let mut params = vec![];
        let sql = Serializer::sqlite().serialize(&map(update), &mut params);
        assert_eq!(
            sql,
            r#"UPDATE "users" AS "User" SET "email_address" = ?1 WHERE "User"."id" = ?2"#
        );
    }

    #[test]
    fn unmapped_tables_and_derived_tables_are_left_alone() {
        let inner = Select::from(TableRef::table("Tag", None)).item(Expr::column("Tag", "label"), None);
        let outer = Select::from(TableRef::derived(inner, "$t1")).item(Expr::column("$t1", "label"), None);
        assert_eq!(
            sql(map(outer)),
            r#"SELECT "$t1"."label" FROM (SELECT "Tag"."label" FROM "Tag") AS "$t1""#
        );
    }

    #[test]
    fn correlated_columns_resolve_to_outer_tables() {
        let inner = Select::from(TableRef::table("Tag", Some("$t2".into())))
            .item(Expr::column("$t2", "id"), None);
        let mut inner = inner;
        inner.and_filter(Expr::eq(Expr::column("$t2", "label"), Expr::column("$t1", "email")));
        let outer = Select::from(TableRef::table("User", Some("$t1".into())))
            .item(Expr::exists(inner), Some("found"));

        assert_eq!(
            sql(map(outer)),
            concat!(
                r#"SELECT EXISTS (SELECT "$t2"."id" FROM "Tag" AS "$t2" "#,
                r#"WHERE "$t2"."label" = "$t1"."email_address") AS "found" FROM "users" AS "$t1""#
            )
        );
    }

    #[test]
    fn stars_expand_over_mapped_tables() {
        let select = Select {
            items: vec![SelectItem::All],
            ..Select::from(TableRef::table("User", None))
        };
        let Statement::Query(mapped) = map(select) else {
            panic!("expected a query");
        };
        let aliases: Vec<_> = mapped
            .items
            .iter()
            .map(|item| match item {
                SelectItem::Expr { alias, .. } => alias.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(
            aliases,
            [Some("id".to_string()), Some("email".to_string()), Some("role".to_string())]
        );
    }

    #[test]
    fn unknown_qualifiers_are_internal_errors() {
        let select = Select::from(TableRef::table("User", None)).item(Expr::column("Nope", "id"), None);
        let err = NameMapper::new(schema()).map(select.into()).unwrap_err();
        assert!(err.to_string().contains("not in scope"));
    }

    #[test]
    fn schemas_without_mapping_pass_through() {
        let schema = Schema::new(Provider::Sqlite)
            .model(ModelDef::new("Tag").field(FieldDef::new("id", "Int").id()))
            .build()
            .unwrap();
        let select = Select::from(TableRef::table("Tag", None)).item(Expr::column("Nope", "id"), None);
        let stmt: Statement = select.into();
        assert_eq!(NameMapper::new(Arc::new(schema)).map(stmt.clone()).unwrap(), stmt);
    }
}
