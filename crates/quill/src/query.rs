//! Compiles query arguments into statement trees.
//!
//! The builder works purely in terms of logical model and field names;
//! storage names are applied afterwards by the name mapper. Every table a
//! statement reads is aliased, and every column is qualified by the alias of
//! the table that stores it.

mod aggregate;
pub(crate) use aggregate::{AggregateKind, AggregatePlan, OutputColumn};

mod filter;

mod mutation;
pub(crate) use mutation::Row;

mod order;

mod selection;
pub(crate) use selection::{DescendantPlan, PlanItem, SelectionPlan, DELEGATE_PREFIX};

use crate::{
    dialect::{Dialect, ValueType},
    ComputedContext, Options,
};

use quill_core::{
    schema::{FieldDef, ModelDef},
    stmt::{Expr, Join, JoinKind, Select, SelectItem, TableRef},
    Error, Result, Schema, Value,
};

use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct QueryBuilder<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) dialect: &'a dyn Dialect,
    options: &'a Options,

    /// Counter for generated table aliases
    aliases: AtomicUsize,
}

/// A model's row as visible at some point in a statement.
#[derive(Debug, Clone)]
pub(crate) struct ModelRef<'a> {
    pub(crate) model: &'a ModelDef,
    pub(crate) alias: String,
}

/// A compiled `findMany`-style read.
#[derive(Debug)]
pub(crate) struct FindQuery<'a> {
    pub(crate) select: Select,
    pub(crate) plan: SelectionPlan<'a>,

    /// Rows come back in reverse and must be flipped (negative `take`).
    pub(crate) reverse: bool,
}

/// Alias of the delegate ancestor or descendant table `model` joined to the
/// table aliased `alias`.
pub(crate) fn delegate_alias(alias: &str, model: &str) -> String {
    format!("{alias}${model}")
}

impl<'a> ModelRef<'a> {
    pub(crate) fn new(model: &'a ModelDef, alias: impl Into<String>) -> ModelRef<'a> {
        ModelRef {
            model,
            alias: alias.into(),
        }
    }

    /// Alias of the table storing `field`. Inherited fields live in the
    /// table of the delegate model that declares them; ids are repeated in
    /// every table of the chain.
    pub(crate) fn table_for(&self, field: &FieldDef) -> String {
        match &field.origin_model {
            Some(origin) if !self.model.is_id_field(&field.name) => {
                delegate_alias(&self.alias, origin)
            }
            _ => self.alias.clone(),
        }
    }

    pub(crate) fn column(&self, field: &FieldDef) -> Expr {
        Expr::column(self.table_for(field), &field.name)
    }

    pub(crate) fn field(&self, name: &str) -> Result<&'a FieldDef> {
        self.model.get_field(name)
    }

    pub(crate) fn id_fields(&self) -> Result<Vec<&'a FieldDef>> {
        self.model
            .id_fields
            .iter()
            .map(|name| self.model.get_field(name))
            .collect()
    }
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(schema: &'a Schema, dialect: &'a dyn Dialect, options: &'a Options) -> Self {
        QueryBuilder {
            schema,
            dialect,
            options,
            aliases: AtomicUsize::new(0),
        }
    }

    pub(crate) fn next_alias(&self) -> String {
        let next = self.aliases.fetch_add(1, Ordering::Relaxed) + 1;
        format!("$t{next}")
    }

    pub(crate) fn value_type(&self, field: &'a FieldDef) -> Result<ValueType<'a>> {
        ValueType::of(self.schema, field)
    }

    /// Encodes `value` as a bound parameter for a column of `field`'s type.
    pub(crate) fn param(&self, field: &'a FieldDef, value: &Value) -> Result<Expr> {
        let ty = self.value_type(field)?;
        Ok(Expr::Value(self.dialect.transform_input(value, &ty)?))
    }

    /// `FROM model AS alias`, left-joined with every delegate ancestor and
    /// with the given descendants.
    pub(crate) fn from_model(
        &self,
        model: &'a ModelDef,
        alias: impl Into<String>,
        descendants: &[&'a ModelDef],
    ) -> (Select, ModelRef<'a>) {
        let target = ModelRef::new(model, alias);
        let mut select = Select::from(TableRef::table(&model.name, Some(target.alias.clone())));

        for other in self.schema.ancestors(&model.name).into_iter().chain(descendants.iter().copied()) {
            select.joins.push(delegate_join(&target, other));
        }

        (select, target)
    }

    /// The expression reading `field`: its column, or the registered
    /// implementation of a computed field.
    pub(crate) fn field_expr(&self, target: &ModelRef<'a>, field: &'a FieldDef) -> Result<Expr> {
        if !field.computed {
            return Ok(target.column(field));
        }

        let owner = field.origin_model.as_deref().unwrap_or(&target.model.name);
        let implementation = self
            .options
            .get_computed(owner, &field.name)
            .or_else(|| self.options.get_computed(&target.model.name, &field.name))
            .ok_or_else(|| {
                Error::config(format!(
                    "computed field \"{}.{}\" has no implementation",
                    target.model.name, field.name
                ))
            })?;

        let alias = target.table_for(field);
        Ok(implementation(&ComputedContext {
            model_alias: &alias,
        }))
    }

    /// Correlates rows of `target` with the `parent` row through relation
    /// `field`. Many-to-many relations go through their join table.
    pub(crate) fn correlation(
        &self,
        parent: &ModelRef<'a>,
        field: &'a FieldDef,
        target: &ModelRef<'a>,
    ) -> Result<Expr> {
        if self.schema.is_many_to_many(&parent.model.name, field) {
            let m2m = self.schema.many_to_many(&parent.model.name, field)?;
            let join_alias = self.next_alias();

            let mut select = Select::from(TableRef::table(&m2m.join_table, Some(join_alias.clone())))
                .item(Expr::column(&join_alias, &m2m.other_column), None);
            select.and_filter(Expr::eq(
                Expr::column(&join_alias, &m2m.parent_column),
                parent.column(parent.field(&m2m.parent_id)?),
            ));

            return Ok(Expr::in_subquery(
                vec![target.column(target.field(&m2m.other_id)?)],
                select,
            ));
        }

        let pairs = self.schema.join_pairs(&parent.model.name, field)?;
        let exprs = pairs
            .iter()
            .map(|pair| {
                Ok(Expr::eq(
                    target.column(target.field(&pair.target)?),
                    parent.column(parent.field(&pair.parent)?),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Expr::and(exprs))
    }

    /// `(SELECT COUNT(*) FROM target WHERE correlated [AND filter])`. With
    /// `negate`, counts the related rows failing `filter` instead.
    pub(crate) fn relation_count(
        &self,
        parent: &ModelRef<'a>,
        field: &'a FieldDef,
        filter: Option<&Value>,
        negate: bool,
    ) -> Result<Expr> {
        let model = self.schema.get_model(&field.ty)?;
        let (mut select, target) = self.from_model(model, self.next_alias(), &[]);
        select.and_filter(self.correlation(parent, field, &target)?);

        if let Some(filter) = filter {
            let filter = self.filter(&target, filter)?;
            select.and_filter(if negate { Expr::not(filter) } else { filter });
        }

        Ok(Expr::subquery(select.item(Expr::count_star(), None)))
    }

    /// Compiles a `findMany`, `findFirst` or `findUnique` read.
    pub(crate) fn find(&self, model: &'a ModelDef, args: &Value, first: bool) -> Result<FindQuery<'a>> {
        let plan = self.plan(model, args)?;
        let descendants = plan.descendant_models();
        let (mut select, target) = self.from_model(model, model.name.clone(), &descendants);

        if let Some(filter) = args.get("where") {
            select.and_filter(self.filter(&target, filter)?);
        }

        let reverse = self.paginate(&mut select, &target, args, false)?;
        if first {
            select.limit = Some(1);
        }

        select.items = self.select_items(&plan, &target)?;
        Ok(FindQuery {
            select,
            plan,
            reverse,
        })
    }

    /// `SELECT 1 FROM model WHERE filter LIMIT 1`
    pub(crate) fn exists(&self, model: &'a ModelDef, filter: Option<&Value>) -> Result<Select> {
        let (mut select, target) = self.from_model(model, model.name.clone(), &[]);
        if let Some(filter) = filter {
            select.and_filter(self.filter(&target, filter)?);
        }
        select.items = vec![SelectItem::expr(Expr::value(1))];
        select.limit = Some(1);
        Ok(select)
    }

    /// Selects the id fields of the rows matching `args` (`where`,
    /// `orderBy`, `skip`, `take`, `cursor`).
    pub(crate) fn select_ids(&self, model: &'a ModelDef, args: &Value) -> Result<Select> {
        let (mut select, target) = self.from_model(model, model.name.clone(), &[]);
        if let Some(filter) = args.get("where") {
            select.and_filter(self.filter(&target, filter)?);
        }
        self.paginate(&mut select, &target, args, false)?;

        select.items = target
            .id_fields()?
            .into_iter()
            .map(|field| SelectItem::aliased(target.column(field), &field.name))
            .collect();
        Ok(select)
    }

    /// Matches the rows whose id fields equal one of `ids`, each an object
    /// keyed by id field name.
    pub(crate) fn id_filter(&self, target: &ModelRef<'a>, ids: &[Value]) -> Result<Expr> {
        let fields = target.id_fields()?;

        if let [field] = &fields[..] {
            let values = ids
                .iter()
                .map(|id| self.param(field, id.get(&field.name).unwrap_or(&Value::Null)))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Expr::in_list(target.column(field), values));
        }

        let clauses = ids
            .iter()
            .map(|id| {
                let exprs = fields
                    .iter()
                    .map(|field| {
                        let value = id.get(&field.name).unwrap_or(&Value::Null);
                        Ok(Expr::eq(target.column(field), self.param(field, value)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::and(exprs))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Expr::or(clauses))
    }

    /// Left-joins the target of to-one relation `field`, with its delegate
    /// ancestors, and returns a reference to it.
    pub(crate) fn join_relation(
        &self,
        select: &mut Select,
        parent: &ModelRef<'a>,
        field: &'a FieldDef,
    ) -> Result<ModelRef<'a>> {
        let model = self.schema.get_model(&field.ty)?;
        let target = ModelRef::new(model, self.next_alias());

        select.joins.push(Join {
            kind: JoinKind::Left,
            table: TableRef::table(&model.name, Some(target.alias.clone())),
            on: self.correlation(parent, field, &target)?,
        });
        for ancestor in self.schema.ancestors(&model.name) {
            select.joins.push(delegate_join(&target, ancestor));
        }

        Ok(target)
    }
}

fn delegate_join(target: &ModelRef<'_>, other: &ModelDef) -> Join {
    let alias = delegate_alias(&target.alias, &other.name);
    let on = Expr::and(target.model.id_fields.iter().map(|id| {
        Expr::eq(Expr::column(&alias, id), Expr::column(&target.alias, id))
    }));

    Join {
        kind: JoinKind::Left,
        table: TableRef::table(&other.name, Some(alias)),
        on,
    }
}

/// Reads `key` of an argument object as a list, accepting a single value
/// in place of a one-element list.
pub(crate) fn list_arg(value: &Value) -> Vec<&Value> {
    match value {
        Value::List(items) => items.iter().collect(),
        Value::Null => vec![],
        value => vec![value],
    }
}
