use super::{delegate_alias, ModelRef, QueryBuilder};
use crate::dialect::subselect;

use quill_core::{
    err,
    schema::{FieldDef, ModelDef},
    stmt::{Expr, SelectItem},
    Result, Value,
};

/// Column alias prefix of a delegate sub-model's packed fields.
pub(crate) const DELEGATE_PREFIX: &str = "$delegate$";

/// What a read returns for each row of `model`, in output order.
#[derive(Debug, Clone)]
pub(crate) struct SelectionPlan<'a> {
    pub(crate) model: &'a ModelDef,
    pub(crate) items: Vec<PlanItem<'a>>,

    /// Delegate sub-models whose own fields are merged into rows that
    /// belong to them.
    pub(crate) descendants: Vec<DescendantPlan<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) enum PlanItem<'a> {
    /// A stored or computed scalar field
    Field(&'a FieldDef),

    Relation {
        field: &'a FieldDef,
        plan: SelectionPlan<'a>,

        /// The nested read arguments (`where`, `orderBy`, `take`, ...)
        args: Value,
    },

    /// `_count` of to-many relations
    Count(Vec<CountItem<'a>>),
}

#[derive(Debug, Clone)]
pub(crate) struct CountItem<'a> {
    pub(crate) field: &'a FieldDef,
    pub(crate) filter: Option<Value>,
}

#[derive(Debug, Clone)]
pub(crate) struct DescendantPlan<'a> {
    pub(crate) model: &'a ModelDef,
    pub(crate) fields: Vec<&'a FieldDef>,
}

impl<'a> SelectionPlan<'a> {
    pub(crate) fn descendant_models(&self) -> Vec<&'a ModelDef> {
        self.descendants.iter().map(|d| d.model).collect()
    }
}

impl PlanItem<'_> {
    /// Output key of the item.
    pub(crate) fn key(&self) -> &str {
        match self {
            PlanItem::Field(field) | PlanItem::Relation { field, .. } => &field.name,
            PlanItem::Count(_) => "_count",
        }
    }
}

impl<'a> QueryBuilder<'a> {
    /// Resolves `select`, `include` and `omit` into a selection plan.
    ///
    /// Without `select`, every scalar field is returned except omitted
    /// ones; a query-level `omit` beats a client-level omission, which
    /// beats the schema's. Delegate sub-model fields are only merged in
    /// that mode.
    pub(crate) fn plan(&self, model: &'a ModelDef, args: &Value) -> Result<SelectionPlan<'a>> {
        if let Some(select) = args.get("select").filter(|s| !s.is_null()) {
            let entries = select
                .as_object()
                .ok_or_else(|| err!("`select` must be an object"))?;

            let mut items = vec![];
            for (key, value) in entries {
                if value.is_truthy() {
                    items.push(self.plan_item(model, key, value)?);
                }
            }
            return Ok(SelectionPlan {
                model,
                items,
                descendants: vec![],
            });
        }

        let omit = args.get("omit");
        let mut items: Vec<PlanItem<'a>> = model
            .fields
            .values()
            .filter(|field| !field.is_relation() && !self.is_omitted(model, field, omit))
            .map(PlanItem::Field)
            .collect();

        if let Some(include) = args.get("include").and_then(Value::as_object) {
            for (key, value) in include {
                if value.is_truthy() {
                    items.push(self.plan_item(model, key, value)?);
                }
            }
        }

        let descendants = self
            .schema
            .descendants(&model.name)
            .into_iter()
            .map(|descendant| DescendantPlan {
                model: descendant,
                fields: descendant
                    .fields
                    .values()
                    .filter(|field| {
                        field.is_stored()
                            && !model.fields.contains_key(&field.name)
                            && !self.is_omitted(descendant, field, omit)
                    })
                    .collect(),
            })
            .collect();

        Ok(SelectionPlan {
            model,
            items,
            descendants,
        })
    }

    fn plan_item(&self, model: &'a ModelDef, key: &str, value: &Value) -> Result<PlanItem<'a>> {
        if key == "_count" {
            return Ok(PlanItem::Count(self.plan_count(model, value)?));
        }

        let field = model.get_field(key)?;
        if !field.is_relation() {
            return Ok(PlanItem::Field(field));
        }

        let target = self.schema.get_model(&field.ty)?;
        let args = if value.as_object().is_some() {
            value.clone()
        } else {
            Value::Null
        };

        Ok(PlanItem::Relation {
            field,
            plan: self.plan(target, &args)?,
            args,
        })
    }

    /// `_count: true` counts every to-many relation; `_count: { select: {
    /// posts: true | { where } } }` picks relations and filters them.
    fn plan_count(&self, model: &'a ModelDef, value: &Value) -> Result<Vec<CountItem<'a>>> {
        match value.get("select").and_then(Value::as_object) {
            None => Ok(model
                .relation_fields()
                .filter(|field| field.array)
                .map(|field| CountItem { field, filter: None })
                .collect()),
            Some(entries) => entries
                .iter()
                .filter(|(_, value)| value.is_truthy())
                .map(|(key, value)| {
                    Ok(CountItem {
                        field: model.get_field(key)?,
                        filter: value.get("where").cloned(),
                    })
                })
                .collect(),
        }
    }

    fn is_omitted(&self, model: &ModelDef, field: &FieldDef, omit: Option<&Value>) -> bool {
        if let Some(flag) = omit.and_then(|omit| omit.get(&field.name)) {
            return flag.is_truthy();
        }
        self.options.is_omitted(&model.name, &field.name) || field.omit
    }

    /// Top-level select items: scalar columns plus one JSON value per
    /// relation, `_count` and delegate sub-model.
    pub(crate) fn select_items(&self, plan: &SelectionPlan<'a>, target: &ModelRef<'a>) -> Result<Vec<SelectItem>> {
        let mut items = vec![];
        for item in &plan.items {
            items.push(match item {
                PlanItem::Field(field) if field.computed => {
                    SelectItem::aliased(self.field_expr(target, field)?, &field.name)
                }
                PlanItem::Field(field) => SelectItem::expr(target.column(field)),
                PlanItem::Relation { field, plan, args } => {
                    SelectItem::aliased(self.relation_select(target, field, plan, args)?, &field.name)
                }
                PlanItem::Count(counts) => {
                    SelectItem::aliased(self.count_object(target, counts)?, "_count")
                }
            });
        }

        for descendant in &plan.descendants {
            items.push(SelectItem::aliased(
                self.descendant_object(target, descendant)?,
                format!("{DELEGATE_PREFIX}{}", descendant.model.name),
            ));
        }

        Ok(items)
    }

    /// One JSON object holding everything `plan` selects from the row.
    fn object_expr(&self, plan: &SelectionPlan<'a>, target: &ModelRef<'a>) -> Result<Expr> {
        let mut fields = vec![];
        for item in &plan.items {
            let value = match item {
                PlanItem::Field(field) => {
                    let ty = self.value_type(field)?;
                    self.dialect.json_embed(self.field_expr(target, field)?, &ty)
                }
                PlanItem::Relation { field, plan, args } => self
                    .dialect
                    .json_value(self.relation_select(target, field, plan, args)?),
                PlanItem::Count(counts) => self.dialect.json_value(self.count_object(target, counts)?),
            };
            fields.push((item.key().to_string(), value));
        }

        for descendant in &plan.descendants {
            fields.push((
                format!("{DELEGATE_PREFIX}{}", descendant.model.name),
                self.dialect.json_value(self.descendant_object(target, descendant)?),
            ));
        }

        Ok(Expr::json_object(fields))
    }

    /// Correlated subquery producing the related row (or array of rows) of
    /// relation `field` as JSON.
    fn relation_select(
        &self,
        parent: &ModelRef<'a>,
        field: &'a FieldDef,
        plan: &SelectionPlan<'a>,
        args: &Value,
    ) -> Result<Expr> {
        let (mut select, target) =
            self.from_model(plan.model, self.next_alias(), &plan.descendant_models());
        select.and_filter(self.correlation(parent, field, &target)?);

        if let Some(filter) = args.get("where") {
            select.and_filter(self.filter(&target, filter)?);
        }
        if field.array {
            self.paginate(&mut select, &target, args, true)?;
        }

        select.items = vec![SelectItem::aliased(
            self.object_expr(plan, &target)?,
            subselect::OBJECT,
        )];

        Ok(if field.array {
            subselect::to_many(self.dialect, select, &self.next_alias())
        } else {
            subselect::to_one(select)
        })
    }

    fn count_object(&self, target: &ModelRef<'a>, counts: &[CountItem<'a>]) -> Result<Expr> {
        let fields = counts
            .iter()
            .map(|count| {
                let expr = self.relation_count(target, count.field, count.filter.as_ref(), false)?;
                Ok((count.field.name.clone(), expr))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Expr::json_object(fields))
    }

    /// `CASE WHEN <sub-model row exists> THEN {own fields} END`
    fn descendant_object(&self, target: &ModelRef<'a>, descendant: &DescendantPlan<'a>) -> Result<Expr> {
        let own_alias = delegate_alias(&target.alias, &descendant.model.name);

        let fields = descendant
            .fields
            .iter()
            .map(|field| {
                let table = match &field.origin_model {
                    Some(origin) => delegate_alias(&target.alias, origin),
                    None => own_alias.clone(),
                };
                let ty = self.value_type(field)?;
                let column = Expr::column(table, &field.name);
                Ok((field.name.clone(), self.dialect.json_embed(column, &ty)))
            })
            .collect::<Result<Vec<_>>>()?;

        let present = Expr::and(
            target
                .model
                .id_fields
                .iter()
                .map(|id| Expr::is_not_null(Expr::column(&own_alias, id))),
        );

        Ok(Expr::case(vec![(present, Expr::json_object(fields))], None))
    }
}
