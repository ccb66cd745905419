//! Structural validation of operation arguments.
//!
//! Rules are derived from the schema per `(model, kind)` and cached for the
//! validator's lifetime. Rules refer to each other through [`Rule::Ref`], so
//! a rule is only built once a value actually reaches it.

mod build;
mod rule;

use rule::{Check, Rule};

use crate::crud::Operation;

use quill_core::{schema::ModelDef, Error, Result, Schema, Value, Violation};

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

#[derive(Debug)]
pub struct Validator {
    schema: Arc<Schema>,
    cache: RwLock<HashMap<RuleKey, Arc<Rule>>>,
}

/// Identifies a cached rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RuleKey {
    /// A model, or a type definition for the `TypeDef*` kinds
    pub(crate) model: String,
    pub(crate) kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Kind {
    /// The top-level arguments of an operation
    Args(Operation),
    Where,
    WhereUnique,
    /// Operators on one scalar field
    FieldFilter(String),
    TypeDefFilter,
    TypeDefValue,
    Select,
    Include,
    Omit,
    OrderBy,
    /// `orderBy` of `groupBy`, which may sort by aggregates
    GroupByOrderBy,
    /// A create payload; `without` is the relation the payload is nested
    /// under, which the nested write fills in.
    Create { without: Option<String> },
    CreateMany { without: Option<String> },
    Update { without: Option<String> },
    UpdateMany,
}

const AGGREGATES: [&str; 5] = ["_count", "_avg", "_sum", "_min", "_max"];

impl Validator {
    pub fn new(schema: Arc<Schema>) -> Validator {
        Validator {
            schema,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Checks `args` for `operation` on `model`. Every violation found is
    /// reported in one [`Error::invalid_input`].
    pub fn validate(&self, model: &str, operation: Operation, args: &Value) -> Result<()> {
        let def = self.schema.get_model(model)?;
        if def.is_delegate && matches!(
            operation,
            Operation::Create | Operation::CreateMany | Operation::CreateManyAndReturn
        ) {
            return Err(Error::invalid_input(
                model,
                operation.name(),
                vec![Violation::new("", "delegate models cannot be created directly")],
            ));
        }

        let key = RuleKey {
            model: model.to_string(),
            kind: Kind::Args(operation),
        };
        let rule = self.rule(&key)?;

        let mut check = Check::new(self);
        match args {
            Value::Null => check.check(&rule, &Value::object(), "")?,
            args => check.check(&rule, args, "")?,
        }
        if operation == Operation::GroupBy {
            group_by_fields(def, args, &mut check.violations);
        }

        if check.violations.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid_input(model, operation.name(), check.violations))
        }
    }

    pub(crate) fn rule(&self, key: &RuleKey) -> Result<Arc<Rule>> {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        if let Some(rule) = cached {
            tracing::trace!(model = %key.model, kind = ?key.kind, "validation rule cache hit");
            return Ok(rule);
        }

        tracing::trace!(model = %key.model, kind = ?key.kind, "validation rule cache miss");
        let rule = Arc::new(build::Build::new(&self.schema).rule(key)?);

        // Concurrent misses build the same rule; the last write wins.
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), rule.clone());
        Ok(rule)
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// `having` and `orderBy` of a `groupBy` may only name fields of `by`,
/// unless they go through an aggregate.
fn group_by_fields(model: &ModelDef, args: &Value, violations: &mut Vec<Violation>) {
    let by: Vec<&str> = match args.get("by") {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::List(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => return,
    };

    fn having(
        model: &ModelDef,
        by: &[&str],
        filter: &Value,
        path: &str,
        violations: &mut Vec<Violation>,
    ) {
        let Some(entries) = filter.as_object() else {
            return;
        };
        for (key, value) in entries {
            let child = format!("{path}.{key}");
            match key.as_str() {
                "AND" | "OR" | "NOT" => match value {
                    Value::List(items) => {
                        for (i, item) in items.iter().enumerate() {
                            having(model, by, item, &format!("{child}[{i}]"), violations);
                        }
                    }
                    item => having(model, by, item, &child, violations),
                },
                name if by.contains(&name) => {}
                name if model.fields.contains_key(name) => {
                    let aggregated = value
                        .as_object()
                        .is_some_and(|ops| ops.keys().all(|op| AGGREGATES.contains(&op.as_str())));
                    if !aggregated {
                        violations.push(Violation::new(
                            child,
                            format!("`{name}` is not in `by`; filter it through an aggregate"),
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(filter) = args.get("having") {
        having(model, &by, filter, "having", violations);
    }

    let order_by = match args.get("orderBy") {
        Some(Value::List(items)) => items.iter().collect(),
        Some(item) => vec![item],
        None => vec![],
    };
    for (i, item) in order_by.into_iter().enumerate() {
        let Some(entries) = item.as_object() else {
            continue;
        };
        for key in entries.keys() {
            if !by.contains(&key.as_str()) && !AGGREGATES.contains(&key.as_str()) {
                violations.push(Violation::new(
                    format!("orderBy[{i}].{key}"),
                    format!("`{key}` is not in `by`"),
                ));
            }
        }
    }
}
