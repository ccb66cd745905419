use super::{RuleKey, Validator};
use crate::dialect::parse_datetime;

use quill_core::{Result, Value, Violation};

use indexmap::IndexMap;
use rust_decimal::Decimal;

use std::str::FromStr;

/// The structural rule an argument value must satisfy.
#[derive(Debug, Clone)]
pub(crate) enum Rule {
    Any,

    Scalar(Scalar),

    /// One of a fixed set of strings
    OneOf(Vec<String>),

    Object(ObjectRule),

    List(Box<Rule>),

    /// A single item or a list of them
    OneOrMany(Box<Rule>),

    /// `null` or the inner rule
    Nullable(Box<Rule>),

    /// Passes when any alternative passes
    Either(Vec<Rule>),

    /// A rule built on first use; lets rules refer to each other
    /// recursively.
    Ref(RuleKey),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    String,
    Boolean,
    Int,
    NonNegativeInt,
    BigInt,
    Float,
    Decimal,
    DateTime,
    Bytes,
    /// `filter` admits `AnyNull`
    Json { filter: bool },
    Enum { name: String, keys: Vec<String> },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectRule {
    pub(crate) fields: IndexMap<String, Rule>,

    pub(crate) required: Vec<String>,

    /// Each group needs at least one of its keys.
    pub(crate) required_any: Vec<Vec<String>>,

    /// Key pairs that cannot be given together.
    pub(crate) exclusive: Vec<(String, String)>,

    pub(crate) exactly_one: bool,

    /// Unique key sets; when non-empty, one set must be fully given.
    pub(crate) unique: Vec<Vec<String>>,

    /// Relations paired with the foreign key fields they own. An object
    /// either writes relations or foreign keys, never both.
    pub(crate) foreign_keys: Vec<(String, Vec<String>)>,
}

impl Rule {
    pub(crate) fn one_of(values: &[&str]) -> Rule {
        Rule::OneOf(values.iter().map(|value| value.to_string()).collect())
    }

    pub(crate) fn nullable(self) -> Rule {
        Rule::Nullable(Box::new(self))
    }

    pub(crate) fn list(self) -> Rule {
        Rule::List(Box::new(self))
    }

    pub(crate) fn one_or_many(self) -> Rule {
        Rule::OneOrMany(Box::new(self))
    }

    pub(crate) fn boolean() -> Rule {
        Rule::Scalar(Scalar::Boolean)
    }

    /// `true` if the rule expects the kind of value `value` is: an object,
    /// a list or a scalar.
    fn fits_shape(&self, value: &Value) -> bool {
        match self {
            Rule::Object(_) | Rule::Ref(_) => matches!(value, Value::Object(_)),
            Rule::List(_) => matches!(value, Value::List(_)),
            Rule::Nullable(inner) => value.is_null() || inner.fits_shape(value),
            Rule::OneOrMany(inner) => matches!(value, Value::List(_)) || inner.fits_shape(value),
            Rule::Either(alternatives) => alternatives.iter().any(|rule| rule.fits_shape(value)),
            Rule::Any | Rule::Scalar(Scalar::Json { .. }) => true,
            Rule::Scalar(_) | Rule::OneOf(_) => !matches!(value, Value::Object(_) | Value::List(_)),
        }
    }
}

impl ObjectRule {
    pub(crate) fn field(mut self, key: impl Into<String>, rule: Rule) -> ObjectRule {
        self.fields.insert(key.into(), rule);
        self
    }

    pub(crate) fn require(mut self, key: impl Into<String>) -> ObjectRule {
        self.required.push(key.into());
        self
    }

    pub(crate) fn exclusive(mut self, a: &str, b: &str) -> ObjectRule {
        self.exclusive.push((a.to_string(), b.to_string()));
        self
    }

    pub(crate) fn exactly_one(mut self) -> ObjectRule {
        self.exactly_one = true;
        self
    }

    pub(crate) fn into_rule(self) -> Rule {
        Rule::Object(self)
    }
}

/// Walks a value against a rule, collecting every violation.
pub(crate) struct Check<'a> {
    validator: &'a Validator,
    pub(crate) violations: Vec<Violation>,
}

impl<'a> Check<'a> {
    pub(crate) fn new(validator: &'a Validator) -> Check<'a> {
        Check {
            validator,
            violations: vec![],
        }
    }

    fn violation(&mut self, path: &str, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    pub(crate) fn check(&mut self, rule: &Rule, value: &Value, path: &str) -> Result<()> {
        match rule {
            Rule::Any => {}
            Rule::Scalar(scalar) => self.scalar(scalar, value, path),
            Rule::OneOf(values) => match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => {}
                _ => self.violation(path, format!("expected one of {}", quoted(values))),
            },
            Rule::Object(object) => self.object(object, value, path)?,
            Rule::List(item) => match value {
                Value::List(items) => {
                    for (i, value) in items.iter().enumerate() {
                        self.check(item, value, &format!("{path}[{i}]"))?;
                    }
                }
                _ => self.violation(path, format!("expected a list, got {}", value.type_name())),
            },
            Rule::OneOrMany(item) => match value {
                Value::List(items) => {
                    for (i, value) in items.iter().enumerate() {
                        self.check(item, value, &format!("{path}[{i}]"))?;
                    }
                }
                value => self.check(item, value, path)?,
            },
            Rule::Nullable(inner) => {
                if !matches!(value, Value::Null | Value::DbNull) {
                    self.check(inner, value, path)?;
                }
            }
            Rule::Either(alternatives) => self.either(alternatives, value, path)?,
            Rule::Ref(key) => {
                let rule = self.validator.rule(key)?;
                self.check(&rule, value, path)?;
            }
        }
        Ok(())
    }

    /// Keeps the violations of the alternative that came closest,
    /// preferring alternatives shaped like the value.
    fn either(&mut self, alternatives: &[Rule], value: &Value, path: &str) -> Result<()> {
        let mut best: Option<((bool, usize), Vec<Violation>)> = None;

        for alternative in alternatives {
            let mut check = Check::new(self.validator);
            check.check(alternative, value, path)?;
            if check.violations.is_empty() {
                return Ok(());
            }

            let rank = (!alternative.fits_shape(value), check.violations.len());
            if best.as_ref().map_or(true, |(best, _)| rank < *best) {
                best = Some((rank, check.violations));
            }
        }

        self.violations.extend(best.map(|(_, violations)| violations).unwrap_or_default());
        Ok(())
    }

    fn object(&mut self, rule: &ObjectRule, value: &Value, path: &str) -> Result<()> {
        let Some(entries) = value.as_object() else {
            self.violation(path, format!("expected an object, got {}", value.type_name()));
            return Ok(());
        };

        for (key, value) in entries {
            let child = join(path, key);
            match rule.fields.get(key) {
                Some(field) => self.check(field, value, &child)?,
                None => self.violation(&child, "unknown argument"),
            }
        }

        for key in &rule.required {
            if !entries.contains_key(key) {
                self.violation(&join(path, key), "is required");
            }
        }

        for group in &rule.required_any {
            if !group.iter().any(|key| entries.contains_key(key)) {
                self.violation(path, format!("one of {} is required", quoted(group)));
            }
        }

        for (a, b) in &rule.exclusive {
            if entries.contains_key(a) && entries.contains_key(b) {
                self.violation(path, format!("`{a}` and `{b}` cannot be used together"));
            }
        }

        if rule.exactly_one && entries.len() != 1 {
            let keys: Vec<String> = rule.fields.keys().cloned().collect();
            self.violation(path, format!("expected exactly one of {}", quoted(&keys)));
        }

        if !rule.unique.is_empty() {
            let given = |key: &String| entries.get(key).is_some_and(|value| !value.is_null());
            if !rule.unique.iter().any(|set| set.iter().all(given)) {
                let sets: Vec<String> = rule.unique.iter().map(|set| set.join(", ")).collect();
                self.violation(path, format!("requires a unique filter on one of {}", quoted(&sets)));
            }
        }

        let relations: Vec<&str> = rule
            .foreign_keys
            .iter()
            .filter(|(relation, _)| entries.contains_key(relation))
            .map(|(relation, _)| relation.as_str())
            .collect();
        let keys: Vec<&str> = rule
            .foreign_keys
            .iter()
            .flat_map(|(_, fields)| fields)
            .filter(|field| entries.contains_key(*field))
            .map(String::as_str)
            .collect();
        if let (Some(relation), Some(key)) = (relations.first(), keys.first()) {
            self.violation(
                path,
                format!("`{relation}` and foreign key `{key}` cannot be written in the same object"),
            );
        }

        Ok(())
    }

    fn scalar(&mut self, scalar: &Scalar, value: &Value, path: &str) {
        let ok = match (scalar, value) {
            (_, Value::AnyNull) => {
                if !matches!(scalar, Scalar::Json { filter: true }) {
                    self.violation(path, "`AnyNull` can only be used in filters");
                }
                return;
            }
            (Scalar::String, Value::String(_)) => true,
            (Scalar::Boolean, Value::Bool(_)) => true,
            (Scalar::Int, Value::Int(_) | Value::BigInt(_)) => true,
            (Scalar::NonNegativeInt, Value::Int(n)) => *n >= 0,
            (Scalar::BigInt, Value::Int(_) | Value::BigInt(_)) => true,
            (Scalar::BigInt, Value::String(s)) => s.parse::<i64>().is_ok(),
            (Scalar::Float, Value::Float(_) | Value::Int(_) | Value::BigInt(_) | Value::Decimal(_)) => true,
            (Scalar::Decimal, Value::Decimal(_) | Value::Int(_) | Value::BigInt(_) | Value::Float(_)) => true,
            (Scalar::Decimal, Value::String(s)) => Decimal::from_str(s).is_ok(),
            (Scalar::DateTime, Value::DateTime(_)) => true,
            (Scalar::DateTime, Value::String(s)) => parse_datetime(s).is_some(),
            (Scalar::Bytes, Value::Bytes(_)) => true,
            (Scalar::Json { .. }, _) => true,
            (Scalar::Enum { keys, .. }, Value::String(s)) => keys.contains(s),
            _ => false,
        };

        if !ok {
            let message = match (scalar, value) {
                (Scalar::Enum { name, keys }, _) => {
                    format!("expected a value of enum `{name}` ({})", quoted(keys))
                }
                (Scalar::NonNegativeInt, Value::Int(_)) => "must not be negative".to_string(),
                _ => format!("expected {}, got {}", scalar.describe(), value.type_name()),
            };
            self.violation(path, message);
        }
    }
}

impl Scalar {
    fn describe(&self) -> &'static str {
        match self {
            Scalar::String => "a string",
            Scalar::Boolean => "a boolean",
            Scalar::Int => "an integer",
            Scalar::NonNegativeInt => "a non-negative integer",
            Scalar::BigInt => "a big integer",
            Scalar::Float => "a number",
            Scalar::Decimal => "a decimal",
            Scalar::DateTime => "a date-time",
            Scalar::Bytes => "bytes",
            Scalar::Json { .. } => "a JSON value",
            Scalar::Enum { .. } => "an enum value",
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

fn quoted(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("`{value}`"))
        .collect::<Vec<_>>()
        .join(", ")
}
