use quill_core::stmt::Expr;

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

/// What a computed field implementation gets to see.
#[derive(Debug)]
pub struct ComputedContext<'a> {
    /// Alias of the table the computed field's model is read from at the
    /// selection site.
    pub model_alias: &'a str,
}

/// Builds the SQL expression for a computed field.
pub type ComputedField = Arc<dyn Fn(&ComputedContext<'_>) -> Expr + Send + Sync>;

/// Client-level settings shared by every operation.
#[derive(Clone, Default)]
pub struct Options {
    omit: HashMap<String, HashSet<String>>,
    computed: HashMap<(String, String), ComputedField>,
}

impl Options {
    pub fn new() -> Options {
        Options::default()
    }

    /// Omits `field` from `model` results unless a query asks for it.
    pub fn omit(&mut self, model: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.omit
            .entry(model.into())
            .or_default()
            .insert(field.into());
        self
    }

    pub fn is_omitted(&self, model: &str, field: &str) -> bool {
        self.omit
            .get(model)
            .is_some_and(|fields| fields.contains(field))
    }

    pub fn computed_field(
        &mut self,
        model: impl Into<String>,
        field: impl Into<String>,
        f: impl Fn(&ComputedContext<'_>) -> Expr + Send + Sync + 'static,
    ) -> &mut Self {
        self.computed
            .insert((model.into(), field.into()), Arc::new(f));
        self
    }

    pub fn get_computed(&self, model: &str, field: &str) -> Option<&ComputedField> {
        self.computed.get(&(model.to_string(), field.to_string()))
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("omit", &self.omit)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .finish()
    }
}
