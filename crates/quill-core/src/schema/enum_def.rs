use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDef {
    #[serde(default)]
    pub name: String,

    pub values: Vec<EnumValue>,
}

/// An enum member, optionally stored under a different value (`@map`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    pub name: String,

    #[serde(default)]
    pub db_name: Option<String>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>, values: &[&str]) -> EnumDef {
        EnumDef {
            name: name.into(),
            values: values
                .iter()
                .map(|value| EnumValue {
                    name: value.to_string(),
                    db_name: None,
                })
                .collect(),
        }
    }

    /// Stores `key` under `db_name`.
    pub fn map(mut self, key: &str, db_name: impl Into<String>) -> EnumDef {
        if let Some(value) = self.values.iter_mut().find(|value| value.name == key) {
            value.db_name = Some(db_name.into());
        }
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.iter().any(|value| value.name == key)
    }

    /// The stored representation of `key`.
    pub fn db_value(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|value| value.name == key)
            .map(|value| value.db_name.as_deref().unwrap_or(&value.name))
    }

    pub fn has_mapped_values(&self) -> bool {
        self.values.iter().any(|value| value.db_name.is_some())
    }

    /// `(stored, key)` pairs for the members whose stored value differs.
    pub fn mapped_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().filter_map(|value| {
            value
                .db_name
                .as_deref()
                .map(|db_name| (db_name, value.name.as_str()))
        })
    }
}
