//! Declared per-extension options and their resolution against what a guild stored.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    Str,
    List,
    Bool,
    Int,
}

impl Datatype {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Datatype::Str => value.is_string() || value.is_null(),
            Datatype::List => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Datatype::Bool => value.is_boolean(),
            Datatype::Int => value.is_i64(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigOption {
    pub key: String,
    pub datatype: Datatype,
    pub title: String,
    pub description: String,
    pub default: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionConfig {
    pub options: Vec<ConfigOption>,
}

impl ExtensionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        mut self,
        key: &str,
        datatype: Datatype,
        title: &str,
        description: &str,
        default: Value,
    ) -> Self {
        self.options.push(ConfigOption {
            key: key.to_string(),
            datatype,
            title: title.to_string(),
            description: description.to_string(),
            default,
        });
        self
    }

    /// Merge stored values over the declared defaults.
    pub fn resolve(&self, stored: Option<&BTreeMap<String, Value>>) -> ExtensionSettings {
        let values = self
            .options
            .iter()
            .map(|option| {
                let value = match stored.and_then(|s| s.get(&option.key)) {
                    Some(value) if option.datatype.accepts(value) => value.clone(),
                    Some(value) => {
                        warn!(
                            key = %option.key,
                            expected = ?option.datatype,
                            %value,
                            "Stored option has the wrong type, using default"
                        );
                        option.default.clone()
                    }
                    None => option.default.clone(),
                };
                (option.key.clone(), value)
            })
            .collect();
        ExtensionSettings { values }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionSettings {
    values: BTreeMap<String, Value>,
}

impl ExtensionSettings {
    pub fn string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        self.values
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }
}
