//! Render contexts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{TemplateError, TemplateResult};
use crate::value::Value;

/// Variables supplied to a template render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from any serializable struct or map.
    ///
    /// The value must serialize to a mapping; its top-level keys become
    /// variables.
    pub fn from_serialize<T: Serialize>(value: &T) -> TemplateResult<Self> {
        let json = serde_json::to_value(value).map_err(|e| TemplateError::Context(e.to_string()))?;
        Self::from_value(Value::from(json))
    }

    /// Build a context from a mapping value.
    pub fn from_value(value: Value) -> TemplateResult<Self> {
        match value {
            Value::Map(vars) => Ok(Self { vars }),
            Value::Null | Value::Undefined => Ok(Self::new()),
            other => Err(TemplateError::Context(format!(
                "expected a mapping at the top level, found {}",
                other.type_name()
            ))),
        }
    }

    /// Build a context from YAML text.
    pub fn from_yaml_str(source: &str) -> TemplateResult<Self> {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(source).map_err(|e| TemplateError::Context(e.to_string()))?;
        Self::from_value(Value::from(yaml))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Overlay another context; its keys win.
    pub fn extend(&mut self, other: Context) {
        self.vars.extend(other.vars);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Map(self.vars)
    }
}
