//! Resolved presets.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{PresetError, PresetResult};
use crate::provider::CloudProvider;

/// Key naming the benchmark a preset runs.
pub const NAME_KEY: &str = "name";
/// Key holding the flag bundle.
pub const FLAGS_KEY: &str = "flags";

/// A fully resolved preset: merge keys expanded and, when a provider was
/// requested, provider variants selected.
///
/// Values are immutable once built; overrides produce a new preset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPreset {
    /// Registry key the preset was declared under.
    pub preset: String,
    /// Benchmark the preset configures (its `name:` field).
    pub benchmark: String,
    /// Flag bundle.
    pub flags: Mapping,
    /// Every other top-level field, e.g. `vm_groups` or `relational_db`.
    pub sections: Mapping,
    /// Provider used for variant selection, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<CloudProvider>,
}

impl ResolvedPreset {
    /// Split a merged block into name, flags and sections.
    pub(crate) fn from_block(
        preset: &str,
        block: Mapping,
        provider: Option<CloudProvider>,
    ) -> PresetResult<Self> {
        let mut benchmark = None;
        let mut flags = Mapping::new();
        let mut sections = Mapping::new();

        for (key, value) in block {
            match key.as_str() {
                Some(NAME_KEY) => match value {
                    Value::String(name) if !name.trim().is_empty() => benchmark = Some(name),
                    other => {
                        return Err(PresetError::malformed(
                            preset,
                            format!("'name' must be a benchmark name, found {:?}", other),
                        ))
                    }
                },
                Some(FLAGS_KEY) => match value {
                    Value::Mapping(mapping) => flags = mapping,
                    Value::Null => {}
                    _ => return Err(PresetError::malformed(preset, "'flags' must be a mapping")),
                },
                _ => {
                    sections.insert(key, value);
                }
            }
        }

        let benchmark = benchmark
            .ok_or_else(|| PresetError::malformed(preset, "missing 'name' pointing at a benchmark"))?;

        Ok(Self {
            preset: preset.to_string(),
            benchmark,
            flags,
            sections,
            provider,
        })
    }

    pub fn flag(&self, key: &str) -> Option<&Value> {
        self.flags.get(key)
    }

    pub fn section(&self, key: &str) -> Option<&Value> {
        self.sections.get(key)
    }

    /// Return a copy with flag overrides applied on top. Overrides replace
    /// whole values, like every other override in a preset.
    pub fn with_flag_overrides<I>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut resolved = self.clone();
        for (key, value) in overrides {
            resolved.flags.insert(Value::String(key), value);
        }
        resolved
    }

    /// Reassemble the preset as a single YAML mapping.
    pub fn to_value(&self) -> Value {
        let mut mapping = Mapping::new();
        mapping.insert(NAME_KEY.into(), Value::String(self.benchmark.clone()));
        mapping.insert(FLAGS_KEY.into(), Value::Mapping(self.flags.clone()));
        for (key, value) in &self.sections {
            mapping.insert(key.clone(), value.clone());
        }
        Value::Mapping(mapping)
    }
}

/// Parse a `KEY=VALUE` flag override. The value is read as a YAML scalar,
/// so `3` is a number, `true` a boolean and `a,b` a string.
pub fn parse_flag_override(raw: &str) -> PresetResult<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| PresetError::InvalidOverride(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(PresetError::InvalidOverride(raw.to_string()));
    }
    let value = match serde_yaml::from_str::<Value>(value) {
        Ok(Value::Mapping(_)) | Ok(Value::Sequence(_)) | Err(_) => Value::String(value.to_string()),
        Ok(scalar) => scalar,
    };
    Ok((key.to_string(), value))
}
