//! The preset registry.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::error::{PresetError, PresetResult};
use crate::merge::{expand_merge_keys, select_provider};
use crate::preset::{ResolvedPreset, FLAGS_KEY};
use crate::provider::CloudProvider;

/// A raw preset block and where it was declared.
#[derive(Debug, Clone, PartialEq)]
struct RawPreset {
    block: Value,
    origin: String,
}

/// Named presets, held raw until resolved.
///
/// Loading builds the name -> raw block map; [`PresetRegistry::resolve`]
/// expands merge keys on demand. The registry is read-only after loading
/// and can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: BTreeMap<String, RawPreset>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a single YAML document.
    pub fn from_yaml_str(source: &str) -> PresetResult<Self> {
        let mut registry = Self::new();
        registry.add_yaml_str(source, "<inline>")?;
        Ok(registry)
    }

    /// Add every top-level entry of a YAML document.
    ///
    /// A name declared twice, in this document or an earlier one, resolves
    /// to the last declaration; the earlier block is discarded rather than
    /// merged.
    pub fn add_yaml_str(&mut self, source: &str, origin: &str) -> PresetResult<usize> {
        if is_blank_document(source) {
            debug!("Preset source {} is empty", origin);
            return Ok(0);
        }

        let entries: PresetEntries = serde_yaml::from_str(source).map_err(|source| PresetError::Yaml {
            origin: origin.to_string(),
            source,
        })?;

        let count = entries.0.len();
        for (name, block) in entries.0 {
            if !block.is_mapping() {
                return Err(PresetError::malformed(&name, "preset must be a mapping"));
            }
            self.insert(name, block, origin);
        }
        debug!("Read {} preset(s) from {}", count, origin);
        Ok(count)
    }

    /// Register a raw block, replacing any earlier one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, block: Value, origin: &str) {
        let name = name.into();
        let raw = RawPreset {
            block,
            origin: origin.to_string(),
        };
        if let Some(previous) = self.presets.insert(name.clone(), raw) {
            warn!(
                "Preset '{}' declared again in {}; replacing the declaration from {}",
                name, origin, previous.origin
            );
        }
    }

    /// The source that holds the winning declaration of a preset.
    pub fn origin(&self, name: &str) -> Option<&str> {
        self.presets.get(name).map(|raw| raw.origin.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    /// Preset names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Resolve a preset's merge keys without selecting a provider.
    pub fn resolve(&self, name: &str) -> PresetResult<ResolvedPreset> {
        self.resolve_inner(name, None)
    }

    /// Resolve a preset and select each provider variant's branch for
    /// `provider`. Flags are left untouched.
    pub fn resolve_for(&self, name: &str, provider: CloudProvider) -> PresetResult<ResolvedPreset> {
        self.resolve_inner(name, Some(provider))
    }

    fn resolve_inner(&self, name: &str, provider: Option<CloudProvider>) -> PresetResult<ResolvedPreset> {
        let raw = self
            .presets
            .get(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;

        let merged = expand_merge_keys(&raw.block).map_err(|m| PresetError::malformed(name, m))?;
        let Value::Mapping(mut block) = merged else {
            return Err(PresetError::malformed(name, "preset must be a mapping"));
        };

        if let Some(provider) = provider {
            let keys: Vec<Value> = block.keys().cloned().collect();
            for key in keys {
                let Some(section) = key.as_str().filter(|k| *k != FLAGS_KEY) else {
                    continue;
                };
                let path = format!("{}.{}", name, section);
                if let Some(value) = block.get(&key) {
                    let selected =
                        select_provider(value, provider, &path).map_err(|m| PresetError::malformed(name, m))?;
                    block.insert(key, selected);
                }
            }
        }

        debug!("Resolved preset {} from {}", name, raw.origin);
        ResolvedPreset::from_block(name, block, provider)
    }

    /// Resolve every preset, keeping failures alongside successes.
    pub fn resolve_all(&self) -> Vec<(&str, PresetResult<ResolvedPreset>)> {
        self.presets
            .keys()
            .map(|name| (name.as_str(), self.resolve(name)))
            .collect()
    }
}

/// Whether a document holds nothing but comments and separators.
fn is_blank_document(source: &str) -> bool {
    source.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

/// Top-level entries in declaration order, duplicates included.
///
/// A plain `Mapping` rejects duplicate keys, which would make a file with a
/// re-declared preset unloadable.
struct PresetEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for PresetEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = PresetEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of preset names to preset blocks")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, block)) = map.next_entry::<String, Value>()? {
                    entries.push((name, block));
                }
                Ok(PresetEntries(entries))
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(PresetEntries(Vec::new()))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
base: &base
  name: redis_memtier
  flags:
    memtier_clients: 6
    memtier_threads: 32
  vm_groups:
    servers:
      vm_spec:
        GCP: {machine_type: c3-standard-8}
        AWS: {machine_type: m7i.2xlarge}
derived:
  <<: *base
  flags:
    memtier_clients: 12
"#;

    #[test]
    fn test_base_keys_inherited_and_overridden() {
        let registry = PresetRegistry::from_yaml_str(SOURCE).unwrap();
        let base = registry.resolve("base").unwrap();
        let derived = registry.resolve("derived").unwrap();

        assert_eq!(derived.benchmark, "redis_memtier");
        assert_eq!(derived.section("vm_groups"), base.section("vm_groups"));
        assert_eq!(derived.flag("memtier_clients"), Some(&Value::from(12)));
        // flags was overridden as a whole
        assert_eq!(derived.flag("memtier_threads"), None);
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let registry = PresetRegistry::from_yaml_str(
            "p:\n  name: first\n  flags: {a: 1}\np:\n  name: second\n  flags: {b: 2}\n",
        )
        .unwrap();
        assert_eq!(registry.len(), 1);
        let p = registry.resolve("p").unwrap();
        assert_eq!(p.benchmark, "second");
        assert_eq!(p.flag("a"), None);
        assert_eq!(p.flag("b"), Some(&Value::from(2)));
    }

    #[test]
    fn test_origin_follows_last_declaration() {
        let mut registry = PresetRegistry::new();
        registry.add_yaml_str("p:\n  name: first\n", "a.yaml").unwrap();
        registry.add_yaml_str("p:\n  name: second\nq:\n  name: other\n", "b.yaml").unwrap();
        assert_eq!(registry.origin("p"), Some("b.yaml"));
        assert_eq!(registry.origin("q"), Some("b.yaml"));
        assert_eq!(registry.origin("nope"), None);
    }

    #[test]
    fn test_unknown_preset() {
        let registry = PresetRegistry::from_yaml_str(SOURCE).unwrap();
        assert!(matches!(registry.resolve("nope"), Err(PresetError::NotFound(_))));
    }

    #[test]
    fn test_resolve_for_provider() {
        let registry = PresetRegistry::from_yaml_str(SOURCE).unwrap();
        let aws = registry.resolve_for("derived", CloudProvider::Aws).unwrap();
        assert_eq!(aws.provider, Some(CloudProvider::Aws));
        assert_eq!(
            aws.section("vm_groups").unwrap()["servers"]["vm_spec"]["machine_type"],
            Value::from("m7i.2xlarge")
        );

        let err = registry.resolve_for("derived", CloudProvider::Azure).unwrap_err();
        assert!(matches!(err, PresetError::MalformedPreset { .. }));
    }

    #[test]
    fn test_non_mapping_entry_rejected() {
        assert!(PresetRegistry::from_yaml_str("p: 3\n").is_err());
        assert!(PresetRegistry::from_yaml_str("- a\n").is_err());
    }

    #[test]
    fn test_blank_document() {
        assert!(PresetRegistry::from_yaml_str("# nothing here\n---\n").unwrap().is_empty());
    }
}
