//! Merge-key and provider-variant resolution.
//!
//! Both passes work on plain YAML values and return new values; the raw
//! blocks held by the registry are never modified.

use serde_yaml::{Mapping, Value};

use crate::provider::CloudProvider;

/// The YAML merge key.
pub const MERGE_KEY: &str = "<<";

/// Expand every `<<` merge key in `value`.
///
/// At each mapping carrying a merge key, the base mapping's fields are
/// copied first and the mapping's own fields then replace them key by key.
/// Nested mappings are not deep-merged: an overriding key replaces the base
/// value wholesale. With a sequence of bases, earlier bases win over later
/// ones, as YAML merge keys define.
pub fn expand_merge_keys(value: &Value) -> Result<Value, String> {
    match value {
        Value::Mapping(mapping) => expand_mapping(mapping).map(Value::Mapping),
        Value::Sequence(items) => items
            .iter()
            .map(expand_merge_keys)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Tagged(tagged) => expand_merge_keys(&tagged.value),
        other => Ok(other.clone()),
    }
}

fn expand_mapping(mapping: &Mapping) -> Result<Mapping, String> {
    let mut merged = Mapping::new();

    if let Some(base) = mapping.get(MERGE_KEY) {
        match base {
            Value::Mapping(base) => {
                merged.extend(expand_mapping(base)?);
            }
            Value::Sequence(bases) => {
                for base in bases.iter().rev() {
                    match base {
                        Value::Mapping(base) => merged.extend(expand_mapping(base)?),
                        other => {
                            return Err(format!(
                                "merge key sequence entries must be mappings, found {}",
                                kind(other)
                            ))
                        }
                    }
                }
            }
            other => {
                return Err(format!(
                    "merge key value must be a mapping or sequence of mappings, found {}",
                    kind(other)
                ))
            }
        }
    }

    for (key, value) in mapping {
        if key.as_str() == Some(MERGE_KEY) {
            continue;
        }
        merged.insert(key.clone(), expand_merge_keys(value)?);
    }
    Ok(merged)
}

/// Whether a mapping is a provider variant: non-empty, and every key names
/// a cloud provider.
pub fn is_provider_variant(mapping: &Mapping) -> bool {
    !mapping.is_empty()
        && mapping
            .keys()
            .all(|k| k.as_str().and_then(CloudProvider::from_key).is_some())
}

/// Replace every provider variant under `value` with its branch for
/// `provider`. `path` names `value` in error messages.
pub fn select_provider(value: &Value, provider: CloudProvider, path: &str) -> Result<Value, String> {
    match value {
        Value::Mapping(mapping) if is_provider_variant(mapping) => {
            let branch = mapping.get(provider.as_str()).ok_or_else(|| {
                let available: Vec<&str> = mapping.keys().filter_map(Value::as_str).collect();
                format!(
                    "{} has no {} variant (available: {})",
                    path,
                    provider,
                    available.join(", ")
                )
            })?;
            select_provider(branch, provider, path)
        }
        Value::Mapping(mapping) => {
            let mut selected = Mapping::new();
            for (key, child) in mapping {
                let child_path = match key.as_str() {
                    Some(k) => format!("{}.{}", path, k),
                    None => format!("{}.?", path),
                };
                selected.insert(key.clone(), select_provider(child, provider, &child_path)?);
            }
            Ok(Value::Mapping(selected))
        }
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| select_provider(item, provider, &format!("{}[{}]", path, i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        other => Ok(other.clone()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn test_merge_is_shallow() {
        let doc = yaml(
            r#"
base: &base
  a: 1
  nested: {x: 1, y: 2}
derived:
  <<: *base
  b: 2
  nested: {z: 3}
"#,
        );
        let derived = expand_merge_keys(&doc["derived"]).unwrap();
        assert_eq!(derived, yaml("{a: 1, nested: {z: 3}, b: 2}"));
    }

    #[test]
    fn test_merge_sequence_earlier_wins() {
        let doc = yaml(
            r#"
one: &one {k: one, a: 1}
two: &two {k: two, b: 2}
both:
  <<: [*one, *two]
  c: 3
"#,
        );
        let both = expand_merge_keys(&doc["both"]).unwrap();
        assert_eq!(both["k"], yaml("one"));
        assert_eq!(both["a"], yaml("1"));
        assert_eq!(both["b"], yaml("2"));
        assert_eq!(both["c"], yaml("3"));
    }

    #[test]
    fn test_chained_merges() {
        let doc = yaml(
            r#"
a: &a {x: 1, y: 1}
b: &b
  <<: *a
  y: 2
c:
  <<: *b
  z: 3
"#,
        );
        assert_eq!(expand_merge_keys(&doc["c"]).unwrap(), yaml("{x: 1, y: 2, z: 3}"));
    }

    #[test]
    fn test_bad_merge_value() {
        let doc = yaml("bad:\n  <<: 3\n");
        assert!(expand_merge_keys(&doc["bad"]).is_err());
    }

    #[test]
    fn test_select_provider() {
        let doc = yaml(
            r#"
vm_spec:
  GCP: {machine_type: n2-standard-4}
  AWS: {machine_type: m6i.xlarge}
disk_count: 2
"#,
        );
        let selected = select_provider(&doc, CloudProvider::Aws, "vm_groups").unwrap();
        assert_eq!(selected, yaml("{vm_spec: {machine_type: m6i.xlarge}, disk_count: 2}"));

        let err = select_provider(&doc, CloudProvider::Azure, "vm_groups").unwrap_err();
        assert!(err.contains("vm_groups.vm_spec"));
    }

    #[test]
    fn test_variant_detection() {
        assert!(is_provider_variant(yaml("{GCP: 1, Azure: 2}").as_mapping().unwrap()));
        assert!(!is_provider_variant(yaml("{GCP: 1, zone: a}").as_mapping().unwrap()));
        assert!(!is_provider_variant(&Mapping::new()));
    }
}
