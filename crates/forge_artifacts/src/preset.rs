//! Turning resolved presets into render contexts.

use forge_presets::ResolvedPreset;
use forge_templates::{Context, Value};

/// Build a context from a resolved preset.
///
/// Every section and every flag becomes a top-level variable, flags last so
/// they win over a section of the same name. The preset itself is also
/// exposed as `preset_name`, `benchmark`, `flags`, `cloud` when a provider
/// was selected, and `preset` holding the whole resolved block.
pub fn preset_context(preset: &ResolvedPreset) -> Context {
    let mut context = Context::new();

    for (key, value) in preset.sections.iter().chain(preset.flags.iter()) {
        if let Some(key) = key.as_str() {
            context.insert(key, Value::from(value.clone()));
        }
    }

    context.insert("preset_name", preset.preset.as_str());
    context.insert("benchmark", preset.benchmark.as_str());
    context.insert(
        "flags",
        Value::from(serde_yaml::Value::Mapping(preset.flags.clone())),
    );
    if let Some(provider) = preset.provider {
        context.insert("cloud", provider.as_str());
    }
    context.insert("preset", Value::from(preset.to_value()));
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_presets::{CloudProvider, PresetRegistry};

    const PRESETS: &str = r#"
pgbench_base: &pgbench_base
  name: pgbench
  flags:
    pgbench_seconds_per_test: 60
  relational_db:
    engine: postgres
    db_spec:
      GCP:
        machine_type: db-custom-4-16384
      AWS:
        machine_type: db.m5.xlarge
      Azure:
        machine_type: GP_Gen5_4
"#;

    #[test]
    fn test_flags_and_sections_exposed() {
        let registry = PresetRegistry::from_yaml_str(PRESETS).unwrap();
        let preset = registry.resolve_for("pgbench_base", CloudProvider::Aws).unwrap();
        let ctx = preset_context(&preset);

        assert_eq!(ctx.get("pgbench_seconds_per_test"), Some(&Value::Int(60)));
        assert_eq!(ctx.get("benchmark"), Some(&Value::from("pgbench")));
        assert_eq!(ctx.get("cloud"), Some(&Value::from("AWS")));
        assert_eq!(
            ctx.get("relational_db")
                .unwrap()
                .get("db_spec")
                .get("machine_type"),
            Value::from("db.m5.xlarge")
        );
    }

    #[test]
    fn test_no_cloud_without_provider() {
        let registry = PresetRegistry::from_yaml_str(PRESETS).unwrap();
        let preset = registry.resolve("pgbench_base").unwrap();
        assert!(!preset_context(&preset).contains("cloud"));
    }
}
