//! Integration tests for template rendering.

use std::fs;
use std::sync::Arc;
use std::thread;

use forge_templates::{Context, Template, TemplateError, TemplateOptions, TemplateSet, UndefinedPolicy};
use tempfile::tempdir;

const SERVICE: &str = r#"apiVersion: v1
kind: Service
metadata:
  name: {{ name }}
spec:
  ports:
  {%- for port in ports %}
  - port: {{ port }}
  {%- endfor %}
  {%- if session_affinity is defined %}
  sessionAffinity: {{ session_affinity }}
  {%- endif %}
"#;

fn service_context() -> Context {
    Context::from_yaml_str("name: web\nports: [80, 443]\n").unwrap()
}

#[test]
fn test_dash_markers_leave_no_blank_lines() {
    let template = Template::parse("service.yaml.j2", SERVICE, TemplateOptions::new()).unwrap();
    let out = template.render(&service_context()).unwrap();
    assert_eq!(
        out,
        "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\nspec:\n  ports:\n  - port: 80\n  - port: 443"
    );
}

#[test]
fn test_defined_key_with_empty_value_renders() {
    let template = Template::parse("service.yaml.j2", SERVICE, TemplateOptions::new()).unwrap();
    let mut ctx = service_context();
    ctx.insert("session_affinity", "");
    let out = template.render(&ctx).unwrap();
    assert!(out.ends_with("\n  sessionAffinity: "));
}

#[test]
fn test_trim_spaces_matches_block_layout() {
    let src = "items:\n{% for x in xs %}\n  - {{ x }}\n{% endfor %}\ndone\n";
    let template = Template::parse("list.j2", src, TemplateOptions::new().trim_spaces(true)).unwrap();
    let ctx = Context::from_yaml_str("xs: [a, b]").unwrap();
    assert_eq!(template.render(&ctx).unwrap(), "items:\n  - a\n  - b\ndone");
}

#[test]
fn test_policy_override_at_render() {
    let template = Template::parse("t.j2", "value={{ missing }}", TemplateOptions::new()).unwrap();
    assert!(matches!(
        template.render(&Context::new()),
        Err(TemplateError::UndefinedVariable { .. })
    ));
    assert_eq!(
        template.render_with(&Context::new(), UndefinedPolicy::Lenient).unwrap(),
        "value="
    );
}

#[test]
fn test_shared_template_renders_identically_across_threads() {
    let template = Arc::new(Template::parse("service.yaml.j2", SERVICE, TemplateOptions::new()).unwrap());
    let expected = template.render(&service_context()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let template = Arc::clone(&template);
            thread::spawn(move || template.render(&service_context()).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_template_set_from_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("container")).unwrap();
    fs::write(dir.path().join("container/service.yaml.j2"), SERVICE).unwrap();

    let set = TemplateSet::load_dir(dir.path(), TemplateOptions::new()).unwrap();
    assert!(set.contains("container/service.yaml.j2"));
    let out = set.render("container/service.yaml.j2", &service_context()).unwrap();
    assert!(out.contains("name: web"));
    assert!(matches!(
        set.render("container/missing.yaml.j2", &service_context()),
        Err(TemplateError::NotFound(_))
    ));
}
