//! Render command - Render a template with a YAML context.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use forge_templates::{Context, Template, TemplateOptions, TemplateSet};

use super::parse_vars;
use crate::config::ForgeConfig;

#[derive(Args)]
pub struct RenderArgs {
    /// Template file, or a template name when --templates-dir is given
    template: String,

    /// Look the template up by name in this directory
    #[arg(long)]
    templates_dir: Option<PathBuf>,

    /// YAML file holding the render context
    #[arg(short, long)]
    context: Option<PathBuf>,

    /// Set a context variable (KEY=VALUE, repeatable, wins over --context)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,

    /// Render undefined variables as empty strings
    #[arg(long)]
    lenient: bool,

    /// Enable trim_blocks and lstrip_blocks
    #[arg(long)]
    trim_blocks: bool,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

pub async fn execute(args: RenderArgs, config: &ForgeConfig) -> Result<()> {
    let options = options(&args, config);
    let context = build_context(args.context.as_deref(), &args.vars)?;

    let rendered = match &args.templates_dir {
        Some(dir) => {
            let set = TemplateSet::load_dir(dir, options)
                .with_context(|| format!("Failed to load templates from {:?}", dir))?;
            set.render(&args.template, &context)
        }
        None => render_file(Path::new(&args.template), options, &context),
    }
    .with_context(|| format!("Failed to render template {}", args.template))?;

    match &args.out {
        Some(out) => {
            let path = config.output_path(out);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &rendered).with_context(|| format!("Failed to write {:?}", path))?;
            info!("Wrote {:?}", path);
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn options(args: &RenderArgs, config: &ForgeConfig) -> TemplateOptions {
    let mut options = config.template_options();
    if args.lenient {
        options = options.lenient();
    }
    if args.trim_blocks {
        options = options.trim_spaces(true);
    }
    options
}

/// Read `--context` then layer `--var` values over it.
pub fn build_context(file: Option<&Path>, vars: &[String]) -> Result<Context> {
    let mut context = match file {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read context file {:?}", path))?;
            Context::from_yaml_str(&source)
                .with_context(|| format!("Invalid context file {:?}", path))?
        }
        None => Context::new(),
    };
    context.extend(parse_vars(vars)?);
    Ok(context)
}

fn render_file(path: &Path, options: TemplateOptions, context: &Context) -> forge_templates::TemplateResult<String> {
    let source = fs::read_to_string(path).map_err(|source| forge_templates::TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path.to_string_lossy();
    Template::parse(name, &source, options)?.render(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_build_context_vars_override_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("ctx.yaml");
        fs::write(&file, "Name: web\nReplicas: 1\nlabels: [a, b]\n").unwrap();

        let ctx = build_context(Some(file.as_path()), &["Replicas=4".into()]).unwrap();
        assert_eq!(ctx.get("Name"), Some(&forge_templates::Value::from("web")));
        assert_eq!(ctx.get("Replicas"), Some(&forge_templates::Value::Int(4)));
        assert_eq!(ctx.get("labels").and_then(|v| v.len()), Some(2));
    }

    #[tokio::test]
    async fn test_render_file_to_out() {
        let temp = tempdir().unwrap();
        let template = temp.path().join("motd.j2");
        fs::write(&template, "{% for u in users %}hi {{ u }}\n{% endfor %}").unwrap();
        let context = temp.path().join("ctx.yaml");
        fs::write(&context, "users: [ana, bo]\n").unwrap();
        let out = temp.path().join("out/motd.txt");

        let args = RenderArgs {
            template: template.to_string_lossy().to_string(),
            templates_dir: None,
            context: Some(context),
            vars: vec![],
            lenient: false,
            trim_blocks: false,
            out: Some(out.clone()),
        };
        execute(args, &ForgeConfig::default()).await.unwrap();
        assert_eq!(fs::read_to_string(out).unwrap(), "hi ana\nhi bo\n");
    }

    #[tokio::test]
    async fn test_strict_undefined_fails() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("t.j2"), "{{ missing }}").unwrap();

        let args = RenderArgs {
            template: "t.j2".into(),
            templates_dir: Some(temp.path().to_path_buf()),
            context: None,
            vars: vec![],
            lenient: false,
            trim_blocks: false,
            out: None,
        };
        let err = execute(args, &ForgeConfig::default()).await.unwrap_err();
        assert!(err.downcast_ref::<forge_templates::TemplateError>().is_some());
    }
}
