//! Named template collections.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::context::Context;
use crate::error::{TemplateError, TemplateResult};
use crate::renderer::{Template, TemplateOptions};

/// File extension marking a template.
pub const TEMPLATE_EXTENSION: &str = "j2";

/// A set of parsed templates addressed by name.
///
/// Names loaded from a directory are paths relative to its root with `/`
/// separators, e.g. `container/deployment.yaml.j2`. Every template is parsed
/// on insertion, so a set that loaded successfully has no syntax errors.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, Arc<Template>>,
    options: TemplateOptions,
}

impl TemplateSet {
    pub fn new(options: TemplateOptions) -> Self {
        Self {
            templates: BTreeMap::new(),
            options,
        }
    }

    /// Load every `*.j2` file under `root`.
    pub fn load_dir(root: impl AsRef<Path>, options: TemplateOptions) -> TemplateResult<Self> {
        let root = root.as_ref();
        let mut set = Self::new(options);

        if !root.exists() {
            warn!("Templates directory does not exist: {:?}", root);
            return Ok(set);
        }

        for entry in WalkDir::new(root).sort_by_file_name().into_iter() {
            let entry = entry.map_err(|e| TemplateError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
                source: e.into(),
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != TEMPLATE_EXTENSION) {
                continue;
            }
            let name = template_name(root, path);
            set.add_file(name, path)?;
        }

        info!("Loaded {} template(s) from {:?}", set.len(), root);
        Ok(set)
    }

    /// Parse and register a template from source text.
    pub fn add(&mut self, name: impl Into<String>, source: &str) -> TemplateResult<()> {
        let name = name.into();
        let template = Template::parse(name.clone(), source, self.options)?;
        if self.templates.insert(name.clone(), Arc::new(template)).is_some() {
            debug!("Replaced template: {}", name);
        }
        Ok(())
    }

    /// Parse and register a template read from disk.
    pub fn add_file(&mut self, name: impl Into<String>, path: &Path) -> TemplateResult<()> {
        debug!("Loading template from {:?}", path);
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.add(name, &source)
    }

    pub fn get(&self, name: &str) -> TemplateResult<Arc<Template>> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn options(&self) -> TemplateOptions {
        self.options
    }

    /// Render a named template.
    pub fn render(&self, name: &str, context: &Context) -> TemplateResult<String> {
        self.get(name)?.render(context)
    }

    /// Parse every template file under `root` without stopping at the first
    /// failure. Returns one entry per file that failed.
    pub fn check_dir(root: impl AsRef<Path>, options: TemplateOptions) -> Vec<(PathBuf, TemplateError)> {
        let root = root.as_ref();
        let mut failures = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != TEMPLATE_EXTENSION) {
                continue;
            }
            let mut scratch = Self::new(options);
            if let Err(e) = scratch.add_file(template_name(root, path), path) {
                failures.push((path.to_path_buf(), e));
            }
        }
        failures
    }
}

fn template_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_loader_empty_dir() {
        let temp = tempdir().unwrap();
        let set = TemplateSet::load_dir(temp.path(), TemplateOptions::new()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_nested_names() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("container")).unwrap();
        fs::write(temp.path().join("container/app.yaml.j2"), "name: {{ name }}\n").unwrap();
        fs::write(temp.path().join("README.md"), "not a template").unwrap();

        let set = TemplateSet::load_dir(temp.path(), TemplateOptions::new()).unwrap();
        assert_eq!(set.names(), vec!["container/app.yaml.j2"]);
        let ctx = Context::new().with("name", "web");
        assert_eq!(set.render("container/app.yaml.j2", &ctx).unwrap(), "name: web");
    }

    #[test]
    fn test_unknown_template() {
        let set = TemplateSet::default();
        assert!(matches!(set.get("nope.j2"), Err(TemplateError::NotFound(_))));
    }

    #[test]
    fn test_syntax_error_fails_load() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("bad.j2"), "{% if x %}never closed").unwrap();
        fs::write(temp.path().join("good.j2"), "fine").unwrap();

        let err = TemplateSet::load_dir(temp.path(), TemplateOptions::new()).unwrap_err();
        assert!(err.is_syntax());

        let failures = TemplateSet::check_dir(temp.path(), TemplateOptions::new());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].0.ends_with("bad.j2"));
    }
}
