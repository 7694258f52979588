//! `forge.toml` configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use forge_presets::CloudProvider;
use forge_templates::TemplateOptions;

/// Configuration file looked up in the current directory.
pub const CONFIG_FILE: &str = "forge.toml";

/// A command-line value that could not be interpreted.
#[derive(Error, Debug)]
#[error("Invalid argument: {0}")]
pub struct ArgumentError(pub String);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    /// Directory scanned for `*.yml`/`*.yaml` preset files.
    pub presets_dir: PathBuf,
    /// Directory of user templates; bundled templates fill the gaps.
    pub templates_dir: Option<PathBuf>,
    /// Base for relative output paths and temp files.
    pub output_dir: PathBuf,
    /// Provider used when `--cloud` is not given.
    pub default_cloud: Option<String>,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub strict: bool,
    pub trim_blocks: bool,
    pub lstrip_blocks: bool,
    pub keep_trailing_newline: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            presets_dir: PathBuf::from("presets"),
            templates_dir: None,
            output_dir: PathBuf::from("."),
            default_cloud: None,
            render: RenderConfig::default(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strict: true,
            trim_blocks: false,
            lstrip_blocks: false,
            keep_trailing_newline: false,
        }
    }
}

impl ForgeConfig {
    /// Load `explicit` if given, else `forge.toml` in the current directory
    /// if present, else defaults. An explicit path that does not exist is
    /// an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    debug!("No {} found, using defaults", CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&source)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Pick the provider from the command line, falling back to the file.
    pub fn cloud(&self, flag: Option<CloudProvider>) -> Result<Option<CloudProvider>> {
        if flag.is_some() {
            return Ok(flag);
        }
        self.default_cloud
            .as_deref()
            .map(|name| name.parse::<CloudProvider>())
            .transpose()
            .context("Invalid default_cloud in config")
    }

    pub fn template_options(&self) -> TemplateOptions {
        let mut options = TemplateOptions::new().keep_trailing_newline(self.render.keep_trailing_newline);
        if !self.render.strict {
            options = options.lenient();
        }
        options.whitespace.trim_blocks = self.render.trim_blocks;
        options.whitespace.lstrip_blocks = self.render.lstrip_blocks;
        options
    }

    /// Resolve a relative output path against `output_dir`.
    pub fn output_path(&self, path: &Path) -> PathBuf {
        self.output_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_templates::UndefinedPolicy;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = ForgeConfig::default();
        assert_eq!(config.presets_dir, PathBuf::from("presets"));
        assert_eq!(config.template_options(), TemplateOptions::new());
        assert_eq!(config.cloud(None).unwrap(), None);
    }

    #[test]
    fn test_partial_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
presets_dir = "configs/presets"
default_cloud = "aws"

[render]
strict = false
trim_blocks = true
"#,
        )
        .unwrap();

        let config = ForgeConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.presets_dir, PathBuf::from("configs/presets"));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.cloud(None).unwrap(), Some(CloudProvider::Aws));
        assert_eq!(
            config.cloud(Some(CloudProvider::Gcp)).unwrap(),
            Some(CloudProvider::Gcp)
        );

        let options = config.template_options();
        assert_eq!(options.undefined, UndefinedPolicy::Lenient);
        assert!(options.whitespace.trim_blocks);
        assert!(!options.whitespace.lstrip_blocks);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "preset_dir = \"typo\"\n").unwrap();
        assert!(ForgeConfig::load(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp = tempdir().unwrap();
        assert!(ForgeConfig::load(Some(temp.path().join("absent.toml").as_path())).is_err());
    }
}
