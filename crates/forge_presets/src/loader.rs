//! Preset loading from files and directories.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{PresetError, PresetResult};
use crate::registry::PresetRegistry;

/// Preset loader.
pub struct PresetLoader {
    presets_path: PathBuf,
}

impl PresetLoader {
    /// Create a loader rooted at a presets directory.
    pub fn new(presets_path: impl Into<PathBuf>) -> Self {
        Self {
            presets_path: presets_path.into(),
        }
    }

    /// Load a single preset file.
    pub fn load_file(path: impl AsRef<Path>) -> PresetResult<PresetRegistry> {
        let mut registry = PresetRegistry::new();
        Self::add_file(&mut registry, path.as_ref())?;
        Ok(registry)
    }

    fn add_file(registry: &mut PresetRegistry, path: &Path) -> PresetResult<usize> {
        debug!("Loading presets from {:?}", path);
        let content = fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        registry.add_yaml_str(&content, &path.display().to_string())
    }

    /// Load every `*.yml` and `*.yaml` file in the presets directory.
    ///
    /// Files are read in sorted path order, so when two files declare the
    /// same preset the one sorting last wins.
    pub fn load_all(&self) -> PresetResult<PresetRegistry> {
        let mut registry = PresetRegistry::new();

        if !self.presets_path.exists() {
            warn!("Presets directory does not exist: {:?}", self.presets_path);
            return Ok(registry);
        }

        let files = self.preset_files()?;
        for path in &files {
            Self::add_file(&mut registry, path)?;
        }

        info!(
            "Loaded {} preset(s) from {} file(s) in {:?}",
            registry.len(),
            files.len(),
            self.presets_path
        );
        Ok(registry)
    }

    /// Preset files in the directory, sorted.
    pub fn preset_files(&self) -> PresetResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for ext in ["yml", "yaml"] {
            let pattern = self.presets_path.join(format!("*.{}", ext));
            let pattern = pattern.to_string_lossy();
            for entry in glob::glob(&pattern)? {
                match entry {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable preset path: {}", e),
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_loader_missing_dir() {
        let temp = tempdir().unwrap();
        let loader = PresetLoader::new(temp.path().join("absent"));
        assert!(loader.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_later_file_wins() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.yaml"), "p:\n  name: from_a\n").unwrap();
        fs::write(temp.path().join("b.yml"), "p:\n  name: from_b\nq:\n  name: only_b\n").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let registry = PresetLoader::new(temp.path()).load_all().unwrap();
        assert_eq!(registry.names(), vec!["p", "q"]);
        assert_eq!(registry.resolve("p").unwrap().benchmark, "from_b");
    }

    #[test]
    fn test_yaml_error_names_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.yaml");
        fs::write(&path, "p: [unclosed\n").unwrap();
        let err = PresetLoader::load_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}
