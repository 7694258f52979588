//! Writing rendered artifacts to disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ArtifactError, ArtifactResult};
use crate::renderer::RenderedArtifact;

/// Prefix of files created by [`ArtifactEmitter::emit_temp`].
pub const TEMP_PREFIX: &str = "forge-";

/// Writes artifacts, optionally echoing their full text to the log.
#[derive(Debug, Clone, Default)]
pub struct ArtifactEmitter {
    log_contents: bool,
}

impl ArtifactEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_contents(mut self, enabled: bool) -> Self {
        self.log_contents = enabled;
        self
    }

    /// Write `artifact` to `path`, creating parent directories.
    pub fn emit(&self, artifact: &RenderedArtifact, path: impl AsRef<Path>) -> ArtifactResult<PathBuf> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        fs::write(path, &artifact.content).map_err(|source| io_error(path, source))?;
        self.record(artifact, path);
        Ok(path.to_path_buf())
    }

    /// Write `artifact` under `dir` using its default file name.
    pub fn emit_to_dir(&self, artifact: &RenderedArtifact, dir: impl AsRef<Path>) -> ArtifactResult<PathBuf> {
        self.emit(artifact, dir.as_ref().join(&artifact.file_name))
    }

    /// Write `artifact` to a new uniquely named file in `dir`.
    ///
    /// The file is kept after return; removing it is the caller's job.
    pub fn emit_temp(&self, artifact: &RenderedArtifact, dir: impl AsRef<Path>) -> ArtifactResult<PathBuf> {
        let dir = dir.as_ref();
        let prefix = format!("{}{}", TEMP_PREFIX, artifact.file_name);
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile_in(dir)
            .map_err(|source| io_error(dir, source))?;
        file.write_all(artifact.content.as_bytes())
            .map_err(|source| io_error(file.path(), source))?;

        let (_, path) = file.keep().map_err(|e| io_error(dir, e.error))?;
        self.record(artifact, &path);
        Ok(path)
    }

    fn record(&self, artifact: &RenderedArtifact, path: &Path) {
        info!("Wrote {} to {:?}", artifact.kind, path);
        if self.log_contents {
            info!("Contents of {:?}:\n{}", path, artifact.content);
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}
