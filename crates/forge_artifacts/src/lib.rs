//! Benchmark configuration artifacts.
//!
//! The templates for every [`ArtifactKind`] ship inside the binary. Contexts
//! come from typed structs such as [`FioJobSpec`], from resolved presets, or
//! from plain [`Context`](forge_templates::Context) values.
//!
//! ```
//! use forge_artifacts::{ArtifactRenderer, DeploymentSpec};
//!
//! let renderer = ArtifactRenderer::new().unwrap();
//! let spec = DeploymentSpec::new("memtier", "redislabs/memtier_benchmark:2.0");
//! let artifact = renderer.render_spec(&spec).unwrap();
//! assert!(artifact.content.contains("replicas: 1"));
//! assert!(!artifact.content.contains("nvidia.com/gpu"));
//! ```

pub mod emitter;
pub mod error;
pub mod kind;
pub mod model;
pub mod preset;
pub mod renderer;

pub use emitter::{ArtifactEmitter, TEMP_PREFIX};
pub use error::{ArtifactError, ArtifactResult};
pub use kind::ArtifactKind;
pub use model::{ArtifactSpec, DeploymentSpec, DiskPair, FioJobSpec, FioScenario, SlurmBlueprintSpec};
pub use preset::preset_context;
pub use renderer::{ArtifactRenderer, RenderedArtifact};
