//! # forge_presets
//!
//! Named benchmark presets for benchforge.
//!
//! A preset file is a YAML mapping from preset name to a block holding the
//! benchmark `name`, a `flags` bundle and optional resource sections such as
//! `vm_groups`, `relational_db` or `dpb_service`. Blocks share structure
//! through YAML anchors and `<<` merge keys, and resource specs may branch
//! per cloud provider (`GCP`, `AWS`, `Azure`).
//!
//! Resolution is explicit and two-pass: loading records each name's raw
//! block, and [`PresetRegistry::resolve`] later expands merge keys
//! (base fields first, then the block's own fields, per key) into an
//! immutable [`ResolvedPreset`].
//!
//! ## Example
//!
//! ```rust
//! use forge_presets::{CloudProvider, PresetRegistry};
//!
//! let registry = PresetRegistry::from_yaml_str(r#"
//! fio_base: &fio_base
//!   name: fio
//!   flags: {fio_runtime: 60}
//!   vm_groups:
//!     default:
//!       vm_spec:
//!         GCP: {machine_type: n2-standard-8}
//!         AWS: {machine_type: m6i.2xlarge}
//! fio_long:
//!   <<: *fio_base
//!   flags: {fio_runtime: 600}
//! "#).unwrap();
//!
//! let preset = registry.resolve_for("fio_long", CloudProvider::Gcp).unwrap();
//! assert_eq!(preset.benchmark, "fio");
//! ```

pub mod error;
pub mod loader;
pub mod merge;
pub mod preset;
pub mod provider;
pub mod registry;

pub use error::{PresetError, PresetResult};
pub use loader::PresetLoader;
pub use preset::{parse_flag_override, ResolvedPreset};
pub use provider::CloudProvider;
pub use registry::PresetRegistry;
