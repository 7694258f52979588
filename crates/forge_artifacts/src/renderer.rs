//! Rendering artifacts from the bundled templates.

use std::path::Path;

use forge_presets::ResolvedPreset;
use forge_templates::{Context, TemplateOptions, TemplateSet};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ArtifactResult;
use crate::kind::ArtifactKind;
use crate::model::ArtifactSpec;
use crate::preset::preset_context;

/// Rendered artifact text, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedArtifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub content: String,
}

/// Renders artifact kinds from a template set seeded with the bundled
/// templates.
#[derive(Debug, Clone)]
pub struct ArtifactRenderer {
    templates: TemplateSet,
}

impl ArtifactRenderer {
    /// Renderer over the bundled templates with strict undefined handling.
    pub fn new() -> ArtifactResult<Self> {
        Self::with_options(TemplateOptions::new())
    }

    pub fn with_options(options: TemplateOptions) -> ArtifactResult<Self> {
        let mut templates = TemplateSet::new(options);
        add_bundled(&mut templates)?;
        Ok(Self { templates })
    }

    /// Renderer over the templates under `dir`. A file whose name matches a
    /// bundled template replaces it; bundled templates fill the rest.
    pub fn with_overrides(dir: impl AsRef<Path>, options: TemplateOptions) -> ArtifactResult<Self> {
        let dir = dir.as_ref();
        let mut templates = TemplateSet::load_dir(dir, options)?;
        for kind in ArtifactKind::all() {
            if templates.contains(kind.template_name()) {
                info!("Using {} from {:?}", kind.template_name(), dir);
            }
        }
        add_bundled(&mut templates)?;
        Ok(Self { templates })
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn render(&self, kind: ArtifactKind, context: &Context) -> ArtifactResult<RenderedArtifact> {
        debug!("Rendering {} with {} variable(s)", kind, context.len());
        let content = self.templates.render(kind.template_name(), context)?;
        Ok(RenderedArtifact {
            kind,
            file_name: kind.default_file_name().to_string(),
            content,
        })
    }

    /// Render from a typed context.
    pub fn render_spec<S: ArtifactSpec>(&self, spec: &S) -> ArtifactResult<RenderedArtifact> {
        let context = Context::from_serialize(spec)?;
        self.render(S::KIND, &context)
    }

    /// Render from a resolved preset, with `extra` layered on top.
    pub fn render_preset(
        &self,
        kind: ArtifactKind,
        preset: &ResolvedPreset,
        extra: Context,
    ) -> ArtifactResult<RenderedArtifact> {
        let mut context = preset_context(preset);
        context.extend(extra);
        self.render(kind, &context)
    }
}

fn add_bundled(templates: &mut TemplateSet) -> ArtifactResult<()> {
    for kind in ArtifactKind::all() {
        if !templates.contains(kind.template_name()) {
            templates.add(kind.template_name(), kind.source())?;
        }
    }
    Ok(())
}
