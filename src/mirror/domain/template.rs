//! Deterministic mirror document rendering.

use super::{
    error::MirrorDomainError,
    marker::{render_body_marker, render_title_marker},
};
use crate::issue::domain::CanonicalId;
use minijinja::Environment;
use serde::Serialize;

const DEFAULT_TITLE_TEMPLATE: &str = "{{ summary }}";
const DEFAULT_BODY_TEMPLATE: &str = "\
{{ details }}

---
This issue mirrors canonical record `{{ canonical_id }}` and is managed \
automatically. Lifecycle state lives in the canonical record; edits here \
are not read back.";

/// Values interpolated into a mirror document template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorContext {
    /// Canonical identifier the document mirrors.
    pub canonical_id: String,
    /// One-line summary used for the title.
    pub summary: String,
    /// Long-form details used for the body.
    pub details: String,
}

impl MirrorContext {
    /// Creates a template context for a canonical identifier.
    #[must_use]
    pub fn new(
        canonical_id: &CanonicalId,
        summary: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            canonical_id: canonical_id.as_str().to_owned(),
            summary: summary.into(),
            details: details.into(),
        }
    }
}

/// A rendered, marker-bearing mirror document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorDocument {
    title: String,
    body: String,
}

impl MirrorDocument {
    /// Returns the marker-bearing title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the marker-bearing body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Template pair producing mirror documents.
///
/// Rendering interpolates the context into the title and body templates,
/// then stamps both canonical identifier markers so the resolver can find
/// the artifact later. Rendering is deterministic and performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTemplate {
    title_template: String,
    body_template: String,
}

impl MirrorTemplate {
    /// Creates a template pair from raw template strings.
    #[must_use]
    pub fn new(title_template: impl Into<String>, body_template: impl Into<String>) -> Self {
        Self {
            title_template: title_template.into(),
            body_template: body_template.into(),
        }
    }

    /// Renders a mirror document for the given context.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorDomainError::TemplateRender`] when either template
    /// fails to render.
    pub fn render(
        &self,
        canonical_id: &CanonicalId,
        context: &MirrorContext,
    ) -> Result<MirrorDocument, MirrorDomainError> {
        let title = render_fragment("title", &self.title_template, context)?;
        let body = render_fragment("body", &self.body_template, context)?;
        Ok(MirrorDocument {
            title: render_title_marker(canonical_id, &title),
            body: render_body_marker(canonical_id, &body),
        })
    }
}

impl Default for MirrorTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_TEMPLATE, DEFAULT_BODY_TEMPLATE)
    }
}

fn render_fragment(
    name: &str,
    template: &str,
    context: &MirrorContext,
) -> Result<String, MirrorDomainError> {
    let environment = Environment::new();
    environment
        .render_str(template, context)
        .map_err(|error| MirrorDomainError::TemplateRender {
            template: name.to_owned(),
            reason: error.to_string(),
        })
}
