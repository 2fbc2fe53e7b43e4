//! Domain error types for mirror document handling.

use thiserror::Error;

/// Validation and rendering failures for mirror documents.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorDomainError {
    /// A mirror document template failed to render.
    #[error("template '{template}' failed to render: {reason}")]
    TemplateRender {
        /// Which template failed.
        template: String,
        /// Render failure detail from the template engine.
        reason: String,
    },
}
