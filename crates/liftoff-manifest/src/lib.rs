//! Cloud Run service descriptors for liftoff.
//!
//! # Strategies
//!
//! ```text
//! DescriptorStrategy::render(config, image) -> YAML
//!   StructuredDescriptor ── typed ServiceDescriptor → serde_yaml
//!   TemplateDescriptor   ── ${NAME} text replacement over a user template
//! ```
//!
//! Both produce a `serving.knative.dev/v1` Service document for
//! `gcloud run services replace`. Secrets are always bound by name and the
//! `latest` version alias, never by value.
//!
//! [`select`] picks the template strategy when `DESCRIPTOR_TEMPLATE` is set
//! and the structured one otherwise.

pub mod descriptor;
pub mod template;

use std::path::PathBuf;

use liftoff_core::{DeploymentConfig, ImageReference};

pub use descriptor::{ServiceDescriptor, StructuredDescriptor};
pub use template::TemplateDescriptor;

/// Turns a configuration and an image into a descriptor document.
pub trait DescriptorStrategy {
    /// Short label used in status output.
    fn name(&self) -> &'static str;

    fn render(
        &self,
        config: &DeploymentConfig,
        image: &ImageReference,
    ) -> Result<String, DescriptorError>;
}

/// Choose the strategy configured for this invocation.
pub fn select(config: &DeploymentConfig) -> Result<Box<dyn DescriptorStrategy>, DescriptorError> {
    match &config.descriptor_template {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using descriptor template");
            Ok(Box::new(TemplateDescriptor::load(path)?))
        }
        None => Ok(Box::new(StructuredDescriptor)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("failed to serialize service descriptor")]
    Serialize { source: serde_yaml::Error },

    #[error("failed to read descriptor template {path}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("descriptor template has unresolved placeholders: {}", names.join(", "))]
    UnresolvedPlaceholders { names: Vec<String> },

    #[error("rendered descriptor contains a value that looks like a credential")]
    SuspectedSecret,

    #[error("rendered descriptor is not valid YAML")]
    InvalidYaml { source: serde_yaml::Error },

    #[error("descriptor kind is '{kind}', expected 'Service'")]
    NotAService { kind: String },

    #[error("descriptor names service '{found}' but SERVICE_NAME is '{expected}'")]
    NameMismatch { expected: String, found: String },
}

impl DescriptorError {
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Serialize { .. } => "this is a bug in liftoff; please report it",
            Self::TemplateRead { .. } => "check DESCRIPTOR_TEMPLATE points at a readable file",
            Self::UnresolvedPlaceholders { .. } => {
                "set the matching keys (e.g. SERVICE_ACCOUNT) or remove the placeholders from the template"
            }
            Self::SuspectedSecret => {
                "reference credentials through Secret Manager (valueFrom.secretKeyRef) instead of inline values"
            }
            Self::InvalidYaml { .. } | Self::NotAService { .. } => {
                "the template must be a serving.knative.dev/v1 Service document"
            }
            Self::NameMismatch { .. } => "use ${SERVICE_NAME} for metadata.name in the template",
        }
    }
}
