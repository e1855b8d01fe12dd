use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use liftoff_core::{DeploymentConfig, ImageReference, SecretRef, looks_like_secret};
use regex::Regex;

use crate::{DescriptorError, DescriptorStrategy};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid"));

/// Renders a user-supplied descriptor by literal `${NAME}` replacement.
///
/// The rendered text is submitted verbatim, so templates may carry fields
/// the structured builder does not know about (probes, extra annotations).
#[derive(Debug, Clone)]
pub struct TemplateDescriptor {
    template: String,
}

impl TemplateDescriptor {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let template =
            std::fs::read_to_string(path).map_err(|e| DescriptorError::TemplateRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self { template })
    }

    /// Substitute known placeholders in a single pass; unknown ones are
    /// left in place. Substituted values are never expanded again.
    pub fn substitute(&self, config: &DeploymentConfig, image: &ImageReference) -> String {
        self.expand(&placeholders(config, image)).0
    }

    /// Rendered text plus the placeholder names that had no value.
    fn expand(&self, values: &BTreeMap<&'static str, String>) -> (String, Vec<String>) {
        let mut unresolved = Vec::new();
        let rendered = PLACEHOLDER.replace_all(&self.template, |caps: &regex::Captures<'_>| {
            match values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    unresolved.push(caps[1].to_owned());
                    caps[0].to_owned()
                }
            }
        });
        (rendered.into_owned(), unresolved)
    }
}

impl DescriptorStrategy for TemplateDescriptor {
    fn name(&self) -> &'static str {
        "template"
    }

    fn render(
        &self,
        config: &DeploymentConfig,
        image: &ImageReference,
    ) -> Result<String, DescriptorError> {
        let (rendered, mut unresolved) = self.expand(&placeholders(config, image));
        if !unresolved.is_empty() {
            unresolved.sort();
            unresolved.dedup();
            return Err(DescriptorError::UnresolvedPlaceholders { names: unresolved });
        }

        if looks_like_secret(&rendered) {
            return Err(DescriptorError::SuspectedSecret);
        }

        check_identity(&rendered, &config.service_name)?;
        Ok(rendered)
    }
}

/// Values available to templates. `SERVICE_ACCOUNT` and `TAG` are only
/// offered when known, so a template that needs them fails loudly.
fn placeholders(config: &DeploymentConfig, image: &ImageReference) -> BTreeMap<&'static str, String> {
    let mut values = BTreeMap::from([
        ("IMAGE", image.to_string()),
        ("SERVICE_NAME", config.service_name.clone()),
        ("PROJECT_ID", config.project_id.clone()),
        ("REGION", config.region.clone()),
        ("MEMORY", config.memory.clone()),
        ("CPU", config.cpu.clone()),
        ("CONCURRENCY", config.concurrency.to_string()),
        ("TIMEOUT", config.timeout_seconds.to_string()),
        ("MIN_INSTANCES", config.min_instances.to_string()),
        ("MAX_INSTANCES", config.max_instances.to_string()),
        ("PORT", config.port.to_string()),
        ("INGRESS", config.ingress.annotation().to_owned()),
        ("ALLOW_UNAUTHENTICATED", config.allow_unauthenticated.to_string()),
        ("SECRET_NAME", config.secret.name.clone()),
        ("SECRET_ENV_VAR", config.secret.env_var.clone()),
        ("SECRET_VERSION", SecretRef::VERSION.to_owned()),
        ("ENVIRONMENT", config.environment.clone()),
    ]);
    if let Some(sa) = &config.service_account {
        values.insert("SERVICE_ACCOUNT", sa.clone());
    }
    if let Some(tag) = image.tag() {
        values.insert("TAG", tag.to_owned());
    }
    values
}

fn check_identity(rendered: &str, service_name: &str) -> Result<(), DescriptorError> {
    let doc: serde_yaml::Value =
        serde_yaml::from_str(rendered).map_err(|e| DescriptorError::InvalidYaml { source: e })?;

    let kind = doc.get("kind").and_then(|k| k.as_str()).unwrap_or_default();
    if kind != crate::descriptor::KIND {
        return Err(DescriptorError::NotAService {
            kind: kind.to_owned(),
        });
    }

    let name = doc
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or_default();
    if name != service_name {
        return Err(DescriptorError::NameMismatch {
            expected: service_name.to_owned(),
            found: name.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_check_reads_nested_name() {
        let yaml = "apiVersion: serving.knative.dev/v1\nkind: Service\nmetadata:\n  name: api\n";
        assert!(check_identity(yaml, "api").is_ok());
    }

    #[test]
    fn identity_check_rejects_other_kinds() {
        let yaml = "kind: Job\nmetadata:\n  name: api\n";
        assert!(matches!(
            check_identity(yaml, "api"),
            Err(DescriptorError::NotAService { ref kind }) if kind == "Job"
        ));
    }

    #[test]
    fn identity_check_rejects_missing_name() {
        let yaml = "kind: Service\n";
        assert!(matches!(
            check_identity(yaml, "api"),
            Err(DescriptorError::NameMismatch { ref found, .. }) if found.is_empty()
        ));
    }
}
