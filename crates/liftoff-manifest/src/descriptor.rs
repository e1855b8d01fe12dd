//! Knative `serving.knative.dev/v1` Service document accepted by
//! `gcloud run services replace`.

use std::collections::BTreeMap;

use liftoff_core::{DeploymentConfig, ImageReference, SecretRef};
use serde::{Deserialize, Serialize};

use crate::{DescriptorError, DescriptorStrategy};

pub const API_VERSION: &str = "serving.knative.dev/v1";
pub const KIND: &str = "Service";

pub const INGRESS_ANNOTATION: &str = "run.googleapis.com/ingress";
pub const INVOKER_IAM_DISABLED_ANNOTATION: &str = "run.googleapis.com/invoker-iam-disabled";
pub const MIN_SCALE_ANNOTATION: &str = "autoscaling.knative.dev/minScale";
pub const MAX_SCALE_ANNOTATION: &str = "autoscaling.knative.dev/maxScale";

/// Desired state of the Cloud Run service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub template: RevisionTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionTemplate {
    pub metadata: ObjectMeta,
    pub spec: RevisionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSpec {
    pub container_concurrency: u32,
    pub timeout_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub image: String,
    pub ports: Vec<ContainerPort>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    pub resources: Resources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub name: String,
    pub container_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

impl EnvVar {
    pub fn plain(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: Some(value.to_owned()),
            value_from: None,
        }
    }

    /// Binding resolved by the platform at container start; never a value.
    pub fn secret(secret: &SecretRef) -> Self {
        Self {
            name: secret.env_var.clone(),
            value: None,
            value_from: Some(EnvVarSource {
                secret_key_ref: SecretKeySelector {
                    name: secret.name.clone(),
                    key: SecretRef::VERSION.to_owned(),
                },
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    pub secret_key_ref: SecretKeySelector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    pub name: String,
    /// Secret version alias.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub limits: BTreeMap<String, String>,
}

impl ServiceDescriptor {
    /// Build the descriptor for `config` running `image`.
    pub fn new(config: &DeploymentConfig, image: &ImageReference) -> Self {
        let labels = BTreeMap::from([
            ("app".to_owned(), config.service_name.clone()),
            ("env".to_owned(), config.environment.clone()),
            ("managed-by".to_owned(), "liftoff".to_owned()),
        ]);

        let mut annotations = BTreeMap::from([(
            INGRESS_ANNOTATION.to_owned(),
            config.ingress.annotation().to_owned(),
        )]);
        if config.allow_unauthenticated {
            annotations.insert(INVOKER_IAM_DISABLED_ANNOTATION.to_owned(), "true".to_owned());
        }

        let mut template_annotations = BTreeMap::from([(
            MIN_SCALE_ANNOTATION.to_owned(),
            config.min_instances.to_string(),
        )]);
        if config.max_instances > 0 {
            template_annotations.insert(
                MAX_SCALE_ANNOTATION.to_owned(),
                config.max_instances.to_string(),
            );
        }

        // Plain variables first, then the secret binding.
        let mut env: Vec<EnvVar> = config
            .env
            .iter()
            .map(|(name, value)| EnvVar::plain(name, value))
            .collect();
        env.push(EnvVar::secret(&config.secret));

        let limits = BTreeMap::from([
            ("cpu".to_owned(), config.cpu.clone()),
            ("memory".to_owned(), config.memory.clone()),
        ]);

        Self {
            api_version: API_VERSION.to_owned(),
            kind: KIND.to_owned(),
            metadata: ObjectMeta {
                name: config.service_name.clone(),
                labels: labels.clone(),
                annotations,
            },
            spec: ServiceSpec {
                template: RevisionTemplate {
                    metadata: ObjectMeta {
                        name: String::new(),
                        labels,
                        annotations: template_annotations,
                    },
                    spec: RevisionSpec {
                        container_concurrency: config.concurrency,
                        timeout_seconds: config.timeout_seconds,
                        service_account_name: config.service_account.clone(),
                        containers: vec![Container {
                            image: image.to_string(),
                            ports: vec![ContainerPort {
                                name: "http1".to_owned(),
                                container_port: config.port,
                            }],
                            env,
                            resources: Resources { limits },
                        }],
                    },
                },
            },
        }
    }

    pub fn to_yaml(&self) -> Result<String, DescriptorError> {
        serde_yaml::to_string(self).map_err(|e| DescriptorError::Serialize { source: e })
    }
}

/// Builds the descriptor from typed configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredDescriptor;

impl DescriptorStrategy for StructuredDescriptor {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn render(
        &self,
        config: &DeploymentConfig,
        image: &ImageReference,
    ) -> Result<String, DescriptorError> {
        ServiceDescriptor::new(config, image).to_yaml()
    }
}
