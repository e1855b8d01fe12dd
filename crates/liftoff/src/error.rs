use liftoff_cloud::{
    ArtifactError, CloudBuildError, DeployError, IamError, SecretError, ServicesError,
};
use liftoff_manifest::DescriptorError;

/// Broad failure category, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or invalid input. Fixable by changing configuration.
    Config,
    /// The platform is not in the state the chosen mode requires.
    Precondition,
    /// A platform call failed.
    Platform,
}

impl ErrorClass {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Config => 2,
            Self::Precondition => 3,
            Self::Platform => 4,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] liftoff_core::Error),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("secret '{name}' does not exist and SECRET_VALUE is not set")]
    MissingSecretValue { name: String },

    #[error("service '{service}' has no deployment in {region} to reuse; the first deploy must use full mode")]
    NoPriorDeployment { service: String, region: String },

    #[error(transparent)]
    Services(#[from] ServicesError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Build(#[from] CloudBuildError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Iam(#[from] IamError),

    #[error("failed to write service descriptor to a temporary file")]
    DescriptorFile { source: std::io::Error },
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) | Self::Descriptor(_) | Self::MissingSecretValue { .. } => {
                ErrorClass::Config
            }
            Self::NoPriorDeployment { .. } => ErrorClass::Precondition,
            Self::Services(_)
            | Self::Artifact(_)
            | Self::Secret(_)
            | Self::Build(_)
            | Self::Deploy(_)
            | Self::Iam(_)
            | Self::DescriptorFile { .. } => ErrorClass::Platform,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.class().exit_code()
    }

    /// Operator-facing remediation for the error.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Config(e) => e.hint(),
            Self::Descriptor(e) => e.hint(),
            Self::MissingSecretValue { .. } => {
                "supply SECRET_VALUE once for the first deploy; later deploys reference the stored secret"
            }
            Self::NoPriorDeployment { .. } => {
                "run `liftoff deploy --mode full`, or pin an existing image with `--set TAG=<tag>`"
            }
            Self::Services(_) => {
                "the active account needs serviceusage.services.enable and billing must be enabled; run `liftoff doctor`"
            }
            Self::Artifact(_) => "check Artifact Registry permissions for the active account",
            Self::Secret(_) => "check Secret Manager permissions for the active account",
            Self::Build(CloudBuildError::InvalidPath(_)) => "use a UTF-8 SOURCE_DIR path",
            Self::Build(_) => "inspect the Cloud Build log above; nothing was deployed",
            Self::Deploy(DeployError::Replace { .. }) => {
                "fix the descriptor field named in the platform message; the previous revision keeps serving"
            }
            Self::Deploy(DeployError::ProjectNumber { .. }) => {
                "the active account needs resourcemanager.projects.get, or set SERVICE_ACCOUNT to skip the default identity lookup"
            }
            Self::Deploy(_) => "check Cloud Run permissions and the REGION setting",
            Self::Iam(_) => {
                "the active account needs run.services.setIamPolicy; the service is deployed but not yet invokable"
            }
            Self::DescriptorFile { .. } => "check that the temporary directory is writable",
        }
    }
}
