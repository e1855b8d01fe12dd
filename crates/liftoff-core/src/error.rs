use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to read env file {path}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("unsupported value for `{key}` in {path}: only strings, numbers and booleans are allowed")]
    ConfigValueType { path: PathBuf, key: String },

    #[error("unknown key `{key}` in {path}")]
    UnknownConfigKey { path: PathBuf, key: String },

    // ── Resolution ──
    #[error("PROJECT_ID is not set")]
    MissingProjectId,

    #[error("PROJECT_ID is still the placeholder '{0}'")]
    PlaceholderProjectId(String),

    #[error("invalid MODE '{0}': expected `full` or `deploy`")]
    InvalidMode(String),

    #[error("invalid INGRESS '{0}': expected `all`, `internal` or `internal-and-load-balanced`")]
    InvalidIngress(String),

    #[error("invalid {key} '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("invalid SERVICE_NAME '{0}': use lowercase letters, digits and hyphens, start with a letter, at most 49 characters")]
    InvalidServiceName(String),

    #[error("MIN_INSTANCES ({min}) cannot exceed MAX_INSTANCES ({max})")]
    ScalingBounds { min: u32, max: u32 },

    #[error("invalid INVOKER '{0}': expected a `user:`, `group:`, `serviceAccount:` or `domain:` principal")]
    InvalidInvoker(String),

    #[error("invalid ENV_VARS entry '{0}': expected KEY=VALUE")]
    InvalidEnvEntry(String),

    #[error("{field} contains a value that looks like a credential")]
    SuspectedSecret { field: String },
}

impl Error {
    /// Operator-facing remediation for the error.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::ConfigLoad { .. } | Self::ConfigParse { .. } | Self::ConfigValueType { .. } => {
                "fix liftoff.toml or remove it"
            }
            Self::UnknownConfigKey { .. } => {
                "check the key for typos; liftoff.toml keys are the lowercase setting names, e.g. `region`"
            }
            Self::EnvFile { .. } => "fix the env file (KEY=VALUE per line) or point --env-file elsewhere",
            Self::MissingProjectId | Self::PlaceholderProjectId(_) => {
                "set PROJECT_ID, e.g. `export PROJECT_ID=my-gcp-project` or `--set PROJECT_ID=my-gcp-project`"
            }
            Self::InvalidMode(_) => "use `--mode full` for build + deploy or `--mode deploy` to reuse an image",
            Self::InvalidIngress(_) => "set INGRESS to all, internal or internal-and-load-balanced",
            Self::InvalidValue { .. } | Self::ScalingBounds { .. } => {
                "correct the value and re-run"
            }
            Self::InvalidServiceName(_) => "choose a service name such as `my-service`",
            Self::InvalidInvoker(_) => "use a principal such as `user:you@example.com` or `group:team@example.com`",
            Self::InvalidEnvEntry(_) => "write ENV_VARS as KEY=VALUE pairs separated by commas",
            Self::SuspectedSecret { .. } => {
                "store credentials in Secret Manager (SECRET_NAME / SECRET_VALUE) instead of plain configuration"
            }
        }
    }
}
