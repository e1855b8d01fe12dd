use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use secrecy::SecretString;
use std::sync::LazyLock;

use crate::image::ImageReference;
use crate::overrides::Overrides;
use crate::revision::{FALLBACK_TAG, SourceRevision};
use crate::secret_scan::ensure_not_secret;
use crate::{Error, Result};

/// Values that mark an unedited `PROJECT_ID` (compared case-insensitively).
pub const PLACEHOLDER_PROJECT_IDS: &[&str] = &["YOUR_GCP_PROJECT", "your-project-id", "${PROJECT_ID}"];

const INVOKER_PREFIXES: &[&str] = &["user:", "group:", "serviceAccount:", "domain:"];

static SERVICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]([a-z0-9-]{0,47}[a-z0-9])?$").expect("static regex is valid"));
static REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+-[a-z]+[0-9]+$").expect("static regex is valid"));
static IMAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*(/[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*)*$")
        .expect("static regex is valid")
});
static RESOURCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]([a-z0-9-]*[a-z0-9])?$").expect("static regex is valid"));
static SECRET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,255}$").expect("static regex is valid"));
static IMAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("static regex is valid"));
static MEMORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(Ki|Mi|Gi|k|M|G)?$").expect("static regex is valid"));
static CPU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+(\.[0-9]+)?|[0-9]+m)$").expect("static regex is valid"));
static ENV_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex is valid"));

/// Deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Provision, build and publish a new image, then deploy it.
    Full,
    /// Deploy an image that already exists: a pinned tag, or whatever the
    /// service runs now.
    DeployOnly,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "full" => Ok(Self::Full),
            "deploy" => Ok(Self::DeployOnly),
            other => Err(Error::InvalidMode(other.to_owned())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::DeployOnly => f.write_str("deploy"),
        }
    }
}

/// Network ingress policy of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingress {
    All,
    Internal,
    InternalAndLoadBalanced,
}

impl Ingress {
    /// Value of the `run.googleapis.com/ingress` annotation.
    pub fn annotation(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Internal => "internal",
            Self::InternalAndLoadBalanced => "internal-and-cloud-load-balancing",
        }
    }
}

impl FromStr for Ingress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "all" => Ok(Self::All),
            "internal" => Ok(Self::Internal),
            "internal-and-load-balanced" | "internal-and-cloud-load-balancing" => {
                Ok(Self::InternalAndLoadBalanced)
            }
            other => Err(Error::InvalidIngress(other.to_owned())),
        }
    }
}

/// Where the resolved tag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    /// `TAG` was given.
    Explicit,
    /// Short hash of the source revision.
    Revision,
    /// No revision metadata; [`FALLBACK_TAG`] was used.
    Fallback,
    /// Deploy-only without `TAG`: the deployed image is reused.
    Unset,
}

/// Secret Manager secret bound into the container by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub name: String,
    /// Environment variable the platform injects the value into.
    pub env_var: String,
}

impl SecretRef {
    /// Version alias the binding resolves at container start.
    pub const VERSION: &'static str = "latest";
}

/// Paths of the deployed service used by verification output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub health: String,
    pub docs: String,
    pub invoke: String,
    /// Sample JSON body for the business endpoint.
    pub invoke_body: String,
}

/// Fully resolved, validated deployment parameters.
///
/// Built once per invocation by [`DeploymentConfig::resolve`]; nothing
/// mutates it afterwards.
#[derive(Debug)]
pub struct DeploymentConfig {
    pub mode: Mode,
    pub project_id: String,
    pub region: String,
    pub service_name: String,
    pub repository: String,
    pub image_name: String,
    /// Always `Some` in [`Mode::Full`].
    pub tag: Option<String>,
    pub tag_source: TagSource,
    /// Uncommitted changes in the source tree; only probed for revision tags.
    pub source_dirty: Option<bool>,
    /// Runtime identity; `None` runs as the platform default compute identity.
    pub service_account: Option<String>,
    pub memory: String,
    pub cpu: String,
    pub concurrency: u32,
    pub timeout_seconds: u32,
    pub min_instances: u32,
    pub max_instances: u32,
    pub port: u16,
    pub ingress: Ingress,
    pub allow_unauthenticated: bool,
    pub invoker: Option<String>,
    pub secret: SecretRef,
    /// Plaintext used only when the secret has to be created.
    pub secret_value: Option<SecretString>,
    /// Plain (non-secret) environment variables.
    pub env: BTreeMap<String, String>,
    /// Value of the `env` label.
    pub environment: String,
    pub source_dir: PathBuf,
    /// Raw descriptor template; selects template rendering when set.
    pub descriptor_template: Option<PathBuf>,
    pub endpoints: Endpoints,
}

impl DeploymentConfig {
    /// Resolve inputs against built-in defaults and validate them.
    ///
    /// `revision` is asked for the source tree's revision only when a full
    /// deploy has no explicit `TAG`.
    ///
    /// # Examples
    ///
    /// ```
    /// use liftoff_core::{DeploymentConfig, Mode, Overrides, SourceRevision};
    ///
    /// let inputs = Overrides::from_pairs([("PROJECT_ID", "acme-prod")]);
    /// let config = DeploymentConfig::resolve(&inputs, |_| Some(SourceRevision::new("1a2b3c4", Some(false)))).unwrap();
    ///
    /// assert_eq!(config.mode, Mode::Full);
    /// assert_eq!(config.tag.as_deref(), Some("1a2b3c4"));
    /// ```
    pub fn resolve<F>(inputs: &Overrides, revision: F) -> Result<Self>
    where
        F: FnOnce(&Path) -> Option<SourceRevision>,
    {
        let project_id = resolve_project_id(inputs)?;
        let mode: Mode = inputs.non_empty("MODE").unwrap_or("full").parse()?;

        let region = text(inputs, "REGION", "us-central1");
        if !REGION.is_match(&region) {
            return Err(invalid("REGION", &region, "expected a region such as us-central1"));
        }
        let service_name = text(inputs, "SERVICE_NAME", "cloudops-agent");
        if !SERVICE_NAME.is_match(&service_name) {
            return Err(Error::InvalidServiceName(service_name));
        }

        let repository = text(inputs, "REPO_NAME", "containers");
        if !RESOURCE_NAME.is_match(&repository) {
            return Err(invalid(
                "REPO_NAME",
                &repository,
                "use lowercase letters, digits and hyphens",
            ));
        }
        let image_name = text(inputs, "IMAGE_NAME", &service_name);
        if !IMAGE_NAME.is_match(&image_name) {
            return Err(invalid(
                "IMAGE_NAME",
                &image_name,
                "use lowercase letters, digits, '.', '_', '-' and '/' separators",
            ));
        }

        let source_dir = PathBuf::from(text(inputs, "SOURCE_DIR", "."));

        let (tag, tag_source, source_dirty) = match (mode, inputs.non_empty("TAG")) {
            (_, Some(tag)) => {
                if !IMAGE_TAG.is_match(tag) {
                    return Err(invalid("TAG", tag, "not a valid image tag"));
                }
                (Some(tag.to_owned()), TagSource::Explicit, None)
            }
            (Mode::Full, None) => match revision(&source_dir) {
                Some(rev) => (Some(rev.short_hash), TagSource::Revision, rev.dirty),
                None => (Some(FALLBACK_TAG.to_owned()), TagSource::Fallback, None),
            },
            (Mode::DeployOnly, None) => (None, TagSource::Unset, None),
        };

        let service_account = inputs.non_empty("SERVICE_ACCOUNT").map(str::to_owned);
        if let Some(sa) = &service_account {
            ensure_not_secret(sa, "SERVICE_ACCOUNT")?;
            if !sa.contains('@') {
                return Err(invalid("SERVICE_ACCOUNT", sa, "expected a service account email"));
            }
        }

        let memory = text(inputs, "MEMORY", "512Mi");
        if !MEMORY.is_match(&memory) {
            return Err(invalid("MEMORY", &memory, "expected a quantity such as 512Mi or 1Gi"));
        }
        let cpu = text(inputs, "CPU", "1");
        if !CPU.is_match(&cpu) {
            return Err(invalid("CPU", &cpu, "expected a count such as 1, 2 or 1000m"));
        }

        let concurrency: u32 = number(inputs, "CONCURRENCY", 80)?;
        if concurrency == 0 {
            return Err(invalid("CONCURRENCY", "0", "must be greater than zero"));
        }
        let timeout_seconds: u32 = number(inputs, "TIMEOUT", 300)?;
        if !(1..=3600).contains(&timeout_seconds) {
            return Err(invalid(
                "TIMEOUT",
                &timeout_seconds.to_string(),
                "must be between 1 and 3600 seconds",
            ));
        }
        let min_instances: u32 = number(inputs, "MIN_INSTANCES", 0)?;
        let max_instances: u32 = number(inputs, "MAX_INSTANCES", 3)?;
        if max_instances > 0 && min_instances > max_instances {
            return Err(Error::ScalingBounds {
                min: min_instances,
                max: max_instances,
            });
        }
        let port: u16 = number(inputs, "PORT", 8080)?;
        if port == 0 {
            return Err(invalid("PORT", "0", "must be a valid TCP port"));
        }

        let ingress: Ingress = inputs.non_empty("INGRESS").unwrap_or("all").parse()?;
        let allow_unauthenticated = flag(inputs, "ALLOW_UNAUTHENTICATED", false)?;

        let invoker = inputs.non_empty("INVOKER").map(str::to_owned);
        if let Some(principal) = &invoker
            && !INVOKER_PREFIXES
                .iter()
                .any(|p| principal.starts_with(p) && principal.len() > p.len())
        {
            return Err(Error::InvalidInvoker(principal.clone()));
        }

        let secret_name = text(inputs, "SECRET_NAME", "google-api-key");
        if !SECRET_NAME.is_match(&secret_name) {
            return Err(invalid(
                "SECRET_NAME",
                &secret_name,
                "use letters, digits, hyphens and underscores",
            ));
        }
        let secret_env = inputs
            .non_empty("SECRET_ENV_VAR")
            .map(str::to_owned)
            .unwrap_or_else(|| env_var_name(&secret_name));
        if !ENV_NAME.is_match(&secret_env) {
            return Err(invalid("SECRET_ENV_VAR", &secret_env, "not a valid variable name"));
        }
        // Stored verbatim: the first version is never rewritten.
        let secret_value = inputs
            .get("SECRET_VALUE")
            .filter(|v| !v.trim().is_empty())
            .map(|v| SecretString::from(v.to_owned()));

        let env = parse_env_vars(inputs.get("ENV_VARS").unwrap_or(""))?;
        if env.contains_key(&secret_env) {
            return Err(invalid(
                "ENV_VARS",
                &secret_env,
                "collides with the variable the secret is bound to",
            ));
        }

        let environment = text(inputs, "ENVIRONMENT", "prod");
        let descriptor_template = inputs.non_empty("DESCRIPTOR_TEMPLATE").map(PathBuf::from);

        let invoke_body = text(inputs, "INVOKE_BODY", r#"{"text":"ping"}"#);
        if serde_json::from_str::<serde_json::Value>(&invoke_body).is_err() {
            return Err(invalid("INVOKE_BODY", &invoke_body, "must be a JSON document"));
        }
        let endpoints = Endpoints {
            health: url_path(inputs, "HEALTH_PATH", "/health"),
            docs: url_path(inputs, "DOCS_PATH", "/docs"),
            invoke: url_path(inputs, "INVOKE_PATH", "/generate"),
            invoke_body,
        };

        let config = Self {
            mode,
            project_id,
            region,
            service_name,
            repository,
            image_name,
            tag,
            tag_source,
            source_dirty,
            service_account,
            memory,
            cpu,
            concurrency,
            timeout_seconds,
            min_instances,
            max_instances,
            port,
            ingress,
            allow_unauthenticated,
            invoker,
            secret: SecretRef {
                name: secret_name,
                env_var: secret_env,
            },
            secret_value,
            env,
            environment,
            source_dir,
            descriptor_template,
            endpoints,
        };

        tracing::debug!(
            mode = %config.mode,
            project = %config.project_id,
            region = %config.region,
            service = %config.service_name,
            tag = ?config.tag,
            secret_value_supplied = config.secret_value.is_some(),
            "configuration resolved",
        );
        Ok(config)
    }

    /// Artifact Registry coordinate of this service's image at `tag`.
    pub fn image_at(&self, tag: &str) -> ImageReference {
        ImageReference::compose(
            &self.region,
            &self.project_id,
            &self.repository,
            &self.image_name,
            tag,
        )
    }
}

fn resolve_project_id(inputs: &Overrides) -> Result<String> {
    let project_id = inputs.non_empty("PROJECT_ID").ok_or(Error::MissingProjectId)?;
    if PLACEHOLDER_PROJECT_IDS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(project_id))
    {
        return Err(Error::PlaceholderProjectId(project_id.to_owned()));
    }
    Ok(project_id.to_owned())
}

fn text(inputs: &Overrides, key: &str, default: &str) -> String {
    inputs.non_empty(key).unwrap_or(default).to_owned()
}

fn number<T: FromStr>(inputs: &Overrides, key: &'static str, default: T) -> Result<T> {
    match inputs.non_empty(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| invalid(key, raw, "expected a non-negative integer")),
    }
}

fn flag(inputs: &Overrides, key: &'static str, default: bool) -> Result<bool> {
    match inputs.non_empty(key) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(invalid(key, raw, "expected true or false")),
        },
    }
}

fn url_path(inputs: &Overrides, key: &str, default: &str) -> String {
    let path = text(inputs, key, default);
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

fn invalid(key: &'static str, value: &str, reason: &'static str) -> Error {
    Error::InvalidValue {
        key,
        value: value.to_owned(),
        reason,
    }
}

/// `google-api-key` → `GOOGLE_API_KEY`.
fn env_var_name(secret_name: &str) -> String {
    secret_name
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

fn parse_env_vars(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| Error::InvalidEnvEntry(entry.to_owned()))?;
        let key = key.trim();
        if !ENV_NAME.is_match(key) {
            return Err(Error::InvalidEnvEntry(entry.to_owned()));
        }
        ensure_not_secret(value, &format!("ENV_VARS[{key}]"))?;
        env.insert(key.to_owned(), value.trim().to_owned());
    }
    Ok(env)
}
