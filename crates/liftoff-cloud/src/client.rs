use std::fmt;
use std::path::Path;

use liftoff_core::ImageReference;
use secrecy::{ExposeSecret, SecretString};

use crate::executor::{GcloudExecutor, RealExecutor};
use crate::gcloud::GcloudError;

/// Platform APIs every deployment needs, with display labels.
pub const REQUIRED_SERVICES: &[(&str, &str)] = &[
    ("Cloud Run", "run.googleapis.com"),
    ("Artifact Registry", "artifactregistry.googleapis.com"),
    ("Secret Manager", "secretmanager.googleapis.com"),
    ("Cloud Build", "cloudbuild.googleapis.com"),
    ("IAM", "iam.googleapis.com"),
];

const INVOKER_ROLE: &str = "roles/run.invoker";
const SECRET_ACCESSOR_ROLE: &str = "roles/secretmanager.secretAccessor";

/// GCP operations client, parameterized over the executor for testability.
pub struct GcloudClient<E: GcloudExecutor = RealExecutor> {
    executor: E,
}

impl GcloudClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for GcloudClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: GcloudExecutor> GcloudClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Doctor ──

    /// Run every diagnostic that `target` allows and collect the results.
    ///
    /// Checks never abort each other except where a later check has nothing
    /// to ask about: without an accessible project there is no billing,
    /// API or placement state to read.
    pub async fn doctor(&self, target: DoctorTarget<'_>) -> DoctorReport {
        let mut report = DoctorReport {
            gcloud: self.check_gcloud().await,
            account: self.check_account().await,
            ..DoctorReport::default()
        };

        let Some(pid) = target.project_id else {
            report.project = CheckResult::fail("PROJECT_ID not set");
            return report;
        };
        report.project = self.check_project(pid).await;
        if !report.project.passed {
            return report;
        }

        report.billing = self.check_billing(pid).await;
        report.apis = self.check_apis(pid).await;

        if let Some(region) = target.region {
            report.region = Some(self.check_region(pid, region).await);
            if let Some(repo) = target.repository {
                report.repository = Some(self.check_repository(pid, region, repo).await);
            }
        }
        report
    }

    async fn check_gcloud(&self) -> CheckResult {
        match self.executor.exec(&args(["version"])).await {
            Ok(out) => {
                let version = out
                    .lines()
                    .find_map(|line| line.strip_prefix("Google Cloud SDK "))
                    .unwrap_or("installed");
                CheckResult::ok(version.trim())
            }
            Err(e) => CheckResult::fail(&e.to_string()),
        }
    }

    async fn check_account(&self) -> CheckResult {
        match self
            .executor
            .exec(&args(["config", "get-value", "account"]))
            .await
        {
            Ok(account) if !account.trim().is_empty() => CheckResult::ok(account.trim()),
            _ => CheckResult::fail("no active account; run `gcloud auth login`"),
        }
    }

    async fn check_project(&self, project_id: &str) -> CheckResult {
        let result = self
            .executor
            .exec(&args([
                "projects",
                "describe",
                project_id,
                "--format",
                "value(name)",
            ]))
            .await;

        match result {
            Ok(name) => CheckResult::ok(&format!("{project_id} ({})", name.trim())),
            Err(e) => {
                tracing::debug!(error = %e, "project lookup failed");
                CheckResult::fail(&format!("{project_id} is not accessible to the active account"))
            }
        }
    }

    async fn check_billing(&self, project_id: &str) -> CheckResult {
        let enabled = self
            .executor
            .exec(&args([
                "billing",
                "projects",
                "describe",
                project_id,
                "--format",
                "value(billingEnabled)",
            ]))
            .await
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if enabled {
            CheckResult::ok("Enabled")
        } else {
            CheckResult::fail("Billing not enabled")
        }
    }

    /// One listing of enabled APIs, compared against [`REQUIRED_SERVICES`].
    async fn check_apis(&self, project_id: &str) -> Vec<ApiCheck> {
        let enabled = self
            .executor
            .exec(&args([
                "services",
                "list",
                "--enabled",
                "--project",
                project_id,
                "--format",
                "value(config.name)",
            ]))
            .await;

        REQUIRED_SERVICES
            .iter()
            .map(|(label, api)| {
                let result = match &enabled {
                    Ok(out) if out.lines().any(|l| l.trim() == *api) => CheckResult::ok("Enabled"),
                    Ok(_) => CheckResult::fail("Not enabled (deploy enables it)"),
                    Err(_) => CheckResult::fail("could not list enabled APIs"),
                };
                ApiCheck {
                    name: (*label).to_owned(),
                    result,
                }
            })
            .collect()
    }

    async fn check_region(&self, project_id: &str, region: &str) -> CheckResult {
        let listed = self
            .executor
            .exec(&args([
                "run",
                "regions",
                "list",
                "--project",
                project_id,
                "--format",
                "value(locationId)",
            ]))
            .await;

        match listed {
            Ok(out) if out.lines().any(|l| l.trim() == region) => CheckResult::ok(region),
            Ok(_) => CheckResult::fail(&format!("{region} is not a Cloud Run region")),
            Err(e) => {
                tracing::debug!(error = %e, "region listing failed");
                CheckResult::fail("could not list Cloud Run regions")
            }
        }
    }

    async fn check_repository(&self, project_id: &str, region: &str, repo: &str) -> CheckResult {
        let described = self
            .executor
            .exec(&args([
                "artifacts",
                "repositories",
                "describe",
                repo,
                "--project",
                project_id,
                "--location",
                region,
                "--format",
                "value(format)",
            ]))
            .await;

        match described {
            Ok(format) if format.trim().eq_ignore_ascii_case("docker") => {
                CheckResult::ok(&format!("{repo} (docker)"))
            }
            Ok(format) => CheckResult::fail(&format!(
                "{repo} holds {} artifacts, not container images",
                format.trim().to_ascii_lowercase()
            )),
            Err(e) if e.is_not_found() => {
                CheckResult::ok(&format!("{repo} does not exist yet; deploy creates it"))
            }
            Err(e) => {
                tracing::debug!(error = %e, "repository lookup failed");
                CheckResult::fail(&format!("{repo} could not be read"))
            }
        }
    }

    // ── Service Usage ──

    /// Enable every API in [`REQUIRED_SERVICES`]. Already-enabled APIs are
    /// a no-op on the platform side.
    pub async fn enable_services(&self, project_id: &str) -> Result<(), ServicesError> {
        let mut cmd = vec!["services".to_owned(), "enable".to_owned()];
        cmd.extend(REQUIRED_SERVICES.iter().map(|(_, api)| (*api).to_owned()));
        cmd.extend(args(["--project", project_id, "--quiet"]));

        self.executor
            .exec(&cmd)
            .await
            .map_err(|e| ServicesError::Enable { source: e })?;

        Ok(())
    }

    // ── Artifact Registry ──

    /// Create the Docker repository. Returns `false` when it already existed.
    pub async fn ensure_artifact_repo(
        &self,
        project_id: &str,
        region: &str,
        repo_name: &str,
    ) -> Result<bool, ArtifactError> {
        let result = self
            .executor
            .exec(&args([
                "artifacts",
                "repositories",
                "create",
                repo_name,
                "--project",
                project_id,
                "--location",
                region,
                "--repository-format",
                "docker",
                "--quiet",
            ]))
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_already_exists() => {
                tracing::info!(repository = repo_name, "artifact repository already exists");
                Ok(false)
            }
            Err(e) => Err(ArtifactError::Create { source: e }),
        }
    }

    // ── Cloud Build ──

    pub async fn submit_build(
        &self,
        source_dir: &Path,
        project_id: &str,
        image: &ImageReference,
    ) -> Result<(), CloudBuildError> {
        let source = source_dir
            .to_str()
            .ok_or_else(|| CloudBuildError::InvalidPath(source_dir.to_path_buf()))?;

        self.executor
            .exec_streaming(&args([
                "builds",
                "submit",
                source,
                "--project",
                project_id,
                "--tag",
                image.as_str(),
                "--quiet",
            ]))
            .await
            .map_err(|e| CloudBuildError::Submit { source: e })
    }

    // ── Cloud Run ──

    /// Image the service currently runs, or `None` if there is no service.
    pub async fn current_image(
        &self,
        service_name: &str,
        project_id: &str,
        region: &str,
    ) -> Result<Option<ImageReference>, DeployError> {
        let result = self
            .executor
            .exec(&args([
                "run",
                "services",
                "describe",
                service_name,
                "--project",
                project_id,
                "--region",
                region,
                "--format",
                "value(spec.template.spec.containers[0].image)",
            ]))
            .await;

        match result {
            Ok(out) => {
                let image = out.trim();
                if image.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(ImageReference::deployed(image)))
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(service = service_name, "service does not exist yet");
                Ok(None)
            }
            Err(e) => Err(DeployError::Describe { source: e }),
        }
    }

    /// Overwrite the service with the descriptor at `descriptor`.
    pub async fn replace_service(
        &self,
        descriptor: &Path,
        project_id: &str,
        region: &str,
    ) -> Result<(), DeployError> {
        let path = descriptor
            .to_str()
            .ok_or_else(|| DeployError::InvalidPath(descriptor.to_path_buf()))?;

        self.executor
            .exec(&args([
                "run",
                "services",
                "replace",
                path,
                "--project",
                project_id,
                "--region",
                region,
                "--quiet",
            ]))
            .await
            .map_err(|e| DeployError::Replace { source: e })?;

        Ok(())
    }

    pub async fn service_url(
        &self,
        service_name: &str,
        project_id: &str,
        region: &str,
    ) -> Result<String, DeployError> {
        let output = self
            .executor
            .exec(&args([
                "run",
                "services",
                "describe",
                service_name,
                "--project",
                project_id,
                "--region",
                region,
                "--format",
                "value(status.url)",
            ]))
            .await
            .map_err(|e| DeployError::Describe { source: e })?;

        Ok(output.trim().to_owned())
    }

    pub async fn describe_service(
        &self,
        service_name: &str,
        project_id: &str,
        region: &str,
    ) -> Result<String, DeployError> {
        self.executor
            .exec(&args([
                "run",
                "services",
                "describe",
                service_name,
                "--project",
                project_id,
                "--region",
                region,
                "--format",
                "yaml(status)",
            ]))
            .await
            .map_err(|e| DeployError::Describe { source: e })
    }

    /// Add `member` to the service's invoker role. IAM bindings are sets,
    /// so repeating the call changes nothing.
    pub async fn grant_invoker(
        &self,
        service_name: &str,
        project_id: &str,
        region: &str,
        member: &str,
    ) -> Result<(), IamError> {
        self.executor
            .exec(&args([
                "run",
                "services",
                "add-iam-policy-binding",
                service_name,
                "--project",
                project_id,
                "--region",
                region,
                "--member",
                member,
                "--role",
                INVOKER_ROLE,
                "--quiet",
            ]))
            .await
            .map_err(|e| IamError::GrantInvoker { source: e })?;

        Ok(())
    }

    // ── Secret Manager ──

    pub async fn secret_exists(
        &self,
        project_id: &str,
        secret_name: &str,
    ) -> Result<bool, SecretError> {
        let result = self
            .executor
            .exec(&args([
                "secrets",
                "describe",
                secret_name,
                "--project",
                project_id,
                "--format",
                "value(name)",
            ]))
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(SecretError::Describe { source: e }),
        }
    }

    /// Create the secret with `value` as its first version. Returns `false`
    /// when another writer created it first; its content is left alone.
    pub async fn create_secret(
        &self,
        project_id: &str,
        secret_name: &str,
        value: &SecretString,
    ) -> Result<bool, SecretError> {
        let result = self
            .executor
            .exec_with_stdin(
                &args([
                    "secrets",
                    "create",
                    secret_name,
                    "--project",
                    project_id,
                    "--replication-policy",
                    "automatic",
                    "--data-file",
                    "-",
                ]),
                value.expose_secret().as_bytes(),
            )
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_already_exists() => {
                tracing::info!(secret = secret_name, "secret already exists");
                Ok(false)
            }
            Err(e) => Err(SecretError::Create { source: e }),
        }
    }

    pub async fn get_project_number(&self, project_id: &str) -> Result<String, DeployError> {
        let output = self
            .executor
            .exec(&args([
                "projects",
                "describe",
                project_id,
                "--format",
                "value(projectNumber)",
            ]))
            .await
            .map_err(|e| DeployError::ProjectNumber { source: e })?;

        Ok(output.trim().to_owned())
    }

    pub async fn grant_secret_access(
        &self,
        project_id: &str,
        secret_name: &str,
        service_account: &str,
    ) -> Result<(), SecretError> {
        let member = format!("serviceAccount:{service_account}");
        self.executor
            .exec(&args([
                "secrets",
                "add-iam-policy-binding",
                secret_name,
                "--project",
                project_id,
                "--member",
                &member,
                "--role",
                SECRET_ACCESSOR_ROLE,
                "--quiet",
            ]))
            .await
            .map_err(|e| SecretError::GrantAccess { source: e })?;

        Ok(())
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

// ── Doctor types ──

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub gcloud: CheckResult,
    pub account: CheckResult,
    pub project: CheckResult,
    pub billing: CheckResult,
    pub apis: Vec<ApiCheck>,
    /// Present when a region was configured.
    pub region: Option<CheckResult>,
    /// Present when both region and repository were configured.
    pub repository: Option<CheckResult>,
    pub config: CheckResult,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.rows().all(|(_, check)| check.passed) && self.apis.iter().all(|a| a.result.passed)
    }

    fn rows(&self) -> impl Iterator<Item = (&'static str, &CheckResult)> {
        [
            ("gcloud CLI", Some(&self.gcloud)),
            ("Account", Some(&self.account)),
            ("Project", Some(&self.project)),
            ("Billing", Some(&self.billing)),
            ("Region", self.region.as_ref()),
            ("Repository", self.repository.as_ref()),
            ("Configuration", Some(&self.config)),
        ]
        .into_iter()
        .filter_map(|(label, check)| check.map(|c| (label, c)))
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, check) in self.rows() {
            writeln!(f, "[{}] {label:<18} {}", check.icon(), check.detail)?;
        }
        for api in &self.apis {
            writeln!(
                f,
                "[{}] {:<18} {}",
                api.result.icon(),
                format!("{} API", api.name),
                api.result.detail
            )?;
        }
        Ok(())
    }
}

/// What [`GcloudClient::doctor`] checks against.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoctorTarget<'a> {
    pub project_id: Option<&'a str>,
    pub region: Option<&'a str>,
    pub repository: Option<&'a str>,
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

#[derive(Debug, Clone)]
pub struct ApiCheck {
    pub name: String,
    pub result: CheckResult,
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum ServicesError {
    #[error("failed to enable required platform APIs")]
    Enable { source: GcloudError },
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to create artifact repository")]
    Create { source: GcloudError },
}

#[derive(Debug, thiserror::Error)]
pub enum CloudBuildError {
    #[error("source path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("cloud build submission failed")]
    Submit { source: GcloudError },
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("descriptor path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("failed to describe cloud run service")]
    Describe { source: GcloudError },

    #[error("cloud run rejected the service descriptor")]
    Replace { source: GcloudError },

    #[error("failed to look up project number")]
    ProjectNumber { source: GcloudError },
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("failed to look up secret")]
    Describe { source: GcloudError },

    #[error("failed to create secret")]
    Create { source: GcloudError },

    #[error("failed to grant secret access")]
    GrantAccess { source: GcloudError },
}

#[derive(Debug, thiserror::Error)]
pub enum IamError {
    #[error("failed to grant invoke permission")]
    GrantInvoker { source: GcloudError },
}
