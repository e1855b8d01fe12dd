use std::io::Write;

use liftoff_cloud::{GcloudClient, GcloudExecutor};
use liftoff_core::{DeploymentConfig, FALLBACK_TAG, ImageReference, Mode, TagSource};

use crate::access::{self, AccessDecision};
use crate::error::Error;
use crate::reporter::Reporter;
use crate::verify::{self, VerifyCommand};

/// Result of a successful deploy.
#[derive(Debug)]
pub struct DeployOutcome {
    pub image: ImageReference,
    pub url: String,
    pub access: AccessDecision,
    pub verification: Vec<VerifyCommand>,
    /// The Artifact Registry repository was created by this run.
    pub repository_created: bool,
    /// The secret was created by this run.
    pub secret_created: bool,
}

/// Render the descriptor for `image` with the configured strategy.
pub fn render_descriptor(config: &DeploymentConfig, image: &ImageReference) -> Result<String, Error> {
    let strategy = liftoff_manifest::select(config)?;
    tracing::debug!(strategy = strategy.name(), "rendering descriptor");
    Ok(strategy.render(config, image)?)
}

/// Run the deploy pipeline: image selection → provision → build → reconcile
/// → authorize → verify.
///
/// Every platform call is awaited before the next one is issued, and the
/// first failure aborts the run. Steps that already completed stay in place.
pub async fn deploy<E, R>(
    client: &GcloudClient<E>,
    config: &DeploymentConfig,
    reporter: &mut R,
) -> Result<DeployOutcome, Error>
where
    E: GcloudExecutor,
    R: Reporter + ?Sized,
{
    let project = config.project_id.as_str();
    let region = config.region.as_str();
    let service = config.service_name.as_str();

    reporter.step(&format!(
        "Deploying {service} to {project}/{region} ({mode} mode)",
        mode = config.mode
    ));

    // Mode selection. Runs before anything is provisioned so that a
    // deploy-only run against a missing service leaves the project untouched.
    let image = select_image(client, config, reporter).await?;

    // Render up front: a broken template must not leave a half-provisioned project.
    let descriptor = render_descriptor(config, &image)?;

    reporter.step("Enabling required platform APIs");
    client.enable_services(project).await?;

    reporter.step(&format!("Ensuring Artifact Registry repository '{}'", config.repository));
    let repository_created = client
        .ensure_artifact_repo(project, region, &config.repository)
        .await?;
    if !repository_created {
        reporter.note("already exists");
    }

    let secret_created = ensure_secret(client, config, reporter).await?;

    if config.mode == Mode::Full {
        reporter.step(&format!("Building {image}"));
        client
            .submit_build(&config.source_dir, project, &image)
            .await?;
    }

    reporter.step(&format!("Reconciling Cloud Run service '{service}'"));
    let file = write_descriptor(&descriptor)?;
    client.replace_service(file.path(), project, region).await?;

    let access = AccessDecision::for_config(config);
    match &access {
        AccessDecision::Public => {
            reporter.step("Service is public; no invoke grant needed");
        }
        AccessDecision::GuidanceOnly => {
            reporter.step("Service is private and INVOKER is not set");
            reporter.note("grant invoke access with:");
            reporter.note(&access::guidance(config));
        }
        AccessDecision::Grant { member } => {
            reporter.step(&format!("Granting invoke access to {member}"));
            client.grant_invoker(service, project, region, member).await?;
        }
    }

    reporter.step("Fetching service URL");
    let url = client.service_url(service, project, region).await?;
    let verification = verify::commands(&url, &config.endpoints, !config.allow_unauthenticated);

    tracing::info!(%image, %url, "deploy finished");

    Ok(DeployOutcome {
        image,
        url,
        access,
        verification,
        repository_created,
        secret_created,
    })
}

async fn select_image<E, R>(
    client: &GcloudClient<E>,
    config: &DeploymentConfig,
    reporter: &mut R,
) -> Result<ImageReference, Error>
where
    E: GcloudExecutor,
    R: Reporter + ?Sized,
{
    match (config.mode, config.tag.as_deref()) {
        (Mode::Full, tag) => {
            let tag = tag.unwrap_or(FALLBACK_TAG);
            let image = config.image_at(tag);
            reporter.step(&format!("Image: {image}"));
            match config.tag_source {
                TagSource::Fallback => {
                    reporter.note(&format!("no source revision found; using tag '{FALLBACK_TAG}'"));
                }
                TagSource::Revision => {
                    if config.source_dirty == Some(true) {
                        reporter.note(&format!(
                            "working tree has uncommitted changes; tag '{tag}' does not describe them"
                        ));
                    }
                }
                TagSource::Explicit | TagSource::Unset => {}
            }
            Ok(image)
        }
        (Mode::DeployOnly, Some(tag)) => {
            let image = config.image_at(tag);
            reporter.step(&format!("Image: {image} (pinned tag)"));
            Ok(image)
        }
        (Mode::DeployOnly, None) => {
            reporter.step(&format!("Looking up the image '{}' currently runs", config.service_name));
            let current = client
                .current_image(&config.service_name, &config.project_id, &config.region)
                .await?;
            let image = current.ok_or_else(|| Error::NoPriorDeployment {
                service: config.service_name.clone(),
                region: config.region.clone(),
            })?;
            reporter.note(&format!("reusing {image}"));
            Ok(image)
        }
    }
}

/// Make sure the secret exists and the runtime identity can read it.
/// Returns whether this run created it.
async fn ensure_secret<E, R>(
    client: &GcloudClient<E>,
    config: &DeploymentConfig,
    reporter: &mut R,
) -> Result<bool, Error>
where
    E: GcloudExecutor,
    R: Reporter + ?Sized,
{
    let project = config.project_id.as_str();
    let name = config.secret.name.as_str();

    reporter.step(&format!("Ensuring secret '{name}'"));
    let created = if client.secret_exists(project, name).await? {
        reporter.note("already exists; content is left unchanged");
        if config.secret_value.is_some() {
            reporter.note("SECRET_VALUE is ignored for an existing secret");
        }
        false
    } else {
        let value = config
            .secret_value
            .as_ref()
            .ok_or_else(|| Error::MissingSecretValue {
                name: name.to_owned(),
            })?;
        let created = client.create_secret(project, name, value).await?;
        if !created {
            reporter.note("created concurrently by another writer");
        }
        created
    };

    let accessor = match &config.service_account {
        Some(sa) => sa.clone(),
        None => {
            let number = client.get_project_number(project).await?;
            format!("{number}-compute@developer.gserviceaccount.com")
        }
    };
    reporter.note(&format!("granting read access to {accessor}"));
    client.grant_secret_access(project, name, &accessor).await?;

    Ok(created)
}

fn write_descriptor(descriptor: &str) -> Result<tempfile::NamedTempFile, Error> {
    let mut file = tempfile::Builder::new()
        .prefix("liftoff-service-")
        .suffix(".yaml")
        .tempfile()
        .map_err(|e| Error::DescriptorFile { source: e })?;
    file.write_all(descriptor.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| Error::DescriptorFile { source: e })?;
    Ok(file)
}
