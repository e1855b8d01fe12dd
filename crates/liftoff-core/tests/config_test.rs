use liftoff_core::{
    DeploymentConfig, Error, FALLBACK_TAG, Ingress, Mode, Overrides, SourceRevision, TagSource,
};
use proptest::prelude::*;
use secrecy::ExposeSecret;
use tempfile::TempDir;

fn inputs(pairs: &[(&str, &str)]) -> Overrides {
    Overrides::from_pairs(pairs.iter().copied())
}

fn no_revision(_: &std::path::Path) -> Option<SourceRevision> {
    None
}

// ── Defaults ──

#[test]
fn resolve_fills_defaults() {
    let config = DeploymentConfig::resolve(&inputs(&[("PROJECT_ID", "acme")]), no_revision).unwrap();

    assert_eq!(config.mode, Mode::Full);
    assert_eq!(config.project_id, "acme");
    assert_eq!(config.region, "us-central1");
    assert_eq!(config.service_name, "cloudops-agent");
    assert_eq!(config.repository, "containers");
    assert_eq!(config.image_name, "cloudops-agent");
    assert_eq!(config.tag.as_deref(), Some(FALLBACK_TAG));
    assert_eq!(config.tag_source, TagSource::Fallback);
    assert!(config.service_account.is_none());
    assert_eq!(config.memory, "512Mi");
    assert_eq!(config.cpu, "1");
    assert_eq!(config.concurrency, 80);
    assert_eq!(config.timeout_seconds, 300);
    assert_eq!(config.min_instances, 0);
    assert_eq!(config.max_instances, 3);
    assert_eq!(config.port, 8080);
    assert_eq!(config.ingress, Ingress::All);
    assert!(!config.allow_unauthenticated);
    assert!(config.invoker.is_none());
    assert_eq!(config.secret.name, "google-api-key");
    assert_eq!(config.secret.env_var, "GOOGLE_API_KEY");
    assert!(config.secret_value.is_none());
    assert!(config.env.is_empty());
    assert_eq!(config.environment, "prod");
    assert!(config.descriptor_template.is_none());
    assert_eq!(config.endpoints.health, "/health");
    assert_eq!(config.endpoints.docs, "/docs");
    assert_eq!(config.endpoints.invoke, "/generate");
}

#[test]
fn resolve_parses_full_overrides() {
    let config = DeploymentConfig::resolve(
        &inputs(&[
            ("MODE", "full"),
            ("PROJECT_ID", "acme-prod"),
            ("REGION", "asia-northeast1"),
            ("SERVICE_NAME", "review-api"),
            ("REPO_NAME", "apps"),
            ("IMAGE_NAME", "reviewer"),
            ("TAG", "v1.4.0"),
            ("SERVICE_ACCOUNT", "runtime@acme-prod.iam.gserviceaccount.com"),
            ("MEMORY", "1Gi"),
            ("CPU", "2"),
            ("CONCURRENCY", "10"),
            ("TIMEOUT", "900"),
            ("MIN_INSTANCES", "1"),
            ("MAX_INSTANCES", "20"),
            ("PORT", "3000"),
            ("INGRESS", "internal-and-load-balanced"),
            ("ALLOW_UNAUTHENTICATED", "yes"),
            ("INVOKER", "group:ops@acme.dev"),
            ("SECRET_NAME", "openai-api-key"),
            ("SECRET_VALUE", "plaintext"),
            ("ENV_VARS", "WORKSPACE_ROOT=/app,LOG_LEVEL=info"),
            ("ENVIRONMENT", "staging"),
            ("SOURCE_DIR", "services/api"),
            ("DESCRIPTOR_TEMPLATE", "deploy/service.yaml"),
            ("HEALTH_PATH", "healthz"),
        ]),
        |_| panic!("explicit TAG must not probe the revision"),
    )
    .unwrap();

    assert_eq!(config.region, "asia-northeast1");
    assert_eq!(config.service_name, "review-api");
    assert_eq!(config.repository, "apps");
    assert_eq!(config.image_name, "reviewer");
    assert_eq!(config.tag.as_deref(), Some("v1.4.0"));
    assert_eq!(config.tag_source, TagSource::Explicit);
    assert_eq!(
        config.service_account.as_deref(),
        Some("runtime@acme-prod.iam.gserviceaccount.com")
    );
    assert_eq!(config.memory, "1Gi");
    assert_eq!(config.cpu, "2");
    assert_eq!(config.concurrency, 10);
    assert_eq!(config.timeout_seconds, 900);
    assert_eq!(config.min_instances, 1);
    assert_eq!(config.max_instances, 20);
    assert_eq!(config.port, 3000);
    assert_eq!(config.ingress, Ingress::InternalAndLoadBalanced);
    assert!(config.allow_unauthenticated);
    assert_eq!(config.invoker.as_deref(), Some("group:ops@acme.dev"));
    assert_eq!(config.secret.env_var, "OPENAI_API_KEY");
    assert_eq!(
        config.secret_value.as_ref().map(|s| s.expose_secret().to_owned()),
        Some("plaintext".to_owned())
    );
    assert_eq!(config.env.len(), 2);
    assert_eq!(config.environment, "staging");
    assert_eq!(config.source_dir, std::path::PathBuf::from("services/api"));
    assert_eq!(
        config.descriptor_template,
        Some(std::path::PathBuf::from("deploy/service.yaml"))
    );
    assert_eq!(config.endpoints.health, "/healthz");
    assert_eq!(
        config.image_at("v1.4.0").as_str(),
        "asia-northeast1-docker.pkg.dev/acme-prod/apps/reviewer:v1.4.0"
    );
}

// ── Project identity ──

#[test]
fn missing_project_is_config_error() {
    let err = DeploymentConfig::resolve(&inputs(&[]), no_revision).unwrap_err();
    assert!(matches!(err, Error::MissingProjectId));
}

#[test]
fn blank_project_is_config_error() {
    let err = DeploymentConfig::resolve(&inputs(&[("PROJECT_ID", "   ")]), no_revision).unwrap_err();
    assert!(matches!(err, Error::MissingProjectId));
}

#[test]
fn placeholder_project_is_config_error() {
    for placeholder in ["YOUR_GCP_PROJECT", "your_gcp_project", "your-project-id", "${PROJECT_ID}"] {
        let err = DeploymentConfig::resolve(&inputs(&[("PROJECT_ID", placeholder)]), no_revision)
            .unwrap_err();
        assert!(
            matches!(err, Error::PlaceholderProjectId(ref p) if p == placeholder),
            "{placeholder} should be rejected"
        );
    }
}

// ── Mode and tag ──

#[test]
fn invalid_mode_is_config_error() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("MODE", "rollback")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidMode(ref m) if m == "rollback"));
    assert!(err.hint().contains("--mode"));
}

#[test]
fn full_mode_tag_defaults_to_revision() {
    let config = DeploymentConfig::resolve(&inputs(&[("PROJECT_ID", "acme")]), |_| {
        Some(SourceRevision::new("9f8e7d6", Some(true)))
    })
    .unwrap();
    assert_eq!(config.tag.as_deref(), Some("9f8e7d6"));
    assert_eq!(config.tag_source, TagSource::Revision);
    assert_eq!(config.source_dirty, Some(true));
}

#[test]
fn explicit_tag_does_not_report_tree_state() {
    let config = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("TAG", "v2")]),
        |_| Some(SourceRevision::new("9f8e7d6", Some(true))),
    )
    .unwrap();
    assert_eq!(config.source_dirty, None);
}

#[test]
fn revision_probe_receives_source_dir() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().to_str().unwrap().to_owned();
    let expected = tmp.path().to_path_buf();

    DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("SOURCE_DIR", &dir)]),
        |path| {
            assert_eq!(path, expected.as_path());
            None
        },
    )
    .unwrap();
}

#[test]
fn deploy_mode_without_tag_leaves_it_unset() {
    let config = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("MODE", "deploy"), ("TAG", "")]),
        |_| panic!("deploy mode must not probe the revision"),
    )
    .unwrap();
    assert_eq!(config.mode, Mode::DeployOnly);
    assert!(config.tag.is_none());
    assert_eq!(config.tag_source, TagSource::Unset);
}

#[test]
fn deploy_mode_with_tag_pins_it() {
    let config = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("MODE", "deploy"), ("TAG", "abc123")]),
        no_revision,
    )
    .unwrap();
    assert_eq!(config.tag.as_deref(), Some("abc123"));
    assert_eq!(config.tag_source, TagSource::Explicit);
}

#[test]
fn malformed_tag_is_rejected() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("TAG", "has space")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { key: "TAG", .. }));
}

// ── Validation ──

#[test]
fn invalid_ingress_is_rejected() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("INGRESS", "public")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidIngress(ref i) if i == "public"));
}

#[test]
fn invalid_service_name_is_rejected() {
    for name in ["Api", "1api", "api-", "api_v2"] {
        let err = DeploymentConfig::resolve(
            &inputs(&[("PROJECT_ID", "acme"), ("SERVICE_NAME", name)]),
            no_revision,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidServiceName(_)), "{name} should be rejected");
    }
}

#[test]
fn non_numeric_limits_are_rejected() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("CONCURRENCY", "lots")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { key: "CONCURRENCY", .. }));
}

#[test]
fn zero_concurrency_is_rejected() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("CONCURRENCY", "0")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { key: "CONCURRENCY", .. }));
}

#[test]
fn timeout_out_of_range_is_rejected() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("TIMEOUT", "7200")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { key: "TIMEOUT", .. }));
}

#[test]
fn min_above_max_is_rejected() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("MIN_INSTANCES", "5"), ("MAX_INSTANCES", "2")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::ScalingBounds { min: 5, max: 2 }));
}

#[test]
fn unbounded_max_allows_any_min() {
    let config = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("MIN_INSTANCES", "5"), ("MAX_INSTANCES", "0")]),
        no_revision,
    )
    .unwrap();
    assert_eq!(config.min_instances, 5);
}

#[test]
fn invalid_public_flag_is_rejected() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("ALLOW_UNAUTHENTICATED", "maybe")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { key: "ALLOW_UNAUTHENTICATED", .. }));
}

#[test]
fn invoker_requires_principal_prefix() {
    for invoker in ["alice@example.com", "user:", "robot:x@y"] {
        let err = DeploymentConfig::resolve(
            &inputs(&[("PROJECT_ID", "acme"), ("INVOKER", invoker)]),
            no_revision,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInvoker(_)), "{invoker} should be rejected");
    }
}

#[test]
fn invoke_body_must_be_json() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("INVOKE_BODY", "text=ping")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { key: "INVOKE_BODY", .. }));

    let config = DeploymentConfig::resolve(
        &inputs(&[
            ("PROJECT_ID", "acme"),
            ("INVOKE_BODY", r#"{"prompt":"hello"}"#),
            ("INVOKE_PATH", "v1/answer"),
        ]),
        no_revision,
    )
    .unwrap();
    assert_eq!(config.endpoints.invoke_body, r#"{"prompt":"hello"}"#);
    assert_eq!(config.endpoints.invoke, "/v1/answer");
}

#[test]
fn credential_in_env_vars_is_rejected() {
    let err = DeploymentConfig::resolve(
        &inputs(&[
            ("PROJECT_ID", "acme"),
            ("ENV_VARS", "API_KEY=AIzaSyA1234567890abcdefghijklmnop"),
        ]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::SuspectedSecret { ref field } if field == "ENV_VARS[API_KEY]"));
}

#[test]
fn env_var_colliding_with_secret_binding_is_rejected() {
    let err = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("ENV_VARS", "GOOGLE_API_KEY=x")]),
        no_revision,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { key: "ENV_VARS", .. }));
}

#[test]
fn secret_value_is_kept_verbatim() {
    let supplied = "  p@ss word \n";
    let config = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("SECRET_VALUE", supplied)]),
        no_revision,
    )
    .unwrap();
    assert_eq!(config.secret_value.unwrap().expose_secret(), supplied);
}

#[test]
fn blank_secret_value_counts_as_unset() {
    let config = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("SECRET_VALUE", " \n")]),
        no_revision,
    )
    .unwrap();
    assert!(config.secret_value.is_none());
}

#[test]
fn malformed_region_is_rejected() {
    for region in ["us central1", "US-CENTRAL1", "europe"] {
        let err = DeploymentConfig::resolve(
            &inputs(&[("PROJECT_ID", "acme"), ("REGION", region)]),
            no_revision,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { key: "REGION", .. }), "{region}");
    }
}

#[test]
fn malformed_image_name_is_rejected() {
    for image in ["My Image:x", "api:v1", "-leading", "trailing/"] {
        let err = DeploymentConfig::resolve(
            &inputs(&[("PROJECT_ID", "acme"), ("IMAGE_NAME", image)]),
            no_revision,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { key: "IMAGE_NAME", .. }), "{image}");
    }
}

#[test]
fn nested_image_name_is_accepted() {
    let config = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("IMAGE_NAME", "team/review_bot.v2")]),
        no_revision,
    )
    .unwrap();
    assert_eq!(
        config.image_at("t1").as_str(),
        "us-central1-docker.pkg.dev/acme/containers/team/review_bot.v2:t1"
    );
}

#[test]
fn secret_value_is_redacted_in_debug_output() {
    let config = DeploymentConfig::resolve(
        &inputs(&[("PROJECT_ID", "acme"), ("SECRET_VALUE", "hunter2-plaintext")]),
        no_revision,
    )
    .unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("hunter2-plaintext"));
}

// ── Config file layer ──

#[test]
fn load_file_returns_empty_when_missing() {
    let tmp = TempDir::new().unwrap();
    let layer = Overrides::load_file(tmp.path()).unwrap();
    assert!(layer.is_empty());
}

#[test]
fn load_file_reads_lowercase_keys() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("liftoff.toml"),
        r#"
project_id = "file-project"
region = "europe-west1"
max_instances = 5
allow_unauthenticated = true
"#,
    )
    .unwrap();

    let layer = Overrides::load_file(tmp.path()).unwrap();
    assert_eq!(layer.get("PROJECT_ID"), Some("file-project"));
    assert_eq!(layer.get("REGION"), Some("europe-west1"));
    assert_eq!(layer.get("MAX_INSTANCES"), Some("5"));
    assert_eq!(layer.get("ALLOW_UNAUTHENTICATED"), Some("true"));
}

#[test]
fn load_file_rejects_misspelt_key() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("liftoff.toml"),
        "regoin = \"europe-west1\"\nproject_id = \"acme\"\n",
    )
    .unwrap();

    let err = Overrides::load_file(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::UnknownConfigKey { ref key, .. } if key == "regoin"));
    assert!(err.hint().contains("typos"));
}

#[test]
fn load_file_reports_parse_errors() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("liftoff.toml"), "region = ").unwrap();

    let err = Overrides::load_file(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
}

#[test]
fn env_file_is_read_without_touching_process_env() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(".env");
    std::fs::write(
        &path,
        "# deployment\nPROJECT_ID=dotenv-project\nSECRET_VALUE=\"from file\"\nHOME_GROWN=1\n",
    )
    .unwrap();

    let layer = Overrides::load_env_file(&path, true).unwrap();
    assert_eq!(layer.get("PROJECT_ID"), Some("dotenv-project"));
    assert_eq!(layer.get("SECRET_VALUE"), Some("from file"));
    assert_eq!(layer.get("HOME_GROWN"), None);
    assert!(std::env::var("PROJECT_ID").map_or(true, |v| v != "dotenv-project"));
}

#[test]
fn env_file_missing_is_empty_unless_required() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(".env");

    assert!(Overrides::load_env_file(&path, false).unwrap().is_empty());
    let err = Overrides::load_env_file(&path, true).unwrap_err();
    assert!(matches!(err, Error::EnvFile { .. }));
}

#[test]
fn environment_layer_overrides_file_layer() {
    let file = Overrides::from_pairs([("PROJECT_ID", "file-project"), ("REGION", "europe-west1")]);
    let env = Overrides::from_pairs([("PROJECT_ID", "env-project")]);

    let config = DeploymentConfig::resolve(&file.layer(env), no_revision).unwrap();
    assert_eq!(config.project_id, "env-project");
    assert_eq!(config.region, "europe-west1");
}

// ── Properties ──

proptest! {
    #[test]
    fn valid_tags_compose_into_image(tag in "[a-z0-9][a-z0-9._-]{0,20}") {
        let config = DeploymentConfig::resolve(
            &inputs(&[("PROJECT_ID", "acme"), ("TAG", &tag)]),
            no_revision,
        ).unwrap();
        let image = config.image_at(config.tag.as_deref().unwrap());
        prop_assert_eq!(image.tag(), Some(tag.as_str()));
        prop_assert!(image.as_str().starts_with("us-central1-docker.pkg.dev/acme/containers/cloudops-agent:"));
    }

    #[test]
    fn deploy_mode_without_tag_never_probes_revision(service in "[a-z][a-z0-9]{0,20}") {
        let config = DeploymentConfig::resolve(
            &inputs(&[("PROJECT_ID", "acme"), ("MODE", "deploy"), ("SERVICE_NAME", &service)]),
            |_| panic!("probed"),
        ).unwrap();
        prop_assert!(config.tag.is_none());
    }
}
