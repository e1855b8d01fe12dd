//! Invoke-access decision for the deployed service.

use liftoff_core::DeploymentConfig;

/// What the pipeline does about invoke permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The descriptor disables the invoker check; nothing to grant.
    Public,
    /// Private service without an invoker: print how to grant access.
    GuidanceOnly,
    /// Bind `member` to the invoker role.
    Grant { member: String },
}

impl AccessDecision {
    pub fn for_config(config: &DeploymentConfig) -> Self {
        match (config.allow_unauthenticated, &config.invoker) {
            (true, _) => Self::Public,
            (false, None) => Self::GuidanceOnly,
            (false, Some(member)) => Self::Grant {
                member: member.clone(),
            },
        }
    }
}

/// Command an operator can run to grant invoke access by hand.
pub fn guidance(config: &DeploymentConfig) -> String {
    format!(
        "gcloud run services add-iam-policy-binding {service} \
         --project {project} --region {region} \
         --member user:YOUR_EMAIL --role roles/run.invoker",
        service = config.service_name,
        project = config.project_id,
        region = config.region,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftoff_core::Overrides;

    fn config(pairs: &[(&str, &str)]) -> DeploymentConfig {
        let mut all = vec![("PROJECT_ID", "acme"), ("TAG", "v1")];
        all.extend_from_slice(pairs);
        DeploymentConfig::resolve(&Overrides::from_pairs(all), |_| None).unwrap()
    }

    #[test]
    fn public_ignores_invoker() {
        let config = config(&[
            ("ALLOW_UNAUTHENTICATED", "true"),
            ("INVOKER", "user:dev@example.com"),
        ]);
        assert_eq!(AccessDecision::for_config(&config), AccessDecision::Public);
    }

    #[test]
    fn private_without_invoker_prints_guidance() {
        let config = config(&[]);
        assert_eq!(AccessDecision::for_config(&config), AccessDecision::GuidanceOnly);
        assert!(guidance(&config).contains("cloudops-agent"));
        assert!(guidance(&config).contains("roles/run.invoker"));
    }

    #[test]
    fn private_with_invoker_grants() {
        let config = config(&[("INVOKER", "group:team@example.com")]);
        assert_eq!(
            AccessDecision::for_config(&config),
            AccessDecision::Grant {
                member: "group:team@example.com".to_owned()
            }
        );
    }
}
