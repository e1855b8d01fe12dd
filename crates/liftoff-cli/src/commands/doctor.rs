use liftoff_cloud::{CheckResult, DoctorTarget, GcloudClient};

use crate::inputs::InputArgs;

pub async fn doctor(inputs: &InputArgs) -> anyhow::Result<()> {
    let overrides = inputs.gather()?;

    // Diagnostics continue with whatever PROJECT_ID was given even when the
    // rest of the configuration does not resolve; placement is then skipped.
    let (config, config_check) = match inputs.resolve() {
        Ok(config) => {
            let check =
                CheckResult::ok(&format!("{} ({} mode)", config.service_name, config.mode));
            (Some(config), check)
        }
        Err(e) => (None, CheckResult::fail(&e.to_string())),
    };

    let target = match &config {
        Some(config) => DoctorTarget {
            project_id: Some(&config.project_id),
            region: Some(&config.region),
            repository: Some(&config.repository),
        },
        None => DoctorTarget {
            project_id: overrides.non_empty("PROJECT_ID"),
            ..DoctorTarget::default()
        },
    };

    let client = GcloudClient::new();
    let mut report = client.doctor(target).await;
    report.config = config_check;

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed; see above for details");
    }

    Ok(())
}
