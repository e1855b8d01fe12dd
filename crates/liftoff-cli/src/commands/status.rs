use liftoff_cloud::GcloudClient;

use crate::inputs::InputArgs;

pub async fn status(inputs: &InputArgs) -> anyhow::Result<()> {
    let config = inputs.resolve()?;

    let client = GcloudClient::new();
    let output = client
        .describe_service(&config.service_name, &config.project_id, &config.region)
        .await
        .map_err(liftoff::Error::from)?;

    println!("{output}");
    Ok(())
}
