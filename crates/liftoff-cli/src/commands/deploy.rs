use liftoff::ConsoleReporter;
use liftoff_cloud::GcloudClient;

use crate::inputs::InputArgs;

/// Execute the deploy pipeline.
pub async fn deploy(inputs: &InputArgs) -> anyhow::Result<()> {
    let config = inputs.resolve()?;
    let client = GcloudClient::new();

    let outcome = liftoff::deploy(&client, &config, &mut ConsoleReporter).await?;

    println!();
    println!("Deployed: {}", outcome.url);
    println!("Image:    {}", outcome.image);
    println!();
    println!("Verify:");
    for check in &outcome.verification {
        println!("  # {}", check.label);
        println!("  {}", check.command);
    }

    Ok(())
}
