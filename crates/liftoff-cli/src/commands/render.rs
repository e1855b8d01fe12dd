use std::path::Path;

use anyhow::Context;
use liftoff_core::{DeploymentConfig, FALLBACK_TAG, revision};

use crate::inputs::InputArgs;

/// Print or write the descriptor a full-mode deploy would submit.
pub fn render(inputs: &InputArgs, output: Option<&Path>) -> anyhow::Result<()> {
    let mut overrides = inputs.gather()?;
    overrides.set("MODE", "full");

    let config =
        DeploymentConfig::resolve(&overrides, revision::probe).map_err(liftoff::Error::from)?;
    let image = config.image_at(config.tag.as_deref().unwrap_or(FALLBACK_TAG));
    let descriptor = liftoff::render_descriptor(&config, &image)?;

    match output {
        Some(path) => {
            std::fs::write(path, &descriptor)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{descriptor}"),
    }

    Ok(())
}
