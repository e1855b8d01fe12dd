use std::path::PathBuf;

use clap::Args;
use liftoff_core::{DeploymentConfig, Overrides, RECOGNIZED_KEYS, revision};

/// Input layering flags shared by every command.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Lifecycle mode: `full` (build + deploy) or `deploy` (reuse an image)
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Override a configuration key; repeatable
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Dotenv file to read (default: .env in the config directory, if present)
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Directory holding liftoff.toml
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub config_dir: PathBuf,
}

impl InputArgs {
    /// Merge the input layers: liftoff.toml < dotenv < process env < flags.
    pub fn gather(&self) -> Result<Overrides, liftoff::Error> {
        let file = Overrides::load_file(&self.config_dir)?;

        let env_path = self
            .env_file
            .clone()
            .unwrap_or_else(|| self.config_dir.join(".env"));
        let dotenv = Overrides::load_env_file(&env_path, self.env_file.is_some())?;

        // Non-UTF-8 variables cannot be configuration keys.
        let process = Overrides::from_pairs(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.to_str()?.to_owned(), v.to_str()?.to_owned()))
        }));

        let mut flags = Overrides::from_pairs(self.set.iter().cloned());
        if let Some(mode) = &self.mode {
            flags.set("MODE", mode.as_str());
        }

        tracing::debug!(env_file = %env_path.display(), "gathered configuration layers");
        Ok(file.layer(dotenv).layer(process).layer(flags))
    }

    pub fn resolve(&self) -> Result<DeploymentConfig, liftoff::Error> {
        let overrides = self.gather()?;
        Ok(DeploymentConfig::resolve(&overrides, revision::probe)?)
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim().to_ascii_uppercase();
    if !RECOGNIZED_KEYS.contains(&key.as_str()) {
        return Err(format!("unknown key '{key}'"));
    }
    Ok((key, value.to_owned()))
}
