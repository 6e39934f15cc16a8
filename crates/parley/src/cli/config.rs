use dotenvy::dotenv;
use eyre::{Result, eyre};
use parley_core::config::ClientConfig;
use url::Url;

use super::Cli;

pub fn load_env() -> Result<()> {
    dotenv().ok();
    Ok(())
}

/// Config file and environment first, then command-line flags.
pub fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;

    if let Some(raw) = &cli.base_url {
        config.base_url = Url::parse(raw).map_err(|e| eyre!("Invalid --base-url '{raw}': {e}"))?;
    }
    if let Some(token) = &cli.session_token {
        config.session_token = Some(token.clone());
    }

    tracing::debug!(base_url = %config.base_url, "Resolved client config");
    Ok(config)
}
