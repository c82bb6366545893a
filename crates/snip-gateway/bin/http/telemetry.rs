use crate::cli::Environment;
use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: pretty output for `DEV`, JSON lines
/// for `PROD`.
pub fn init(env: Environment, filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match env {
        Environment::Dev => builder.pretty().try_init(),
        Environment::Prod => builder.json().flatten_event(true).try_init(),
    };

    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
