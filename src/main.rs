use std::io;

use anyhow::Context;
use sqlite_users::StoreConfig;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr; stdout only carries the rendered rows.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = StoreConfig::default();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    sqlite_users::run(&config, &mut out)
        .with_context(|| format!("run against {} failed", config.db_path.display()))?;
    Ok(())
}
