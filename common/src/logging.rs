use std::str::FromStr;

use anyhow::{Context, Result};
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

pub fn init(level: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::from_str(level).context("failed to parse log level")?;

    let builder = tracing_subscriber::fmt()
        .with_line_number(true)
        .with_file(true)
        .with_env_filter(env_filter);

    if json {
        builder.json().finish().try_init()
    } else {
        builder.pretty().finish().try_init()
    }
    .context("failed to init logger")?;

    Ok(())
}
