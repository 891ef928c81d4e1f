//! treestatus-settings
//!
//! Resolves the tree status service configuration the same way the service
//! does at startup and prints the (redacted) result. Exits non-zero when the
//! configuration is incomplete.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use treestatus_settings::{
    config::{ConfigResolver, EnvSnapshot, PROJECT_ID},
    logging::{init_tracing, LogFormat},
    secrets::{TaskclusterConfig, TaskclusterSecretStore},
};

/// Resolve and print the tree status service settings
#[derive(Parser, Debug)]
#[command(name = "treestatus-settings")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Env file layered under the process environment
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Do not read an env file
    #[arg(long)]
    no_env_file: bool,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Project layer to read from the secret
    #[arg(long, default_value = PROJECT_ID)]
    project_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut env = EnvSnapshot::from_process();

    let log_level = args
        .log_level
        .clone()
        .or_else(|| env.get_non_empty("LOG_LEVEL").map(str::to_string))
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&log_level, args.log_format).context("Failed to initialize logging")?;

    if !args.no_env_file && args.env_file.exists() {
        env = env
            .with_dotenv(&args.env_file)
            .with_context(|| format!("Failed to read {}", args.env_file.display()))?;
    }

    let store = TaskclusterSecretStore::new(TaskclusterConfig::from_env(&env))
        .context("Failed to create Taskcluster client")?;
    let resolver = ConfigResolver::new(Arc::new(store)).with_project_id(args.project_id);

    let settings = match resolver.resolve(&env).await {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(key = err.key().unwrap_or("-"), error = %err, "Configuration error");
            return Err(err).context("Cannot start: configuration is incomplete");
        }
    };

    let dump = settings.to_redacted_json().context("Failed to serialize settings")?;
    println!("{}", serde_json::to_string_pretty(&dump)?);

    Ok(())
}
