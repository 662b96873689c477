use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::select_backend;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Connect to the configured backend and run a health probe")]
    Check,

    #[command(about = "Create missing tables and seed the default tenant")]
    Init,
}

pub async fn handle(cmd: DbCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut database = config.database.clone();
    database.auto_migrate = matches!(cmd, DbCommands::Init);

    let backend = select_backend(&database)
        .await
        .context("failed to connect to the configured backend")?;
    let engine = backend.kind();

    let result = match cmd {
        DbCommands::Check => {
            if backend.test_connection().await {
                output_success(
                    output_format,
                    &format!("{} backend is reachable", engine),
                    Some(json!({ "engine": engine, "healthy": true })),
                )
            } else {
                Err(anyhow::anyhow!("{} backend did not answer the health probe", engine))
            }
        }
        DbCommands::Init => output_success(
            output_format,
            &format!("Schema ready for {} backend", engine),
            Some(json!({ "engine": engine })),
        ),
    };

    backend.close().await;
    result
}
