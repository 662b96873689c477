use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, output_json, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::TenantStatus;
use crate::database::select_backend;
use crate::tenant::{NewTenant, TenantService};

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "List all tenants")]
    List,

    #[command(about = "Create new tenant")]
    Create {
        #[arg(help = "Unique tenant slug (lowercase letters, digits, hyphens)")]
        slug: String,

        #[arg(long, help = "Display name")]
        name: String,

        #[arg(long, help = "Subscription tier", default_value = "free")]
        tier: String,

        #[arg(long, help = "Maximum number of users", default_value_t = 5)]
        max_users: i64,
    },

    #[command(about = "Change tenant status (active, suspended, inactive)")]
    Status {
        #[arg(help = "Tenant slug")]
        slug: String,

        #[arg(help = "New status")]
        status: String,
    },
}

pub async fn handle(cmd: TenantCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let backend = select_backend(&config.database)
        .await
        .context("failed to connect to the configured backend")?;
    let tenants = TenantService::new(backend.clone());

    let result = run(cmd, &tenants, output_format).await;
    backend.close().await;
    result
}

async fn run(cmd: TenantCommands, tenants: &TenantService, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TenantCommands::List => {
            let list = tenants.list().await?;
            if list.is_empty() {
                return output_empty_collection(output_format, "tenants", "No tenants registered");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "tenants": list }))?,
                OutputFormat::Text => {
                    println!("{:<20} {:<25} {:<10} {:<10} {}", "SLUG", "NAME", "STATUS", "TIER", "ID");
                    println!("{}", "-".repeat(100));
                    for t in &list {
                        println!("{:<20} {:<25} {:<10} {:<10} {}", t.slug, t.name, t.status, t.subscription_tier, t.id);
                    }
                }
            }
            Ok(())
        }
        TenantCommands::Create { slug, name, tier, max_users } => {
            let tenant = tenants
                .create(NewTenant {
                    name,
                    slug,
                    subscription_tier: Some(tier),
                    max_users: Some(max_users),
                })
                .await?;
            output_success(
                output_format,
                &format!("Created tenant '{}' ({})", tenant.slug, tenant.id),
                Some(serde_json::to_value(&tenant)?),
            )
        }
        TenantCommands::Status { slug, status } => {
            let status: TenantStatus = status.parse().map_err(anyhow::Error::msg)?;
            let tenant = tenants.set_status(&slug, status).await?;
            output_success(
                output_format,
                &format!("Tenant '{}' is now {}", tenant.slug, tenant.status),
                Some(serde_json::to_value(&tenant)?),
            )
        }
    }
}
