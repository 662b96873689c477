use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::auth::permissions::{GlobalRole, LegacyRole, OrganizationRole};
use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_json;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::select_backend;
use crate::tenant::{TenantContext, TenantService};

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "User id placed in the `sub` claim")]
    pub user_id: String,

    #[arg(long)]
    pub username: String,

    #[arg(long, help = "Legacy role: user, manager or admin")]
    pub role: Option<String>,

    #[arg(long, help = "Global role: none, global_operator or global_admin")]
    pub global_role: Option<String>,

    #[arg(long, help = "Organization role: user or org_admin (requires --tenant)")]
    pub org_role: Option<String>,

    #[arg(long, help = "Slug of the tenant the user is bound to")]
    pub tenant: Option<String>,

    #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
    pub hours: Option<u64>,
}

pub async fn handle(args: TokenArgs, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let hours = args.hours.unwrap_or(config.security.jwt_expiry_hours);
    let mut claims = Claims::new(&args.user_id, &args.username, hours);

    if let Some(role) = &args.role {
        claims = claims.with_legacy_role(role.parse::<LegacyRole>().map_err(anyhow::Error::msg)?);
    }
    if let Some(role) = &args.global_role {
        claims = claims.with_global_role(role.parse::<GlobalRole>().map_err(anyhow::Error::msg)?);
    }

    match (&args.tenant, &args.org_role) {
        (Some(slug), role) => {
            let role = match role {
                Some(r) => r.parse::<OrganizationRole>().map_err(anyhow::Error::msg)?,
                None => OrganizationRole::User,
            };
            let context = lookup_tenant(config, slug).await?;
            claims = claims.with_organization(&context, role);
        }
        (None, Some(_)) => anyhow::bail!("--org-role requires --tenant"),
        (None, None) => {}
    }

    let token = generate_jwt(&claims, &config.security.jwt_secret)?;
    match output_format {
        OutputFormat::Json => output_json(&json!({ "token": token, "expires_at": claims.exp })),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}

async fn lookup_tenant(config: &AppConfig, slug: &str) -> anyhow::Result<TenantContext> {
    let mut database = config.database.clone();
    database.auto_migrate = false;
    let backend = select_backend(&database)
        .await
        .context("failed to connect to the configured backend")?;

    let tenant = TenantService::new(backend.clone()).get_active(slug).await;
    backend.close().await;
    Ok(TenantContext::from(&tenant?))
}
