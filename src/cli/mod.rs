pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "cardctl")]
#[command(about = "Card Vault operator CLI - storage checks, tenant registry and session tokens")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Storage backend checks and schema bootstrap")]
    Db {
        #[command(subcommand)]
        cmd: commands::db::DbCommands,
    },

    #[command(about = "Tenant registry administration (multi-tenant mode)")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },

    #[command(about = "Mint a signed session token")]
    Token(commands::token::TokenArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::AppConfig::from_env()?;

    match cli.command {
        Commands::Db { cmd } => commands::db::handle(cmd, &config, output_format).await,
        Commands::Tenant { cmd } => commands::tenant::handle(cmd, &config, output_format).await,
        Commands::Token(args) => commands::token::handle(args, &config, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tenant_create() {
        let cli = Cli::try_parse_from(["cardctl", "--json", "tenant", "create", "acme", "--name", "Acme Cards"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Tenant { cmd: commands::tenant::TenantCommands::Create { ref slug, .. } } if slug == "acme"
        ));
    }

    #[test]
    fn parses_token_roles() {
        let cli = Cli::try_parse_from([
            "cardctl", "token", "--user-id", "7", "--username", "ada", "--org-role", "org_admin", "--tenant", "acme",
        ])
        .unwrap();
        match cli.command {
            Commands::Token(args) => {
                assert_eq!(args.org_role.as_deref(), Some("org_admin"));
                assert_eq!(args.tenant.as_deref(), Some("acme"));
            }
            _ => panic!("expected token command"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
