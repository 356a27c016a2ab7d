use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use ulip_gateway::api::{LoginRequest, StatementOutcome};
use ulip_gateway::routes::{landing_route, menu};
use ulip_gateway::{GatewayConfig, GatewayError, LoggingNavigator, QueryParams, connect};

#[derive(Parser)]
#[command(name = "ulip-gateway")]
#[command(about = "Command-line client for the ULIP portal backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the session
    Login {
        #[arg(long, env = "ULIP_EMAIL")]
        email: String,
        #[arg(long, env = "ULIP_PASSWORD")]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Issue a deduplicated GET and print the JSON body
    Get {
        /// Path under the API base, e.g. /user/all
        path: String,
        /// Query parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// List available funds
    Funds,
    /// List the signed-in customer's policies
    Policies,
    /// Download a policy statement
    Statement {
        policy_id: i64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Show the navigation menu for the signed-in role
    Menu,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))
}

/// Surface the backend's own message rather than the transport detail.
fn backend(err: GatewayError) -> anyhow::Error {
    anyhow!(err.message())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ulip_gateway=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = GatewayConfig::load()?;
    info!("Using backend {}", config.base_url);
    let client = connect(&config, Arc::new(LoggingNavigator))?;

    match cli.command {
        Commands::Login { email, password } => {
            let session = client
                .auth
                .login(&LoginRequest { email, password })
                .await
                .map_err(backend)?;
            println!("Signed in as {}", session.display());
            if let Some(role) = session.role() {
                println!("Landing page: {}", landing_route(role));
            }
        }
        Commands::Logout => {
            client.auth.logout().await;
            println!("Signed out");
        }
        Commands::Whoami => match client.gateway().session().current().await {
            Some(session) => {
                println!("User: {}", session.display());
                if let Some(user) = session.user() {
                    println!("Email: {}", user.email);
                    println!("Role: {}", user.role);
                }
                if let Some(expires_at) = session.expires_at() {
                    println!("Expires: {}", expires_at.to_rfc3339());
                }
            }
            None => println!("Not signed in"),
        },
        Commands::Get { path, params } => {
            let query: QueryParams = params.into_iter().collect();
            let response = client.gateway().get(&path, query).await.map_err(backend)?;
            println!("{}", serde_json::to_string_pretty(&response.value())?);
        }
        Commands::Funds => {
            let funds = client.funds.list_funds().await.map_err(backend)?;
            println!("Found {} funds:", funds.len());
            for fund in funds {
                println!(
                    "  [{}] {} ({}, risk {}) NAV {:.4}",
                    fund.fund_id, fund.fund_name, fund.fund_type, fund.risk_level, fund.current_nav
                );
            }
        }
        Commands::Policies => {
            let policies = client.policies.my_policies().await.map_err(backend)?;
            println!("Found {} policies:", policies.len());
            for policy in policies {
                println!(
                    "  [{}] {} sum assured {:.2}, premium {:.2}, status {}",
                    policy.key().map_or_else(|| "-".to_string(), |id| id.to_string()),
                    policy.policy_name,
                    policy.sum_assured,
                    policy.premium_amount,
                    policy.current_status().unwrap_or("unknown")
                );
            }
        }
        Commands::Statement { policy_id, out } => {
            match client
                .policies
                .generate_statement(policy_id)
                .await
                .map_err(backend)?
            {
                StatementOutcome::Document { bytes, .. } => {
                    tokio::fs::write(&out, &bytes)
                        .await
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    println!("Wrote {} bytes to {}", bytes.len(), out.display());
                }
                StatementOutcome::Unavailable(message) => println!("{}", message),
            }
        }
        Commands::Menu => {
            let role = client
                .gateway()
                .session()
                .current()
                .await
                .and_then(|s| s.role())
                .ok_or_else(|| anyhow!("Not signed in"))?;
            for entry in menu(role) {
                println!("  {:<20} {}", entry.label, entry.path);
            }
        }
    }

    Ok(())
}
