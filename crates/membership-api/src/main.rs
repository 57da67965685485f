//! Group membership API - HTTP service and lookup CLI.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use membership_api::config::GatewayConfig;

#[derive(Parser)]
#[command(name = "membership-api")]
#[command(about = "Directory group membership API")]
struct Cli {
    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address (defaults to SERVER_HOST, then 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
        /// Listen port (defaults to SERVER_PORT, then 3000)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print one user's group memberships as JSON
    Lookup {
        /// User ID or principal name (defaults to MEMBERSHIP_USER_ID)
        user_id: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = GatewayConfig::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            membership_api::run_server(&host, port, config).await?;
        }
        Commands::Lookup { user_id } => {
            let user_id = user_id.unwrap_or_else(|| config.membership_user_id.clone());
            let memberships = membership_api::lookup(config, &user_id).await?;
            println!("{}", serde_json::to_string_pretty(&memberships)?);
        }
    }

    Ok(())
}
