use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kiln_server::ServerConfig;
use kiln_server::components::demo_registry;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "kiln", version, about = "Kiln live component server")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve components over HTTP
    Serve {
        /// Path to a kiln.toml config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to listen on, overriding config and KILN_BIND_ADDR
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// List the registered components
    Components,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; `kiln components` prints its listing on stdout
    let filter = EnvFilter::try_from_env("KILN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Serve { config, bind } => {
            let (mut config, source) = ServerConfig::load(config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }

            match source {
                Some(path) => tracing::info!(path = %path.display(), "Loaded config"),
                None => tracing::info!("No config file found, using defaults"),
            }

            kiln_server::server::serve(config).await
        }
        Commands::Components => {
            for name in demo_registry().names() {
                println!("{name}");
            }
            Ok(())
        }
    }
}
