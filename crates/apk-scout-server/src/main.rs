//! apk-scout entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use apk_scout::Scout;
use apk_scout_server::config::{load_scout_config, ServerConfig, DEFAULT_LIMIT};
use apk_scout_server::rest::{self, AppState};

#[derive(Parser)]
#[command(
    name = "apk-scout",
    about = "Search an APK catalog and resolve direct download links",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API (default).
    Serve {
        /// Bind host. Also reads APK_SCOUT_HOST.
        #[arg(long)]
        host: Option<String>,

        /// Listen port. Also reads PORT.
        #[arg(short, long)]
        port: Option<u16>,

        /// Largest `limit` a request may ask for.
        #[arg(long)]
        max_limit: Option<usize>,
    },

    /// Run one search and print the JSON response.
    Search {
        /// Search terms.
        query: String,

        /// Maximum number of items to resolve.
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   apk-scout completions bash > ~/.local/share/bash-completion/completions/apk-scout
    ///   apk-scout completions zsh > ~/.zfunc/_apk-scout
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
        max_limit: None,
    }) {
        Commands::Serve {
            host,
            port,
            max_limit,
        } => {
            let server = ServerConfig::resolve(host, port, max_limit);
            let scout = Scout::new(load_scout_config()?)?;
            tracing::info!("apk-scout REST API");
            tracing::info!("Mirror: {}", scout.config().site.mirror_base);
            let state = Arc::new(AppState::new(scout, &server));
            rest::serve(&server.addr(), state).await?;
        }

        Commands::Search { query, limit } => {
            let scout = Scout::new(load_scout_config()?)?;
            let response = scout.search(&query, limit).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "apk-scout", &mut std::io::stdout());
        }
    }

    Ok(())
}
