//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod download;
mod estimate;
mod history;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tagfetch::catalog::HttpCatalog;
use tagfetch::config::{load_settings_with_options, LoadOptions, Settings};
use tagfetch::credentials::Credentials;
use tagfetch::error::SessionError;
use tagfetch::http_client::HttpClient;

#[derive(Parser)]
#[command(name = "tagfetch")]
#[command(about = "Bulk downloader for tag-searchable media catalogs")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true, alias = "debug")]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose" || arg == "--debug")
}

/// Catalog account flags shared by commands that talk to the API.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AuthArgs {
    /// Catalog username
    #[arg(long, env = "TAGFETCH_USERNAME")]
    username: Option<String>,

    /// Catalog API key
    #[arg(long, env = "TAGFETCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl AuthArgs {
    /// Flags first, then the config file.
    fn resolve(&self, settings: &Settings) -> Option<Credentials> {
        Credentials::from_parts(
            self.username.as_deref().or(settings.username.as_deref()),
            self.api_key.as_deref().or(settings.api_key.as_deref()),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download posts matching a tag query
    Download {
        /// Tag query, e.g. "fox rating:safe"
        tags: String,
        /// Number of posts to download
        #[arg(short = 'n', long)]
        count: usize,
        /// Concurrent downloads (default from config, 5 otherwise)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Output folder name (defaults to the sanitized tag query)
        #[arg(short, long)]
        folder: Option<String>,
        /// Zip the output folder when done
        #[arg(long)]
        zip: bool,
        /// Save payloads even when identical bytes are already on disk
        #[arg(long)]
        keep_duplicates: bool,
        /// Skip the size estimate before downloading
        #[arg(long)]
        no_estimate: bool,
        /// Do not record this session in the history file
        #[arg(long)]
        no_history: bool,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Estimate the download size of a tag query
    Estimate {
        /// Tag query
        tags: String,
        /// Number of posts to estimate for
        #[arg(short = 'n', long)]
        count: usize,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Show recorded download sessions
    History {
        /// Show only the most recent N sessions
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print raw JSON entries
        #[arg(long)]
        json: bool,
    },
}

/// Build the catalog client, optionally authenticated.
fn build_catalog(
    settings: &Settings,
    credentials: Option<Credentials>,
) -> anyhow::Result<HttpCatalog> {
    let http = HttpClient::builder(settings.request_timeout())
        .user_agent(&settings.user_agent)
        .credentials(credentials)
        .build()
        .map_err(SessionError::from)?;
    Ok(HttpCatalog::new(http, settings.endpoint.clone()))
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (settings, _config) = load_settings_with_options(options)
        .await
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Download {
            tags,
            count,
            workers,
            folder,
            zip,
            keep_duplicates,
            no_estimate,
            no_history,
            auth,
        } => {
            let args = download::DownloadArgs {
                tags,
                count,
                workers: workers.unwrap_or(settings.workers),
                folder,
                zip,
                skip_duplicates: !keep_duplicates,
                estimate: !no_estimate,
                record_history: !no_history,
                credentials: auth.resolve(&settings),
            };
            download::cmd_download(&settings, args).await
        }
        Commands::Estimate { tags, count, auth } => {
            estimate::cmd_estimate(&settings, &tags, count, auth.resolve(&settings)).await
        }
        Commands::History { limit, json } => history::cmd_history(&settings, limit, json),
    }
}
