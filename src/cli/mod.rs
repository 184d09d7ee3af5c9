use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::domain::DEFAULT_MAX_RESULTS;
use crate::infra::config::AppConfig;
use crate::search::SearchAdapter;
use crate::tools::build_registry;

#[derive(Parser)]
#[command(name = "search-mcp")]
#[command(about = "Web search MCP server over stdio")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the MCP server on stdin/stdout (default)
    Serve,
    /// Run one search and print the formatted results
    Query {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: u32,
    },
    /// Validate and print the effective configuration
    Config,
    /// Print the advertised tool descriptors as JSON
    Tools,
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match AppConfig::from_env_and_toml() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = crate::infra::logging::init(&cfg.logging) {
        tracing::info!(log_file = %path.display(), "logging to file");
    }

    run_commands(cli.command.unwrap_or(Commands::Serve), &cfg).await
}

pub async fn run_commands(command: Commands, cfg: &AppConfig) -> ExitCode {
    match command {
        Commands::Serve => match crate::infra::boot::run_server(cfg).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "server stopped with error");
                ExitCode::FAILURE
            }
        },
        Commands::Query { query, max_results } => {
            println!("{}", one_shot_search(cfg, &query, max_results).await);
            ExitCode::SUCCESS
        }
        Commands::Config => match cfg.validate() {
            Ok(()) => {
                print_config(cfg);
                println!("✅ Configuration is valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Tools => match tools_json() {
            Ok(s) => {
                println!("{s}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Failed to render tools: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn one_shot_search(cfg: &AppConfig, query: &str, max_results: u32) -> String {
    let adapter = SearchAdapter::new(crate::infra::boot::provider_from_config(cfg));
    adapter.search(query, max_results.max(1)).await
}

fn tools_json() -> Result<String, serde_json::Error> {
    let tools: Vec<_> = build_registry()
        .list_tools()
        .iter()
        .map(|t| t.to_mcp_tool())
        .collect();
    serde_json::to_string_pretty(&serde_json::json!({ "tools": tools }))
}

fn print_config(cfg: &AppConfig) {
    println!("📋 Configuration:");
    println!("  Search backend: {}", cfg.search.base_url());
    println!("  Timeout: {} ms", cfg.search.timeout().as_millis());
    println!("  Connect timeout: {} ms", cfg.search.connect_timeout().as_millis());
    println!("  Retries: {}", cfg.search.retries());
    println!(
        "  Log file dir: {}",
        cfg.logging.log_dir().unwrap_or("(disabled)")
    );
    println!(
        "  Log level: {}",
        std::env::var("RUST_LOG").unwrap_or_else(|_| cfg.logging.level().to_string())
    );
}
