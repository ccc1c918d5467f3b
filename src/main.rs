mod commands;
#[cfg(feature = "mcp")]
mod mcp;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::Workspace;
use dashsearch::CollectionSelector;

#[derive(Parser)]
#[command(name = "dashsearch")]
#[command(about = "Semantic search over dashboard metadata", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Workspace root (default: current directory)")]
    root: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Verbose logging on stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List workbooks and the "All" collection
    Collections {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Store extracted dashboard metadata (JSON array) for a workbook
    Import {
        workbook: String,
        file: PathBuf,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Rebuild the search index of a collection
    Build {
        #[arg(help = "Workbook name or \"All\" (default: All)")]
        collection: Option<CollectionSelector>,
        #[arg(long, conflicts_with = "collection", help = "Rebuild every workbook, then All")]
        each: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Semantic search in one collection
    Search {
        collection: CollectionSelector,
        query: String,
        #[arg(short, long, help = "Number of results (default: 5)")]
        k: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show record and index counts per collection
    Status {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Remove indexes of workbooks whose metadata was deleted
    Prune {
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== MCP Server =====
    /// Start MCP server over stdio
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show client configuration instructions")]
        install: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "dashsearch=debug" } else { "dashsearch=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries JSON output and the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let workspace = Workspace::open(cli.root)?;

    match cli.command {
        Commands::Collections { json } => commands::collections::run(&workspace, json),
        Commands::Import {
            workbook,
            file,
            json,
        } => commands::import::run(&workspace, &workbook, &file, json),
        Commands::Build {
            collection,
            each,
            json,
        } => commands::build::run(&workspace, collection, each, json),
        Commands::Search {
            collection,
            query,
            k,
            json,
        } => commands::search::run(&workspace, &collection, &query, k, json),
        Commands::Status { json } => commands::status::run(&workspace, json),
        Commands::Prune { json } => commands::prune::run(&workspace, json),

        // MCP Server
        #[cfg(feature = "mcp")]
        Commands::Mcp { install } => {
            if install {
                print_mcp_install_instructions(&workspace);
                Ok(())
            } else {
                run_mcp_server(workspace)
            }
        }
    }
}

#[cfg(feature = "mcp")]
fn run_mcp_server(workspace: Workspace) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(mcp::run_mcp_server(workspace.root, workspace.config))
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions(workspace: &Workspace) {
    use colored::Colorize;

    let root = workspace.root.to_string_lossy().to_string();
    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "dashsearch".to_string());

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP client configuration:");
    println!();
    println!(r#"{{
  "mcpServers": {{
    "dashboard-search": {{
      "command": "{}",
      "args": ["mcp", "--root", "{}"]
    }}
  }}
}}"#, binary_path, root);
    println!();
    println!("{}", "Available tools:".bold());
    println!("  • {} - Semantic search in a workbook or All", "dashboard_search".green());
    println!("  • {} - List workbooks and index state", "dashboard_collections".green());
    println!("  • {} - Rebuild a collection index", "dashboard_build".green());
    println!("  • {} - Get one dashboard's metadata", "dashboard_get".green());
    println!("  • {} - Index status summary", "dashboard_status".green());
}
