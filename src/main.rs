use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use open_gemdocs::browser;
use open_gemdocs::config::{default_config_path, load_config, save_config, GemdocsConfig};
use open_gemdocs::docs::{format_docs_as_json, format_docs_as_markdown, RegistryProjector};
use open_gemdocs::errors::{GemdocsError, Result};
use open_gemdocs::gems::GemCli;
use open_gemdocs::mcp::{self, GemdocsTools, McpServer};
use open_gemdocs::yard::{StartOutcome, YardCli, YardProcess, YardServer};

/// Documentation for installed Ruby gems.
#[derive(Parser)]
#[command(
    name = "open-gemdocs",
    version,
    about = "Browse and serve documentation for installed Ruby gems"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server
    Serve {
        /// Port for the JSON-RPC endpoint
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Open a gem's documentation in the browser
    Browse {
        /// Name of the gem
        gem: String,
        /// Open this version instead of the locked or latest one
        #[arg(short, long, conflicts_with = "latest")]
        version: Option<String>,
        /// Ignore Gemfile.lock and open the latest version
        #[arg(long)]
        latest: bool,
        /// Use the local yard server instead of gemdocs.org
        #[arg(long)]
        local: bool,
    },
    /// Print structured documentation for a gem, or one of its objects
    Docs {
        /// Name of the gem
        gem: String,
        /// Class, module or method path, e.g. `Rake::Task#invoke`
        path: Option<String>,
        /// Print JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },
    /// Stop the local yard server
    Stop,
    /// Show whether the local yard server is running
    Status,
    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.or_else(default_config_path);
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => GemdocsConfig::default(),
    };
    let working_dir = current_dir();

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.mcp_port);
            let tools = GemdocsTools::from_config(&config, working_dir);
            let server = Arc::new(McpServer::new(tools));
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(mcp::serve(server, port))?;
        }
        Commands::Browse {
            gem,
            version,
            latest,
            local,
        } => {
            if local {
                browse_local(&config, &gem, &working_dir)?;
            } else {
                let url =
                    browser::browse_hosted(&gem, version.as_deref(), latest, &working_dir)?;
                println!("Opened {}", url);
            }
        }
        Commands::Docs { gem, path, json } => {
            let packages = Arc::new(GemCli::new(&config));
            let projector =
                RegistryProjector::new(packages, Arc::new(YardCli::new(&config)), &config);
            let projection = projector.project(&gem, path.as_deref())?;
            if json {
                println!("{}", format_docs_as_json(&projection));
            } else {
                println!("{}", format_docs_as_markdown(&projection));
            }
        }
        Commands::Stop => {
            let yard = yard_server(&config);
            if !yard.is_running() {
                println!("Yard server is not running");
            } else {
                let pids = yard.stop()?;
                println!("Yard server stopped successfully (PID: {})", join_pids(&pids));
            }
        }
        Commands::Status => {
            let yard = yard_server(&config);
            let status = yard.status();
            if !status.running {
                println!("Yard server is not running");
            } else {
                let pids = if status.pids.is_empty() {
                    "unknown".to_string()
                } else {
                    join_pids(&status.pids)
                };
                println!(
                    "Yard server is running (PID: {}) on port {}",
                    pids,
                    yard.port()
                );
                if let Some(dir) = status.serving_dir {
                    println!("Serving from: {}", dir.display());
                }
            }
        }
        Commands::Config { init } => {
            println!(
                "{}",
                serde_json::to_string_pretty(&config).unwrap_or_default()
            );
            if init {
                let path = config_path.ok_or_else(|| GemdocsError::Config {
                    message: "no configuration directory available".to_string(),
                })?;
                save_config(&path, &config)?;
                println!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

fn browse_local(config: &GemdocsConfig, gem: &str, working_dir: &std::path::Path) -> Result<()> {
    if gem.trim().is_empty() {
        return Err(GemdocsError::MissingArgument {
            name: "gem".to_string(),
        });
    }

    let yard = yard_server(config);
    if let StartOutcome::Started = yard.ensure_running(working_dir)? {
        println!("Started yard server on port {}", yard.port());
    }

    let url = yard.docs_url(gem, None);
    browser::open_url(&url)?;
    println!("Opened {}", url);
    println!("The yard server keeps running; stop it with `open-gemdocs stop`.");
    Ok(())
}

fn yard_server(config: &GemdocsConfig) -> YardServer {
    YardServer::new(Arc::new(YardProcess::new(config)), config)
}

fn join_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
