mod analysis;
mod config;
mod github;
mod narrative;
mod report;
mod server;

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

/// Tech Health: scores the technical health of a GitHub repository and drafts
/// an investor-facing appendix from the numbers.
#[derive(Parser, Debug)]
#[command(name = "tech-health", version, about)]
struct Cli {
    /// Config file (defaults to .tech-health.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (POST /analyze, POST /ai)
    Serve {
        /// Address to bind (overrides [server].host)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on (overrides [server].port and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Analyze one repository and print the report
    Analyze {
        /// GitHub repository URL (e.g., https://github.com/acme/widget)
        repo_url: String,

        /// Also generate the investor-facing narrative
        #[arg(long)]
        narrative: bool,

        /// Write a markdown report to this path instead of the terminal
        #[arg(short, long, conflicts_with = "json")]
        output: Option<PathBuf>,

        /// Print the raw analyzer JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port } => {
            let host = match host {
                Some(host) => host,
                None => config.server.host.parse()?,
            };
            let addr = SocketAddr::new(host, port.unwrap_or(config.server.port));
            let state = server::AppState::from_config(&config)?;
            server::serve(state, addr).await?;
        }
        Command::Analyze {
            repo_url,
            narrative: with_narrative,
            output,
            json,
        } => {
            let _main_span = info_span!("analyze", repo_url = %repo_url).entered();

            info!("parsing repository URL");
            let id = github::parse_repo_url(&repo_url)?;
            debug!(owner = %id.owner, name = %id.name, "parsed repository URL");

            let signals = analysis::PathSignals::new(&config.patterns)?;
            let client = github::GitHubClient::from_config(&config)?;

            info!("fetching repository data from GitHub");
            let built_report = analysis::analyze(&client, &signals, &id, Utc::now()).await?;
            info!(
                technical = built_report.scores.technical_health.value,
                effectiveness = built_report.scores.effectiveness.value,
                "analysis complete"
            );

            let narrative_text = if with_narrative {
                info!("generating narrative");
                let generator = narrative::AnthropicClient::from_config(&config);
                Some(narrative::generate_narrative(&generator, &built_report).await?)
            } else {
                None
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&built_report)?);
                if let Some(text) = &narrative_text {
                    println!("{}", text);
                }
            } else {
                report::output(&built_report, narrative_text.as_deref(), output.as_deref())?;
            }
            info!(combined = built_report.scores.combined, "done");
        }
    }

    Ok(())
}
