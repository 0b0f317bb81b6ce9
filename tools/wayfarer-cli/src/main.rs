//! Wayfarer command line interface.
//! Runs the capability agents and the planner, and plans trips from the shell.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use wayfarer_core::config::{DEFAULT_CAR_AGENT_URL, DEFAULT_HOTEL_AGENT_URL, DEFAULT_PLANNER_ADDR};
use wayfarer_core::logging::{self, LogFormat};
use wayfarer_core::{PlannerConfig, TravelCapability};
use wayfarer_llm::LlmConfig;

#[derive(Parser)]
#[command(name = "wayfarer", author, version, about, long_about = None)]
struct Cli {
    /// Log output format (pretty or json)
    #[arg(long, global = true, env = "WAYFARER_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hotel search agent
    HotelAgent(AgentArgs),

    /// Run the car rental search agent
    CarAgent(AgentArgs),

    /// Run the planner Front Door
    Planner {
        /// Address to bind
        #[arg(long, env = "WAYFARER_PLANNER_ADDR", default_value = DEFAULT_PLANNER_ADDR)]
        addr: String,

        #[command(flatten)]
        planner: PlannerArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Plan one trip and print the result
    Plan {
        #[command(flatten)]
        trip: commands::plan::TripArgs,

        /// Print the raw JSON plan
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        planner: PlannerArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Show peer health and connection metrics of a running planner
    Status {
        /// Front Door base URL
        #[arg(long, env = "WAYFARER_PLANNER_URL", default_value = "http://127.0.0.1:8000")]
        planner_url: String,
    },
}

#[derive(Args)]
pub struct AgentArgs {
    /// Address to bind; defaults to the agent's well-known port
    #[arg(long)]
    addr: Option<String>,

    /// URL advertised on the agent card
    #[arg(long)]
    public_url: Option<String>,

    #[arg(long, env = "SERPER_API_KEY", hide_env_values = true, default_value = "")]
    serper_api_key: String,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args)]
pub struct PlannerArgs {
    /// YAML planner configuration
    #[arg(long, short, env = "WAYFARER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "HOTEL_AGENT_URL")]
    hotel_agent_url: Option<String>,

    #[arg(long, env = "CAR_AGENT_URL")]
    car_agent_url: Option<String>,
}

impl PlannerArgs {
    /// File configuration, with agent URL flags overriding the defaults.
    fn load(&self) -> Result<PlannerConfig> {
        let mut config = match &self.config {
            Some(path) => PlannerConfig::load(path)?,
            None => PlannerConfig::default(),
        };
        for peer in &mut config.peers {
            let override_url = if peer.url == DEFAULT_HOTEL_AGENT_URL {
                self.hotel_agent_url.as_ref()
            } else if peer.url == DEFAULT_CAR_AGENT_URL {
                self.car_agent_url.as_ref()
            } else {
                None
            };
            if let Some(url) = override_url {
                peer.url = url.clone();
            }
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
pub struct LlmArgs {
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, default_value = "")]
    groq_api_key: String,

    #[arg(long, env = "WAYFARER_LLM_BASE_URL", default_value = wayfarer_llm::DEFAULT_BASE_URL)]
    llm_base_url: String,

    #[arg(long, env = "WAYFARER_LLM_MODEL", default_value = wayfarer_llm::DEFAULT_MODEL)]
    llm_model: String,
}

impl LlmArgs {
    fn config(&self) -> LlmConfig {
        LlmConfig::default()
            .with_api_key(&self.groq_api_key)
            .with_base_url(&self.llm_base_url)
            .with_model(&self.llm_model)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.log_format)?;

    match cli.command {
        Commands::HotelAgent(args) => {
            commands::agent::run(TravelCapability::Hotel, DEFAULT_HOTEL_AGENT_URL, args).await
        }
        Commands::CarAgent(args) => {
            commands::agent::run(TravelCapability::CarRental, DEFAULT_CAR_AGENT_URL, args).await
        }
        Commands::Planner { addr, planner, llm } => {
            commands::planner::run(&addr, planner.load()?, llm.config()).await
        }
        Commands::Plan {
            trip,
            json,
            planner,
            llm,
        } => commands::plan::run(trip, json, planner.load()?, llm.config()).await,
        Commands::Status { planner_url } => commands::status::run(&planner_url).await,
    }
}
