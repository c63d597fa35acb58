//! PrintFlow CLI - bridge interface for the order service
//!
//! Outputs JSON to stdout, logs to stderr.
//! Exit codes: 0 success, 1 failure, 2 rejected status transition.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use printflow_core::{
    catalog::ProductCatalog, config::DEFAULT_AI_TIMEOUT_SECS, Config, FulfillmentPipeline, JsonFileStore, LabelFields, MockupRequest, NewOrder,
    OrderStatus, PipelineError, ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "printflow-cli")]
#[command(version = ENGINE_VERSION)]
#[command(about = "PrintFlow CLI - custom apparel order fulfillment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to product templates directory
    #[arg(short, long, env = "PRINTFLOW_TEMPLATES_DIR", default_value = "assets/templates")]
    templates_dir: PathBuf,

    /// Root directory for mockups, labels and uploads
    #[arg(short, long, env = "PRINTFLOW_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// JSON record store file
    #[arg(short, long, env = "PRINTFLOW_STORE_FILE", default_value = "printflow.json")]
    store: PathBuf,

    /// Per-request bound for AI generation and remote logo fetches
    #[arg(
        long,
        env = "PRINTFLOW_AI_TIMEOUT_SECS",
        default_value_t = DEFAULT_AI_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    ai_timeout_secs: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Write placeholder templates for every catalog product
    SeedTemplates,

    /// Store a logo file under uploads/
    Upload {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Create an order without a mockup
    Create {
        #[arg(short, long)]
        product: String,
        #[arg(short, long)]
        color: String,
        #[arg(long, default_value = "")]
        size: String,
    },

    /// Create an order and composite its mockup
    Place {
        #[arg(short, long)]
        product: String,
        #[arg(short, long)]
        color: String,
        #[arg(long, default_value = "")]
        size: String,
        /// Local reference (/uploads/...) or http(s) URL
        #[arg(short, long)]
        logo: Option<String>,
    },

    /// List all orders
    List,

    /// Show one order with its asset
    Show {
        #[arg(short, long)]
        id: u64,
    },

    /// Generate a mockup for an existing order
    Mockup {
        #[arg(short, long)]
        id: u64,
        #[arg(short, long)]
        logo: Option<String>,
        /// Free-text design prompt for AI generation
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Approve an order with a generated mockup
    Approve {
        #[arg(short, long)]
        id: u64,
    },

    /// Mark an approved order ready for fulfillment
    Ready {
        #[arg(short, long)]
        id: u64,
    },

    /// Apply an explicit status transition
    Transition {
        #[arg(short, long)]
        id: u64,
        #[arg(short, long)]
        status: OrderStatus,
    },

    /// Generate a shipping label PDF
    Label {
        #[arg(short, long)]
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
    },

    /// List available garment colors
    Colors,

    /// Delete all orders and assets
    Reset,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config {
        data_dir: cli.data_dir,
        templates_dir: cli.templates_dir,
        store_file: cli.store,
        ai_timeout_secs: cli.ai_timeout_secs,
        ..Config::from_env()
    };

    let store = match JsonFileStore::open(&config.store_file) {
        Ok(s) => s,
        Err(e) => {
            println!("{}", json!({"success": false, "error": format!("Failed to open store: {}", e)}));
            return ExitCode::FAILURE;
        }
    };
    let mut pipeline = FulfillmentPipeline::from_config(&config, store);

    match run(cli.command, &config, &mut pipeline) {
        Ok(output) => {
            println!("{:#}", json!({"success": true, "result": output}));
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", json!({"success": false, "error": e.to_string()}));
            let rejected = e
                .downcast_ref::<PipelineError>()
                .is_some_and(PipelineError::is_invalid_transition);
            if rejected {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(
    command: Commands,
    config: &Config,
    pipeline: &mut FulfillmentPipeline<JsonFileStore>,
) -> Result<Value, Box<dyn Error>> {
    let output = match command {
        Commands::SeedTemplates => {
            let written = ProductCatalog::default().seed_templates(&config.templates_dir)?;
            json!({ "written": written })
        }

        Commands::Upload { file } => {
            let bytes = std::fs::read(&file)?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let timestamp = chrono::Utc::now().timestamp();
            json!(pipeline.upload_logo(&filename, &bytes, timestamp)?)
        }

        Commands::Create { product, color, size } => {
            let input = NewOrder {
                product,
                color,
                size,
                logo_url: None,
            };
            json!(pipeline.create_order(&input)?)
        }

        Commands::Place {
            product,
            color,
            size,
            logo,
        } => {
            let input = NewOrder {
                product,
                color,
                size,
                logo_url: logo,
            };
            json!(pipeline.place_order(&input)?)
        }

        Commands::List => json!(pipeline.list_orders()?),

        Commands::Show { id } => json!({
            "order": pipeline.get_order(id)?,
            "asset": pipeline.asset(id)?,
        }),

        Commands::Mockup { id, logo, prompt } => {
            let request = MockupRequest {
                logo_url: logo,
                ai_prompt: prompt,
            };
            json!(pipeline.generate_mockup(id, &request)?)
        }

        Commands::Approve { id } => json!(pipeline.approve(id)?),

        Commands::Ready { id } => json!(pipeline.mark_ready(id)?),

        Commands::Transition { id, status } => json!(pipeline.transition(id, status)?),

        Commands::Label {
            id,
            name,
            address,
            city,
            state,
            zip,
        } => {
            let fields = LabelFields {
                name,
                address,
                city,
                state,
                zip,
            };
            json!({ "label": pipeline.generate_label(id, &fields)? })
        }

        Commands::Colors => json!(pipeline.available_colors()),

        Commands::Reset => {
            pipeline.reset()?;
            json!({ "cleared": true })
        }
    };
    Ok(output)
}
