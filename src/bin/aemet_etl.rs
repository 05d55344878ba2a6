use aemet_etl::{Credentials, EtlConfig, EtlError, EtlPipeline};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "aemet-etl")]
#[command(about = "Incremental ETL of AEMET daily climatological observations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Configuration file [default: config/config.yaml]")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(long, global = true, help = "Override today's date (YYYY-MM-DD)")]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract new observations, clean them and load them into the store
    Run,

    /// Extract new observations into the raw CSV only
    Extract,

    /// Clean an existing raw CSV and write the cleaned CSV
    Clean {
        #[arg(short, long, help = "Raw CSV [default: the configured raw store]")]
        input: Option<PathBuf>,
    },

    /// Load a cleaned CSV into the store
    Load {
        #[arg(short, long, help = "Cleaned CSV [default: the configured cleaned file]")]
        input: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

async fn run(cli: Cli) -> Result<(), EtlError> {
    let config = EtlConfig::load(cli.config.as_deref())?;
    let pipeline = EtlPipeline::new(config);
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    match cli.command {
        Commands::Run => {
            let api_key = Credentials::api_key()?;
            let database_url = Credentials::database_url()?;
            let summary = pipeline.run(&api_key, &database_url, today).await?;
            info!("{:?}", summary);
        }
        Commands::Extract => {
            let api_key = Credentials::api_key()?;
            let outcome = pipeline.extract(&api_key, today).await?;
            info!("Extracted {} rows ({:?})", outcome.rows.len(), outcome.summary);
        }
        Commands::Clean { input } => {
            let input = input.unwrap_or_else(|| pipeline.config().paths.raw_store());
            let (records, _) = pipeline.clean_file(&input).await?;
            info!("Cleaned file has {} records", records.len());
        }
        Commands::Load { input } => {
            let database_url = Credentials::database_url()?;
            let input = input.unwrap_or_else(|| pipeline.config().paths.cleaned_file());
            let loaded = pipeline.load_file(&input, &database_url).await?;
            info!("Loaded {} rows", loaded);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the variables may come from the environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(cause) = source {
                message.push_str(&format!(": {cause}"));
                source = cause.source();
            }
            error!("ETL pipeline failed: {}", message);
            ExitCode::FAILURE
        }
    }
}
