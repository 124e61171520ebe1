//! Command-line entry point for the rainfall pipeline.

use clap::{Parser, Subcommand};
use rainfall::{DashboardInputs, Pipeline, PipelineConfig, RainfallError};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rainfall", about = "Rainfall forecasting pipeline")]
struct Cli {
    /// JSON config file. Omitted fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily temperature and precipitation per location
    Fetch,
    /// Add humidity, cloud and soil moisture to the downloaded files
    Enhance,
    /// Merge every enhanced file into one table
    Combine,
    /// Impute and derive model features from the combined table
    Engineer,
    /// Grid-search a forest and save it as the next model version
    Train,
    /// Predict rainfall for one day with the latest model
    Predict {
        /// Maximum temperature (°C)
        #[arg(long)]
        max_temp: f64,
        /// Minimum temperature (°C)
        #[arg(long)]
        min_temp: f64,
        /// Relative humidity (%)
        #[arg(long)]
        humidity: f64,
        /// Cloud cover (%)
        #[arg(long)]
        cloud_cover: f64,
        /// Month of the year (1-12)
        #[arg(long)]
        month: u32,
    },
    /// Print precipitation summaries of the feature table
    Summary,
}

#[tokio::main]
async fn main() -> Result<(), RainfallError> {
    env_logger::init();
    configure_polars_display();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = Pipeline::new(config)?;

    match cli.command {
        Commands::Fetch => {
            let written = pipeline.fetch_basic().await?;
            println!("Fetched {} locations", written.len());
        }
        Commands::Enhance => {
            let written = pipeline.enhance().await?;
            println!("Enhanced {} locations", written.len());
        }
        Commands::Combine => {
            let summary = pipeline.combine()?;
            println!(
                "Combined {} into {} ({} rows)",
                summary.locations.join(", "),
                summary.path.display(),
                summary.rows
            );
        }
        Commands::Engineer => {
            let engineered = pipeline.engineer()?;
            println!("Engineered {} rows", engineered.height());
        }
        Commands::Train => {
            let (report, path) = pipeline.train()?;
            println!(
                "Model v{} ({}) CV MAE {:.4} saved to {}",
                report.version,
                report.best_params,
                report.best_mae,
                path.display()
            );
        }
        Commands::Predict {
            max_temp,
            min_temp,
            humidity,
            cloud_cover,
            month,
        } => {
            let forecaster = pipeline.forecaster()?;
            let forecast = forecaster.forecast(&DashboardInputs {
                max_temp,
                min_temp,
                humidity,
                cloud_cover,
                month,
            })?;
            println!("Predicted rainfall: {:.2} mm", forecast.precipitation);
            println!("Confidence: {:.0}%", forecast.confidence * 100.0);
            println!("Advisory: {}", forecast.advisory);
            println!(
                "Season: {}{}",
                forecast.season,
                if forecast.is_monsoon { " (monsoon)" } else { "" }
            );
            println!("Model: v{}", forecast.model_version);
        }
        Commands::Summary => {
            let summary = pipeline.summarize(&pipeline.history()?)?;
            println!("{}", summary.locations);
            println!("{}", summary.monthly);
            println!("{}", summary.seasonal);
        }
    }

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
