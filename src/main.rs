use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use hdb_resale_price_predictor::{
    api, fetch_model_artifact, load_model, Predictor, PropertyRequest,
};
use tracing_subscriber::EnvFilter;

/// HDB resale price predictor
#[derive(Parser, Debug)]
#[command(name = "hdb-resale")]
#[command(version)]
#[command(about = "Estimate Singapore HDB resale prices with a pre-trained XGBoost model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON prediction API
    Serve {
        /// Host to bind to
        #[arg(long, env = "HDB_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "8080")]
        port: u16,

        #[command(flatten)]
        model: ModelArgs,
    },
    /// Predict the price of a single flat and print it
    Predict {
        #[arg(long, default_value = "148.0")]
        floor_area: f64,

        #[arg(long, default_value = "1992")]
        lease_commence_year: i32,

        #[arg(long, default_value = "520329")]
        postal_code: u32,

        #[arg(long, default_value = "ANG MO KIO")]
        town: String,

        #[arg(long, default_value = "3 ROOM")]
        flat_type: String,

        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Path to the XGBoost model file
    #[arg(long, env = "HDB_MODEL_PATH", default_value = "models/hdb_resale_model.json")]
    model_path: PathBuf,

    /// Download the model from this URL if it is not present locally
    #[arg(long, env = "HDB_MODEL_URL")]
    model_url: Option<String>,
}

// Steps
// 1. Fetch the model artifact if a URL was given
// 2. Load it once; a load failure stops the process
// 3. Serve requests, or answer a single prediction
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Command::Serve { host, port, model } => {
            let predictor = load_predictor(&model).await?;

            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid listen address {host}:{port}"))?;

            api::serve(addr, predictor).await
        }
        Command::Predict {
            floor_area,
            lease_commence_year,
            postal_code,
            town,
            flat_type,
            model,
        } => {
            let request = PropertyRequest {
                floor_area_sqm: floor_area,
                lease_commence_year,
                postal_code,
                town,
                flat_type,
                current_year: None,
            };
            let input = request.validate()?;

            let predictor = load_predictor(&model).await?;
            let result = predictor.predict(&input)?;

            println!("Predicted price: {}", result.formatted_price);
            println!("(rounded to the nearest $1,000; actual transacted prices may vary)");
            println!();
            println!("Floor Area: {} sqm", result.property.floor_area_sqm);
            println!("Town: {}", result.property.town);
            println!("Flat Type: {}", result.property.flat_type);
            println!("Lease Commencement Date: {}", result.property.lease_commence_year);
            println!("Postal Code: {}", result.property.postal_code);
            println!("Assumed Current Year: {}", result.property.assumed_current_year);

            Ok(())
        }
    }
}

async fn load_predictor(args: &ModelArgs) -> anyhow::Result<Predictor> {
    if let Some(url) = &args.model_url {
        fetch_model_artifact(url, &args.model_path).await?;
    }

    let path: &Path = &args.model_path;
    let predictor = Predictor::from_load(load_model(path));

    // nothing can be served without a model
    predictor.ensure_available().with_context(|| {
        format!(
            "could not load the model, check that {} exists",
            path.display()
        )
    })?;

    tracing::info!(model = %predictor.info().detail, "predictor ready");

    Ok(predictor)
}
