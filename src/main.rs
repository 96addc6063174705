use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use quotebind::application::workflow::QuoteWorkflow;
use quotebind::config::{self, CarrierConfig};
use quotebind::domain::ports::{CarrierGateway, CarrierGatewayRef};
use quotebind::infrastructure::http::HttpCarrierGateway;
use quotebind::infrastructure::in_memory::InMemoryCarrier;
use quotebind::interfaces::csv::application_reader::ApplicationReader;
use quotebind::interfaces::csv::outcome_writer::{ApplicationOutcome, OutcomeWriter};
use std::env;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input applications CSV file
    #[arg(required_unless_present = "health")]
    input: Option<PathBuf>,

    /// Carrier base URL [env: CARRIER_BASE_URL]. Without one, the in-process
    /// sandbox carrier is used.
    #[arg(long)]
    carrier_url: Option<String>,

    /// Bearer token sent to the carrier [env: CARRIER_API_KEY]
    #[arg(long)]
    api_key: Option<String>,

    /// Quote package identifier sent to the carrier [env: CARRIER_QUOTE_PACKAGE_ID]
    #[arg(long)]
    package_id: Option<String>,

    /// Per-call timeout in seconds [env: CARRIER_TIMEOUT_SECS, default: 30]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Only check the carrier's liveness endpoint
    #[arg(long)]
    health: bool,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quotebind=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Flags take precedence over the environment.
    let carrier_config = CarrierConfig::from_lookup(|key| {
        let flag = match key {
            config::ENV_BASE_URL => cli.carrier_url.clone(),
            config::ENV_API_KEY => cli.api_key.clone(),
            config::ENV_PACKAGE_ID => cli.package_id.clone(),
            config::ENV_TIMEOUT_SECS => cli.timeout_secs.map(|secs| secs.to_string()),
            _ => None,
        };
        flag.or_else(|| env::var(key).ok())
    })
    .into_diagnostic()?;

    let (gateway, timeout): (CarrierGatewayRef, Duration) = match carrier_config {
        Some(config) => {
            info!(base_url = %config.base_url, timeout_secs = config.timeout.as_secs(), "Using HTTP carrier");
            let timeout = config.timeout;
            (Arc::new(HttpCarrierGateway::new(config).into_diagnostic()?), timeout)
        }
        None => {
            eprintln!(
                "WARNING: No carrier URL configured (--carrier-url or {}). Falling back to the in-memory sandbox carrier.",
                config::ENV_BASE_URL
            );
            (Arc::new(InMemoryCarrier::new()), config::DEFAULT_TIMEOUT)
        }
    };

    if cli.health {
        gateway
            .health()
            .await
            .map_err(|e| miette!("Carrier health check failed: {}", e))?;
        println!("carrier is healthy");
        return Ok(());
    }

    let Some(input) = cli.input else {
        return Err(miette!("an input CSV file is required"));
    };

    // Leave headroom over the HTTP client's own timeout so it reports first.
    let workflow = QuoteWorkflow::new(gateway).with_call_timeout(timeout + Duration::from_secs(1));

    let file = File::open(input).into_diagnostic()?;
    let reader = ApplicationReader::new(file);
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());

    for (index, row_result) in reader.applications().enumerate() {
        let row_number = index + 1;
        let row = match row_result {
            Ok(row) => row,
            Err(e) => {
                eprintln!("Error reading application {}: {}", row_number, e);
                continue;
            }
        };

        if let Err(e) = workflow.submit_customer_info(row.customer_form()).await {
            eprintln!("Error processing application {}: {}", row_number, e);
        } else if let Err(e) = workflow.submit_payment(row.payment_form()).await {
            eprintln!("Error processing application {}: {}", row_number, e);
        }

        let snapshot = workflow.snapshot().await;
        writer
            .write_outcome(&ApplicationOutcome::from_snapshot(row_number, &snapshot))
            .into_diagnostic()?;
        workflow.reset().await.into_diagnostic()?;
    }

    writer.flush().into_diagnostic()?;
    Ok(())
}
