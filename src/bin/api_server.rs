//! REST API Server for the container demand forecast
//!
//! Usage:
//!   ./target/release/api_server [--port PORT] [--data PATH] [pipeline options]
//!
//! REST endpoints:
//!   GET /api/v1/health                        - Health check
//!   GET /api/v1/filters                       - Container types and hubs
//!   GET /api/v1/summary                       - Delivery counts for charts
//!   GET /api/v1/report?container=X&hub=Y      - Full dashboard report
//!   GET /api/v1/forecast?container=X&hub=Y    - Series and forecast band
//!   GET /api/v1/accuracy?container=X&hub=Y    - MAPE / RMSE
//!   GET /api/v1/breakdown?container=X&hub=Y   - Next-day attribution

use anyhow::Result;
use clap::Parser;
use depot_forecast::api::{self, ForecastService};
use depot_forecast::config::PipelineArgs;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "api_server")]
#[command(about = "Serve the container demand forecast over REST")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "DEPOT_PORT", default_value_t = 8080)]
    port: u16,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

fn print_banner(port: u16, service: &ForecastService) {
    println!("============================================================");
    println!("         CONTAINER DEMAND FORECAST API SERVER");
    println!("============================================================");
    println!();
    println!("  Port:     {}", port);
    println!("  REST:     http://localhost:{}/api/v1/", port);
    println!("  Data:     {}", service.config().data_path.display());
    println!("  Records:  {}", service.record_count());
    println!();
    println!("REST Endpoints:");
    println!("  GET /api/v1/health              Health check");
    println!("  GET /api/v1/filters             Drop-down values");
    println!("  GET /api/v1/summary             Delivery counts");
    println!("  GET /api/v1/report              Full report");
    println!("  GET /api/v1/forecast            Forecast series");
    println!("  GET /api/v1/accuracy            Accuracy metrics");
    println!("  GET /api/v1/breakdown           Next-day breakdown");
    println!();
    println!("  Selection: ?container=<type|All>&hub=<hub|All>");
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();
    let config = args.pipeline.into_config();

    let service = match ForecastService::load(config) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    };

    print_banner(args.port, &service);

    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let app = api::router(service);
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
