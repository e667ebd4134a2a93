//! circle-proxy: an InfluxDB-compatible write/query proxy.
//!
//! ```text
//!     Client                ┌──────────────────────────────────────────────┐
//!     ─────────────────────▶│ http (/write, /query, /ping, /health)        │
//!                           │        │                                     │
//!                           │        ▼                                     │
//!                           │ proxy: line checks → RoutingKey → circle     │
//!                           │        │ (assignment cache pins db,meas.)    │
//!                           │        ▼                                     │
//!                           │ circle: jump hash → backend                  │
//!                           │        │                                     │
//!                           │        ▼                                     │
//!                           │ HttpBackend buffer → flusher ────────────────┼──▶ InfluxDB
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser)]
#[command(name = "circle-proxy")]
#[command(about = "Circle-sharded InfluxDB proxy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "circle-proxy.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match circle_proxy::lifecycle::run(&cli.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logging may not be initialized yet when config loading fails.
            eprintln!("circle-proxy: {}", e);
            tracing::error!(error = %e, "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}
