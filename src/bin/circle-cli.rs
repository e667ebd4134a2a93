use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "circle-cli")]
#[command(about = "Client for a running circle-proxy", long_about = None)]
struct Cli {
    #[arg(long, default_value = "http://localhost:7076")]
    url: String,

    /// Username for basic auth
    #[arg(short, long)]
    username: Option<String>,

    /// Password for basic auth
    #[arg(short, long)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the proxy answers /ping
    Ping,
    /// Show backend health per circle
    Health {
        /// Include buffer statistics
        #[arg(long)]
        stats: bool,
    },
    /// Run an InfluxQL statement
    Query {
        q: String,
        #[arg(long)]
        db: Option<String>,
    },
    /// Write line protocol read from a file ("-" for stdin)
    Write {
        #[arg(long)]
        db: String,
        #[arg(long, default_value = "ns")]
        precision: String,
        file: PathBuf,
    },
    /// Validate a configuration file without starting the proxy
    Check { config: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let auth = |req: reqwest::RequestBuilder| match &cli.username {
        Some(u) => req.basic_auth(u, cli.password.as_deref()),
        None => req,
    };

    match &cli.command {
        Commands::Ping => {
            let res = client.get(format!("{}/ping", cli.url)).send().await?;
            let version = res
                .headers()
                .get("x-influxdb-version")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            println!("{} (version {})", res.status(), version);
        }
        Commands::Health { stats } => {
            let res = client
                .get(format!("{}/health", cli.url))
                .query(&[("stats", stats.to_string())])
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Query { q, db } => {
            let mut form = vec![("q", q.clone())];
            if let Some(db) = db {
                form.push(("db", db.clone()));
            }
            let res = auth(client.post(format!("{}/query", cli.url)))
                .form(&form)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Write { db, precision, file } => {
            let body = if file.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
                buf
            } else {
                std::fs::read_to_string(file)?
            };
            let res = auth(client.post(format!("{}/write", cli.url)))
                .query(&[("db", db.as_str()), ("precision", precision.as_str())])
                .body(body)
                .send()
                .await?;
            if res.status().is_success() {
                println!("{}", res.status());
            } else {
                print_response(res).await?;
            }
        }
        Commands::Check { config } => match circle_proxy::config::load_config(config) {
            Ok(c) => println!(
                "{}: ok ({} circles, {} backends)",
                config.display(),
                c.circles.len(),
                c.circles.iter().map(|c| c.backends.len()).sum::<usize>()
            ),
            Err(e) => {
                eprintln!("{}: {}", config.display(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
