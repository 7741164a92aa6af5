use clap::Parser;
use parallel_get::{log_batch_failure, setup_logging, LogConfig, ParallelRequest, DEFAULT_TIMEOUT_MS};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

/// Fetch several urls at once and print the bodies in the order given.
#[derive(Parser, Debug)]
#[command(name = "parallel_get")]
struct Args {
    /// Per-request timeout in milliseconds, for connecting and for the whole response
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Print the result list as JSON instead of one body per line
    #[arg(long)]
    json: bool,

    /// Also write logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(required = true)]
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();

    setup_logging(LogConfig {
        file_output: args.log_dir.is_some(),
        log_dir: args.log_dir.clone().unwrap_or_else(|| PathBuf::from("logs")),
        ..LogConfig::default()
    })?;

    let request = ParallelRequest::with_timeout(args.timeout_ms, args.urls)?;
    info!(
        requests = request.requests().len(),
        timeout_ms = args.timeout_ms,
        "Dispatching batch"
    );

    let bodies = match request.get_result().await {
        Ok(bodies) => bodies,
        Err(e) => {
            log_batch_failure(&e);
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bodies)?);
    } else {
        for body in &bodies {
            println!("result: {body}");
        }
    }

    Ok(())
}
