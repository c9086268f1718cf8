use std::io::{self, Write};

use anyhow::{Context, Result};
use futures::{pin_mut, StreamExt};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use freshdesk_connector::{cli, config, TicketPollConnector};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = cli::parse_args(&args)?;
    if args.help {
        cli::print_help();
        return Ok(());
    }

    let path = args.config_path.clone().unwrap_or_else(config::config_path);
    let mut connector_config = config::load_config(&path)?.freshdesk;
    if let Some(batch_size) = args.batch_size {
        connector_config.batch_size = batch_size;
    }

    let connector = TicketPollConnector::from_config(connector_config)
        .context("Set freshdesk domain and api_key in the config file or FD_DOMAIN/FD_API_KEY")?;

    let end = chrono::Utc::now().timestamp();
    let start = args
        .hours
        .checked_mul(60 * 60)
        .and_then(|window| end.checked_sub(window))
        .context("--hours window is out of range")?;
    info!(start, end, "Polling Freshdesk");

    let batches = connector.poll_source(start, end);
    pin_mut!(batches);

    let mut stdout = io::stdout().lock();
    let mut count = 0usize;
    while let Some(batch) = batches.next().await {
        let batch = batch.context("Freshdesk poll failed")?;
        for doc in &batch {
            writeln!(stdout, "{}", serde_json::to_string(doc)?)?;
        }
        count += batch.len();
    }

    info!(documents = count, "Done");
    Ok(())
}
