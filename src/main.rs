//! desklink - stream every ticket of a helpdesk
//!
//! Prints one `id<TAB>subject` line per ticket on stdout. Logs go to stderr.
//! Ctrl+C stops after the page being printed.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `HELPDESK_BASE_URL`: Base URL of the helpdesk
//! - `HELPDESK_API_KEY`: API key for authentication
//!
//! # Usage
//!
//! ```bash
//! HELPDESK_BASE_URL=https://acme.helpdesk.example HELPDESK_API_KEY=xxx ./desklink
//! ```

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use desklink::paginate::Progress;
use desklink::{Config, HelpdeskClient, ListQuery, PaginateOptions, TicketQuery};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    // stdout carries the ticket list
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("desklink=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting desklink v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::debug!("Configuration loaded, base_url: {}", config.base_url);

    let client = HelpdeskClient::new(&config).context("Failed to create helpdesk client")?;

    tracing::info!("Testing connection to helpdesk...");
    client
        .test_connection()
        .await
        .context("Helpdesk is not reachable")?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, finishing current page");
            on_ctrl_c.cancel();
        }
    });

    let options = PaginateOptions::new()
        .with_cancel(cancel.clone())
        .with_observer(|progress| {
            if let Progress::PageFetched { page, total_so_far, .. } = progress {
                tracing::info!(page, total_so_far, "Page done");
            }
        });

    let mut tickets = client
        .tickets()
        .stream(TicketQuery::new().with_per_page(100), options);

    let mut count = 0u64;
    while let Some(ticket) = tickets.next().await {
        let ticket = ticket.context("Failed to fetch tickets")?;
        println!("{}\t{}", ticket.id, ticket.display_subject());
        count += 1;
    }

    let rate_limit = client.rate_limit();
    tracing::info!(
        count,
        cancelled = cancel.is_cancelled(),
        remaining = rate_limit.remaining,
        "Done"
    );

    Ok(())
}
