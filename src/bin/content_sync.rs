use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use travel_provider_core::config::ProviderSettings;
use travel_provider_core::hotelbeds::HotelbedsClient;
use travel_provider_core::http::build_client;
use travel_provider_core::retry::{with_backoff, RetryConfig};
use travel_provider_core::store::ReferenceStores;
use travel_provider_core::sync::{page_windows, ContentCategory, ContentSyncPipeline, PageRequest};
use travel_provider_core::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "content_sync", version, about = "Mirror the hotel content feed")]
struct Cli {
    /// Categories to sync (comma-separated); all of them when omitted
    #[arg(long, value_delimiter = ',')]
    category: Vec<ContentCategory>,
    /// First record, 1-based
    #[arg(long, default_value_t = 1)]
    from: u32,
    /// Last record, inclusive
    #[arg(long, default_value_t = 1000)]
    to: u32,
    #[arg(long, default_value_t = 100)]
    page_size: u32,
    #[arg(long, default_value = "ENG")]
    language: String,
    /// Only records changed since this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    init_tracing("info,travel_provider_core=debug")?;

    let cli = Cli::parse();
    let settings = ProviderSettings::from_env().context("loading provider settings")?;
    let client = build_client(&settings.http).context("building http client")?;

    let feed = Arc::new(HotelbedsClient::new(client, settings.hotelbeds.clone()));
    let pipeline = ContentSyncPipeline::new(feed, ReferenceStores::in_memory());
    let retry = RetryConfig::default();

    let categories = if cli.category.is_empty() {
        ContentCategory::ALL.to_vec()
    } else {
        cli.category.clone()
    };

    for category in categories {
        let started = Instant::now();
        let (mut written, mut failed) = (0usize, 0usize);

        for (from, to) in page_windows(cli.from, cli.to, cli.page_size) {
            let mut request = PageRequest::new(from, to, cli.language.clone());
            if let Some(since) = &cli.since {
                request = request.with_since(since.clone());
            }

            let report = match with_backoff(&retry, category.as_str(), || {
                pipeline.sync_page(category, &request)
            })
            .await
            {
                Ok(report) => report,
                Err(err) => {
                    error!(
                        category = %category,
                        from,
                        to,
                        kind = ?err.kind,
                        error = %err.message,
                        "page failed, skipping category"
                    );
                    break;
                }
            };

            for failure in &report.failures {
                warn!(
                    category = %category,
                    index = failure.index,
                    key = ?failure.key,
                    error = %failure.error.message,
                    "record skipped"
                );
            }
            info!(
                category = %category,
                from = report.from,
                to = report.to,
                received = report.received,
                inserted = report.inserted,
                updated = report.updated,
                failed = report.failed(),
                total = ?report.total,
                "page synced"
            );
            written += report.records_processed();
            failed += report.failed();

            if report.is_last_page() {
                break;
            }
        }

        info!(
            category = %category,
            written,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "category done"
        );
    }

    Ok(())
}
