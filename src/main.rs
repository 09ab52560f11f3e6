//! renting-radar — Binary Entrypoint
//! Runs one reconciliation pass over the scraped snapshot (or keeps running on
//! an interval when `WATCH_INTERVAL_SECS` is set), prints the ranked report,
//! and emails it when SMTP is configured.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use renting_radar::enrich::openai::OpenAiGateway;
use renting_radar::enrich::DisabledGateway;
use renting_radar::notify::EmailSender;
use renting_radar::{report, snapshot, AppConfig, Reconciler, SharedGateway};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();
}

fn build_gateway() -> SharedGateway {
    if std::env::var("OPENAI_API_KEY").map(|k| !k.is_empty()).unwrap_or(false) {
        match OpenAiGateway::new(None) {
            Ok(gw) => return Arc::new(gw),
            Err(e) => tracing::warn!(error = %e, "openai gateway unavailable, enrichment disabled"),
        }
    } else {
        tracing::warn!("OPENAI_API_KEY not set, enrichment disabled");
    }
    Arc::new(DisabledGateway)
}

async fn run_pass(config: &AppConfig, reconciler: &Reconciler, mailer: &Option<EmailSender>) -> Result<()> {
    let incoming = snapshot::load_snapshot(&config.snapshot_path).await?;
    let outcome = reconciler.run_once(&incoming).await?;

    let text = report::render(&outcome);
    println!("{text}");

    if let Some(mailer) = mailer {
        let subject = format!("Renting radar: {}", outcome.summary);
        match mailer.send_report(&subject, &text).await {
            Ok(()) => tracing::info!("report emailed"),
            Err(e) => tracing::warn!(error = %e, "report email failed"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::from_env();
    let gateway = build_gateway();
    let reconciler = Reconciler::new(&config, gateway);
    let mailer = EmailSender::from_env()?;

    match config.watch_interval_secs {
        None => run_pass(&config, &reconciler, &mailer).await?,
        Some(secs) => {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(secs.max(1)));
            loop {
                ticker.tick().await;
                if let Err(e) = run_pass(&config, &reconciler, &mailer).await {
                    tracing::error!(error = format!("{e:#}"), "pass failed");
                }
            }
        }
    }
    Ok(())
}
