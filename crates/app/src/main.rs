use anyhow::Context;
use medibook_core::{Clock, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    medibook_observability::init();

    let services = medibook_app::build_services()
        .await
        .context("failed to start MediBook")?;

    let hours = services.config.hours;
    tracing::info!(
        backend = services.backend,
        open = %hours.open().format("%H:%M"),
        close = %hours.close().format("%H:%M"),
        granularity_minutes = hours.granularity_minutes(),
        slots_per_day = hours.slot_count(),
        reject_past_dates = services.config.reject_past_dates,
        "clinic configured"
    );

    // Today's schedule summary runs off the startup path.
    let engine = services.engine.clone();
    let today = SystemClock.today();
    let summary = tokio::spawn(async move { engine.list_on(today).await });

    let todays = summary
        .await
        .context("schedule summary task panicked")?
        .context("loading today's appointments")?;
    tracing::info!(%today, appointments = todays.len(), "schedule loaded");

    Ok(())
}
