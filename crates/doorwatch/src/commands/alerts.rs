//! Alert command handler.

use std::sync::Arc;
use std::time::Duration;

use doorwatch_core::Alert;
use doorwatch_core::view;
use tabled::Tabled;

use crate::cli::{AlertsArgs, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::{SHUTDOWN_GRACE, collection_window};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Type")]
    alert_type: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Acknowledged")]
    acknowledged: String,
}

impl From<&Arc<Alert>> for AlertRow {
    fn from(a: &Arc<Alert>) -> Self {
        Self {
            id: a.id.clone(),
            time: a.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            severity: a.severity.to_string(),
            alert_type: a.alert_type.to_string(),
            title: a.title.clone(),
            acknowledged: match (a.acknowledged, a.acknowledged_by.as_deref()) {
                (true, Some(by)) => format!("yes ({by})"),
                (true, None) => "yes".into(),
                (false, _) => "no".into(),
            },
        }
    }
}

fn plain_line(a: &Arc<Alert>) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        a.id,
        a.severity,
        if a.acknowledged { "acked" } else { "open" },
        a.title
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: AlertsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = Session::open(global)?;
    session.start().await?;
    collection_window(Some(Duration::from_secs(args.duration))).await;

    let pipeline = &session.pipeline;
    let stores = pipeline.stores();

    let mut acknowledged = 0usize;
    if let Some(user) = args.ack_as.as_deref() {
        let pending: Vec<String> = stores
            .alerts
            .snapshot()
            .alerts
            .iter()
            .filter(|a| !a.acknowledged)
            .map(|a| a.id.clone())
            .collect();
        acknowledged = pending
            .iter()
            .filter(|id| pipeline.acknowledge_alert(id, user))
            .count();
        tracing::info!(count = acknowledged, user, "alerts acknowledged");
    }

    let prefs = stores.preferences.snapshot();
    let alerts = view::visible_alerts(&stores.alerts.snapshot(), &prefs);
    pipeline.shutdown();
    if acknowledged > 0 {
        tokio::time::sleep(SHUTDOWN_GRACE).await;
    }

    let out = output::render_list(global.output, &alerts, |a| AlertRow::from(a), plain_line)?;
    output::print_output(&out, global.quiet);
    if let (false, Some(user)) = (global.quiet, args.ack_as.as_deref()) {
        eprintln!("Acknowledged {acknowledged} alert(s) as {user}");
    }
    Ok(())
}
