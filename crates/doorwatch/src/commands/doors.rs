//! Door command handler.

use std::sync::Arc;
use std::time::Duration;

use doorwatch_core::Door;
use tabled::Tabled;

use crate::cli::{DoorsArgs, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::collection_window;

#[derive(Tabled)]
struct DoorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Last Heartbeat")]
    heartbeat: String,
}

impl From<&Arc<Door>> for DoorRow {
    fn from(d: &Arc<Door>) -> Self {
        let empty_as_dash = |s: &str| output::or_dash(Some(s).filter(|s| !s.is_empty()));
        Self {
            id: d.id.clone(),
            name: empty_as_dash(&d.name),
            zone: empty_as_dash(&d.zone_id),
            status: d.status.to_string(),
            online: if d.is_online { "yes" } else { "no" }.into(),
            heartbeat: d
                .last_heartbeat
                .map_or_else(|| "-".into(), |t| t.format("%H:%M:%S").to_string()),
        }
    }
}

fn plain_line(d: &Arc<Door>) -> String {
    format!("{}\t{}\t{}", d.id, d.status, if d.is_online { "online" } else { "offline" })
}

pub async fn handle(args: DoorsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = Session::open(global)?;
    session.start().await?;
    collection_window(Some(Duration::from_secs(args.duration))).await;

    let state = session.pipeline.stores().doors.snapshot();
    session.pipeline.shutdown();

    let doors: Vec<Arc<Door>> = state.doors.values().cloned().collect();
    let out = output::render_list(global.output, &doors, |d| DoorRow::from(d), plain_line)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
