//! Live feed streaming.

use std::time::Duration;

use doorwatch_core::{ConnectionIndicator, FeedEntry, MessageKind};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::collection_window;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let pipeline = session.pipeline.clone();
    let color = output::should_color(global.color);

    // Subscribe before starting so the first transitions are not missed.
    let mut activity = pipeline.activity();
    let mut connection = pipeline.watch_connection();

    session.start_tolerant().await;
    if !global.quiet {
        emit_connection(global.output, pipeline.connection_indicator(), color)?;
    }

    let window = collection_window(args.duration.map(Duration::from_secs));
    tokio::pin!(window);

    loop {
        tokio::select! {
            () = &mut window => break,
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let indicator = ConnectionIndicator::from(*connection.borrow_and_update());
                if !global.quiet {
                    emit_connection(global.output, indicator, color)?;
                }
            }
            received = activity.recv() => match received {
                Ok(envelope) => {
                    if accepts(&args.kinds, envelope.kind()) && !global.quiet {
                        emit_entry(global.output, &FeedEntry::from(envelope.as_ref()), color)?;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "live feed fell behind, entries dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    pipeline.shutdown();
    Ok(())
}

fn accepts(filter: &[MessageKind], kind: MessageKind) -> bool {
    filter.is_empty() || filter.contains(&kind)
}

fn emit_entry(format: OutputFormat, entry: &FeedEntry, color: bool) -> Result<(), CliError> {
    let line = match format {
        OutputFormat::Json => serde_json::to_string(entry)?,
        OutputFormat::Plain => format!(
            "{}\t{}\t{}",
            entry.timestamp.to_rfc3339(),
            entry.kind,
            entry.summary
        ),
        OutputFormat::Table => {
            let kind: &'static str = entry.kind.into();
            format!(
                "{}  {kind:<20} {}",
                entry.timestamp.format("%H:%M:%S"),
                output::paint(&entry.summary, entry.tone, color)
            )
        }
    };
    output::print_line(&line);
    Ok(())
}

fn emit_connection(
    format: OutputFormat,
    indicator: ConnectionIndicator,
    color: bool,
) -> Result<(), CliError> {
    let line = match format {
        OutputFormat::Json => serde_json::to_string(&serde_json::json!({
            "connection": indicator,
        }))?,
        OutputFormat::Plain => format!("connection\t{}", indicator.state),
        OutputFormat::Table => format!(
            "-- connection: {}",
            output::paint(indicator.label, indicator.tone, color)
        ),
    };
    output::print_line(&line);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_accepts_everything() {
        assert!(accepts(&[], MessageKind::UserActivity));
    }

    #[test]
    fn filter_limits_kinds() {
        let filter = [MessageKind::NewAlert, MessageKind::AccessEvent];
        assert!(accepts(&filter, MessageKind::AccessEvent));
        assert!(!accepts(&filter, MessageKind::DoorStatusUpdate));
    }
}
