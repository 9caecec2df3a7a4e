//! Command dispatch: bridges CLI args -> pipeline sessions -> output formatting.

pub mod alerts;
pub mod config_cmd;
pub mod doors;
pub mod watch;

use std::time::Duration;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Time for the transport to flush queued outbound messages after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Dispatch a pipeline-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Alerts(args) => alerts::handle(args, global).await,
        Command::Doors(args) => doors::handle(args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Resolve once `duration` elapses (never, if `None`) or on Ctrl-C.
pub(crate) async fn collection_window(duration: Option<Duration>) {
    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    tokio::select! {
        () = &mut deadline => {}
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::debug!("interrupted"),
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                deadline.await;
            }
        },
    }
}
