use std::convert::Infallible;
use std::sync::Arc;

use clap::Subcommand;
use focusbridge_core::storage::data_dir;
use focusbridge_core::{
    Config, FocusEvent, FocusRuntime, JsonFileLedger, Phase, SessionBridge, SettingsPatch,
    SyncNotice, TaskRef, TaskRegistry,
};
use serde::Serialize;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run one work interval and its break, printing events as JSON lines
    Run {
        /// Bind the interval to a task with this title
        #[arg(long)]
        task: Option<String>,
        /// Class id recorded with the task
        #[arg(long)]
        class: Option<String>,
        /// Override the work duration (seconds)
        #[arg(long)]
        work: Option<u64>,
        /// Override the short break duration (seconds)
        #[arg(long = "break")]
        break_secs: Option<u64>,
    },
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run {
            task,
            class,
            work,
            break_secs,
        } => {
            let patch = SettingsPatch {
                work_duration_secs: work,
                short_break_duration_secs: break_secs,
                auto_start_breaks: None,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_interval(task, class, patch))
        }
    }
}

async fn run_interval(
    title: Option<String>,
    class_id: Option<String>,
    patch: SettingsPatch,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let settings = config.timer_settings().merged(&patch)?;
    let ledger = Arc::new(JsonFileLedger::open(config.ledger_path(&data_dir()?))?);
    tracing::debug!(path = %ledger.path().display(), "using local session ledger");

    let registry = TaskRegistry::default();
    let task = match title {
        // No task service here: confirm locally under a timestamped id.
        Some(title) => {
            let record = registry
                .create_with(title, class_id, |record| async move {
                    let stamp = chrono::Utc::now().timestamp_millis();
                    tracing::debug!(provisional = %record.id, "confirming task locally");
                    Ok::<_, Infallible>(format!("local_{stamp}"))
                })
                .await
                .map_err(|e| e.to_string())?;
            Some(TaskRef::from(record))
        }
        None => None,
    };

    let mut handle = FocusRuntime::new(settings)
        .with_registry(registry.clone())
        .with_bridge(SessionBridge::new(ledger).with_notes(config.sync.record_notes))
        .spawn();
    let mut notices = handle.take_notices().ok_or("session bridge not attached")?;
    let mut events = handle.subscribe().await?;

    handle.start_work(task).await?;

    let mut cancelling = false;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                print_line(&event)?;
                if ends_run(&event) {
                    break;
                }
            }
            Some(notice) = notices.recv() => report(&notice)?,
            interrupted = tokio::signal::ctrl_c(), if !cancelling => {
                interrupted?;
                cancelling = true;
                tracing::info!("interrupted, cancelling the current interval");
                if let Err(e) = handle.cancel().await {
                    tracing::warn!(error = %e, "cancel failed");
                    break;
                }
            }
        }
    }

    handle.shutdown().await?;
    while let Some(notice) = notices.recv().await {
        report(&notice)?;
    }

    for record in registry.snapshot() {
        tracing::info!(task_id = %record.id, completed = record.completed_intervals, "task progress");
    }
    Ok(())
}

/// The run is over once the break ends, or the interval is abandoned.
fn ends_run(event: &FocusEvent) -> bool {
    matches!(
        event,
        FocusEvent::IntervalCompleted {
            phase: Phase::ShortBreak,
            ..
        } | FocusEvent::BreakStarted { running: false, .. }
            | FocusEvent::Skipped { .. }
            | FocusEvent::Cancelled { .. }
    )
}

/// Print a bridge notice; failures are also logged, since the timer itself
/// carried on regardless.
fn report(notice: &SyncNotice) -> serde_json::Result<()> {
    if notice.is_failure() {
        tracing::warn!(?notice, "session ledger call failed");
    } else {
        tracing::debug!(?notice, "session ledger updated");
    }
    print_line(notice)
}

fn print_line<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
