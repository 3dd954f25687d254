use clap::Subcommand;
use focusbridge_core::storage::data_dir;
use focusbridge_core::{Config, JsonFileLedger, SessionLedger};

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List sessions recorded in the local ledger
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Cancel an active session, e.g. one left behind by a killed run
    Cancel {
        /// Session id
        #[arg(required_unless_present = "active", conflicts_with = "active")]
        id: Option<String>,
        /// Cancel whichever session is currently active
        #[arg(long)]
        active: bool,
    },
}

pub fn run(action: SessionsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let ledger = JsonFileLedger::open(config.ledger_path(&data_dir()?))?;

    match action {
        SessionsAction::List { json } => {
            let sessions = ledger.sessions()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
                return Ok(());
            }

            if sessions.is_empty() {
                println!("no sessions recorded");
                return Ok(());
            }
            for s in &sessions {
                println!(
                    "{}  {:<9}  {:>3} min  {}  {}",
                    s.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                    format!("{:?}", s.status).to_lowercase(),
                    s.target_duration_minutes,
                    s.task_id.as_deref().unwrap_or("-"),
                    s.notes.as_deref().unwrap_or(""),
                );
            }
        }
        SessionsAction::Cancel { id, active } => {
            let rt = tokio::runtime::Runtime::new()?;
            let cancelled = rt.block_on(async {
                let id = match id {
                    Some(id) => id,
                    None if active => match ledger.active_session().await? {
                        Some(session) => session.id,
                        None => return Err("no active session".into()),
                    },
                    None => return Err("session id or --active required".into()),
                };
                let session = ledger.cancel_session(&id).await?;
                Ok::<_, Box<dyn std::error::Error>>(session)
            })?;
            tracing::info!(session_id = %cancelled.id, "session cancelled");
            println!("cancelled {}", cancelled.id);
        }
    }
    Ok(())
}
