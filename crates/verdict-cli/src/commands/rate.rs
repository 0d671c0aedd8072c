use clap::Subcommand;
use verdict_core::{Outcome, RecordStore};

use crate::session::Session;

#[derive(Subcommand)]
pub enum RateAction {
    /// Mark a decision as having turned out well
    Good {
        /// Record id; defaults to the most recent decision
        #[arg(long)]
        id: Option<String>,
    },
    /// Mark a decision as having turned out badly
    Bad {
        /// Record id; defaults to the most recent decision
        #[arg(long)]
        id: Option<String>,
    },
}

pub fn run(action: RateAction) -> Result<(), Box<dyn std::error::Error>> {
    let (session, _) = Session::load()?;

    let (id, outcome) = match action {
        RateAction::Good { id } => (id, Outcome::Good),
        RateAction::Bad { id } => (id, Outcome::Bad),
    };

    let id = match id {
        Some(id) => id,
        None => session
            .records
            .list_for_user(&session.config.user_id)?
            .first()
            .map(|r| r.id.clone())
            .ok_or("no decisions recorded yet")?,
    };

    session.records.rate(&id, outcome, session.now_ms())?;
    let record = session
        .records
        .get(&id)?
        .ok_or("record disappeared while rating")?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
