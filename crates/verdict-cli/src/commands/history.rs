use clap::Subcommand;
use verdict_core::RecordStore;

use crate::session::Session;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List this user's decisions, newest first
    List,
    /// Aggregate statistics
    Stats,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let (session, _) = Session::load()?;

    match action {
        HistoryAction::List => {
            let records = session.records.list_for_user(&session.config.user_id)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        HistoryAction::Stats => {
            let stats = session.records.stats(&session.config.user_id)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
