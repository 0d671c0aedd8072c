use clap::Subcommand;
use verdict_core::Side;

use crate::session::{print_event, Session};

#[derive(Subcommand)]
pub enum DraftAction {
    /// Discard the current draft and start over
    New,
    /// Set the question being decided
    Question { text: String },
    /// Add a pro (max 5, 100 chars each)
    AddPro { text: String },
    /// Add a con (max 5, 100 chars each)
    AddCon { text: String },
    /// Remove a pro by index
    RemovePro { index: usize },
    /// Remove a con by index
    RemoveCon { index: usize },
    /// Star one entry per side (advisory; does not affect the verdict)
    Star {
        /// "pro" or "con"
        side: String,
        /// Index to star; omit to clear the star
        index: Option<usize>,
    },
    /// Print the current draft as JSON
    Show,
}

fn parse_side(side: &str) -> Result<Side, Box<dyn std::error::Error>> {
    match side {
        "pro" | "pros" => Ok(Side::Pro),
        "con" | "cons" => Ok(Side::Con),
        other => Err(format!("unknown side {other:?} (expected \"pro\" or \"con\")").into()),
    }
}

pub fn run(action: DraftAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, events) = Session::load()?;
    for event in &events {
        print_event(event);
    }

    match action {
        DraftAction::New => {
            if session.engine.phase() == verdict_core::Phase::Counting {
                return Err("a countdown is running; decide or let it expire first".into());
            }
            if session.engine.is_unsaved() {
                return Err(
                    "the previous decision is not saved yet; run `verdict timer status` first"
                        .into(),
                );
            }
            session.engine = verdict_core::DecisionEngine::with_settings(
                session.config.extend_bonus_secs,
                session.config.rating_lock_ms(),
            );
        }
        DraftAction::Question { text } => session.engine.set_question(&text)?,
        DraftAction::AddPro { text } => session.engine.add_pro(&text)?,
        DraftAction::AddCon { text } => session.engine.add_con(&text)?,
        DraftAction::RemovePro { index } => {
            let removed = session.engine.remove_pro(index)?;
            println!("removed pro: {removed}");
        }
        DraftAction::RemoveCon { index } => {
            let removed = session.engine.remove_con(index)?;
            println!("removed con: {removed}");
        }
        DraftAction::Star { side, index } => {
            session.engine.star(parse_side(&side)?, index)?;
        }
        DraftAction::Show => {}
    }

    print_event(&session.engine.state_event(session.now_ms()));
    session.persist()?;
    Ok(())
}
