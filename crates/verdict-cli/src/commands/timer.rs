use clap::Subcommand;
use verdict_core::{CoinFlip, Event, InsightClient, Verdict};

use crate::session::{print_event, Session};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the countdown on the current draft
    Start {
        /// Duration in seconds (default from config)
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Tick the countdown and print current state as JSON
    Status,
    /// Resolve now: by policy, or forced with --force
    Decide {
        /// "yes" or "no" to override the policy
        #[arg(long)]
        force: Option<String>,
    },
    /// One-time extension of the running countdown
    Extend,
}

fn parse_forced(force: Option<String>) -> Result<Option<Verdict>, Box<dyn std::error::Error>> {
    match force.as_deref() {
        None => Ok(None),
        Some("yes") => Ok(Some(Verdict::Yes)),
        Some("no") => Ok(Some(Verdict::No)),
        Some(other) => Err(format!("unknown verdict {other:?} (expected \"yes\" or \"no\")").into()),
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, events) = Session::load()?;
    for event in &events {
        print_event(event);
    }

    match action {
        TimerAction::Start { secs } => {
            let duration = secs.unwrap_or(session.config.default_timer_secs);
            let event = session.engine.start(duration, session.now_ms())?;
            print_event(&event);
            // Immediate snapshot so a crash right after start still recovers.
            session.persist()?;
        }
        TimerAction::Status => {
            // A parked unsaved decision gets its retry here.
            match session.retry_finalize() {
                Ok(Some(event)) => print_event(&event),
                Ok(None) => {}
                Err(e) => eprintln!("warning: retrying record write failed: {e}"),
            }
            let mut tie = CoinFlip;
            if let Some(event) = session.engine.tick(session.now_ms(), &mut tie) {
                print_event(&event);
                conclude(&mut session)?;
            }
            print_event(&session.engine.state_event(session.now_ms()));
            session.persist()?;
        }
        TimerAction::Decide { force } => {
            let forced = parse_forced(force)?;
            let mut tie = CoinFlip;
            let event = session
                .engine
                .decide_now(forced, session.now_ms(), &mut tie)?;
            print_event(&event);
            conclude(&mut session)?;
            session.persist()?;
        }
        TimerAction::Extend => {
            let event = session.engine.extend(session.now_ms())?;
            print_event(&event);
            session.persist()?;
        }
    }
    Ok(())
}

/// Finalize a freshly resolved decision and, best-effort, print an insight.
fn conclude(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    match session
        .engine
        .finalize(&session.config.user_id, &session.records, session.snapshots.as_ref())
    {
        Ok(event) => {
            print_event(&event);
            if let Event::RecordSaved { .. } = event {
                print_insight(session);
            }
        }
        Err(e) => {
            // Result is preserved; the next `timer status` retries the write.
            eprintln!("warning: failed to save decision record: {e}");
            eprintln!("the verdict is kept; run `verdict timer status` to retry");
        }
    }
    Ok(())
}

fn print_insight(session: &Session) {
    let Some(client) = InsightClient::from_config(&session.config.insight) else {
        return;
    };
    let Some(result) = session.engine.result() else {
        return;
    };
    let draft = session.engine.draft();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(_) => return,
    };
    let text = runtime.block_on(client.generate(
        draft.question(),
        draft.pros(),
        draft.cons(),
        result,
        None,
    ));
    println!("insight: {text}");
}
