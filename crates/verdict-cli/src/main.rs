use clap::{Parser, Subcommand};

mod commands;
mod session;

#[derive(Parser)]
#[command(name = "verdict", version, about = "Verdict decision timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft editing (question, pros, cons, stars)
    Draft {
        #[command(subcommand)]
        action: commands::draft::DraftAction,
    },
    /// Countdown control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Rate a finalized decision's outcome
    Rate {
        #[command(subcommand)]
        action: commands::rate::RateAction,
    },
    /// Decision history and statistics
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Draft { action } => commands::draft::run(action),
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Rate { action } => commands::rate::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
