use clap::Subcommand;
use verdict_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the active configuration as JSON
    Show,
    /// Print the configuration file path
    Path,
    /// Set the stable user id
    SetUser { user_id: String },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::SetUser { user_id } => {
            let mut config = Config::load()?;
            config.user_id = user_id;
            config.save()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
