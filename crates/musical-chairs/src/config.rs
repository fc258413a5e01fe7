use clap::Parser;
use coordination::GameConfig;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Number of players (overrides CHAIRS_PLAYERS)
    #[arg(short, long)]
    pub players: Option<usize>,
}

impl Args {
    /// Environment-backed defaults with the CLI override applied.
    pub fn game_config(&self) -> GameConfig {
        let config = GameConfig::default();
        match self.players {
            Some(players) => GameConfig {
                participants: players,
                ..config
            },
            None => config,
        }
    }
}
