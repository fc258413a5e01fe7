//! Musical chairs console runner
//!
//! ```bash
//! musical-chairs --players 6
//! CHAIRS_MAX_MUSIC_MS=2000 RUST_LOG=coordination=debug musical-chairs
//! ```

mod config;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use config::Args;
use coordination::GameSession;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.game_config();
    let session = GameSession::new(config).context("Invalid game configuration")?;
    info!(
        game_id = session.game_id(),
        players = session.config().participants,
        max_music_ms = session.config().max_music.as_millis() as u64,
        "Musical chairs starting"
    );

    println!("{}", render::OPENING);
    println!();
    let printer = tokio::spawn(render::print_events(session.subscribe()));

    let result = session.run().await;
    // The printer exits on the terminal event either way.
    printer.await.context("Console printer task failed")?;
    let outcome = result.context("Game did not finish")?;

    info!(
        winner = %outcome.winner,
        rounds = outcome.rounds,
        "Game finished"
    );
    println!("{}", render::CLOSING);
    Ok(())
}
