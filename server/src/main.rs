//! Server binary entry point

use std::path::PathBuf;

use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig};

/// Command-line arguments. All positional, so launch glue can pass them as a
/// plain argument vector.
#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative snake game server")]
struct Args {
    /// Filesystem path of the listening socket (created on startup)
    socket_path: PathBuf,

    /// "1" for single player, "0" for multiplayer
    #[arg(default_value = "1", value_parser = parse_flag)]
    single_player: bool,

    /// Game time limit in seconds, or -1 for an untimed game
    #[arg(default_value_t = -1, allow_hyphen_values = true)]
    game_time: i64,

    /// "1" to play with obstacles; this also makes the walls deadly
    #[arg(default_value = "0", value_parser = parse_flag)]
    obstacles_enabled: bool,

    /// "1" for randomly generated obstacles, "0" to load them from a file
    #[arg(default_value = "1", value_parser = parse_flag)]
    random_world: bool,

    /// Obstacles file, required when obstacles are enabled and not random
    obstacles_file: Option<PathBuf>,
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(format!("expected \"1\" or \"0\", got {:?}", other)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    if args.obstacles_enabled && !args.random_world && args.obstacles_file.is_none() {
        return Err(
            "an obstacles file is required when obstacles are enabled and random world is disabled"
                .into(),
        );
    }

    info!("socket path: {}", args.socket_path.display());
    info!("single player: {}", args.single_player);
    info!("game time: {}", args.game_time);
    info!("obstacles enabled: {}", args.obstacles_enabled);
    info!("random world: {}", args.random_world);

    let config = ServerConfig {
        socket_path: args.socket_path,
        single_player: args.single_player,
        game_time: args.game_time,
        obstacles_enabled: args.obstacles_enabled,
        random_world: args.random_world,
        obstacles_file: args.obstacles_file,
    };

    // the Rust runtime masks SIGPIPE at startup, so a write to a vanished
    // client surfaces as an EPIPE error instead of killing the process
    let mut server = Server::new(config);
    server.run().await?;
    Ok(())
}
