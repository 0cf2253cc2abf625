//! Client application entry point

use std::path::PathBuf;

use clap::Parser;
use client::app::App;
use log::info;

/// Command-line arguments for client configuration
#[derive(Parser, Debug)]
#[command(author, version, about = "Snake terminal client")]
struct Args {
    /// Socket path used both for hosting and for joining games
    #[arg(short, long, default_value = "/tmp/serpent.sock")]
    socket: PathBuf,

    /// Server binary spawned for hosted games
    #[arg(long, default_value = "server")]
    server_bin: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    info!("socket path: {}", args.socket.display());
    info!("server binary: {}", args.server_bin.display());

    let mut app = App::new(args.socket, args.server_bin)?;
    app.run()?;
    Ok(())
}
