//! Spawn glue for a colocated server process.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use log::info;

/// Options forwarded to a spawned server, mirroring its positional CLI.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub single_player: bool,
    pub game_time: i64,
    pub obstacles_enabled: bool,
    pub random_world: bool,
    pub obstacles_file: Option<PathBuf>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        LaunchOptions {
            single_player: true,
            game_time: -1,
            obstacles_enabled: false,
            random_world: true,
            obstacles_file: None,
        }
    }
}

/// Builds the positional argument vector for the server binary.
pub fn server_args(socket_path: &Path, options: &LaunchOptions) -> Vec<String> {
    let flag = |enabled: bool| if enabled { "1" } else { "0" }.to_string();
    let mut args = vec![
        socket_path.display().to_string(),
        flag(options.single_player),
        options.game_time.to_string(),
        flag(options.obstacles_enabled),
        flag(options.random_world),
    ];
    if let Some(file) = &options.obstacles_file {
        args.push(file.display().to_string());
    }
    args
}

/// Spawns the server binary detached from the client's terminal streams, so
/// its logging cannot corrupt the alternate screen.
pub fn spawn_server(
    binary: &Path,
    socket_path: &Path,
    options: &LaunchOptions,
) -> io::Result<Child> {
    info!(
        "spawning server {} for socket {}",
        binary.display(),
        socket_path.display()
    );
    Command::new(binary)
        .args(server_args(socket_path, options))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}
