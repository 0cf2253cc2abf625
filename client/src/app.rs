//! The client application state machine: menus, the in-game session loop,
//! and teardown back to the menu.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use log::{info, warn};
use shared::Direction;

use crate::game::Session;
use crate::input::{self, Gesture};
use crate::launcher::{self, LaunchOptions};
use crate::menu::{Menu, MenuAction, MenuStack};
use crate::network::Connection;
use crate::rendering::Renderer;

/// Pacing of both the menu loop and the in-game loop.
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Where a finished menu interaction sends the application.
#[derive(Debug, PartialEq, Eq)]
enum MenuOutcome {
    /// Start a session; `host` spawns a colocated server first.
    Play { host: bool },
    Quit,
}

/// Routes a chosen menu entry: either mutates the configuration and the menu
/// stack, or hands back the outcome that leaves the menus.
fn route_action(
    action: MenuAction,
    options: &mut LaunchOptions,
    menus: &mut MenuStack,
) -> Option<MenuOutcome> {
    match action {
        MenuAction::StartSinglePlayer => {
            options.single_player = true;
            menus.push(Menu::mode_select());
        }
        MenuAction::HostMultiplayer => {
            options.single_player = false;
            menus.push(Menu::mode_select());
        }
        MenuAction::JoinMultiplayer => return Some(MenuOutcome::Play { host: false }),
        MenuAction::SelectMode { game_time } => {
            options.game_time = game_time;
            menus.push(Menu::world_select());
        }
        MenuAction::SelectWorld { obstacles } => {
            options.obstacles_enabled = obstacles;
            return Some(MenuOutcome::Play { host: true });
        }
        MenuAction::Back => menus.pop(),
        MenuAction::Quit => return Some(MenuOutcome::Quit),
    }
    None
}

pub struct App {
    socket_path: PathBuf,
    server_bin: PathBuf,
    menus: MenuStack,
    options: LaunchOptions,
    renderer: Renderer,
    /// Summary of the last session, shown under the main menu.
    note: Option<String>,
}

impl App {
    pub fn new(socket_path: PathBuf, server_bin: PathBuf) -> io::Result<App> {
        Ok(App {
            socket_path,
            server_bin,
            menus: MenuStack::new(Menu::main()),
            options: LaunchOptions::default(),
            renderer: Renderer::new()?,
            note: None,
        })
    }

    /// Runs menus and game sessions until the player quits.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            match self.menu_loop()? {
                MenuOutcome::Quit => return Ok(()),
                MenuOutcome::Play { host } => {
                    let note = match self.play(host) {
                        Ok(note) => note,
                        Err(e) => {
                            warn!("session failed: {}", e);
                            format!("connection failed: {}", e)
                        }
                    };
                    self.note = Some(note);
                    self.menus.reset();
                }
            }
        }
    }

    fn menu_loop(&mut self) -> io::Result<MenuOutcome> {
        loop {
            self.renderer
                .draw_menu(self.menus.current(), self.note.as_deref())?;
            let gesture = match input::poll_gesture(INPUT_POLL)? {
                Some(gesture) => gesture,
                None => continue,
            };
            self.note = None;
            match gesture {
                Gesture::Steer(Direction::Up) => self.menus.current_mut().select_previous(),
                Gesture::Steer(Direction::Down) => self.menus.current_mut().select_next(),
                Gesture::Steer(_) => {}
                Gesture::Cancel => self.menus.pop(),
                Gesture::Quit => return Ok(MenuOutcome::Quit),
                Gesture::TogglePause => {}
                Gesture::Submit => {
                    let action = self.menus.current().selected_action();
                    if let Some(outcome) = route_action(action, &mut self.options, &mut self.menus)
                    {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    /// One full game session. Returns the summary shown back in the menu.
    fn play(&mut self, host: bool) -> io::Result<String> {
        let mut hosted = if host {
            Some(launcher::spawn_server(
                &self.server_bin,
                &self.socket_path,
                &self.options,
            )?)
        } else {
            None
        };

        let mut connection = Connection::connect(&self.socket_path)?;
        let mut session = Session::new();

        let note = loop {
            let mut lost = false;
            loop {
                match connection.try_message() {
                    Ok(Some(message)) => session.apply(message),
                    Ok(None) => break,
                    Err(_) => {
                        lost = true;
                        break;
                    }
                }
            }

            if let Some(error) = session.error.take() {
                break format!("server error: {}", error);
            }
            if session.game_over {
                break format!("game over - score {}", session.snapshot.score);
            }
            if lost {
                break "connection lost".to_string();
            }

            if session.ready {
                self.renderer.draw_game(&session.snapshot, session.paused)?;
            }

            if let Some(gesture) = input::poll_gesture(INPUT_POLL)? {
                match gesture {
                    Gesture::Steer(direction) if !session.paused => {
                        if connection.send_input(direction).is_err() {
                            break "connection lost".to_string();
                        }
                    }
                    Gesture::TogglePause => {
                        let request = if session.toggle_pause() {
                            connection.send_pause()
                        } else {
                            connection.send_resume()
                        };
                        if request.is_err() {
                            break "connection lost".to_string();
                        }
                    }
                    Gesture::Quit | Gesture::Cancel => {
                        let _ = connection.send_leave();
                        break "left the game".to_string();
                    }
                    _ => {}
                }
            }
        };

        drop(connection);
        if let Some(mut child) = hosted.take() {
            if self.options.single_player {
                // a single-player server ends once its only player left
                let _ = child.wait();
            } else {
                info!(
                    "hosted server keeps running for the remaining players (pid {})",
                    child.id()
                );
            }
        }

        Ok(note)
    }
}
