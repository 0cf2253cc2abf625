//! # Snake Terminal Client
//!
//! A terminal UI for the snake platform. The client never simulates
//! anything: it renders the snapshots the authoritative server sends each
//! tick and reports the player's directional and control inputs back.
//!
//! Menus, keyboard capture and rendering all live here; the wire contract
//! with the server comes from the `shared` crate. For locally hosted games
//! the client also spawns the server binary as a child process.

pub mod app;
pub mod game;
pub mod input;
pub mod launcher;
pub mod menu;
pub mod network;
pub mod rendering;
