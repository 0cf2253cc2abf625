//! # Snake Game Server Library
//!
//! The authoritative server for the snake platform. It owns the canonical
//! game world, advances it at a fixed 10 Hz tick, and keeps every connected
//! terminal client synchronized through per-tick state snapshots.
//!
//! ## Architecture
//!
//! Four concurrent roles cooperate through two bounded queues:
//!
//! - the **listener** accepts connections on the Unix socket and starts a
//!   receiver per client,
//! - each **receiver** translates framed client messages into events,
//! - the **main loop** drains events, mutates the game state and posts
//!   actions,
//! - the **worker** performs every outward effect: socket sends, registry
//!   removals and the timer tasks behind grace periods and freeze windows.
//!
//! Only the main loop ever touches the game state; everything that leaves it
//! is deep-copied first. The registry serializes all socket writes, so each
//! socket has exactly one producer and one consumer.
//!
//! ## Module organization
//!
//! - [`entity`]: players and snakes.
//! - [`physics`]: movement and collision predicates.
//! - [`game`]: the authoritative world and the per-tick step.
//! - [`client_manager`]: the connected-client registry.
//! - [`network`]: the event pipeline wiring the roles together.

pub mod client_manager;
pub mod entity;
pub mod game;
pub mod network;
pub mod physics;
