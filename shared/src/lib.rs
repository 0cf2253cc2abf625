//! # Shared Game Library
//!
//! Everything both the snake server and the terminal client need to agree on:
//! the grid model (positions, directions, fruits, obstacles), the per-client
//! state snapshot, the tuning constants of the simulation, and the
//! length-prefixed wire protocol in [`protocol`].
//!
//! The server is authoritative: clients only ever render [`Snapshot`]s and
//! send back directional and control messages. Keeping these types in one
//! crate guarantees the two binaries can never drift apart on the meaning of
//! a frame.

pub mod protocol;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Simulation updates per second.
pub const TICK_RATE: u32 = 10;

/// Target period of one simulation tick.
pub const TICK_INTERVAL: Duration = Duration::from_millis((1000 / TICK_RATE) as u64);

/// Number of body segments a snake starts with. Snakes never shrink below it.
pub const INITIAL_SNAKE_LENGTH: usize = 3;

/// Maximum number of simultaneously connected clients.
pub const MAX_CLIENTS: usize = 16;

/// Upper bound on fruits present in the world at once.
pub const MAX_FRUITS: usize = 5;

/// Default playfield width in cells.
pub const WORLD_WIDTH: i32 = 40;

/// Default playfield height in cells.
pub const WORLD_HEIGHT: i32 = 20;

/// Capacity of the server's event queue (receivers -> main loop).
pub const MAX_EVENTS: usize = 1024;

/// Capacity of the server's action queue (main loop -> worker).
pub const MAX_ACTIONS: usize = 1024;

/// A cell on the playfield grid. Origin is the top-left corner; `x` grows to
/// the right and `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Travel direction of a snake.
///
/// Serialized as a 4-byte tag on the wire, which is what makes an INPUT
/// payload exactly four bytes long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The direction a snake travelling `self` is never allowed to turn into.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Per-tick head displacement as an `(dx, dy)` pair.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// A fruit on the playfield. Eaten fruits are flagged inactive and compacted
/// away at the end of the tick that consumed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fruit {
    pub pos: Position,
    pub active: bool,
}

/// An impassable cell. Running into one ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub pos: Position,
}

/// One snake's body as seen by a client, head first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnakeSnapshot {
    pub body: Vec<Position>,
}

/// A serialized, per-client view of the world, sent once per tick.
///
/// `score` and `player_time_elapsed` are specific to the receiving player;
/// the snakes, fruits and obstacles cover the whole world.
/// `game_time_remaining` is `-1` for untimed games.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub width: i32,
    pub height: i32,
    pub score: u64,
    pub player_time_elapsed: i32,
    pub game_time_remaining: i32,
    pub snakes: Vec<SnakeSnapshot>,
    pub fruits: Vec<Fruit>,
    pub obstacles: Vec<Obstacle>,
}
