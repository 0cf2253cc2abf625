//! Authoritative game state and the per-tick simulation step.

use std::io;
use std::path::Path;
use std::time::Instant;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    Direction, Fruit, Obstacle, Position, SnakeSnapshot, Snapshot, INITIAL_SNAKE_LENGTH,
    MAX_FRUITS,
};

use crate::entity::Player;
use crate::physics;

/// Attempts before giving up on a random placement.
const PLACEMENT_ATTEMPTS: usize = 1000;

/// Playfield cells per obstacle, at most.
const OBSTACLE_DENSITY: i32 = 120;

/// Wall-clock game timer. A non-positive duration means the game is untimed.
#[derive(Debug, Clone)]
pub struct GameTimer {
    started: Instant,
    duration_secs: i64,
}

impl GameTimer {
    pub fn new(duration_secs: i64) -> Self {
        GameTimer {
            started: Instant::now(),
            duration_secs,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.duration_secs > 0
    }

    /// Seconds left in a timed game, never below zero; `-1` when untimed.
    pub fn remaining_secs(&self) -> i32 {
        if !self.is_timed() {
            return -1;
        }
        let elapsed = self.started.elapsed().as_secs() as i64;
        (self.duration_secs - elapsed).max(0) as i32
    }

    pub fn expired(&self) -> bool {
        self.is_timed() && self.started.elapsed().as_secs() as i64 >= self.duration_secs
    }
}

/// The server-authoritative world. Mutated only by the main loop; everything
/// the worker sends out is deep-copied into a [`Snapshot`] first.
#[derive(Debug)]
pub struct GameState {
    pub width: i32,
    pub height: i32,
    pub players: Vec<Player>,
    pub fruits: Vec<Fruit>,
    pub obstacles: Vec<Obstacle>,
    pub timer: GameTimer,
    /// True while a grace-period timer is outstanding.
    pub wait_for_end_pending: bool,
    easy_mode: bool,
    rng: StdRng,
}

impl GameState {
    /// New world. `game_time <= 0` means untimed; `easy_mode` makes walls
    /// wrap instead of kill.
    pub fn new(width: i32, height: i32, game_time: i64, easy_mode: bool) -> Self {
        Self::with_rng(width, height, game_time, easy_mode, StdRng::from_entropy())
    }

    /// New world with a deterministic random stream, for tests.
    pub fn seeded(width: i32, height: i32, game_time: i64, easy_mode: bool, seed: u64) -> Self {
        Self::with_rng(
            width,
            height,
            game_time,
            easy_mode,
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng(width: i32, height: i32, game_time: i64, easy_mode: bool, rng: StdRng) -> Self {
        GameState {
            width,
            height,
            players: Vec::new(),
            fruits: Vec::new(),
            obstacles: Vec::new(),
            timer: GameTimer::new(game_time),
            wait_for_end_pending: false,
            easy_mode,
            rng,
        }
    }

    pub fn easy_mode(&self) -> bool {
        self.easy_mode
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: u32) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Scatters obstacles over the field: a random count up to one per
    /// [`OBSTACLE_DENSITY`] cells (at least one slot), each placed so that no
    /// other obstacle sits in its 8-neighborhood. Gives up early when the
    /// attempts for a slot run out.
    pub fn spawn_obstacles_random(&mut self) {
        let max_count = ((self.width * self.height) / OBSTACLE_DENSITY).max(1) as usize;
        let count = self.rng.gen_range(1..=max_count);
        for _ in 0..count {
            let mut placed = false;
            for _ in 0..PLACEMENT_ATTEMPTS {
                let pos = Position::new(
                    self.rng.gen_range(0..self.width),
                    self.rng.gen_range(0..self.height),
                );
                if !self.has_obstacle_near(pos) {
                    self.obstacles.push(Obstacle { pos });
                    placed = true;
                    break;
                }
            }
            if !placed {
                break;
            }
        }
        info!("generated {} obstacles", self.obstacles.len());
    }

    /// Loads obstacles from a file: one `x y` pair per line, with blank lines
    /// and `#` comments skipped. Coordinates must lie inside the playfield.
    pub fn load_obstacles(&mut self, path: &Path) -> io::Result<()> {
        let contents = std::fs::read_to_string(path)?;
        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let bad_line = |detail: &str| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("obstacles file line {}: {}", index + 1, detail),
                )
            };
            let mut parts = line.split_whitespace();
            let (x, y) = match (parts.next(), parts.next(), parts.next()) {
                (Some(x), Some(y), None) => (x, y),
                _ => return Err(bad_line("expected exactly two fields")),
            };
            let x: i32 = x.parse().map_err(|_| bad_line("invalid x coordinate"))?;
            let y: i32 = y.parse().map_err(|_| bad_line("invalid y coordinate"))?;
            if x < 0 || x >= self.width || y < 0 || y >= self.height {
                return Err(bad_line("coordinates outside the playfield"));
            }
            self.obstacles.push(Obstacle {
                pos: Position::new(x, y),
            });
        }
        info!("loaded {} obstacles from {}", self.obstacles.len(), path.display());
        Ok(())
    }

    fn has_obstacle_near(&self, pos: Position) -> bool {
        self.obstacles
            .iter()
            .any(|o| (o.pos.x - pos.x).abs() <= 1 && (o.pos.y - pos.y).abs() <= 1)
    }

    /// Adds a player at a spawn placement whose whole starting body is free
    /// of obstacles. The head is placed at `x >= INITIAL_SNAKE_LENGTH - 1` so
    /// the leftward body always fits the field.
    pub fn add_player(&mut self, id: u32) {
        let head = self.find_spawn();
        info!("player {} spawns at ({}, {})", id, head.x, head.y);
        self.players.push(Player::new(id, head));
    }

    fn find_spawn(&mut self) -> Position {
        let min_x = (INITIAL_SNAKE_LENGTH - 1) as i32;
        let mut candidate = Position::new(min_x, self.height / 2);
        for _ in 0..PLACEMENT_ATTEMPTS {
            candidate = Position::new(
                self.rng.gen_range(min_x..self.width),
                self.rng.gen_range(0..self.height),
            );
            let body_clear = (0..INITIAL_SNAKE_LENGTH as i32).all(|i| {
                let cell = Position::new(candidate.x - i, candidate.y);
                !physics::hits_obstacle(cell, &self.obstacles)
            });
            if body_clear {
                return candidate;
            }
        }
        warn!("no obstacle-free spawn found, using last candidate");
        candidate
    }

    pub fn remove_player(&mut self, id: u32) {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() < before {
            info!("player {} left the game", id);
        }
    }

    /// Stages a new travel direction. Reversal attempts are silently ignored.
    pub fn set_direction(&mut self, id: u32, direction: Direction) {
        if let Some(player) = self.player_mut(id) {
            if direction != player.snake.direction.opposite() {
                player.snake.next_direction = direction;
            }
        }
    }

    pub fn pause_player(&mut self, id: u32) {
        if let Some(player) = self.player_mut(id) {
            player.paused = true;
            player.resume_pending = true;
        }
    }

    /// Records a resume request; the player stays frozen until the freeze
    /// window elapses and [`GameState::complete_resume`] runs.
    pub fn begin_resume(&mut self, id: u32) {
        if let Some(player) = self.player_mut(id) {
            player.resume_pending = false;
        }
    }

    /// Unfreezes the player unless a further pause arrived inside the freeze
    /// window and re-armed `resume_pending`.
    pub fn complete_resume(&mut self, id: u32) {
        if let Some(player) = self.player_mut(id) {
            if !player.resume_pending {
                player.paused = false;
            }
        }
    }

    /// Places a fruit on a free cell strictly inside the playfield, up to the
    /// world fruit cap.
    pub fn add_fruit(&mut self) {
        if self.fruits.len() >= MAX_FRUITS {
            return;
        }
        if let Some(pos) = self.free_fruit_cell() {
            self.fruits.push(Fruit { pos, active: true });
        }
    }

    fn free_fruit_cell(&mut self) -> Option<Position> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let pos = Position::new(
                self.rng.gen_range(1..self.width - 1),
                self.rng.gen_range(1..self.height - 1),
            );
            let blocked = physics::hits_obstacle(pos, &self.obstacles)
                || self.fruits.iter().any(|f| f.pos == pos)
                || self.players.iter().any(|p| p.snake.head() == pos);
            if !blocked {
                return Some(pos);
            }
        }
        warn!("no free cell left for a fruit");
        None
    }

    /// Advances every non-paused snake one cell and resolves collisions, in
    /// join order: snake bodies, then obstacles, then walls (which wrap in
    /// easy mode and kill otherwise), then fruit.
    ///
    /// Returns the ids of players eliminated this tick; they are removed from
    /// the state before returning. Inactive fruits are compacted afterwards.
    pub fn step(&mut self) -> Vec<u32> {
        let mut casualties = Vec::new();

        for i in 0..self.players.len() {
            if self.players[i].paused {
                continue;
            }
            let id = self.players[i].id;
            physics::advance(&mut self.players[i].snake);
            let head = self.players[i].snake.head();

            if physics::hits_snake(head, id, &self.players)
                || physics::hits_obstacle(head, &self.obstacles)
            {
                casualties.push(id);
                continue;
            }

            let head = if physics::outside(head, self.width, self.height) {
                if self.easy_mode {
                    let wrapped = physics::wrap(head, self.width, self.height);
                    self.players[i].snake.body[0] = wrapped;
                    wrapped
                } else {
                    casualties.push(id);
                    continue;
                }
            } else {
                head
            };

            if let Some(index) = physics::fruit_at(head, &self.fruits) {
                self.fruits[index].active = false;
                self.players[i].score += 1;
                physics::grow(&mut self.players[i].snake);
                self.add_fruit();
            }
        }

        self.players.retain(|p| !casualties.contains(&p.id));
        self.fruits.retain(|f| f.active);
        casualties
    }

    /// Deep-copies the world into the view one player receives this tick.
    pub fn snapshot_for(&self, player: &Player) -> Snapshot {
        Snapshot {
            width: self.width,
            height: self.height,
            score: player.score,
            player_time_elapsed: player.time_elapsed(),
            game_time_remaining: self.timer.remaining_secs(),
            snakes: self
                .players
                .iter()
                .map(|p| SnakeSnapshot {
                    body: p.snake.body.clone(),
                })
                .collect(),
            fruits: self.fruits.clone(),
            obstacles: self.obstacles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn untimed(width: i32, height: i32, easy_mode: bool) -> GameState {
        GameState::seeded(width, height, -1, easy_mode, 42)
    }

    fn place_player(game: &mut GameState, id: u32, head: Position) {
        game.players.push(Player::new(id, head));
    }

    #[test]
    fn test_add_player_spawn_fits_field() {
        let mut game = untimed(40, 20, true);
        game.add_player(1);
        let player = game.player(1).unwrap();
        for &cell in &player.snake.body {
            assert!(cell.x >= 0 && cell.x < 40);
            assert!(cell.y >= 0 && cell.y < 20);
        }
        assert_eq!(player.snake.direction, Direction::Right);
    }

    #[test]
    fn test_spawn_avoids_obstacles() {
        let mut game = untimed(40, 20, false);
        // wall off a column band so placement has something to dodge
        for y in 0..20 {
            game.obstacles.push(Obstacle {
                pos: Position::new(10, y),
            });
        }
        for id in 0..8 {
            game.add_player(id);
            let player = game.player(id).unwrap();
            for &cell in &player.snake.body {
                assert!(!physics::hits_obstacle(cell, &game.obstacles));
            }
        }
    }

    #[test]
    fn test_remove_player_is_idempotent() {
        let mut game = untimed(40, 20, true);
        game.add_player(1);
        game.remove_player(1);
        assert_eq!(game.player_count(), 0);
        game.remove_player(1);
        assert_eq!(game.player_count(), 0);
    }

    #[test]
    fn test_reversal_is_rejected() {
        let mut game = untimed(40, 20, true);
        place_player(&mut game, 1, Position::new(10, 10));
        game.set_direction(1, Direction::Left);
        assert_eq!(game.player(1).unwrap().snake.next_direction, Direction::Right);
        game.set_direction(1, Direction::Up);
        assert_eq!(game.player(1).unwrap().snake.next_direction, Direction::Up);
    }

    #[test]
    fn test_step_moves_snakes() {
        let mut game = untimed(40, 20, true);
        place_player(&mut game, 1, Position::new(10, 10));
        let casualties = game.step();
        assert!(casualties.is_empty());
        assert_eq!(game.player(1).unwrap().snake.head(), Position::new(11, 10));
    }

    #[test]
    fn test_paused_player_does_not_move() {
        let mut game = untimed(40, 20, true);
        place_player(&mut game, 1, Position::new(10, 10));
        game.pause_player(1);
        game.step();
        assert_eq!(game.player(1).unwrap().snake.head(), Position::new(10, 10));
    }

    #[test]
    fn test_resume_freeze_window() {
        let mut game = untimed(40, 20, true);
        place_player(&mut game, 1, Position::new(10, 10));

        game.pause_player(1);
        assert!(game.player(1).unwrap().paused);
        assert!(game.player(1).unwrap().resume_pending);

        // resume requested: still frozen until the wait elapses
        game.begin_resume(1);
        assert!(game.player(1).unwrap().paused);

        game.complete_resume(1);
        assert!(!game.player(1).unwrap().paused);
    }

    #[test]
    fn test_second_pause_cancels_pending_resume() {
        let mut game = untimed(40, 20, true);
        place_player(&mut game, 1, Position::new(10, 10));

        game.pause_player(1);
        game.begin_resume(1);
        // a second pause inside the freeze window re-arms the pause
        game.pause_player(1);
        game.complete_resume(1);
        assert!(game.player(1).unwrap().paused);
    }

    #[test]
    fn test_fruit_consumption_scores_and_grows() {
        let mut game = untimed(40, 20, true);
        place_player(&mut game, 1, Position::new(9, 5));
        game.fruits.push(Fruit {
            pos: Position::new(10, 5),
            active: true,
        });

        let casualties = game.step();

        assert!(casualties.is_empty());
        let player = game.player(1).unwrap();
        assert_eq!(player.score, 1);
        assert_eq!(player.snake.len(), INITIAL_SNAKE_LENGTH + 1);
        // the eaten fruit is gone and a replacement exists on a legal cell
        assert_eq!(game.fruits.len(), 1);
        let replacement = game.fruits[0];
        assert!(replacement.active);
        assert_ne!(replacement.pos, Position::new(10, 5));
        assert!(replacement.pos.x >= 1 && replacement.pos.x <= game.width - 2);
        assert!(replacement.pos.y >= 1 && replacement.pos.y <= game.height - 2);
    }

    #[test]
    fn test_wall_wraps_in_easy_mode() {
        let mut game = untimed(10, 10, true);
        place_player(&mut game, 1, Position::new(9, 5));
        let casualties = game.step();
        assert!(casualties.is_empty());
        assert_eq!(game.player(1).unwrap().snake.head(), Position::new(0, 5));
    }

    #[test]
    fn test_wall_wraps_on_every_edge() {
        let mut game = untimed(10, 10, true);
        place_player(&mut game, 1, Position::new(9, 5));
        game.step();
        assert_eq!(game.player(1).unwrap().snake.head(), Position::new(0, 5));

        let mut game = untimed(10, 10, true);
        place_player(&mut game, 2, Position::new(5, 9));
        game.player_mut(2).unwrap().snake.direction = Direction::Down;
        game.player_mut(2).unwrap().snake.next_direction = Direction::Down;
        game.step();
        assert_eq!(game.player(2).unwrap().snake.head(), Position::new(5, 0));

        let mut game = untimed(10, 10, true);
        place_player(&mut game, 3, Position::new(5, 0));
        game.player_mut(3).unwrap().snake.direction = Direction::Up;
        game.player_mut(3).unwrap().snake.next_direction = Direction::Up;
        game.step();
        assert_eq!(game.player(3).unwrap().snake.head(), Position::new(5, 9));

        let mut game = untimed(10, 10, true);
        place_player(&mut game, 4, Position::new(0, 5));
        game.player_mut(4).unwrap().snake.direction = Direction::Left;
        game.player_mut(4).unwrap().snake.next_direction = Direction::Left;
        // move the body out of the way of the wrapped head
        game.player_mut(4).unwrap().snake.body = vec![
            Position::new(0, 5),
            Position::new(1, 5),
            Position::new(2, 5),
        ];
        game.step();
        assert_eq!(game.player(4).unwrap().snake.head(), Position::new(9, 5));
    }

    #[test]
    fn test_wall_kills_in_hard_mode() {
        let mut game = untimed(10, 10, false);
        place_player(&mut game, 1, Position::new(9, 5));
        let casualties = game.step();
        assert_eq!(casualties, vec![1]);
        assert_eq!(game.player_count(), 0);
    }

    #[test]
    fn test_obstacle_kills() {
        let mut game = untimed(40, 20, false);
        place_player(&mut game, 1, Position::new(10, 10));
        game.obstacles.push(Obstacle {
            pos: Position::new(11, 10),
        });
        let casualties = game.step();
        assert_eq!(casualties, vec![1]);
    }

    #[test]
    fn test_running_into_other_snake_kills() {
        let mut game = untimed(40, 20, true);
        place_player(&mut game, 1, Position::new(10, 10));
        // a second snake lying across player 1's path
        place_player(&mut game, 2, Position::new(11, 12));
        game.player_mut(2).unwrap().snake.body = vec![
            Position::new(11, 12),
            Position::new(11, 11),
            Position::new(11, 10),
        ];
        game.pause_player(2);
        // player 2 is paused mid-run; its resume flags are irrelevant here
        let casualties = game.step();
        assert_eq!(casualties, vec![1]);
        assert_eq!(game.player_count(), 1);
    }

    #[test]
    fn test_self_collision_kills() {
        let mut game = untimed(40, 20, true);
        place_player(&mut game, 1, Position::new(10, 10));
        // a hook-shaped body so turning up crashes into the snake itself
        game.player_mut(1).unwrap().snake.body = vec![
            Position::new(10, 10),
            Position::new(10, 9),
            Position::new(11, 9),
            Position::new(11, 10),
            Position::new(11, 11),
        ];
        game.player_mut(1).unwrap().snake.direction = Direction::Left;
        game.set_direction(1, Direction::Up);
        let casualties = game.step();
        assert_eq!(casualties, vec![1]);
    }

    #[test]
    fn test_snake_invariants_hold_over_many_ticks() {
        let mut game = untimed(40, 20, true);
        game.add_player(1);
        game.add_fruit();
        for tick in 0..50 {
            // steer in a wide circle to exercise turns
            let direction = match (tick / 5) % 4 {
                0 => Direction::Right,
                1 => Direction::Down,
                2 => Direction::Left,
                _ => Direction::Up,
            };
            game.set_direction(1, direction);
            game.step();
            let player = match game.player(1) {
                Some(p) => p,
                None => break,
            };
            assert!(player.snake.len() >= INITIAL_SNAKE_LENGTH);
            assert_ne!(
                player.snake.next_direction,
                player.snake.direction.opposite()
            );
            // easy-mode wrapping keeps every segment on the field
            for &cell in &player.snake.body {
                assert!(!physics::outside(cell, game.width, game.height));
            }
        }
    }

    #[test]
    fn test_fruits_never_collide_with_anything() {
        let mut game = untimed(40, 20, false);
        game.spawn_obstacles_random();
        for _ in 0..MAX_FRUITS {
            game.add_fruit();
        }
        for (i, fruit) in game.fruits.iter().enumerate() {
            assert!(fruit.pos.x >= 1 && fruit.pos.x <= game.width - 2);
            assert!(fruit.pos.y >= 1 && fruit.pos.y <= game.height - 2);
            assert!(!physics::hits_obstacle(fruit.pos, &game.obstacles));
            for other in &game.fruits[i + 1..] {
                assert_ne!(fruit.pos, other.pos);
            }
        }
    }

    #[test]
    fn test_fruit_cap() {
        let mut game = untimed(40, 20, true);
        for _ in 0..(MAX_FRUITS + 3) {
            game.add_fruit();
        }
        assert_eq!(game.fruits.len(), MAX_FRUITS);
    }

    #[test]
    fn test_random_obstacles_are_not_adjacent() {
        let mut game = untimed(40, 20, false);
        game.spawn_obstacles_random();
        let max_count = (40 * 20 / OBSTACLE_DENSITY) as usize;
        assert!(!game.obstacles.is_empty());
        assert!(game.obstacles.len() <= max_count);
        for (i, a) in game.obstacles.iter().enumerate() {
            for b in &game.obstacles[i + 1..] {
                let adjacent = (a.pos.x - b.pos.x).abs() <= 1 && (a.pos.y - b.pos.y).abs() <= 1;
                assert!(!adjacent, "obstacles at {:?} and {:?}", a.pos, b.pos);
            }
        }
    }

    #[test]
    fn test_load_obstacles_parses_pairs() {
        let path = std::env::temp_dir().join(format!("obstacles-ok-{}.txt", std::process::id()));
        std::fs::write(&path, "# edge wall\n3 4\n\n10 2\n").unwrap();
        let mut game = untimed(40, 20, false);
        game.load_obstacles(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(game.obstacles.len(), 2);
        assert_eq!(game.obstacles[0].pos, Position::new(3, 4));
        assert_eq!(game.obstacles[1].pos, Position::new(10, 2));
    }

    #[test]
    fn test_load_obstacles_rejects_bad_lines() {
        let path = std::env::temp_dir().join(format!("obstacles-bad-{}.txt", std::process::id()));
        std::fs::write(&path, "3 4 5\n").unwrap();
        let mut game = untimed(40, 20, false);
        assert!(game.load_obstacles(&path).is_err());
        std::fs::write(&path, "99 4\n").unwrap();
        assert!(game.load_obstacles(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_snapshot_reflects_world() {
        let mut game = untimed(40, 20, true);
        place_player(&mut game, 1, Position::new(10, 10));
        place_player(&mut game, 2, Position::new(20, 10));
        game.add_fruit();
        game.players[0].score = 3;

        let snapshot = game.snapshot_for(&game.players[0]);
        assert_eq!(snapshot.width, 40);
        assert_eq!(snapshot.height, 20);
        assert_eq!(snapshot.score, 3);
        assert_eq!(snapshot.game_time_remaining, -1);
        assert_eq!(snapshot.snakes.len(), 2);
        assert_eq!(snapshot.snakes[0].body, game.players[0].snake.body);
        assert_eq!(snapshot.fruits, game.fruits);
    }

    #[test]
    fn test_untimed_timer_reports_minus_one() {
        let timer = GameTimer::new(-1);
        assert!(!timer.is_timed());
        assert!(!timer.expired());
        assert_eq!(timer.remaining_secs(), -1);
    }

    #[test]
    fn test_timed_timer_counts_down() {
        let timer = GameTimer::new(3600);
        assert!(timer.is_timed());
        assert!(!timer.expired());
        let remaining = timer.remaining_secs();
        assert!(remaining > 0 && remaining <= 3600);
    }
}
