use std::time::Instant;

use shared::{Direction, Position, INITIAL_SNAKE_LENGTH};

/// A snake body with its staged steering state. The head is at index 0.
#[derive(Debug, Clone)]
pub struct Snake {
    pub body: Vec<Position>,
    pub direction: Direction,
    /// Direction adopted on the next tick. Never the opposite of `direction`.
    pub next_direction: Direction,
}

impl Snake {
    /// New snake with its head at `head` and the body extending to the left,
    /// travelling right.
    pub fn new(head: Position) -> Self {
        let body = (0..INITIAL_SNAKE_LENGTH as i32)
            .map(|i| Position::new(head.x - i, head.y))
            .collect();
        Snake {
            body,
            direction: Direction::Right,
            next_direction: Direction::Right,
        }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// One connected participant and the snake it owns.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub snake: Snake,
    pub score: u64,
    pub paused: bool,
    /// Set while a pause is in force and no resume has been requested yet.
    /// Cleared by a resume request; a further pause inside the freeze window
    /// re-sets it, which cancels the pending unfreeze.
    pub resume_pending: bool,
    joined: Instant,
}

impl Player {
    pub fn new(id: u32, head: Position) -> Self {
        Player {
            id,
            snake: Snake::new(head),
            score: 0,
            paused: false,
            resume_pending: false,
            joined: Instant::now(),
        }
    }

    /// Whole seconds since this player joined the game.
    pub fn time_elapsed(&self) -> i32 {
        self.joined.elapsed().as_secs() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_snake_extends_left_of_head() {
        let snake = Snake::new(Position::new(5, 5));
        assert_eq!(snake.len(), INITIAL_SNAKE_LENGTH);
        assert_eq!(snake.head(), Position::new(5, 5));
        assert_eq!(snake.body[1], Position::new(4, 5));
        assert_eq!(snake.body[2], Position::new(3, 5));
        assert_eq!(snake.direction, Direction::Right);
        assert_eq!(snake.next_direction, Direction::Right);
    }

    #[test]
    fn test_new_snake_segments_are_adjacent() {
        let snake = Snake::new(Position::new(10, 3));
        for pair in snake.body.windows(2) {
            let dist = (pair[0].x - pair[1].x).abs() + (pair[0].y - pair[1].y).abs();
            assert_eq!(dist, 1);
        }
    }

    #[test]
    fn test_new_player_state() {
        let player = Player::new(7, Position::new(5, 5));
        assert_eq!(player.id, 7);
        assert_eq!(player.score, 0);
        assert!(!player.paused);
        assert!(!player.resume_pending);
        assert!(player.time_elapsed() >= 0);
    }
}
