use shared::{Fruit, Obstacle, Position};

use crate::entity::{Player, Snake};

/// Moves a snake one cell: adopts the staged direction, lets every segment
/// take the place of the one ahead of it and advances the head.
pub fn advance(snake: &mut Snake) {
    snake.direction = snake.next_direction;
    let (dx, dy) = snake.direction.offset();
    let head = snake.head();
    snake.body.rotate_right(1);
    snake.body[0] = Position::new(head.x + dx, head.y + dy);
}

/// Grows a snake by one segment, duplicating the current tail cell. The
/// duplicate separates on the next advance.
pub fn grow(snake: &mut Snake) {
    if let Some(&tail) = snake.body.last() {
        snake.body.push(tail);
    }
}

/// True when `head` lands on any snake body segment, including the moving
/// player's own body. Only that player's own head cell is skipped.
pub fn hits_snake(head: Position, player_id: u32, players: &[Player]) -> bool {
    players.iter().any(|other| {
        other
            .snake
            .body
            .iter()
            .enumerate()
            .any(|(segment, &pos)| !(other.id == player_id && segment == 0) && pos == head)
    })
}

pub fn hits_obstacle(head: Position, obstacles: &[Obstacle]) -> bool {
    obstacles.iter().any(|o| o.pos == head)
}

/// Index of the active fruit at `head`, if any.
pub fn fruit_at(head: Position, fruits: &[Fruit]) -> Option<usize> {
    fruits.iter().position(|f| f.active && f.pos == head)
}

pub fn outside(head: Position, width: i32, height: i32) -> bool {
    head.x < 0 || head.x >= width || head.y < 0 || head.y >= height
}

/// Wraps a head that left the playfield back in on the opposite edge.
pub fn wrap(head: Position, width: i32, height: i32) -> Position {
    Position::new(head.x.rem_euclid(width), head.y.rem_euclid(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Direction;

    fn snake_at(head: Position) -> Snake {
        Snake::new(head)
    }

    #[test]
    fn test_advance_moves_head_and_tail_follows() {
        let mut snake = snake_at(Position::new(5, 5));
        advance(&mut snake);
        assert_eq!(snake.head(), Position::new(6, 5));
        assert_eq!(snake.body[1], Position::new(5, 5));
        assert_eq!(snake.body[2], Position::new(4, 5));
        assert_eq!(snake.len(), 3);
    }

    #[test]
    fn test_advance_adopts_staged_direction() {
        let mut snake = snake_at(Position::new(5, 5));
        snake.next_direction = Direction::Down;
        advance(&mut snake);
        assert_eq!(snake.direction, Direction::Down);
        assert_eq!(snake.head(), Position::new(5, 6));
    }

    #[test]
    fn test_advance_vacates_the_tail_cell() {
        let mut snake = snake_at(Position::new(5, 5));
        let old_tail = *snake.body.last().unwrap();
        advance(&mut snake);
        assert!(!snake.body.contains(&old_tail));
    }

    #[test]
    fn test_grow_duplicates_tail() {
        let mut snake = snake_at(Position::new(5, 5));
        let tail = *snake.body.last().unwrap();
        grow(&mut snake);
        assert_eq!(snake.len(), 4);
        assert_eq!(snake.body[2], tail);
        assert_eq!(snake.body[3], tail);
    }

    #[test]
    fn test_grown_snake_separates_on_next_advance() {
        let mut snake = snake_at(Position::new(5, 5));
        grow(&mut snake);
        advance(&mut snake);
        for pair in snake.body.windows(2) {
            let dist = (pair[0].x - pair[1].x).abs() + (pair[0].y - pair[1].y).abs();
            assert_eq!(dist, 1);
        }
    }

    #[test]
    fn test_hits_snake_skips_own_head_only() {
        let players = vec![Player::new(1, Position::new(5, 5))];
        // own head cell does not count as a collision
        assert!(!hits_snake(Position::new(5, 5), 1, &players));
        // own body does
        assert!(hits_snake(Position::new(4, 5), 1, &players));
        // another player's head does too
        assert!(hits_snake(Position::new(5, 5), 2, &players));
    }

    #[test]
    fn test_hits_snake_detects_other_bodies() {
        let players = vec![
            Player::new(1, Position::new(5, 5)),
            Player::new(2, Position::new(10, 10)),
        ];
        assert!(hits_snake(Position::new(9, 10), 1, &players));
        assert!(!hits_snake(Position::new(20, 20), 1, &players));
    }

    #[test]
    fn test_hits_obstacle() {
        let obstacles = vec![Obstacle {
            pos: Position::new(3, 4),
        }];
        assert!(hits_obstacle(Position::new(3, 4), &obstacles));
        assert!(!hits_obstacle(Position::new(4, 3), &obstacles));
    }

    #[test]
    fn test_fruit_at_ignores_inactive() {
        let fruits = vec![
            Fruit {
                pos: Position::new(1, 1),
                active: false,
            },
            Fruit {
                pos: Position::new(2, 2),
                active: true,
            },
        ];
        assert_eq!(fruit_at(Position::new(1, 1), &fruits), None);
        assert_eq!(fruit_at(Position::new(2, 2), &fruits), Some(1));
    }

    #[test]
    fn test_outside_bounds() {
        assert!(!outside(Position::new(0, 0), 10, 10));
        assert!(!outside(Position::new(9, 9), 10, 10));
        assert!(outside(Position::new(10, 5), 10, 10));
        assert!(outside(Position::new(-1, 5), 10, 10));
        assert!(outside(Position::new(5, 10), 10, 10));
        assert!(outside(Position::new(5, -1), 10, 10));
    }

    #[test]
    fn test_wrap_all_four_edges() {
        assert_eq!(wrap(Position::new(10, 5), 10, 10), Position::new(0, 5));
        assert_eq!(wrap(Position::new(-1, 5), 10, 10), Position::new(9, 5));
        assert_eq!(wrap(Position::new(5, 10), 10, 10), Position::new(5, 0));
        assert_eq!(wrap(Position::new(5, -1), 10, 10), Position::new(5, 9));
    }
}
