//! ANSI rendering of menus and the playfield.
//!
//! The renderer owns the terminal: raw mode plus the alternate screen for
//! the lifetime of the [`Renderer`], restored on drop even when the client
//! bails out with an error.

use std::io::{self, Stdout, Write};

use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, queue, style};
use shared::Snapshot;

use crate::menu::Menu;

const SNAKE_HEAD_CHAR: char = 'O';
const SNAKE_BODY_CHAR: char = 'o';
const FRUIT_CHAR: char = '*';
const OBSTACLE_CHAR: char = '#';
const EMPTY_CHAR: char = ' ';

pub struct Renderer {
    out: Stdout,
}

impl Renderer {
    /// Enters raw mode and the alternate screen.
    pub fn new() -> io::Result<Renderer> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        crossterm::execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Renderer { out })
    }

    /// Draws a menu screen with its selection cursor and an optional note
    /// line underneath (used for game-over and error summaries).
    pub fn draw_menu(&mut self, menu: &Menu, note: Option<&str>) -> io::Result<()> {
        queue!(
            self.out,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(2, 1),
            style::Print(format!("== {} ==", menu.title)),
        )?;
        for (index, item) in menu.items.iter().enumerate() {
            let marker = if index == menu.selected { '>' } else { ' ' };
            queue!(
                self.out,
                cursor::MoveTo(2, 3 + index as u16),
                style::Print(format!("{} {}", marker, item.label)),
            )?;
        }
        if let Some(note) = note {
            queue!(
                self.out,
                cursor::MoveTo(2, 4 + menu.items.len() as u16),
                style::Print(note),
            )?;
        }
        queue!(
            self.out,
            cursor::MoveTo(2, 6 + menu.items.len() as u16),
            style::Print("w/s move, enter select, esc back, q quit"),
        )?;
        self.out.flush()
    }

    /// Draws the playfield and the status line from the latest snapshot.
    pub fn draw_game(&mut self, snapshot: &Snapshot, paused: bool) -> io::Result<()> {
        queue!(
            self.out,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0),
            style::Print(status_line(snapshot, paused)),
        )?;
        for (row, text) in compose_rows(snapshot).into_iter().enumerate() {
            queue!(self.out, cursor::MoveTo(0, 1 + row as u16), style::Print(text))?;
        }
        self.out.flush()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = crossterm::execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// The one-line header above the playfield.
fn status_line(snapshot: &Snapshot, paused: bool) -> String {
    let mut line = format!(
        "score {}  time {}s",
        snapshot.score, snapshot.player_time_elapsed
    );
    if snapshot.game_time_remaining >= 0 {
        line.push_str(&format!("  remaining {}s", snapshot.game_time_remaining));
    }
    if paused {
        line.push_str("  [paused]");
    }
    line
}

/// Renders the playfield into one string per row, with a border around the
/// grid. Pure so it can be tested without a terminal.
fn compose_rows(snapshot: &Snapshot) -> Vec<String> {
    let width = snapshot.width.max(0) as usize;
    let height = snapshot.height.max(0) as usize;
    let mut grid = vec![vec![EMPTY_CHAR; width]; height];

    let put = |x: i32, y: i32, ch: char, grid: &mut Vec<Vec<char>>| {
        if x >= 0 && (x as usize) < width && y >= 0 && (y as usize) < height {
            grid[y as usize][x as usize] = ch;
        }
    };

    for obstacle in &snapshot.obstacles {
        put(obstacle.pos.x, obstacle.pos.y, OBSTACLE_CHAR, &mut grid);
    }
    for fruit in &snapshot.fruits {
        if fruit.active {
            put(fruit.pos.x, fruit.pos.y, FRUIT_CHAR, &mut grid);
        }
    }
    for snake in &snapshot.snakes {
        for (segment, pos) in snake.body.iter().enumerate() {
            let ch = if segment == 0 {
                SNAKE_HEAD_CHAR
            } else {
                SNAKE_BODY_CHAR
            };
            put(pos.x, pos.y, ch, &mut grid);
        }
    }

    let mut rows = Vec::with_capacity(height + 2);
    let horizontal = "-".repeat(width + 2);
    rows.push(horizontal.clone());
    for row in grid {
        let middle: String = row.into_iter().collect();
        rows.push(format!("|{}|", middle));
    }
    rows.push(horizontal);
    rows
}
