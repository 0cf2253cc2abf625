//! Client-side view of a running game session.

use shared::protocol::Message;
use shared::Snapshot;

/// Everything the client knows about its session, folded together from the
/// messages the server sends. The client holds no authority: the snapshot is
/// replaced wholesale whenever a new one arrives.
#[derive(Debug, Default)]
pub struct Session {
    /// Set once the server acknowledged the join.
    pub ready: bool,
    /// Set when the server declared this player's game over.
    pub game_over: bool,
    /// Last error text the server sent, if any.
    pub error: Option<String>,
    /// Latest world view.
    pub snapshot: Snapshot,
    /// Local pause toggle, mirroring what was requested from the server.
    pub paused: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one server message into the view.
    pub fn apply(&mut self, message: Message) {
        match message {
            Message::Ready => self.ready = true,
            Message::GameOver => self.game_over = true,
            Message::State(snapshot) => self.snapshot = snapshot,
            Message::Time(seconds) => self.snapshot.game_time_remaining = seconds,
            Message::Error(text) => self.error = Some(text),
            // client-to-server kinds are never expected here
            Message::Input(_) | Message::Pause | Message::Resume | Message::Leave => {}
        }
    }

    /// Flips the local pause state, returning the new value so the caller
    /// knows whether to send PAUSE or RESUME.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Position, SnakeSnapshot};

    #[test]
    fn test_ready_and_game_over_flags() {
        let mut session = Session::new();
        assert!(!session.ready);

        session.apply(Message::Ready);
        assert!(session.ready);
        assert!(!session.game_over);

        session.apply(Message::GameOver);
        assert!(session.game_over);
    }

    #[test]
    fn test_state_replaces_snapshot() {
        let mut session = Session::new();
        let snapshot = Snapshot {
            width: 40,
            height: 20,
            score: 2,
            player_time_elapsed: 9,
            game_time_remaining: -1,
            snakes: vec![SnakeSnapshot {
                body: vec![Position::new(5, 5)],
            }],
            fruits: Vec::new(),
            obstacles: Vec::new(),
        };
        session.apply(Message::State(snapshot.clone()));
        assert_eq!(session.snapshot, snapshot);
    }

    #[test]
    fn test_time_updates_remaining_seconds() {
        let mut session = Session::new();
        session.apply(Message::Time(42));
        assert_eq!(session.snapshot.game_time_remaining, 42);
    }

    #[test]
    fn test_error_is_recorded() {
        let mut session = Session::new();
        session.apply(Message::Error("boom".to_string()));
        assert_eq!(session.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_toggle_pause_alternates() {
        let mut session = Session::new();
        assert!(session.toggle_pause());
        assert!(session.paused);
        assert!(!session.toggle_pause());
        assert!(!session.paused);
    }
}
