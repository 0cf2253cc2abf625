//! # Server Network Layer
//!
//! The concurrent event pipeline that drives the game:
//!
//! - **Listener**: accepts connections on the Unix socket. The very first
//!   accept runs on the main task before the game loop starts, so the
//!   single-player case always begins with a connected client; in
//!   multiplayer an accept-loop task keeps going until shutdown.
//! - **Receiver** (one task per client): reads length-framed messages and
//!   translates them into [`Event`]s for the main loop.
//! - **Main loop**: advances the authoritative simulation on a fixed 100 ms
//!   tick, drains the event queue between ticks, emits per-client snapshot
//!   [`Action`]s and detects the end conditions.
//! - **Worker**: drains the action queue and performs every outward effect:
//!   socket sends, registry removals, and the short-lived timer tasks behind
//!   the grace period and the post-resume freeze window.
//!
//! Data flow: `client socket -> receiver -> event queue -> main loop ->
//! (game state + action queue) -> worker -> client sockets`. Both queues are
//! bounded, so producers back off instead of ballooning memory. The game
//! state itself is touched only by the main loop; everything that leaves it
//! does so as a deep-copied snapshot owned by the action.

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use shared::protocol::{self, Message, HEADER_SIZE};
use shared::{
    Direction, Snapshot, MAX_ACTIONS, MAX_CLIENTS, MAX_EVENTS, TICK_INTERVAL, WORLD_HEIGHT,
    WORLD_WIDTH,
};
use tokio::io::AsyncReadExt;
use tokio::net::unix::OwnedReadHalf;
use tokio::net::UnixListener;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::client_manager::ClientManager;
use crate::game::GameState;

/// How long the main loop waits for the first client before giving up.
const STARTUP_BARRIER: Duration = Duration::from_secs(10);

/// Grace period after the last player leaves a multiplayer game.
const GRACE_PERIOD_SECS: u64 = 10;

/// Freeze window between a resume request and the actual unfreeze.
const RESUME_FREEZE_SECS: u64 = 3;

/// Events posted by receivers and timer tasks to the main loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected { player_id: u32 },
    Input { player_id: u32, direction: Direction },
    Paused { player_id: u32 },
    Resumed { player_id: u32 },
    PostResumeWaitElapsed { player_id: u32 },
    Disconnected { player_id: u32 },
    GraceWaitElapsed,
    Loaded,
    Error { player_id: u32, message: String },
}

/// Outward effects posted by the main loop to the worker. A snapshot handed
/// to `SendState` is owned by the action and released by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SendReady { player_id: u32 },
    SendGameOver { player_id: u32 },
    SendState { player_id: u32, snapshot: Snapshot },
    UnregisterPlayer { player_id: u32 },
    WaitForEnd { seconds: u64 },
    WaitPaused { player_id: u32, seconds: u64 },
    SendError { player_id: u32, message: String },
}

/// Server configuration, normally taken from the command line.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    pub single_player: bool,
    /// Game length in seconds; zero or negative means untimed.
    pub game_time: i64,
    /// Obstacles make the world "hard": walls kill instead of wrapping.
    pub obstacles_enabled: bool,
    pub random_world: bool,
    pub obstacles_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        ServerConfig {
            socket_path: socket_path.into(),
            single_player: true,
            game_time: -1,
            obstacles_enabled: false,
            random_world: true,
            obstacles_file: None,
        }
    }
}

/// The server: owns the game state and wires the listener, the receivers,
/// the worker and the main loop together.
pub struct Server {
    config: ServerConfig,
    clients: Arc<RwLock<ClientManager>>,
    game: GameState,
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
    action_tx: mpsc::Sender<Action>,
    action_rx: Option<mpsc::Receiver<Action>>,
    running_tx: watch::Sender<bool>,
    accepting_tx: watch::Sender<bool>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(MAX_EVENTS);
        let (action_tx, action_rx) = mpsc::channel(MAX_ACTIONS);
        let (running_tx, _) = watch::channel(true);
        let (accepting_tx, _) = watch::channel(true);
        let game = GameState::new(
            WORLD_WIDTH,
            WORLD_HEIGHT,
            config.game_time,
            !config.obstacles_enabled,
        );

        Server {
            config,
            clients: Arc::new(RwLock::new(ClientManager::new(MAX_CLIENTS))),
            game,
            event_tx,
            event_rx,
            action_tx,
            action_rx: Some(action_rx),
            running_tx,
            accepting_tx,
        }
    }

    /// Runs the server to completion: bind, accept, simulate, tear down.
    pub async fn run(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.config.obstacles_enabled {
            if self.config.random_world {
                self.game.spawn_obstacles_random();
            } else {
                let path = self
                    .config
                    .obstacles_file
                    .clone()
                    .ok_or("an obstacles file is required when random world is disabled")?;
                self.game.load_obstacles(&path)?;
            }
        }

        let listener = setup_listener(&self.config.socket_path)?;
        info!("listening on {}", self.config.socket_path.display());
        // readiness signal for launch scripts, besides the socket file itself
        println!("ready");

        // the very first client is accepted on the main task, so the game
        // never starts without a connected player
        let running_rx = self.running_tx.subscribe();
        accept_once(&listener, &self.clients, &self.event_tx, &running_rx).await?;

        let accept_task = if self.config.single_player {
            info!("single player: closing the listener");
            drop(listener);
            let _ = std::fs::remove_file(&self.config.socket_path);
            None
        } else {
            Some(self.spawn_accept_loop(listener))
        };

        let worker = tokio::spawn(worker_loop(
            self.action_rx.take().ok_or("server can only run once")?,
            Arc::clone(&self.clients),
            self.event_tx.clone(),
            self.running_tx.subscribe(),
        ));

        let started = self.game_loop().await;

        if started {
            // every registered client hears the end before its socket closes
            self.clients.write().await.broadcast(&Message::GameOver).await;
            info!("game over broadcast to all clients");
        }

        let _ = self.accepting_tx.send(false);
        let _ = self.running_tx.send(false);

        // the listener goes first, so nobody can register with a registry
        // that is about to be torn down
        let multiplayer = if let Some(task) = accept_task {
            let _ = task.await;
            true
        } else {
            false
        };
        let _ = worker.await;
        self.clients.write().await.destroy().await;
        if multiplayer {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }
        info!("server shut down");
        Ok(())
    }

    fn spawn_accept_loop(&self, listener: UnixListener) -> JoinHandle<()> {
        let clients = Arc::clone(&self.clients);
        let event_tx = self.event_tx.clone();
        let running = self.running_tx.subscribe();
        let mut accepting = self.accepting_tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = accept_once(&listener, &clients, &event_tx, &running) => {
                        if let Err(e) = result {
                            // transient failure; keep accepting
                            warn!("accept failed: {}", e);
                        }
                    }
                    _ = accepting.changed() => {
                        if !*accepting.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("accept loop finished");
        })
    }

    /// The tick loop. Returns false when the startup barrier expired before
    /// any client connected.
    async fn game_loop(&mut self) -> bool {
        // startup barrier: the first Connected event must arrive in time
        let deadline = Instant::now() + STARTUP_BARRIER;
        loop {
            match time::timeout_at(deadline, self.event_rx.recv()).await {
                Ok(Some(event)) => {
                    let connected = matches!(event, Event::Connected { .. });
                    self.apply_event(event).await;
                    if connected {
                        break;
                    }
                }
                Ok(None) => return false,
                Err(_) => {
                    error!("no client connected within {:?}", STARTUP_BARRIER);
                    let message = Message::Error("no client connected in time".to_string());
                    self.clients.write().await.broadcast(&message).await;
                    return false;
                }
            }
        }

        let timed_mode = self.game.timer.is_timed();
        let mut ticks = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // one deep-copied snapshot per connected player
            let snapshots: Vec<Action> = self
                .game
                .players
                .iter()
                .map(|p| Action::SendState {
                    player_id: p.id,
                    snapshot: self.game.snapshot_for(p),
                })
                .collect();
            for action in snapshots {
                self.post_action(action).await;
            }

            // sleep only for the remainder of the tick period
            ticks.tick().await;

            for player_id in self.game.step() {
                self.post_action(Action::SendGameOver { player_id }).await;
            }

            let mut finished = false;
            while let Ok(event) = self.event_rx.try_recv() {
                if self.apply_event(event).await {
                    finished = true;
                }
            }

            if finished || self.check_end(timed_mode).await {
                break;
            }
        }

        info!("game loop ended");
        true
    }

    /// Applies one event's state mutation and posts its resulting actions.
    /// Returns true when the event ends the game.
    async fn apply_event(&mut self, event: Event) -> bool {
        match event {
            Event::Connected { player_id } => {
                self.game.add_fruit();
                self.game.add_player(player_id);
                self.post_action(Action::SendReady { player_id }).await;
            }
            Event::Input {
                player_id,
                direction,
            } => self.game.set_direction(player_id, direction),
            Event::Paused { player_id } => self.game.pause_player(player_id),
            Event::Resumed { player_id } => {
                self.game.begin_resume(player_id);
                self.post_action(Action::WaitPaused {
                    player_id,
                    seconds: RESUME_FREEZE_SECS,
                })
                .await;
            }
            Event::PostResumeWaitElapsed { player_id } => self.game.complete_resume(player_id),
            Event::Disconnected { player_id } => {
                self.game.remove_player(player_id);
                // when this departure is what ends the game (a single-player
                // game reaching zero players), the leaver still hears
                // GAME_OVER before the unregister closes its socket; a leave
                // from a game that keeps running for others is not a game
                // over and sends nothing
                if self.config.single_player && self.game.player_count() == 0 {
                    self.post_action(Action::SendGameOver { player_id }).await;
                }
                self.post_action(Action::UnregisterPlayer { player_id }).await;
            }
            Event::GraceWaitElapsed => {
                self.game.wait_for_end_pending = false;
                if self.game.player_count() == 0 {
                    info!("grace period elapsed with no players");
                    return true;
                }
            }
            Event::Loaded => debug!("world loaded"),
            Event::Error { player_id, message } => {
                self.post_action(Action::SendError { player_id, message }).await;
            }
        }
        false
    }

    /// End-of-tick check for the two game modes.
    async fn check_end(&mut self, timed_mode: bool) -> bool {
        if timed_mode {
            return self.game.timer.expired()
                || (self.config.single_player && self.game.player_count() == 0);
        }
        if self.game.player_count() == 0 {
            if self.config.single_player {
                return true;
            }
            if !self.game.wait_for_end_pending {
                self.game.wait_for_end_pending = true;
                info!(
                    "no players left, shutting down in {}s unless someone joins",
                    GRACE_PERIOD_SECS
                );
                self.post_action(Action::WaitForEnd {
                    seconds: GRACE_PERIOD_SECS,
                })
                .await;
            }
        }
        false
    }

    async fn post_action(&self, action: Action) {
        if self.action_tx.send(action).await.is_err() {
            warn!("action queue closed, dropping action");
        }
    }
}

/// Binds the listening socket, replacing any stale socket file at the path.
fn setup_listener(path: &Path) -> io::Result<UnixListener> {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("removed stale socket file {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    UnixListener::bind(path)
}

/// Accepts one connection, spawns its receiver task and registers it.
async fn accept_once(
    listener: &UnixListener,
    clients: &Arc<RwLock<ClientManager>>,
    event_tx: &mpsc::Sender<Event>,
    running: &watch::Receiver<bool>,
) -> io::Result<()> {
    let (stream, _) = listener.accept().await?;
    let mut registry = clients.write().await;
    if registry.len() >= MAX_CLIENTS {
        warn!("rejecting connection: server is full");
        return Ok(()); // dropping the stream closes it
    }
    let id = registry.allocate_id();
    info!("accepted connection for player {}", id);
    let (reader, writer) = stream.into_split();
    let receiver = tokio::spawn(receiver_loop(reader, id, event_tx.clone(), running.clone()));
    registry.register(id, writer, receiver);
    Ok(())
}

/// Per-client receive loop. Posts `Connected` immediately, then translates
/// framed messages into events until the peer closes, a read fails, or
/// shutdown is signalled. `Disconnected` is posted at most once on the way
/// out.
async fn receiver_loop(
    mut reader: OwnedReadHalf,
    player_id: u32,
    events: mpsc::Sender<Event>,
    mut running: watch::Receiver<bool>,
) {
    if events.send(Event::Connected { player_id }).await.is_err() {
        return;
    }
    let mut disconnect_sent = false;

    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok((kind, payload)) => match Message::decode(kind, &payload) {
                    Ok(Some(message)) => {
                        if let Some(event) = translate(player_id, message) {
                            if matches!(event, Event::Disconnected { .. }) {
                                disconnect_sent = true;
                            }
                            if events.send(event).await.is_err() {
                                return; // main loop is gone
                            }
                        }
                    }
                    // unknown kinds and malformed payloads are dropped
                    Ok(None) => debug!("player {} sent unknown message kind {}", player_id, kind),
                    Err(e) => warn!("player {} sent a malformed message: {}", player_id, e),
                },
                Err(e) => {
                    debug!("player {} read ended: {}", player_id, e);
                    break;
                }
            },
            _ = running.changed() => {
                if !*running.borrow() {
                    break;
                }
            }
        }
    }

    if !disconnect_sent {
        let _ = events.send(Event::Disconnected { player_id }).await;
    }
    debug!("receiver for player {} finished", player_id);
}

/// Complete-reads one frame: the 8-byte header, then exactly the declared
/// payload. A nonsensical size declaration poisons the stream and surfaces
/// as an error, since resynchronization is impossible.
async fn read_frame(reader: &mut OwnedReadHalf) -> io::Result<(u32, Vec<u8>)> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await?;
    let (kind, payload_size) = protocol::decode_header(&header)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut payload = vec![0u8; payload_size as usize];
    if payload_size > 0 {
        reader.read_exact(&mut payload).await?;
    }
    Ok((kind, payload))
}

/// Receiver-side translation table from wire messages to events.
fn translate(player_id: u32, message: Message) -> Option<Event> {
    match message {
        Message::Input(direction) => Some(Event::Input {
            player_id,
            direction,
        }),
        Message::Pause => Some(Event::Paused { player_id }),
        Message::Resume => Some(Event::Resumed { player_id }),
        Message::Leave => Some(Event::Disconnected { player_id }),
        // server-to-client kinds arriving here are dropped
        _ => None,
    }
}

/// Worker loop: drains the action queue and performs all outward effects,
/// never touching the game state. On shutdown the remaining actions are
/// drained before returning so stragglers still get their messages and
/// owned snapshots are released.
async fn worker_loop(
    mut actions: mpsc::Receiver<Action>,
    clients: Arc<RwLock<ClientManager>>,
    events: mpsc::Sender<Event>,
    mut running: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            action = actions.recv() => match action {
                Some(action) => exec_action(action, &clients, &events).await,
                None => break,
            },
            _ = running.changed() => {
                if !*running.borrow() {
                    break;
                }
            }
        }
    }

    while let Ok(action) = actions.try_recv() {
        exec_action(action, &clients, &events).await;
    }
    debug!("worker finished");
}

/// Executes one action. Send failures are logged inside the registry; the
/// affected client is cleaned up when its receiver reports the disconnect.
async fn exec_action(
    action: Action,
    clients: &Arc<RwLock<ClientManager>>,
    events: &mpsc::Sender<Event>,
) {
    match action {
        Action::SendReady { player_id } => {
            clients.write().await.send(player_id, &Message::Ready).await;
        }
        Action::SendGameOver { player_id } => {
            clients.write().await.send(player_id, &Message::GameOver).await;
        }
        Action::SendState {
            player_id,
            snapshot,
        } => {
            clients
                .write()
                .await
                .send(player_id, &Message::State(snapshot))
                .await;
        }
        Action::SendError { player_id, message } => {
            clients
                .write()
                .await
                .send(player_id, &Message::Error(message))
                .await;
        }
        Action::UnregisterPlayer { player_id } => {
            clients.write().await.remove(player_id).await;
        }
        Action::WaitForEnd { seconds } => {
            let events = events.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_secs(seconds)).await;
                let _ = events.send(Event::GraceWaitElapsed).await;
            });
        }
        Action::WaitPaused { player_id, seconds } => {
            let events = events.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_secs(seconds)).await;
                let _ = events
                    .send(Event::PostResumeWaitElapsed { player_id })
                    .await;
            });
        }
    }
}
