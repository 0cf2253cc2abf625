//! Client-side connection to the game server.
//!
//! The socket is a plain blocking `UnixStream`: a background reader thread
//! turns incoming frames into [`Message`]s on a channel, while sends happen
//! directly from the caller. Dropping the [`Connection`] shuts the socket
//! down, which also stops the reader.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use shared::protocol::{self, Message, HEADER_SIZE};
use shared::Direction;

/// How long to wait for the server's socket file to appear.
const SOCKET_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Polling step while waiting for the socket file.
const SOCKET_WAIT_STEP: Duration = Duration::from_millis(100);

/// Blocks until `path` exists, polling in small steps. A freshly spawned
/// server creates its socket file on startup; this is how the client knows
/// it is safe to connect.
pub fn wait_for_socket(path: &Path) -> io::Result<()> {
    let deadline = Instant::now() + SOCKET_WAIT_TIMEOUT;
    while !path.exists() {
        if Instant::now() >= deadline {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("server socket {} did not appear", path.display()),
            ));
        }
        thread::sleep(SOCKET_WAIT_STEP);
    }
    Ok(())
}

/// A live connection to the server.
pub struct Connection {
    stream: UnixStream,
    incoming: Receiver<Message>,
    reader: Option<thread::JoinHandle<()>>,
}

impl Connection {
    /// Waits for the socket path, connects and starts the reader thread.
    pub fn connect(path: &Path) -> io::Result<Connection> {
        wait_for_socket(path)?;
        let stream = UnixStream::connect(path)?;
        info!("connected to {}", path.display());

        let reader_stream = stream.try_clone()?;
        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || reader_loop(reader_stream, tx));

        Ok(Connection {
            stream,
            incoming: rx,
            reader: Some(reader),
        })
    }

    /// Next pending server message, without blocking. `Ok(None)` when
    /// nothing has arrived yet; an error means the server is gone.
    pub fn try_message(&self) -> io::Result<Option<Message>> {
        match self.incoming.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "server closed the connection",
            )),
        }
    }

    pub fn send(&mut self, message: &Message) -> io::Result<()> {
        let frame = message
            .encode()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.stream.write_all(&frame)
    }

    pub fn send_input(&mut self, direction: Direction) -> io::Result<()> {
        self.send(&Message::Input(direction))
    }

    pub fn send_pause(&mut self) -> io::Result<()> {
        self.send(&Message::Pause)
    }

    pub fn send_resume(&mut self) -> io::Result<()> {
        self.send(&Message::Resume)
    }

    pub fn send_leave(&mut self) -> io::Result<()> {
        self.send(&Message::Leave)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

/// Reads frames until the stream ends, forwarding decoded messages.
/// Unknown kinds and malformed payloads are dropped; only a dead socket or
/// a poisoned stream ends the loop.
fn reader_loop(mut stream: UnixStream, tx: mpsc::Sender<Message>) {
    loop {
        let mut header = [0u8; HEADER_SIZE];
        if let Err(e) = stream.read_exact(&mut header) {
            debug!("server read ended: {}", e);
            break;
        }
        let (kind, payload_size) = match protocol::decode_header(&header) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("bad frame header, dropping connection: {}", e);
                break;
            }
        };
        let mut payload = vec![0u8; payload_size as usize];
        if payload_size > 0 {
            if let Err(e) = stream.read_exact(&mut payload) {
                debug!("server read ended mid-payload: {}", e);
                break;
            }
        }
        match Message::decode(kind, &payload) {
            Ok(Some(message)) => {
                if tx.send(message).is_err() {
                    break; // client side is gone
                }
            }
            Ok(None) => debug!("dropping unknown message kind {}", kind),
            Err(e) => warn!("dropping malformed message: {}", e),
        }
    }
}
