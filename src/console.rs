//! Console server: the command-protocol service feeding the control channel.
//!
//! Listens on TCP and reads newline-delimited messages from each client.
//! A line is either a JSON object `{"topic": "...", "payload": ...}` or a
//! bare topic word such as `poke` or `stop`. Every parsed message is pushed
//! into the control channel with drop-oldest semantics and acknowledged
//! with one reply line; malformed lines get an error reply and are dropped.
//!
//! The server runs on its own single-threaded tokio runtime, one task per
//! client, and never talks to the tick loop except through the channel.

use crate::control::{ControlMessage, ControlSender, SendOutcome, Topic};
use crate::error::{Error, Result};
use std::io;
use std::net::SocketAddr;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(20);

/// Parse one protocol line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> std::result::Result<Option<ControlMessage>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with('{') {
        return serde_json::from_str(line)
            .map(Some)
            .map_err(|e| e.to_string());
    }
    if line.split_whitespace().count() != 1 {
        return Err(format!("expected one topic word, got {line:?}"));
    }
    Ok(Some(ControlMessage::new(Topic::from(line))))
}

/// What to send back for one client line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reply {
    text: String,
    hang_up: bool,
}

impl Reply {
    fn line(text: String) -> Self {
        Self {
            text,
            hang_up: false,
        }
    }
}

/// Handle one line; `None` for blank lines, which get no reply.
fn respond(line: &str, sender: &ControlSender) -> Option<Reply> {
    let message = match parse_line(line) {
        Ok(message) => message?,
        Err(reason) => {
            warn!(%reason, "malformed console line");
            return Some(Reply::line(format!("error: {reason}")));
        }
    };

    let topic = message.topic.clone();
    let reply = match sender.try_send(message) {
        SendOutcome::Queued => Reply::line(format!("ok {topic}")),
        SendOutcome::ReplacedOldest(dropped) => {
            Reply::line(format!("ok {topic} (dropped pending {})", dropped.topic))
        }
        SendOutcome::Closed => Reply {
            text: "error: table is shutting down".to_string(),
            hang_up: true,
        },
    };
    Some(reply)
}

/// Background TCP server forwarding console messages.
#[derive(Debug)]
pub struct ConsoleServer {
    addr: SocketAddr,
    handle: Option<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl ConsoleServer {
    /// Bind `addr` and start accepting clients.
    ///
    /// Failing to bind is fatal for the caller.
    ///
    /// # Panics
    ///
    /// Panics if the OS fails to spawn the server thread.
    pub fn spawn(addr: SocketAddr, sender: ControlSender) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let listener = runtime
            .block_on(TcpListener::bind(addr))
            .map_err(|source| Error::ConsoleBind { addr, source })?;
        let addr = listener.local_addr()?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = thread::Builder::new()
            .name("tabletop-console".to_string())
            .spawn(move || runtime.block_on(accept_loop(listener, sender, shutdown_rx)))
            .expect("Failed to spawn console thread");

        info!(%addr, "console server listening");
        Ok(Self {
            addr,
            handle: Some(handle),
            shutdown,
        })
    }

    /// The bound address (useful when binding port 0).
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal the server to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Stop the server and wait for its thread.
    ///
    /// Connected clients are dropped along with the runtime.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ConsoleServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn accept_loop(
    listener: TcpListener,
    sender: ControlSender,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "console client connected");
                    let sender = sender.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_client(stream, &sender).await {
                            debug!(%peer, error = %e, "console client dropped");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "console accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
    debug!("console server stopped");
}

/// Read lines from one client until it disconnects or the table closes.
async fn serve_client(stream: TcpStream, sender: &ControlSender) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let Some(reply) = respond(&line, sender) else {
            continue;
        };
        writer.write_all(reply.text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        if reply.hang_up {
            break;
        }
    }
    Ok(())
}
