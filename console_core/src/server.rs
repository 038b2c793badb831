use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{info, warn};

use crate::bridge::CommandSubmitter;
use crate::config::ConsoleConfig;
use crate::connection::{ConnectionHandler, MessageChannel};
use crate::events::{event_channel, ConnectionEvent};
use crate::session::SessionRegistry;

/// Line-framed text channel over a TCP stream: one message per
/// newline-terminated line, blank lines skipped. Stands in for the platform
/// transport the core otherwise treats as opaque.
pub struct TcpLineChannel {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    peer: SocketAddr,
}

impl TcpLineChannel {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> io::Result<Self> {
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            peer,
        })
    }
}

impl MessageChannel for TcpLineChannel {
    fn recv(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
    }

    fn send(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    fn peer(&self) -> SocketAddr {
        self.peer
    }
}

/// Handle to a running command server. Dropping it does not stop the accept
/// loop; call [`shutdown`](Self::shutdown) to stop accepting connections.
pub struct CommandServer {
    local_addr: SocketAddr,
    events: Receiver<ConnectionEvent>,
    shutdown: Arc<AtomicBool>,
}

impl CommandServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Lifecycle events from all connections, for logging and metrics.
    pub fn events(&self) -> &Receiver<ConnectionEvent> {
        &self.events
    }

    /// Stops accepting new connections. Existing connections run to their
    /// own disconnect.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Binds the listening socket and spawns the accept loop: one handler
/// thread per connection, each feeding the shared execution bridge.
pub fn start_command_server(
    config: &ConsoleConfig,
    registry: Arc<SessionRegistry>,
    submitter: CommandSubmitter,
) -> io::Result<CommandServer> {
    let listener = TcpListener::bind(config.command_bind)?;
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;

    let (events, event_rx) = event_channel();
    let shutdown = Arc::new(AtomicBool::new(false));
    let verifier = config.auth.verifier();
    let style = config.auth.style();

    let accept_shutdown = Arc::clone(&shutdown);
    thread::spawn(move || loop {
        if accept_shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, addr)) => {
                info!("Command client connected: {}", addr);
                if let Err(err) = stream.set_nodelay(true) {
                    warn!("Failed to set TCP_NODELAY: {}", err);
                }
                if let Err(err) = stream.set_nonblocking(false) {
                    warn!(
                        "Failed to set blocking mode for command client {}: {}",
                        addr, err
                    );
                    continue;
                }
                let mut handler = ConnectionHandler::new(
                    Arc::clone(&verifier),
                    style,
                    Arc::clone(&registry),
                    submitter.clone(),
                    events.clone(),
                );
                thread::spawn(move || match TcpLineChannel::new(stream, addr) {
                    Ok(mut channel) => handler.run(&mut channel),
                    Err(err) => warn!("Failed to open channel for {}: {}", addr, err),
                });
            }
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                warn!("Error accepting command client: {}", err);
                thread::sleep(Duration::from_millis(200));
            }
        }
    });

    Ok(CommandServer {
        local_addr,
        events: event_rx,
        shutdown,
    })
}
