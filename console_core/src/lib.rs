//! Remote administrative command channel for a headless server process.
//!
//! Operators connect over a duplex text transport, authenticate against a
//! pluggable [`CredentialVerifier`], and submit commands that are handed off
//! through the single-slot [`bridge`] into the one thread allowed to touch
//! simulation state. Each command produces exactly one textual result, which
//! the connection handler relays back verbatim.

pub mod auth;
pub mod bridge;
pub mod config;
pub mod connection;
pub mod events;
pub mod interpreter;
pub mod protocol;
pub mod server;
pub mod session;

pub use auth::{CredentialVerifier, SharedPasswordVerifier};
pub use bridge::{
    execution_bridge, BridgeError, CommandExecutor, CommandSubmitter, COMMAND_FAILED_REPLY,
};
pub use config::{AuthMode, ConsoleConfig};
pub use connection::{AuthStyle, ConnectionHandler, ConnectionState, MessageChannel};
pub use events::{event_channel, ConnectionEvent, EventSink};
pub use interpreter::{
    Broadcast, ChannelBroadcast, CommandInterpreter, ConsoleInterpreter, HEARTBEAT_TEXT,
    HELP_TEXT, UNKNOWN_COMMAND_TEXT,
};
pub use protocol::{Envelope, LoginAction, ProtocolError};
pub use server::{start_command_server, CommandServer, TcpLineChannel};
pub use session::{Credentials, Session, SessionRegistry, SessionView};
