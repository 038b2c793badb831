use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::CredentialVerifier;
use crate::bridge::{BridgeError, CommandSubmitter, COMMAND_FAILED_REPLY};
use crate::events::{ConnectionEvent, EventSink};
use crate::protocol::{Envelope, LoginAction, ProtocolError};
use crate::session::{Credentials, Session, SessionRegistry, SessionView};

/// Duplex, message-framed text transport supplied by the platform. The
/// handler never sees wire framing; `recv` returns `Ok(None)` on orderly
/// peer disconnect.
pub trait MessageChannel {
    fn recv(&mut self) -> io::Result<Option<String>>;
    fn send(&mut self, text: &str) -> io::Result<()>;
    fn peer(&self) -> SocketAddr;
}

/// Framing of the authentication exchange, selected per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `{type, data}` JSON envelopes with a per-user login action.
    JsonLogin,
    /// First raw line is the shared password; afterwards commands and
    /// replies are raw lines with no envelope.
    RawPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    AwaitingLogin,
    Authenticated,
    Closed,
}

/// One instance per accepted connection. Runs the auth handshake, then
/// relays command text through the execution bridge and the result back.
pub struct ConnectionHandler {
    verifier: Arc<dyn CredentialVerifier>,
    style: AuthStyle,
    registry: Arc<SessionRegistry>,
    submitter: CommandSubmitter,
    events: EventSink,
    state: ConnectionState,
    session: Option<Arc<Session>>,
}

impl ConnectionHandler {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        style: AuthStyle,
        registry: Arc<SessionRegistry>,
        submitter: CommandSubmitter,
        events: EventSink,
    ) -> Self {
        Self {
            verifier,
            style,
            registry,
            submitter,
            events,
            state: ConnectionState::Connecting,
            session: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// Drives the connection until the peer disconnects or the transport
    /// fails. Blocks only this connection's thread.
    pub fn run<C: MessageChannel>(&mut self, channel: &mut C) {
        let peer = channel.peer();
        self.state = ConnectionState::AwaitingLogin;
        self.events.emit(ConnectionEvent::Connected { peer });
        loop {
            let message = match channel.recv() {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(err) => {
                    warn!(%peer, "connection read error: {}", err);
                    break;
                }
            };
            if let Err(err) = self.handle_message(channel, &message) {
                warn!(%peer, "connection write error: {}", err);
                break;
            }
        }
        self.close(peer);
    }

    fn handle_message<C: MessageChannel>(&mut self, channel: &mut C, raw: &str) -> io::Result<()> {
        match self.state {
            ConnectionState::AwaitingLogin => self.handle_unauthenticated(channel, raw),
            ConnectionState::Authenticated => self.handle_authenticated(channel, raw),
            ConnectionState::Connecting | ConnectionState::Closed => Ok(()),
        }
    }

    fn handle_unauthenticated<C: MessageChannel>(
        &mut self,
        channel: &mut C,
        raw: &str,
    ) -> io::Result<()> {
        match self.style {
            AuthStyle::RawPassword => {
                let credentials = Credentials {
                    endpoint: channel.peer(),
                    name: "operator".to_string(),
                    password: raw.to_string(),
                };
                if self.verifier.verify(&credentials) {
                    self.authenticate(channel.peer(), &credentials);
                    channel.send("authenticated")
                } else {
                    info!(target: "gatehouse::server", peer = %channel.peer(), "login.rejected");
                    channel.send("invalid password")
                }
            }
            AuthStyle::JsonLogin => {
                let envelope = match Envelope::parse(raw) {
                    Ok(envelope) => envelope,
                    Err(err) => return self.send_error(channel, &err),
                };
                match envelope.login_action() {
                    Ok(LoginAction::Login { name, password }) => {
                        let credentials = Credentials {
                            endpoint: channel.peer(),
                            name,
                            password,
                        };
                        if self.verifier.verify(&credentials) {
                            let view = self.authenticate(channel.peer(), &credentials);
                            channel.send(&Envelope::login_success(&view).to_line())
                        } else {
                            info!(
                                target: "gatehouse::server",
                                peer = %channel.peer(),
                                name = %credentials.name,
                                "login.rejected"
                            );
                            channel.send(&Envelope::login_failure().to_line())
                        }
                    }
                    // Anything but a login is ignored while unauthenticated.
                    Ok(LoginAction::Other(action)) => {
                        debug!(peer = %channel.peer(), %action, "ignoring pre-login action");
                        Ok(())
                    }
                    Err(err) => self.send_error(channel, &err),
                }
            }
        }
    }

    fn handle_authenticated<C: MessageChannel>(
        &mut self,
        channel: &mut C,
        raw: &str,
    ) -> io::Result<()> {
        let command = match self.style {
            AuthStyle::RawPassword => raw.to_string(),
            AuthStyle::JsonLogin => {
                match Envelope::parse(raw).and_then(|envelope| envelope.command_text()) {
                    Ok(command) => command,
                    // Malformed execute requests leave the connection open
                    // and authenticated.
                    Err(err) => return self.send_error(channel, &err),
                }
            }
        };
        if let Some(session) = &self.session {
            self.registry.touch(session);
        }
        match self.submitter.submit(command) {
            Ok(result) => channel.send(&result),
            Err(BridgeError::ExecutorGone) => {
                warn!(peer = %channel.peer(), "executor gone while command was pending");
                channel.send(COMMAND_FAILED_REPLY)
            }
        }
    }

    fn authenticate(&mut self, peer: SocketAddr, credentials: &Credentials) -> SessionView {
        let session = self.registry.create_session(credentials);
        let view = session.view();
        self.state = ConnectionState::Authenticated;
        self.session = Some(session);
        info!(
            target: "gatehouse::server",
            %peer,
            name = %credentials.name,
            "login.accepted"
        );
        self.events.emit(ConnectionEvent::Authenticated {
            peer,
            name: credentials.name.clone(),
        });
        view
    }

    fn send_error<C: MessageChannel>(
        &mut self,
        channel: &mut C,
        err: &ProtocolError,
    ) -> io::Result<()> {
        channel.send(&Envelope::error(err.kind(), err.to_string()).to_line())
    }

    fn close(&mut self, peer: SocketAddr) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if let Some(session) = self.session.take() {
            self.registry.remove(&session);
        }
        self.state = ConnectionState::Closed;
        info!(target: "gatehouse::server", %peer, "connection.closed");
        self.events.emit(ConnectionEvent::Disconnected { peer });
    }
}
