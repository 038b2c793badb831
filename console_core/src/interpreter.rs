use crossbeam_channel::Sender;
use tracing::{info, warn};

pub const HELP_TEXT: &str = "The available commands for now are heartbeat, announce and help";
pub const HEARTBEAT_TEXT: &str = "Server is up and running";
pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command, try help";

/// Runs one command to completion and returns its textual result. Called
/// only from the single-threaded executor context, so implementations may
/// touch simulation state without locking. Must not let faults escape: the
/// remote caller always gets a reply (the bridge guards as a last resort).
pub trait CommandInterpreter {
    fn interpret(&mut self, text: &str) -> String;
}

/// Receives announcement text for fan-out to connected players.
pub trait Broadcast: Send {
    fn broadcast(&mut self, message: &str);
}

/// Forwards announcements onto a channel owned by the embedding application.
pub struct ChannelBroadcast {
    sender: Sender<String>,
}

impl ChannelBroadcast {
    pub fn new(sender: Sender<String>) -> Self {
        Self { sender }
    }
}

impl Broadcast for ChannelBroadcast {
    fn broadcast(&mut self, message: &str) {
        if self.sender.send(message.to_string()).is_err() {
            warn!("announcement dropped: broadcast receiver is gone");
        }
    }
}

/// The fixed administrative verb set.
pub struct ConsoleInterpreter<B> {
    broadcaster: B,
}

impl<B: Broadcast> ConsoleInterpreter<B> {
    pub fn new(broadcaster: B) -> Self {
        Self { broadcaster }
    }
}

impl<B: Broadcast> CommandInterpreter for ConsoleInterpreter<B> {
    fn interpret(&mut self, text: &str) -> String {
        let trimmed = text.trim();
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or("").to_ascii_lowercase();
        match verb.as_str() {
            "help" => HELP_TEXT.to_string(),
            "heartbeat" => HEARTBEAT_TEXT.to_string(),
            "announce" => {
                let message = parts.next().map(str::trim).unwrap_or("");
                if message.is_empty() {
                    return "announce requires a message".to_string();
                }
                info!(target: "gatehouse::executor", %message, "announce.forwarded");
                self.broadcaster.broadcast(message);
                format!("Server : {}", message)
            }
            _ => UNKNOWN_COMMAND_TEXT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn interpreter() -> (
        ConsoleInterpreter<ChannelBroadcast>,
        crossbeam_channel::Receiver<String>,
    ) {
        let (tx, rx) = unbounded();
        (ConsoleInterpreter::new(ChannelBroadcast::new(tx)), rx)
    }

    #[test]
    fn help_returns_the_fixed_text() {
        let (mut interpreter, _rx) = interpreter();
        assert_eq!(interpreter.interpret("help"), HELP_TEXT);
        assert_eq!(interpreter.interpret("  HELP  "), HELP_TEXT);
    }

    #[test]
    fn heartbeat_reports_liveness() {
        let (mut interpreter, _rx) = interpreter();
        assert_eq!(interpreter.interpret("heartbeat"), HEARTBEAT_TEXT);
    }

    #[test]
    fn announce_forwards_and_echoes() {
        let (mut interpreter, rx) = interpreter();
        let reply = interpreter.interpret("announce Hello world");
        assert_eq!(reply, "Server : Hello world");
        assert_eq!(rx.try_recv().expect("broadcast sent"), "Hello world");
    }

    #[test]
    fn announce_without_message_is_rejected() {
        let (mut interpreter, rx) = interpreter();
        assert_eq!(
            interpreter.interpret("announce"),
            "announce requires a message"
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unknown_verbs_get_the_default_text() {
        let (mut interpreter, _rx) = interpreter();
        assert_eq!(interpreter.interpret("spawn dragon"), UNKNOWN_COMMAND_TEXT);
        assert_eq!(interpreter.interpret(""), UNKNOWN_COMMAND_TEXT);
    }
}
