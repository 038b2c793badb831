use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::warn;

use crate::interpreter::CommandInterpreter;

/// Fixed reply delivered when the interpreter faults mid-command. The caller
/// must always receive something; a fault never starves the channel.
pub const COMMAND_FAILED_REPLY: &str = "The command did not process correctly";

/// One in-flight command plus the slot its single result travels back on.
/// At most one of these exists process-wide: the inbound channel has
/// capacity 1 and the executor drains it one command at a time.
struct PendingCommand {
    text: String,
    reply: Sender<String>,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("executor side of the bridge is gone")]
    ExecutorGone,
}

/// Builds the two halves of the single-slot handoff. The submitter side is
/// cloned into every connection handler; the executor side belongs to the
/// one thread allowed to run commands.
pub fn execution_bridge() -> (CommandSubmitter, CommandExecutor) {
    let (to_executor, from_callers) = bounded::<PendingCommand>(1);
    (
        CommandSubmitter { to_executor },
        CommandExecutor { from_callers },
    )
}

/// Network-side handle. `submit` blocks the calling connection thread only,
/// never the executor or other connections' protocol handling.
#[derive(Clone)]
pub struct CommandSubmitter {
    to_executor: Sender<PendingCommand>,
}

impl CommandSubmitter {
    /// Blocks until the shared slot frees, then until the executor replies.
    /// Capacity 1 on the inbound channel serializes all connections into a
    /// strict global FIFO. There is no timeout: a stalled executor blocks
    /// callers indefinitely.
    pub fn submit(&self, text: impl Into<String>) -> Result<String, BridgeError> {
        let (reply_tx, reply_rx) = bounded::<String>(1);
        self.to_executor
            .send(PendingCommand {
                text: text.into(),
                reply: reply_tx,
            })
            .map_err(|_| BridgeError::ExecutorGone)?;
        reply_rx.recv().map_err(|_| BridgeError::ExecutorGone)
    }
}

/// Executor-side handle, owned by the single-threaded command context.
pub struct CommandExecutor {
    from_callers: Receiver<PendingCommand>,
}

impl CommandExecutor {
    /// Drains at most one pending command without blocking. Intended to be
    /// called once per scheduling tick of the owning loop. Returns whether a
    /// command was run.
    pub fn pump<I: CommandInterpreter>(&self, interpreter: &mut I) -> bool {
        match self.from_callers.try_recv() {
            Ok(pending) => {
                self.dispatch(pending, interpreter);
                true
            }
            Err(_) => false,
        }
    }

    /// Like [`pump`](Self::pump) but waits up to `timeout` for a command,
    /// bounding the executor's idle spin to its own tick cadence.
    pub fn pump_within<I: CommandInterpreter>(
        &self,
        interpreter: &mut I,
        timeout: Duration,
    ) -> bool {
        match self.from_callers.recv_timeout(timeout) {
            Ok(pending) => {
                self.dispatch(pending, interpreter);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Blocking loop for a dedicated executor thread; exits once every
    /// submitter handle has been dropped.
    pub fn run<I: CommandInterpreter>(&self, interpreter: &mut I) {
        while let Ok(pending) = self.from_callers.recv() {
            self.dispatch(pending, interpreter);
        }
    }

    fn dispatch<I: CommandInterpreter>(&self, pending: PendingCommand, interpreter: &mut I) {
        let result = catch_unwind(AssertUnwindSafe(|| interpreter.interpret(&pending.text)))
            .unwrap_or_else(|_| {
                warn!(
                    target: "gatehouse::executor",
                    command = %pending.text,
                    "interpreter fault converted to failure reply"
                );
                COMMAND_FAILED_REPLY.to_string()
            });
        // The reply slot has capacity 1 and receives exactly one result, so
        // this never blocks. A closed reply end means the submitting
        // connection already disconnected; its stale result is dropped.
        let _ = pending.reply.send(result);
    }
}
