use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;
use tracing::{error, info};

use console_core::{
    execution_bridge, start_command_server, ChannelBroadcast, ConnectionEvent, ConsoleConfig,
    ConsoleInterpreter, SessionRegistry,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ConsoleConfig::default();
    let registry = Arc::new(SessionRegistry::new());
    let (submitter, executor) = execution_bridge();
    let (broadcast_tx, broadcast_rx) = unbounded::<String>();
    let mut interpreter = ConsoleInterpreter::new(ChannelBroadcast::new(broadcast_tx));

    let server = match start_command_server(&config, Arc::clone(&registry), submitter) {
        Ok(server) => server,
        Err(err) => {
            error!(
                "Command server bind failed at {}: {}",
                config.command_bind, err
            );
            return;
        }
    };

    info!(
        command_bind = %server.local_addr(),
        auth = ?config.auth,
        "gatehouse admin console ready"
    );

    // The executor loop: the only context that runs commands. One command
    // per tick keeps command latency bounded by the tick cadence.
    loop {
        executor.pump_within(&mut interpreter, Duration::from_millis(50));

        while let Ok(message) = broadcast_rx.try_recv() {
            info!(target: "gatehouse::server", %message, "announce.broadcast");
        }

        while let Ok(event) = server.events().try_recv() {
            match event {
                ConnectionEvent::Connected { peer } => {
                    info!(target: "gatehouse::server", %peer, "client.connected");
                }
                ConnectionEvent::Authenticated { peer, name } => {
                    info!(target: "gatehouse::server", %peer, %name, "client.authenticated");
                }
                ConnectionEvent::Disconnected { peer } => {
                    info!(target: "gatehouse::server", %peer, "client.disconnected");
                }
            }
        }
    }
}
