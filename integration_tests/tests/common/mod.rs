#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use serde_json::Value;

use console_core::{
    execution_bridge, start_command_server, AuthMode, ChannelBroadcast, CommandServer,
    ConsoleConfig, ConsoleInterpreter, Credentials, SessionRegistry,
};

pub const TEST_PASSWORD: &str = "super_secret_password";

pub struct TestServer {
    pub server: CommandServer,
    pub registry: Arc<SessionRegistry>,
    pub broadcasts: Receiver<String>,
}

impl TestServer {
    pub fn addr(&self) -> SocketAddr {
        self.server.local_addr()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}

fn start_server(auth: AuthMode) -> Result<TestServer> {
    let registry = Arc::new(SessionRegistry::new());
    let (submitter, executor) = execution_bridge();
    let (broadcast_tx, broadcasts) = unbounded();
    thread::spawn(move || {
        let mut interpreter = ConsoleInterpreter::new(ChannelBroadcast::new(broadcast_tx));
        executor.run(&mut interpreter);
    });

    let config = ConsoleConfig {
        command_bind: "127.0.0.1:0".parse().context("test bind addr")?,
        auth,
    };
    let server = start_command_server(&config, Arc::clone(&registry), submitter)
        .context("start command server")?;
    Ok(TestServer {
        server,
        registry,
        broadcasts,
    })
}

/// Per-user JSON login deployment; any name with the test password passes.
pub fn start_per_user_server() -> Result<TestServer> {
    start_server(AuthMode::PerUser(Arc::new(|c: &Credentials| {
        c.password == TEST_PASSWORD
    })))
}

/// Raw shared-password deployment.
pub fn start_shared_password_server() -> Result<TestServer> {
    start_server(AuthMode::SharedPassword(TEST_PASSWORD.to_string()))
}

/// Newline-framed test client mirroring the server's transport adapter.
pub struct LineClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl LineClient {
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).context("connect to command server")?;
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .context("set read timeout")?;
        let writer = stream.try_clone().context("clone stream")?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    pub fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn recv_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).context("read reply")?;
        anyhow::ensure!(read > 0, "server closed the connection");
        Ok(line.trim().to_string())
    }

    pub fn recv_json(&mut self) -> Result<Value> {
        let line = self.recv_line()?;
        serde_json::from_str(&line).with_context(|| format!("parse reply: {}", line))
    }

    /// Sends a login envelope and returns the parsed reply.
    pub fn login(&mut self, name: &str, password: &str) -> Result<Value> {
        self.send_line(&format!(
            r#"{{"type":"auth","data":{{"action":"login","name":"{}","password":"{}"}}}}"#,
            name, password
        ))?;
        self.recv_json()
    }

    /// Sends an execute envelope and returns the raw result line.
    pub fn execute(&mut self, command: &str) -> Result<String> {
        self.send_line(&format!(
            r#"{{"type":"execute","data":{{"command":"{}"}}}}"#,
            command
        ))?;
        self.recv_line()
    }
}
