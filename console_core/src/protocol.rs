use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::session::SessionView;

/// The `{type, data}` wrapper used for structured protocol messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Error raised while decoding an inbound protocol message. Reported back to
/// the same connection as an `error` envelope; never fatal.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing field '{0}'")]
    MissingField(&'static str),
}

impl ProtocolError {
    /// Error-kind string carried in the `error` reply payload.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(_) => "malformed_message",
            ProtocolError::MissingField(_) => "missing_field",
        }
    }
}

/// Action extracted from an envelope received while unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginAction {
    Login { name: String, password: String },
    /// Any other action is ignored without a reply while unauthenticated.
    Other(String),
}

impl Envelope {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn login_action(&self) -> Result<LoginAction, ProtocolError> {
        let action = self
            .data
            .get("action")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("action"))?;
        if action != "login" {
            return Ok(LoginAction::Other(action.to_string()));
        }
        let name = self
            .data
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("name"))?;
        let password = self
            .data
            .get("password")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("password"))?;
        Ok(LoginAction::Login {
            name: name.to_string(),
            password: password.to_string(),
        })
    }

    /// Command text carried by an authenticated execute request.
    pub fn command_text(&self) -> Result<String, ProtocolError> {
        self.data
            .get("command")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or(ProtocolError::MissingField("command"))
    }

    pub fn login_success(view: &SessionView) -> Self {
        Self {
            kind: "login_success".to_string(),
            data: json!({
                "name": view.name,
                "ip": view.ip,
                "time": view.time,
                "secret": view.secret,
            }),
        }
    }

    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            data: json!({ "type": kind, "message": message.into() }),
        }
    }

    pub fn login_failure() -> Self {
        Self::error("login_failed", "invalid name or password")
    }

    /// Renders the envelope as one wire line.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            error!("failed to encode reply envelope: {}", err);
            String::new()
        })
    }
}
