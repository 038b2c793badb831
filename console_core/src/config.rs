use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::{CredentialVerifier, SharedPasswordVerifier};
use crate::connection::AuthStyle;

/// Authentication strategy for a deployment.
#[derive(Clone)]
pub enum AuthMode {
    /// JSON `{type, data}` login envelopes checked by the supplied verifier.
    PerUser(Arc<dyn CredentialVerifier>),
    /// The first raw line of each connection must equal this password;
    /// afterwards commands and replies are raw lines with no envelope.
    SharedPassword(String),
}

impl AuthMode {
    pub(crate) fn style(&self) -> AuthStyle {
        match self {
            AuthMode::PerUser(_) => AuthStyle::JsonLogin,
            AuthMode::SharedPassword(_) => AuthStyle::RawPassword,
        }
    }

    pub(crate) fn verifier(&self) -> Arc<dyn CredentialVerifier> {
        match self {
            AuthMode::PerUser(verifier) => Arc::clone(verifier),
            AuthMode::SharedPassword(password) => {
                Arc::new(SharedPasswordVerifier::new(password.clone()))
            }
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::PerUser(_) => f.write_str("PerUser"),
            AuthMode::SharedPassword(_) => f.write_str("SharedPassword"),
        }
    }
}

/// Deployment parameters supplied by the embedding application.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub command_bind: SocketAddr,
    pub auth: AuthMode,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            command_bind: SocketAddr::from(([127, 0, 0, 1], 4517)),
            auth: AuthMode::SharedPassword("super_secret_password".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Credentials;

    #[test]
    fn default_binds_localhost() {
        let config = ConsoleConfig::default();
        assert!(config.command_bind.ip().is_loopback());
        assert_eq!(config.auth.style(), AuthStyle::RawPassword);
    }

    #[test]
    fn shared_password_mode_builds_its_own_verifier() {
        let mode = AuthMode::SharedPassword("pw".to_string());
        let verifier = mode.verifier();
        assert!(verifier.verify(&Credentials {
            endpoint: "127.0.0.1:1".parse().expect("test addr"),
            name: "anyone".to_string(),
            password: "pw".to_string(),
        }));
    }

    #[test]
    fn per_user_mode_uses_the_supplied_verifier() {
        let mode = AuthMode::PerUser(Arc::new(|c: &Credentials| c.name == "root"));
        assert_eq!(mode.style(), AuthStyle::JsonLogin);
        assert!(mode.verifier().verify(&Credentials {
            endpoint: "127.0.0.1:1".parse().expect("test addr"),
            name: "root".to_string(),
            password: "".to_string(),
        }));
    }
}
