use crate::session::Credentials;

/// Pure predicate over login credentials, pluggable by the embedding
/// application. Called concurrently from connection handler threads; a
/// `false` return is a normal rejection, not an error.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credentials: &Credentials) -> bool;
}

impl<F> CredentialVerifier for F
where
    F: Fn(&Credentials) -> bool + Send + Sync,
{
    fn verify(&self, credentials: &Credentials) -> bool {
        self(credentials)
    }
}

/// Accepts any operator presenting the fixed deployment password.
#[derive(Debug, Clone)]
pub struct SharedPasswordVerifier {
    password: String,
}

impl SharedPasswordVerifier {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl CredentialVerifier for SharedPasswordVerifier {
    fn verify(&self, credentials: &Credentials) -> bool {
        credentials.password == self.password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(password: &str) -> Credentials {
        Credentials {
            endpoint: "10.0.0.1:4000".parse().expect("test addr"),
            name: "root".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn shared_password_matches_exactly() {
        let verifier = SharedPasswordVerifier::new("super_secret_password");
        assert!(verifier.verify(&credentials("super_secret_password")));
        assert!(!verifier.verify(&credentials("guess")));
        assert!(!verifier.verify(&credentials("")));
    }

    #[test]
    fn closures_act_as_verifiers() {
        let verifier = |c: &Credentials| c.name == "root";
        assert!(verifier.verify(&credentials("anything")));
    }
}
