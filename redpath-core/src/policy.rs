use serde::{Deserialize, Serialize};

/// Transport policy shared by every connection the client opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectPolicy {
    /// Speak TLS to the endpoint.
    #[serde(default = "default_true")]
    pub use_tls: bool,

    /// Verify the server certificate against the OS trust store.
    #[serde(default = "default_true")]
    pub verify_server_certificate: bool,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            use_tls: true,
            verify_server_certificate: true,
        }
    }
}

impl ConnectPolicy {
    pub fn scheme(&self) -> &'static str {
        if self.use_tls { "https" } else { "http" }
    }

    pub fn default_port(&self) -> u16 {
        if self.use_tls { 443 } else { 80 }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_tls_with_verification() {
        let policy = ConnectPolicy::default();
        assert!(policy.use_tls);
        assert!(policy.verify_server_certificate);
        assert_eq!(policy.scheme(), "https");
        assert_eq!(policy.default_port(), 443);
    }

    #[test]
    fn plaintext_scheme_and_port() {
        let policy = ConnectPolicy {
            use_tls: false,
            verify_server_certificate: true,
        };
        assert_eq!(policy.scheme(), "http");
        assert_eq!(policy.default_port(), 80);
    }

    #[test]
    fn missing_fields_default_to_true() {
        let policy: ConnectPolicy = serde_json::from_str("{}").unwrap();
        assert!(policy.use_tls);
        assert!(policy.verify_server_certificate);
    }
}
