use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status value used when a request never reached a server at all.
pub const STATUS_NETWORK: u16 = 0;

/// The one error shape the rest of the system observes. Every transport
/// failure is normalized into this before it leaves the session client:
///
/// - server answered with an error: `status` is the HTTP status and
///   `message` comes from the response envelope;
/// - the request never reached a server: `status` is `Some(0)`;
/// - local/programming error: `status` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    /// The server responded with a non-2xx status.
    pub fn server(status: u16, message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            code,
        }
    }

    /// The request never reached a server.
    pub fn network() -> Self {
        Self {
            message: "Network error - please check your connection".into(),
            status: Some(STATUS_NETWORK),
            code: None,
        }
    }

    /// A failure on our side of the wire (serialization, missing state, ...).
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    pub fn is_network(&self) -> bool {
        self.status == Some(STATUS_NETWORK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_the_three_failure_causes() {
        let server = ApiError::server(404, "Product not found", None);
        assert!(server.is_not_found());
        assert!(!server.is_network());

        let network = ApiError::network();
        assert!(network.is_network());
        assert!(!network.is_unauthorized());

        let local = ApiError::local("no refresh token available");
        assert_eq!(local.status, None);
    }

    #[test]
    fn displays_the_message() {
        let err = ApiError::server(401, "Invalid credentials", None);
        assert_eq!(err.to_string(), "Invalid credentials");
    }
}
