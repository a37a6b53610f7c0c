use thiserror::Error;

/// Failure kinds produced anywhere between an inbound command and its notification.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("{usage}")]
    Validation { usage: String },
    #[error("authorization failed: {0}")]
    Auth(String),
    #[error("{provider} returned {status}: {body}")]
    Provider { provider: &'static str, status: u16, body: String },
    #[error("{0}")]
    NotFound(String),
    #[error("unexpected response: {0}")]
    Parse(String),
    #[error("network failure: {0}")]
    Network(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Provider,
    NotFound,
    Parse,
    Network,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Provider => "provider",
            Self::NotFound => "not_found",
            Self::Parse => "parse",
            Self::Network => "network",
        }
    }
}

impl BridgeError {
    pub fn validation(usage: impl Into<String>) -> Self {
        Self::Validation { usage: usage.into() }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Network(_) => ErrorKind::Network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BridgeError, ErrorKind};

    #[test]
    fn provider_error_display_carries_status_and_body() {
        let error = BridgeError::Provider {
            provider: "trello",
            status: 401,
            body: "invalid key".to_owned(),
        };

        assert_eq!(error.to_string(), "trello returned 401: invalid key");
        assert_eq!(error.kind(), ErrorKind::Provider);
    }

    #[test]
    fn validation_error_displays_usage_verbatim() {
        let error = BridgeError::validation("❗ Usage: `/gemini <question>`");
        assert_eq!(error.to_string(), "❗ Usage: `/gemini <question>`");
        assert_eq!(error.kind().as_str(), "validation");
    }

    #[test]
    fn not_found_error_is_not_prefixed() {
        let error = BridgeError::NotFound("Board 'Ops' not found.".to_owned());
        assert_eq!(error.to_string(), "Board 'Ops' not found.");
    }
}
