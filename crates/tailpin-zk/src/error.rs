//! Error type for ZooKeeper operations.

use thiserror::Error;

/// Result type alias for ZooKeeper operations.
pub type Result<T> = std::result::Result<T, ZkError>;

/// Server error codes from the ZooKeeper protocol.
pub mod codes {
    pub const OK: i32 = 0;
    pub const CONNECTION_LOSS: i32 = -4;
    pub const MARSHALLING_ERROR: i32 = -5;
    pub const NO_NODE: i32 = -101;
    pub const NO_AUTH: i32 = -102;
    pub const BAD_VERSION: i32 = -103;
    pub const NODE_EXISTS: i32 = -110;
    pub const SESSION_EXPIRED: i32 = -112;
    pub const AUTH_FAILED: i32 = -115;
}

/// Main error type for ZooKeeper operations.
#[derive(Error, Debug)]
pub enum ZkError {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested znode does not exist
    #[error("node does not exist: {0}")]
    NoNode(String),

    /// Version check failed on a conditional write
    #[error("bad version for {0}")]
    BadVersion(String),

    /// Any other error code reported by the server
    #[error("server error {code} for {path}")]
    ServerError { code: i32, path: String },

    /// The connection to the server was lost
    #[error("connection loss: {0}")]
    ConnectionLoss(String),

    /// The session was expired by the server
    #[error("session expired")]
    SessionExpired,

    /// A request did not complete in time
    #[error("timed out: {0}")]
    Timeout(String),

    /// Malformed data on the wire
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Unusable connect string
    #[error("invalid connect string: {0}")]
    InvalidConnectString(String),

    /// All retry attempts were used up
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
}

impl ZkError {
    /// Map a non-zero reply header error code to an error value.
    pub fn from_code(code: i32, path: &str) -> Self {
        match code {
            codes::NO_NODE => ZkError::NoNode(path.to_string()),
            codes::BAD_VERSION => ZkError::BadVersion(path.to_string()),
            codes::CONNECTION_LOSS => ZkError::ConnectionLoss(path.to_string()),
            codes::SESSION_EXPIRED => ZkError::SessionExpired,
            _ => ZkError::ServerError {
                code,
                path: path.to_string(),
            },
        }
    }

    /// Whether the operation may succeed on a fresh connection attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ZkError::Io(_) | ZkError::ConnectionLoss(_) | ZkError::Timeout(_)
        )
    }
}

impl From<tailpin_common::Error> for ZkError {
    fn from(e: tailpin_common::Error) -> Self {
        match e {
            tailpin_common::Error::Io(io) => ZkError::Io(io),
            other => ZkError::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping() {
        assert!(matches!(
            ZkError::from_code(codes::NO_NODE, "/a"),
            ZkError::NoNode(p) if p == "/a"
        ));
        assert!(matches!(
            ZkError::from_code(codes::BAD_VERSION, "/a"),
            ZkError::BadVersion(_)
        ));
        assert!(matches!(
            ZkError::from_code(-999, "/a"),
            ZkError::ServerError { code: -999, .. }
        ));
    }

    #[test]
    fn retryable_classification() {
        assert!(ZkError::ConnectionLoss("closed".into()).is_retryable());
        assert!(ZkError::Timeout("connect".into()).is_retryable());
        assert!(!ZkError::NoNode("/a".into()).is_retryable());
        assert!(!ZkError::SessionExpired.is_retryable());
    }
}
