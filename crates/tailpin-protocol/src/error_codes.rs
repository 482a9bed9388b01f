//! Kafka protocol error codes
//!
//! Standard error codes from the Kafka protocol specification, limited to
//! the ones brokers return for the metadata and offset lookup paths.
//! See: https://kafka.apache.org/protocol#protocol_error_codes

/// The server experienced an unexpected error
pub const UNKNOWN_SERVER_ERROR: i16 = -1;

/// No error occurred
pub const NONE: i16 = 0;

/// The requested offset is out of range
pub const OFFSET_OUT_OF_RANGE: i16 = 1;

/// The message contents do not match the CRC
pub const CORRUPT_MESSAGE: i16 = 2;

/// This server does not host this topic-partition
pub const UNKNOWN_TOPIC_OR_PARTITION: i16 = 3;

/// There is no leader for this topic-partition
pub const LEADER_NOT_AVAILABLE: i16 = 5;

/// This server is not the leader for that topic-partition
pub const NOT_LEADER_FOR_PARTITION: i16 = 6;

/// The request timed out
pub const REQUEST_TIMED_OUT: i16 = 7;

/// The broker is not available
pub const BROKER_NOT_AVAILABLE: i16 = 8;

/// The replica is not available for the requested topic-partition
pub const REPLICA_NOT_AVAILABLE: i16 = 9;

/// For a request which attempts to access an invalid topic
pub const INVALID_TOPIC_EXCEPTION: i16 = 17;

/// Not authorized to access topic
pub const TOPIC_AUTHORIZATION_FAILED: i16 = 29;

/// The version of API is not supported
pub const UNSUPPORTED_VERSION: i16 = 35;

/// Human-readable name for an error code, for log lines and reports.
pub fn describe(code: i16) -> &'static str {
    match code {
        UNKNOWN_SERVER_ERROR => "UNKNOWN_SERVER_ERROR",
        NONE => "NONE",
        OFFSET_OUT_OF_RANGE => "OFFSET_OUT_OF_RANGE",
        CORRUPT_MESSAGE => "CORRUPT_MESSAGE",
        UNKNOWN_TOPIC_OR_PARTITION => "UNKNOWN_TOPIC_OR_PARTITION",
        LEADER_NOT_AVAILABLE => "LEADER_NOT_AVAILABLE",
        NOT_LEADER_FOR_PARTITION => "NOT_LEADER_FOR_PARTITION",
        REQUEST_TIMED_OUT => "REQUEST_TIMED_OUT",
        BROKER_NOT_AVAILABLE => "BROKER_NOT_AVAILABLE",
        REPLICA_NOT_AVAILABLE => "REPLICA_NOT_AVAILABLE",
        INVALID_TOPIC_EXCEPTION => "INVALID_TOPIC_EXCEPTION",
        TOPIC_AUTHORIZATION_FAILED => "TOPIC_AUTHORIZATION_FAILED",
        UNSUPPORTED_VERSION => "UNSUPPORTED_VERSION",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_known_and_unknown_codes() {
        assert_eq!(describe(NONE), "NONE");
        assert_eq!(describe(LEADER_NOT_AVAILABLE), "LEADER_NOT_AVAILABLE");
        assert_eq!(describe(12345), "UNKNOWN");
    }
}
