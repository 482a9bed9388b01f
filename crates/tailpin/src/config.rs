//! Run configuration and seed broker list parsing.

use std::time::Duration;

use tailpin_common::{BrokerEndpoint, Error, Result};

/// How long a single broker request (connect included) may take.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 100_000;

/// Initial read buffer capacity per broker connection.
pub const DEFAULT_RECV_BUFFER_BYTES: usize = 64 * 1024;

/// Metadata queries in flight at once.
pub const DEFAULT_BROKER_CONCURRENCY: usize = 4;

/// Offset queries in flight at once.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Tuning knobs shared by the resolver and the fetcher.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub request_timeout: Duration,
    pub recv_buffer_bytes: usize,
    pub broker_concurrency: usize,
    pub fetch_concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            recv_buffer_bytes: DEFAULT_RECV_BUFFER_BYTES,
            broker_concurrency: DEFAULT_BROKER_CONCURRENCY,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

/// Parses a comma-separated `host:port` list into broker endpoints.
///
/// A blank list is an empty run, not an error. A host that appears more
/// than once keeps its first position but takes the port of its last
/// occurrence.
pub fn parse_broker_list(list: &str) -> Result<Vec<BrokerEndpoint>> {
    let trimmed = list.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut brokers: Vec<BrokerEndpoint> = Vec::new();
    for entry in trimmed.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Empty entry in broker list {list:?}"
            )));
        }
        let (host, port) = entry.rsplit_once(':').ok_or_else(|| {
            Error::InvalidInput(format!("Broker entry {entry:?} is missing a port"))
        })?;
        if host.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Broker entry {entry:?} is missing a host"
            )));
        }
        let port: u16 = port.parse().map_err(|_| {
            Error::InvalidInput(format!("Broker entry {entry:?} has an invalid port"))
        })?;

        match brokers.iter_mut().find(|b| b.host == host) {
            Some(existing) => existing.port = port,
            None => brokers.push(BrokerEndpoint::new(host, port)),
        }
    }
    Ok(brokers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broker_list() {
        let brokers = parse_broker_list("kafka1:9092, kafka2:9093").unwrap();
        assert_eq!(brokers.len(), 2);
        assert_eq!(brokers[0], BrokerEndpoint::new("kafka1", 9092));
        assert_eq!(brokers[1], BrokerEndpoint::new("kafka2", 9093));
    }

    #[test]
    fn test_parse_empty_list_is_no_op() {
        assert!(parse_broker_list("").unwrap().is_empty());
        assert!(parse_broker_list("   ").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_host_keeps_last_port() {
        let brokers = parse_broker_list("kafka1:9092,kafka2:9092,kafka1:9192").unwrap();
        assert_eq!(brokers.len(), 2);
        // First position is kept, the later port wins.
        assert_eq!(brokers[0], BrokerEndpoint::new("kafka1", 9192));
        assert_eq!(brokers[1], BrokerEndpoint::new("kafka2", 9092));
    }

    #[test]
    fn test_parse_rejects_malformed_entries() {
        assert!(parse_broker_list("kafka1").is_err());
        assert!(parse_broker_list("kafka1:port").is_err());
        assert!(parse_broker_list("kafka1:9092,,kafka2:9093").is_err());
        assert!(parse_broker_list(":9092").is_err());
        assert!(parse_broker_list("kafka1:99999").is_err());
    }

    #[test]
    fn test_ipv6_style_entry_uses_last_colon() {
        let brokers = parse_broker_list("::1:9092").unwrap();
        assert_eq!(brokers[0], BrokerEndpoint::new("::1", 9092));
    }
}
