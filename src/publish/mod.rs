//! Snapshot publication: overwrite the well-known keys, append to the
//! trimmed history list, broadcast to subscribers.

mod store;

pub use store::SqliteSink;

use crate::stats::{Snapshot, TopPorts, HISTORY_CAPACITY};
use thiserror::Error;

/// Overwrite key holding the latest full snapshot; last write wins.
pub const LIVE_TRAFFIC_KEY: &str = "live_traffic";
/// Overwrite key holding the latest `top_ports` object.
pub const PORT_STATISTICS_KEY: &str = "port_statistics";
/// Overwrite key holding the latest `flag_distribution` object.
pub const FLAG_STATISTICS_KEY: &str = "flag_statistics";
/// History list key: serialized snapshots, most recent first, capped at 300.
pub const TRAFFIC_HISTORY_KEY: &str = "traffic_history";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink storage failed: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("snapshot encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Key-value + broadcast sink seam. Write failures surface as `SinkError`;
/// broadcast is at-most-once and best-effort, so it cannot fail.
pub trait TrafficSink {
    fn set(&self, key: &str, value: &str) -> Result<(), SinkError>;
    fn push_history(&self, key: &str, value: &str, limit: usize) -> Result<(), SinkError>;
    fn broadcast(&self, value: &str);
}

pub struct Publisher<S> {
    sink: S,
}

impl<S: TrafficSink> Publisher<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Write one snapshot to the sink. A failure here loses this snapshot
    /// downstream; the caller's aggregate state is untouched either way.
    pub fn publish(&self, snapshot: &Snapshot) -> Result<(), SinkError> {
        let payload = serde_json::to_string(snapshot)?;
        let ports = serde_json::to_string(&TopPorts(&snapshot.top_ports))?;
        let flags = serde_json::to_string(&snapshot.flag_distribution)?;

        self.sink.set(LIVE_TRAFFIC_KEY, &payload)?;
        self.sink.set(PORT_STATISTICS_KEY, &ports)?;
        self.sink.set(FLAG_STATISTICS_KEY, &flags)?;
        self.sink
            .push_history(TRAFFIC_HISTORY_KEY, &payload, HISTORY_CAPACITY)?;
        self.sink.broadcast(&payload);
        Ok(())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
