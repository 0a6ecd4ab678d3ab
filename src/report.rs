//! Downstream reader contract over published state. Consumers read
//! `live_traffic`, derive a threat level, and must degrade to a fixed
//! response on missing or corrupt data rather than propagate a fault.

use crate::stats::{port_map, PortCount, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Epsilon keeping the threat-level division total.
pub const THREAT_EPSILON: f64 = 0.001;

/// `malicious / (normal + malicious + 0.001)`; exactly 0.0 for no traffic.
pub fn threat_level(normal: u64, malicious: u64) -> f64 {
    malicious as f64 / ((normal + malicious) as f64 + THREAT_EPSILON)
}

/// Reader-side view of the latest snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficReport {
    pub normal: u64,
    pub malicious: u64,
    pub threat_level: f64,
    pub timestamp: DateTime<Utc>,
    pub processing: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: String,
    #[serde(with = "port_map")]
    pub top_ports: Vec<PortCount>,
    pub flag_distribution: BTreeMap<String, u64>,
}

impl TrafficReport {
    /// Fixed degraded response for missing or corrupt published state.
    pub fn degraded() -> Self {
        Self {
            normal: 0,
            malicious: 0,
            threat_level: 1.0,
            timestamp: Utc::now(),
            processing: "Error".to_string(),
            src_port: 0,
            dst_port: 0,
            flags: "ERR".to_string(),
            top_ports: Vec::new(),
            flag_distribution: BTreeMap::new(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            threat_level: threat_level(snapshot.normal, snapshot.malicious),
            normal: snapshot.normal,
            malicious: snapshot.malicious,
            timestamp: snapshot.timestamp,
            processing: snapshot.processing,
            src_port: snapshot.src_port,
            dst_port: snapshot.dst_port,
            flags: snapshot.flags,
            top_ports: snapshot.top_ports,
            flag_distribution: snapshot.flag_distribution,
        }
    }

    /// Build a report from the raw `live_traffic` value, degrading on absence
    /// or parse failure.
    pub fn from_live(raw: Option<&str>) -> Self {
        raw.and_then(|s| serde_json::from_str::<Snapshot>(s).ok())
            .map(Self::from_snapshot)
            .unwrap_or_else(Self::degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_level_is_total() {
        assert_eq!(threat_level(0, 0), 0.0);
        assert!(threat_level(0, 10) > 0.99);
        assert!(threat_level(10, 0) < 0.001);
    }

    #[test]
    fn missing_data_degrades() {
        let report = TrafficReport::from_live(None);
        assert_eq!(report.normal, 0);
        assert_eq!(report.malicious, 0);
        assert_eq!(report.threat_level, 1.0);
        assert_eq!(report.processing, "Error");
        assert_eq!(report.flags, "ERR");
    }

    #[test]
    fn corrupt_data_degrades() {
        let report = TrafficReport::from_live(Some("{not json"));
        assert_eq!(report.threat_level, 1.0);
        assert_eq!(report.processing, "Error");
    }
}
