//! Process-lifetime traffic statistics and per-batch snapshots.
//!
//! `AggregateState` is a plain owned value held by the pipeline instance:
//! one writer, constructed and reset explicitly, never a global.

use crate::features::FeatureVector;
use crate::model::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Bound shared by the in-memory snapshot ring and the sink's history list.
pub const HISTORY_CAPACITY: usize = 300;

/// Maximum number of entries published in `top_ports`.
pub const TOP_PORTS_LIMIT: usize = 10;

#[derive(Debug, Clone)]
struct PortEntry {
    count: u64,
    /// Insertion sequence at first sight; the tie-break for equal counts.
    first_seen: u64,
}

/// Cumulative counters since process start plus the bounded snapshot history.
///
/// `port_stats` is bounded by the u16 port domain and `flag_stats` by the
/// flag-label alphabet, so neither needs an eviction policy.
#[derive(Debug, Default)]
pub struct AggregateState {
    port_stats: HashMap<u16, PortEntry>,
    flag_stats: BTreeMap<String, u64>,
    history: VecDeque<Snapshot>,
    port_seq: u64,
}

/// One destination port's cumulative count, as published in `top_ports`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCount {
    pub port: u16,
    pub count: u64,
}

/// Immutable per-batch summary published to consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub normal: u64,
    pub malicious: u64,
    pub normal_percent: f64,
    pub malicious_percent: f64,
    pub timestamp: DateTime<Utc>,
    pub sample_size: usize,
    /// From the last element of the batch, not an aggregate.
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: String,
    pub processing: String,
    /// Highest-count ports, descending; ties resolve in first-seen order.
    #[serde(with = "port_map")]
    pub top_ports: Vec<PortCount>,
    /// Full cumulative flag counts, not just this batch.
    pub flag_distribution: BTreeMap<String, u64>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one classified batch into the cumulative state and produce its
    /// snapshot. Total: runs exactly once per completed batch and never fails.
    pub fn aggregate(&mut self, batch: &[FeatureVector], results: &[Verdict]) -> Snapshot {
        for fv in batch {
            match self.port_stats.entry(fv.dst_port) {
                Entry::Occupied(mut e) => e.get_mut().count += 1,
                Entry::Vacant(v) => {
                    v.insert(PortEntry {
                        count: 1,
                        first_seen: self.port_seq,
                    });
                    self.port_seq += 1;
                }
            }
            *self.flag_stats.entry(fv.flags.clone()).or_insert(0) += 1;
        }

        let normal = results.iter().filter(|v| **v == Verdict::Benign).count() as u64;
        let malicious = results.iter().filter(|v| **v == Verdict::Malicious).count() as u64;
        let sample_size = batch.len();
        let (normal_percent, malicious_percent) = if sample_size == 0 {
            (0.0, 0.0)
        } else {
            (
                normal as f64 / sample_size as f64 * 100.0,
                malicious as f64 / sample_size as f64 * 100.0,
            )
        };

        let (src_port, dst_port, flags) = batch
            .last()
            .map(|fv| (fv.src_port, fv.dst_port, fv.flags.clone()))
            .unwrap_or((0, 0, "UNK".to_string()));

        let snapshot = Snapshot {
            normal,
            malicious,
            normal_percent,
            malicious_percent,
            timestamp: Utc::now(),
            sample_size,
            src_port,
            dst_port,
            flags,
            processing: "Normal".to_string(),
            top_ports: self.top_ports(),
            flag_distribution: self.flag_stats.clone(),
        };

        self.history.push_back(snapshot.clone());
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }

        snapshot
    }

    /// Current top ports: descending by count, first-seen order on ties.
    fn top_ports(&self) -> Vec<PortCount> {
        let mut ranked: Vec<(&u16, &PortEntry)> = self.port_stats.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        });
        ranked
            .into_iter()
            .take(TOP_PORTS_LIMIT)
            .map(|(port, entry)| PortCount {
                port: *port,
                count: entry.count,
            })
            .collect()
    }

    pub fn history(&self) -> &VecDeque<Snapshot> {
        &self.history
    }

    pub fn port_count(&self, port: u16) -> u64 {
        self.port_stats.get(&port).map(|e| e.count).unwrap_or(0)
    }

    pub fn flag_count(&self, flags: &str) -> u64 {
        self.flag_stats.get(flags).copied().unwrap_or(0)
    }
}

/// Wire view of `top_ports`: a JSON object keyed by port, entries emitted in
/// ranked order.
pub struct TopPorts<'a>(pub &'a [PortCount]);

impl Serialize for TopPorts<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(&entry.port.to_string(), &entry.count)?;
        }
        map.end()
    }
}

pub(crate) mod port_map {
    use super::{PortCount, TopPorts};
    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(ports: &[PortCount], serializer: S) -> Result<S::Ok, S::Error> {
        TopPorts(ports).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<PortCount>, D::Error> {
        struct PortMapVisitor;

        impl<'de> Visitor<'de> for PortMapVisitor {
            type Value = Vec<PortCount>;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of port number to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, count)) = access.next_entry::<String, u64>()? {
                    let port = key.parse::<u16>().map_err(serde::de::Error::custom)?;
                    out.push(PortCount { port, count });
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(PortMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{PortCategory, Protocol};

    fn fv(dst_port: u16, flags: &str) -> FeatureVector {
        FeatureVector {
            src_ip: 0x0a000001,
            dst_ip: 0xc0a80101,
            protocol: Protocol::Tcp,
            length: 64,
            src_port: 40123,
            dst_port,
            flags: flags.to_string(),
            src_port_category: PortCategory::Registered,
            dst_port_category: PortCategory::WellKnown,
        }
    }

    #[test]
    fn even_split_tallies() {
        let mut state = AggregateState::new();
        let batch = [fv(80, "SYN"), fv(443, "ACK")];
        let snap = state.aggregate(&batch, &[Verdict::Benign, Verdict::Malicious]);

        assert_eq!(snap.normal, 1);
        assert_eq!(snap.malicious, 1);
        assert_eq!(snap.normal_percent, 50.0);
        assert_eq!(snap.malicious_percent, 50.0);
        assert_eq!(snap.sample_size, 2);
        assert_eq!(snap.processing, "Normal");
    }

    #[test]
    fn last_element_fields() {
        let mut state = AggregateState::new();
        let batch = [fv(80, "SYN"), fv(22, "FIN")];
        let snap = state.aggregate(&batch, &[Verdict::Benign, Verdict::Benign]);

        assert_eq!(snap.src_port, 40123);
        assert_eq!(snap.dst_port, 22);
        assert_eq!(snap.flags, "FIN");
    }

    #[test]
    fn counters_are_cumulative_across_batches() {
        let mut state = AggregateState::new();
        state.aggregate(&[fv(80, "SYN"), fv(80, "ACK")], &[Verdict::Benign; 2]);
        let snap = state.aggregate(&[fv(80, "ACK"), fv(22, "ACK")], &[Verdict::Benign; 2]);

        assert_eq!(state.port_count(80), 3);
        assert_eq!(state.port_count(22), 1);
        assert_eq!(snap.flag_distribution["ACK"], 3);
        assert_eq!(snap.flag_distribution["SYN"], 1);
        assert_eq!(snap.top_ports[0], PortCount { port: 80, count: 3 });
    }

    #[test]
    fn top_ports_capped_and_sorted_with_first_seen_tiebreak() {
        let mut state = AggregateState::new();
        // Twelve distinct ports, all count 1, in known insertion order.
        let batch: Vec<FeatureVector> = (0..12).map(|i| fv(1000 + i, "ACK")).collect();
        let snap = state.aggregate(&batch, &vec![Verdict::Benign; batch.len()]);

        assert_eq!(snap.top_ports.len(), TOP_PORTS_LIMIT);
        let ports: Vec<u16> = snap.top_ports.iter().map(|p| p.port).collect();
        assert_eq!(ports, (1000..1010).collect::<Vec<u16>>());

        // Raising a later port's count moves it ahead of earlier-seen ties.
        let snap = state.aggregate(&[fv(1011, "ACK"), fv(1011, "ACK")], &[Verdict::Benign; 2]);
        assert_eq!(snap.top_ports[0], PortCount { port: 1011, count: 3 });
        for window in snap.top_ports.windows(2) {
            assert!(window[0].count >= window[1].count);
        }
    }

    #[test]
    fn history_evicts_fifo_at_capacity() {
        let mut state = AggregateState::new();
        for i in 0..=HISTORY_CAPACITY {
            state.aggregate(&[fv(i as u16, "ACK")], &[Verdict::Benign]);
        }
        assert_eq!(state.history().len(), HISTORY_CAPACITY);
        // The first-appended snapshot (dst_port 0) is gone.
        assert_eq!(state.history().front().unwrap().dst_port, 1);
        assert_eq!(
            state.history().back().unwrap().dst_port,
            HISTORY_CAPACITY as u16
        );
    }

    #[test]
    fn top_ports_serializes_as_ordered_object() {
        let mut state = AggregateState::new();
        state.aggregate(
            &[fv(443, "ACK"), fv(443, "ACK"), fv(80, "SYN")],
            &[Verdict::Benign; 3],
        );
        let snap = state.aggregate(&[fv(22, "FIN")], &[Verdict::Malicious]);

        let json = serde_json::to_string(&TopPorts(&snap.top_ports)).unwrap();
        assert_eq!(json, r#"{"443":2,"80":1,"22":1}"#);

        // Round-trips through the snapshot wire format in ranked order.
        let wire = serde_json::to_string(&snap).unwrap();
        let parsed: Snapshot = serde_json::from_str(&wire).unwrap();
        assert_eq!(parsed.top_ports, snap.top_ports);
    }
}
