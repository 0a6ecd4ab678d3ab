//! Total mapping from packet records to feature vectors. Absent layers
//! degrade to deterministic defaults; extraction never fails.

use super::{FeatureVector, PortCategory, Protocol};
use crate::capture::{PacketRecord, Transport};
use std::net::Ipv4Addr;

/// Dotted-quad to big-endian u32. Unparsable input maps to 0, so all invalid
/// addresses collide into one bucket; that is accepted, not an error.
pub fn ip_to_int(ip: &str) -> u32 {
    ip.parse::<Ipv4Addr>().map(u32::from).unwrap_or(0)
}

/// Partition of the full port range: [0,1023] well-known,
/// [1024,49151] registered, [49152,65535] dynamic.
pub fn categorize_port(port: u16) -> PortCategory {
    match port {
        0..=1023 => PortCategory::WellKnown,
        1024..=49151 => PortCategory::Registered,
        _ => PortCategory::Dynamic,
    }
}

/// Reduce one packet record to a fully-populated feature vector.
///
/// With no network layer every field takes its default except `length`; the
/// port categories take the default `registered` rather than categorizing the
/// defaulted port 0. With a network layer, ports and flags come from the
/// transport when present, and categories are computed from the ports.
pub fn extract(packet: &PacketRecord) -> FeatureVector {
    let length = packet.length.unwrap_or(0);

    let Some(net) = &packet.network else {
        return FeatureVector {
            src_ip: 0,
            dst_ip: 0,
            protocol: Protocol::Other,
            length,
            src_port: 0,
            dst_port: 0,
            flags: "UNK".to_string(),
            src_port_category: PortCategory::Registered,
            dst_port_category: PortCategory::Registered,
        };
    };

    let (protocol, src_port, dst_port, flags) = match &net.transport {
        Transport::Tcp {
            src_port,
            dst_port,
            flags,
        } => (Protocol::Tcp, *src_port, *dst_port, flags.clone()),
        Transport::Udp { src_port, dst_port } => {
            (Protocol::Udp, *src_port, *dst_port, "NONE".to_string())
        }
        Transport::Icmp => (Protocol::Icmp, 0, 0, "UNK".to_string()),
        Transport::Other(name) => (Protocol::from_name(name), 0, 0, "UNK".to_string()),
    };

    FeatureVector {
        src_ip: ip_to_int(&net.src_ip),
        dst_ip: ip_to_int(&net.dst_ip),
        protocol,
        length,
        src_port,
        dst_port,
        flags,
        src_port_category: categorize_port(src_port),
        dst_port_category: categorize_port(dst_port),
    }
}
