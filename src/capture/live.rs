//! Live capture feed: thin pcap adapter decoding Ethernet/IPv4 frames into
//! [`PacketRecord`]s. Anything the decoder does not recognize degrades to a
//! record with fewer layers; it never aborts the feed.

use super::{NetworkLayer, PacketFeed, PacketRecord, Transport};
use pcap::{Active, Capture, Device};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::{TcpFlags, TcpPacket};
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet;
use thiserror::Error;

/// Read timeout so the run loop can observe its stop flag between packets.
const READ_TIMEOUT_MS: i32 = 1000;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("network interface '{0}' not found (available: {1:?})")]
    InterfaceNotFound(String, Vec<String>),

    #[error("failed to open capture on '{interface}': {reason}")]
    Open { interface: String, reason: String },

    #[error("failed to enumerate capture devices: {0}")]
    Devices(String),

    #[error("packet read failed: {0}")]
    Read(String),
}

pub struct LiveFeed {
    capture: Capture<Active>,
}

impl LiveFeed {
    /// Open a live capture on the named interface.
    pub fn open(interface: &str, promiscuous: bool) -> Result<Self, CaptureError> {
        let devices = Device::list().map_err(|e| CaptureError::Devices(e.to_string()))?;
        if interface != "any" && !devices.iter().any(|d| d.name == interface) {
            let names = devices.into_iter().map(|d| d.name).collect();
            return Err(CaptureError::InterfaceNotFound(interface.to_string(), names));
        }

        let capture = Capture::from_device(Device::from(interface))
            .map_err(|e| CaptureError::Open {
                interface: interface.to_string(),
                reason: e.to_string(),
            })?
            .promisc(promiscuous)
            .timeout(READ_TIMEOUT_MS)
            .open()
            .map_err(|e| CaptureError::Open {
                interface: interface.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { capture })
    }
}

impl PacketFeed for LiveFeed {
    fn next_packet(&mut self) -> Result<Option<PacketRecord>, CaptureError> {
        match self.capture.next_packet() {
            Ok(frame) => Ok(Some(parse_frame(frame.data))),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(CaptureError::Read(e.to_string())),
        }
    }
}

/// Decode one raw frame. Total: undecodable frames come back with no network
/// layer, truncated transport headers degrade to [`Transport::Other`].
fn parse_frame(data: &[u8]) -> PacketRecord {
    let length = Some(data.len() as u32);

    let network = EthernetPacket::new(data)
        .filter(|eth| eth.get_ethertype() == EtherTypes::Ipv4)
        .and_then(|eth| parse_ipv4(eth.payload()));

    PacketRecord { length, network }
}

fn parse_ipv4(data: &[u8]) -> Option<NetworkLayer> {
    let ip = Ipv4Packet::new(data)?;
    let src_ip = ip.get_source().to_string();
    let dst_ip = ip.get_destination().to_string();

    let transport = match ip.get_next_level_protocol() {
        IpNextHeaderProtocols::Tcp => match TcpPacket::new(ip.payload()) {
            Some(tcp) => Transport::Tcp {
                src_port: tcp.get_source(),
                dst_port: tcp.get_destination(),
                flags: tcp_flags_label(tcp.get_flags()),
            },
            None => Transport::Other("TCP".to_string()),
        },
        IpNextHeaderProtocols::Udp => match UdpPacket::new(ip.payload()) {
            Some(udp) => Transport::Udp {
                src_port: udp.get_source(),
                dst_port: udp.get_destination(),
            },
            None => Transport::Other("UDP".to_string()),
        },
        IpNextHeaderProtocols::Icmp => Transport::Icmp,
        other => Transport::Other(other.to_string()),
    };

    Some(NetworkLayer {
        src_ip,
        dst_ip,
        transport,
    })
}

/// Render TCP flag bits as a `|`-joined label in header bit order; no bits set
/// renders as `NONE`.
fn tcp_flags_label(flags: u8) -> String {
    let names: [(u8, &str); 8] = [
        (TcpFlags::FIN, "FIN"),
        (TcpFlags::SYN, "SYN"),
        (TcpFlags::RST, "RST"),
        (TcpFlags::PSH, "PSH"),
        (TcpFlags::ACK, "ACK"),
        (TcpFlags::URG, "URG"),
        (TcpFlags::ECE, "ECE"),
        (TcpFlags::CWR, "CWR"),
    ];
    let set: Vec<&str> = names
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if set.is_empty() {
        "NONE".to_string()
    } else {
        set.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ethernet + IPv4 + TCP frame, minimal headers, no payload.
    fn tcp_frame(src_port: u16, dst_port: u16, flags: u8) -> Vec<u8> {
        let mut f = vec![0u8; 54];
        f[12] = 0x08; // EtherType IPv4
        f[13] = 0x00;
        f[14] = 0x45; // version 4, IHL 5
        f[16] = 0x00; // total length 40
        f[17] = 40;
        f[22] = 64; // TTL
        f[23] = 6; // TCP
        f[26..30].copy_from_slice(&[192, 168, 1, 10]);
        f[30..34].copy_from_slice(&[10, 0, 0, 1]);
        f[34..36].copy_from_slice(&src_port.to_be_bytes());
        f[36..38].copy_from_slice(&dst_port.to_be_bytes());
        f[46] = 0x50; // data offset 5
        f[47] = flags;
        f
    }

    #[test]
    fn decodes_tcp_frame() {
        let record = parse_frame(&tcp_frame(44321, 443, 0x12)); // SYN|ACK
        assert_eq!(record.length, Some(54));
        let net = record.network.expect("network layer");
        assert_eq!(net.src_ip, "192.168.1.10");
        assert_eq!(net.dst_ip, "10.0.0.1");
        match net.transport {
            Transport::Tcp {
                src_port,
                dst_port,
                flags,
            } => {
                assert_eq!(src_port, 44321);
                assert_eq!(dst_port, 443);
                assert_eq!(flags, "SYN|ACK");
            }
            other => panic!("expected TCP, got {:?}", other),
        }
    }

    #[test]
    fn garbage_frame_has_no_network_layer() {
        let record = parse_frame(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(record.length, Some(4));
        assert!(record.network.is_none());
    }

    #[test]
    fn flags_label_covers_empty_and_combined() {
        assert_eq!(tcp_flags_label(0), "NONE");
        assert_eq!(tcp_flags_label(TcpFlags::ACK), "ACK");
        assert_eq!(tcp_flags_label(TcpFlags::FIN | TcpFlags::ACK), "FIN|ACK");
    }
}
