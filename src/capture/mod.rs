//! Packet records handed to the pipeline, and the feed seam they arrive through.
//! Layer presence is modeled explicitly: a record may carry no network layer at
//! all, an IP layer only, or IP plus a decoded transport.

mod live;

pub use live::{CaptureError, LiveFeed};

/// One captured packet, reduced to the capabilities the pipeline reads.
#[derive(Debug, Clone)]
pub struct PacketRecord {
    /// Frame length in bytes, when the capture reports one.
    pub length: Option<u32>,
    pub network: Option<NetworkLayer>,
}

/// Network-layer view: address pair plus whatever transport was decoded.
#[derive(Debug, Clone)]
pub struct NetworkLayer {
    pub src_ip: String,
    pub dst_ip: String,
    pub transport: Transport,
}

/// Transport-layer capability of a packet.
#[derive(Debug, Clone)]
pub enum Transport {
    Tcp {
        src_port: u16,
        dst_port: u16,
        flags: String,
    },
    Udp {
        src_port: u16,
        dst_port: u16,
    },
    Icmp,
    /// Transport present but not decoded; carries the protocol name as captured.
    Other(String),
}

/// Source of packet records. `Ok(None)` means nothing arrived within the
/// feed's poll window; callers re-check their stop condition and poll again.
pub trait PacketFeed {
    fn next_packet(&mut self) -> Result<Option<PacketRecord>, CaptureError>;
}
