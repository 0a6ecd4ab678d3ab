//! Canonical per-packet features consumed by the classifier.

mod batch;
mod extract;

pub use batch::BatchAccumulator;
pub use extract::{categorize_port, extract, ip_to_int};

use serde::{Deserialize, Serialize};

/// Transport protocol of a packet, after exact-name mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Other,
}

impl Protocol {
    /// Exact match against the recognized transport names; anything else is `Other`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "TCP" => Protocol::Tcp,
            "UDP" => Protocol::Udp,
            "ICMP" => Protocol::Icmp,
            _ => Protocol::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Icmp => "ICMP",
            Protocol::Other => "OTHER",
        }
    }
}

/// IANA port range classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortCategory {
    WellKnown,
    Registered,
    Dynamic,
}

impl PortCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortCategory::WellKnown => "well_known",
            PortCategory::Registered => "registered",
            PortCategory::Dynamic => "dynamic",
        }
    }
}

/// Fully-populated per-packet record handed to the classifier. Every field
/// always holds a value; absence in the source packet shows up as a default,
/// never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub src_ip: u32,
    pub dst_ip: u32,
    pub protocol: Protocol,
    pub length: u32,
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: String,
    pub src_port_category: PortCategory,
    pub dst_port_category: PortCategory,
}

/// Columns coerced to integers when a batch is tabularized.
pub const NUMERIC_COLUMNS: &[&str] = &["src_ip", "dst_ip", "length", "src_port", "dst_port"];

/// Columns coerced to strings when a batch is tabularized.
pub const CATEGORICAL_COLUMNS: &[&str] = &[
    "protocol",
    "flags",
    "dst_port_category",
    "src_port_category",
];

pub fn is_feature_column(name: &str) -> bool {
    NUMERIC_COLUMNS.contains(&name) || CATEGORICAL_COLUMNS.contains(&name)
}

impl FeatureVector {
    /// Numeric column accessor by name; `None` for non-numeric columns.
    pub fn numeric(&self, column: &str) -> Option<i64> {
        match column {
            "src_ip" => Some(self.src_ip as i64),
            "dst_ip" => Some(self.dst_ip as i64),
            "length" => Some(self.length as i64),
            "src_port" => Some(self.src_port as i64),
            "dst_port" => Some(self.dst_port as i64),
            _ => None,
        }
    }

    /// Categorical column accessor by name; `None` for non-categorical columns.
    pub fn categorical(&self, column: &str) -> Option<&str> {
        match column {
            "protocol" => Some(self.protocol.as_str()),
            "flags" => Some(&self.flags),
            "src_port_category" => Some(self.src_port_category.as_str()),
            "dst_port_category" => Some(self.dst_port_category.as_str()),
            _ => None,
        }
    }
}
