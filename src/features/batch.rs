//! Size-thresholded batch accumulation. There is no time-based flush: a
//! sub-threshold batch stays pending until more traffic arrives.

use super::FeatureVector;

pub struct BatchAccumulator {
    size: usize,
    pending: Vec<FeatureVector>,
}

impl BatchAccumulator {
    /// `size` is clamped to at least 1 so a batch can always seal.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            pending: Vec::with_capacity(size),
        }
    }

    /// Append one vector. Returns the sealed batch once the threshold is
    /// reached, leaving the accumulator empty for the next batch.
    pub fn push(&mut self, vector: FeatureVector) -> Option<Vec<FeatureVector>> {
        self.pending.push(vector);
        if self.pending.len() == self.size {
            Some(std::mem::replace(
                &mut self.pending,
                Vec::with_capacity(self.size),
            ))
        } else {
            None
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{PortCategory, Protocol};

    fn fv(dst_port: u16) -> FeatureVector {
        FeatureVector {
            src_ip: 1,
            dst_ip: 2,
            protocol: Protocol::Tcp,
            length: 64,
            src_port: 40000,
            dst_port,
            flags: "ACK".to_string(),
            src_port_category: PortCategory::Registered,
            dst_port_category: PortCategory::WellKnown,
        }
    }

    #[test]
    fn seals_at_threshold_and_resets() {
        let mut acc = BatchAccumulator::new(2);

        assert!(acc.push(fv(1)).is_none());
        assert_eq!(acc.pending(), 1);

        let first = acc.push(fv(2)).expect("sealed batch");
        assert_eq!(first.iter().map(|v| v.dst_port).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(acc.pending(), 0);

        assert!(acc.push(fv(3)).is_none());
        let second = acc.push(fv(4)).expect("sealed batch");
        assert_eq!(second.iter().map(|v| v.dst_port).collect::<Vec<_>>(), [3, 4]);
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn partial_batch_stays_pending() {
        let mut acc = BatchAccumulator::new(3);
        assert!(acc.push(fv(1)).is_none());
        assert!(acc.push(fv(2)).is_none());
        assert_eq!(acc.pending(), 2);
    }

    #[test]
    fn zero_size_is_clamped_to_one() {
        let mut acc = BatchAccumulator::new(0);
        assert_eq!(acc.size(), 1);
        assert!(acc.push(fv(1)).is_some());
    }
}
