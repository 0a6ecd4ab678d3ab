//! Ingestion loop: ACCUMULATE → (size == B) → CLASSIFY → AGGREGATE → PUBLISH,
//! then back to ACCUMULATE until the stop flag is raised.
//!
//! One instance, one thread, one writer of the aggregate state. Per-batch
//! failures (classification, publish) are isolated: they are logged and the
//! loop moves on to the next packet.

use crate::capture::{CaptureError, PacketFeed, PacketRecord};
use crate::features::{extract, BatchAccumulator};
use crate::model::{Classifier, ClassifierInvoker};
use crate::publish::{Publisher, TrafficSink};
use crate::stats::{AggregateState, Snapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub struct Pipeline<C: Classifier, S: TrafficSink> {
    accumulator: BatchAccumulator,
    invoker: ClassifierInvoker<C>,
    state: AggregateState,
    publisher: Publisher<S>,
}

impl<C: Classifier, S: TrafficSink> Pipeline<C, S> {
    pub fn new(batch_size: usize, invoker: ClassifierInvoker<C>, publisher: Publisher<S>) -> Self {
        Self {
            accumulator: BatchAccumulator::new(batch_size),
            invoker,
            state: AggregateState::new(),
            publisher,
        }
    }

    /// Feed one packet through the pipeline. Returns the snapshot when this
    /// packet sealed a batch that classified successfully.
    pub fn ingest(&mut self, packet: &PacketRecord) -> Option<Snapshot> {
        let vector = extract(packet);
        let batch = self.accumulator.push(vector)?;
        debug!(size = batch.len(), "batch sealed");

        let verdicts = match self.invoker.classify(&batch) {
            Ok(verdicts) => verdicts,
            Err(e) => {
                warn!(error = %e, dropped = batch.len(), "classification failed; batch dropped");
                return None;
            }
        };

        let snapshot = self.state.aggregate(&batch, &verdicts);
        info!(
            normal = snapshot.normal,
            malicious = snapshot.malicious,
            sample_size = snapshot.sample_size,
            "processed batch"
        );

        if let Err(e) = self.publisher.publish(&snapshot) {
            warn!(error = %e, "snapshot publish failed; aggregate state carries forward");
        }

        Some(snapshot)
    }

    /// Blocking run loop over a packet feed. Returns when the stop flag is
    /// raised or the feed fails; a pending partial batch is not drained.
    pub fn run<F: PacketFeed>(&mut self, feed: &mut F, stop: &AtomicBool) -> Result<(), CaptureError> {
        while !stop.load(Ordering::Relaxed) {
            match feed.next_packet()? {
                Some(packet) => {
                    self.ingest(&packet);
                }
                // Poll window elapsed; loop to re-check the stop flag.
                None => {}
            }
        }
        if self.accumulator.pending() > 0 {
            info!(
                pending = self.accumulator.pending(),
                "stopping with partial batch; not flushed"
            );
        }
        Ok(())
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    pub fn pending(&self) -> usize {
        self.accumulator.pending()
    }

    pub fn publisher(&self) -> &Publisher<S> {
        &self.publisher
    }
}
