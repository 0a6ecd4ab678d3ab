//! NetSentry entrypoint: load the classifier artifact and schema (fatal if
//! absent), open the sink and the live capture, then run the ingestion loop
//! until interrupted. A partial batch is not drained at shutdown.

use netsentry::{
    config::SentinelConfig,
    model::{ClassifierInvoker, ModelSchema, OnnxClassifier},
    pipeline::Pipeline,
    publish::{Publisher, SqliteSink},
    LiveFeed, StructuredLogger,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("NETSENTRY_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = SentinelConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(data_dir = ?config.data_dir, "netsentry starting");

    // Model artifact and schema load once; failure here aborts the process.
    let schema = ModelSchema::load(&config.model.schema_path)?;
    let classifier = OnnxClassifier::load(&config.model.artifact_path, schema.clone())?;
    let invoker = ClassifierInvoker::new(classifier, schema.expected_features)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let sink = SqliteSink::open(&config.data_dir.join("traffic.db"))?;
    let publisher = Publisher::new(sink);

    let mut feed = LiveFeed::open(&config.capture.interface, config.capture.promiscuous)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        let _ = ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        });
    }

    info!(
        interface = %config.capture.interface,
        batch_size = config.batch.size,
        "starting live classification (Ctrl+C to stop)"
    );

    let mut pipeline = Pipeline::new(config.batch.size, invoker, publisher);
    pipeline.run(&mut feed, &stop)?;

    info!("capture stopped");
    Ok(())
}
