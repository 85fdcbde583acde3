use integration_test_utils::InMemoryBus;
use std::sync::Arc;
use std::time::Duration;
use tf_listener::{ListenerConfig, TransformBuffer, TransformListener, TransformTransport};

pub(crate) const WAIT: Duration = Duration::from_secs(5);

pub(crate) fn shared<B: TransformBuffer + 'static>(buffer: &Arc<B>) -> Arc<dyn TransformBuffer> {
    buffer.clone()
}

pub(crate) async fn make_listener<B: TransformBuffer + 'static>(
    buffer: &Arc<B>,
    bus: &InMemoryBus,
    config: ListenerConfig,
) -> TransformListener {
    integration_test_utils::init_tracing();
    let transport: Arc<dyn TransformTransport> = Arc::new(bus.clone());

    TransformListener::new(shared(buffer), transport, config)
        .await
        .expect("listener creation should succeed")
}

#[allow(dead_code)]
pub(crate) fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("unable to read {path}: {err}"))
}

/// Polls until the listener has finished processing `count` batches.
#[allow(dead_code)]
pub(crate) async fn wait_for_batches(listener: &TransformListener, count: u64) -> u64 {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let processed = listener.diagnostics().batches_processed();
        if processed >= count || tokio::time::Instant::now() >= deadline {
            return processed;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
