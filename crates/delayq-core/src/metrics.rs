use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::KeyValue;

/// OTel counters for producer and consumer activity, labelled by queue.
#[derive(Clone)]
pub struct Metrics {
    pub messages_added: Counter<u64>,
    pub messages_duplicate: Counter<u64>,
    pub messages_delivered: Counter<u64>,
    pub messages_removed: Counter<u64>,
    pub handler_failures: Counter<u64>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create metrics from the global meter provider. If no meter provider
    /// is configured, the instruments are no-op.
    pub fn new() -> Self {
        let meter = opentelemetry::global::meter("delayq");
        Self::from_meter(&meter)
    }

    /// Create metrics from a specific meter (used in tests with in-memory exporter).
    pub fn from_meter(meter: &Meter) -> Self {
        Self {
            messages_added: meter
                .u64_counter("delayq.messages.added")
                .with_description("Messages admitted into a queue")
                .build(),
            messages_duplicate: meter
                .u64_counter("delayq.messages.duplicate")
                .with_description("Admissions rejected because the member already existed")
                .build(),
            messages_delivered: meter
                .u64_counter("delayq.messages.delivered")
                .with_description("Messages handed to a consumer handler")
                .build(),
            messages_removed: meter
                .u64_counter("delayq.messages.removed")
                .with_description("Messages removed after successful handling")
                .build(),
            handler_failures: meter
                .u64_counter("delayq.handler.failures")
                .with_description("Handler invocations that returned an error")
                .build(),
        }
    }

    pub fn record_added(&self, queue: &str) {
        self.messages_added.add(1, &[queue_attr(queue)]);
    }

    pub fn record_duplicate(&self, queue: &str) {
        self.messages_duplicate.add(1, &[queue_attr(queue)]);
    }

    pub fn record_delivered(&self, queue: &str) {
        self.messages_delivered.add(1, &[queue_attr(queue)]);
    }

    pub fn record_removed(&self, queue: &str) {
        self.messages_removed.add(1, &[queue_attr(queue)]);
    }

    pub fn record_handler_failure(&self, queue: &str) {
        self.handler_failures.add(1, &[queue_attr(queue)]);
    }
}

fn queue_attr(queue: &str) -> KeyValue {
    KeyValue::new("queue", queue.to_string())
}
