// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

use crate::utils::CircuitState;

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Delivery gate decisions (claimed, declined, skipped)
// - Event outcomes per operation (published, ignored, dropped)
// - Publish latency
// - Circuit breaker state
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the bridge
pub struct Metrics {
    registry: Registry,

    // Delivery Gate Metrics
    pub deliveries_claimed: IntCounter,
    pub deliveries_declined: IntCounter,
    pub deliveries_skipped: IntCounterVec,

    // Event Metrics
    pub events_published: IntCounterVec,
    pub events_ignored: IntCounterVec,
    pub events_dropped: IntCounterVec,
    pub publish_duration: HistogramVec,

    // Circuit Breaker Metrics
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Delivery Gate Metrics
        let deliveries_claimed = IntCounter::new(
            "deliveries_claimed_total",
            "Notifications claimed by the observation delivery gate",
        )?;
        registry.register(Box::new(deliveries_claimed.clone()))?;

        let deliveries_declined = IntCounter::new(
            "deliveries_declined_total",
            "Notifications for other subscriptions, left to the framework",
        )?;
        registry.register(Box::new(deliveries_declined.clone()))?;

        let deliveries_skipped = IntCounterVec::new(
            Opts::new("deliveries_skipped_total", "Claimed notifications with no Observation payload"),
            &["reason"],
        )?;
        registry.register(Box::new(deliveries_skipped.clone()))?;

        // Event Metrics
        let events_published = IntCounterVec::new(
            Opts::new("events_published_total", "Observation events published to NATS"),
            &["op"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let events_ignored = IntCounterVec::new(
            Opts::new("events_ignored_total", "Notifications whose operation produces no event"),
            &["op"],
        )?;
        registry.register(Box::new(events_ignored.clone()))?;

        let events_dropped = IntCounterVec::new(
            Opts::new("events_dropped_total", "Observation events dropped after a failure"),
            &["op", "reason"],
        )?;
        registry.register(Box::new(events_dropped.clone()))?;

        let publish_duration = HistogramVec::new(
            HistogramOpts::new("publish_duration_seconds", "Time spent publishing one event")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["op"],
        )?;
        registry.register(Box::new(publish_duration.clone()))?;

        // Circuit Breaker Metrics
        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            deliveries_claimed,
            deliveries_declined,
            deliveries_skipped,
            events_published,
            events_ignored,
            events_dropped,
            publish_duration,
            circuit_breaker_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_claimed(&self) {
        self.deliveries_claimed.inc();
    }

    pub fn record_declined(&self) {
        self.deliveries_declined.inc();
    }

    pub fn record_skipped(&self, reason: &str) {
        self.deliveries_skipped.with_label_values(&[reason]).inc();
    }

    pub fn record_published(&self, op: &str, duration_secs: f64) {
        self.events_published.with_label_values(&[op]).inc();
        self.publish_duration.with_label_values(&[op]).observe(duration_secs);
    }

    pub fn record_ignored(&self, op: &str) {
        self.events_ignored.with_label_values(&[op]).inc();
    }

    pub fn record_dropped(&self, op: &str, reason: &str) {
        self.events_dropped.with_label_values(&[op, reason]).inc();
    }

    pub fn update_circuit_breaker_state(&self, state: CircuitState) {
        let value = match state {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        };
        self.circuit_breaker_state.set(value);
    }
}
