use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use observation_nats_bridge::config::BridgeConfig;
use observation_nats_bridge::delivery::{run_workers, DeliveryGate, ObservationPublisher};
use observation_nats_bridge::domain::ChangeNotification;
use observation_nats_bridge::messaging::{CircuitBreakerSink, NatsPublisher};
use observation_nats_bridge::metrics::{self, Metrics};
use observation_nats_bridge::utils::CircuitBreaker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,observation_nats_bridge=debug")),
        )
        .init();

    tracing::info!("🚀 Starting Observation → NATS bridge");

    // === 1. Configuration ===
    let config_path = std::env::args().nth(1);
    let config = BridgeConfig::load(config_path.as_deref())?;
    tracing::info!(
        subscription_id = %config.delivery.subscription_id,
        subject = %config.nats.subject,
        consumers = config.delivery.concurrent_consumers,
        format = ?config.delivery.format,
        "Configuration loaded"
    );

    // === 2. Metrics registry ===
    let metrics = Arc::new(Metrics::new()?);

    // === 3. One shared NATS handle for every worker ===
    let nats = NatsPublisher::connect(&config.nats).await?;
    let breaker = CircuitBreaker::new("nats-publish", (&config.circuit_breaker).into());

    // Metrics HTTP server runs on its own thread and runtime
    if config.metrics.enabled {
        let server_metrics = metrics.clone();
        let nats = nats.clone();
        let breaker = breaker.clone();
        let port = config.metrics.port;
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Metrics runtime error: {}", e);
                    return;
                }
            };
            rt.block_on(async {
                if let Err(e) = metrics::start_metrics_server(server_metrics, nats, breaker, port).await {
                    tracing::error!("Metrics server error: {}", e);
                }
            });
        });
    }

    // === 4. Gate + publisher ===
    let sink = CircuitBreakerSink::new(Arc::new(nats.clone()), breaker, metrics.clone());
    let publisher = ObservationPublisher::new(
        Arc::new(sink),
        config.nats.subject.clone(),
        config.delivery.format,
        metrics.clone(),
    );
    let gate = Arc::new(DeliveryGate::new(
        config.delivery.subscription_id.clone(),
        publisher,
        metrics.clone(),
    ));

    // === 5. Feed notifications (one JSON object per stdin line) ===
    let consumers = config.delivery.concurrent_consumers;
    let (tx, rx) = mpsc::channel::<ChangeNotification>(consumers * 16);

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut line_no: u64 = 0;

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupt received, stopping intake");
                    break;
                }
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read notification stream");
                    break;
                }
            };
            line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<ChangeNotification>(&line) {
                Ok(notification) => {
                    if tx.send(notification).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(line = line_no, error = %e, "Skipping malformed notification");
                }
            }
        }
    });

    tracing::info!(consumers, "⏳ Waiting for change notifications on stdin");
    let stats = run_workers(gate, rx, consumers).await;
    reader.await?;

    if let Err(e) = nats.flush().await {
        tracing::warn!(error = %e, "Flush on shutdown failed");
    }

    tracing::info!(
        handled = stats.handled,
        declined = stats.declined,
        "🎉 Bridge stopped"
    );

    Ok(())
}
