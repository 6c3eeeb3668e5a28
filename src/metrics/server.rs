use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use super::Metrics;
use crate::messaging::NatsPublisher;
use crate::utils::{CircuitBreaker, CircuitState};

#[derive(Clone)]
struct ServerState {
    metrics: Arc<Metrics>,
    publisher: NatsPublisher,
    breaker: CircuitBreaker,
}

/// Start the metrics HTTP server
/// This should be called in a separate thread/runtime to avoid conflicts
pub async fn start_metrics_server(
    metrics: Arc<Metrics>,
    publisher: NatsPublisher,
    breaker: CircuitBreaker,
    port: u16,
) -> std::io::Result<()> {
    tracing::info!("📊 Starting metrics server on http://0.0.0.0:{}/metrics", port);

    let state = ServerState {
        metrics,
        publisher,
        breaker,
    };

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route("/metrics", web::get().to(metrics_handler))
            .route("/health", web::get().to(health_handler))
    })
    .workers(1)
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn metrics_handler(state: web::Data<ServerState>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler(state: web::Data<ServerState>) -> impl Responder {
    let circuit = state.breaker.state().await;
    let reopens_in = state.breaker.open_remaining().await;
    let connection = state.publisher.connection_state();

    // While open, events are dropped locally even if the broker is back
    let publishing = match circuit {
        CircuitState::Closed => "broker",
        CircuitState::HalfOpen => "trial",
        CircuitState::Open => "dropping_without_broker",
    };

    HttpResponse::Ok().json(serde_json::json!({
        "status": if circuit == CircuitState::Closed { "healthy" } else { "degraded" },
        "service": "observation-nats-bridge",
        "circuit_breaker": format!("{circuit:?}"),
        "circuit_reopens_in_secs": reopens_in.map(|d| d.as_secs()),
        "publishing": publishing,
        "nats_connection": connection,
    }))
}
