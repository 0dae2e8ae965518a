use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static AUTH_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

fn build() -> Result<(Registry, IntCounterVec, HistogramVec, IntCounterVec), prometheus::Error> {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )?;
    let request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )?;
    let auth_events = IntCounterVec::new(
        Opts::new(
            "studio_auth_events_total",
            "Session lifecycle outcomes by event and result",
        ),
        &["event", "outcome"],
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(request_duration.clone()))?;
    registry.register(Box::new(auth_events.clone()))?;

    Ok((registry, requests_total, request_duration, auth_events))
}

/// Registers the collectors once. Later calls are no-ops.
pub fn init_metrics() {
    if REGISTRY.get().is_some() {
        return;
    }

    match build() {
        Ok((registry, requests_total, request_duration, auth_events)) => {
            let _ = REGISTRY.set(registry);
            let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
            let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);
            let _ = AUTH_EVENTS_TOTAL.set(auth_events);
        }
        Err(e) => tracing::error!("Failed to initialize metrics: {}", e),
    }
}

pub fn record_auth_event(event: &str, outcome: &str) {
    if let Some(counter) = AUTH_EVENTS_TOTAL.get() {
        counter.with_label_values(&[event, outcome]).inc();
    }
}

pub fn get_metrics() -> String {
    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to UTF-8: {}", e);
        format!("# Failed to convert metrics to UTF-8: {}\n", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_includes_recorded_auth_events() {
        init_metrics();
        init_metrics();
        record_auth_event("refresh", "reused");

        let text = get_metrics();
        assert!(text.contains("studio_auth_events_total"));
        assert!(text.contains("outcome=\"reused\""));
    }
}
