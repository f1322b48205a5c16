//! Prometheus counters exported at `/metrics`.

use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub method: String,
    /// Route template (`/api/photos/{id}`), never the raw path.
    pub route: String,
    pub status: String,
}

#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    http_requests: Family<RequestLabels, Counter>,
    photo_visits: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("folio");
        let http_requests = Family::<RequestLabels, Counter>::default();
        let photo_visits = Counter::default();
        registry.register(
            "http_requests",
            "Handled HTTP requests by route and status",
            http_requests.clone(),
        );
        registry.register(
            "photo_visits",
            "Visits that incremented a photo counter",
            photo_visits.clone(),
        );
        Self {
            registry,
            http_requests,
            photo_visits,
        }
    }

    pub fn record_request(&self, method: &str, route: &str, status: u16) {
        self.http_requests
            .get_or_create(&RequestLabels {
                method: method.to_string(),
                route: route.to_string(),
                status: status.to_string(),
            })
            .inc();
    }

    pub fn record_visit(&self) {
        self.photo_visits.inc();
    }

    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Installed with `route_layer`, so a matched route is always present.
pub async fn track_requests(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(request).await;
    metrics.record_request(&method, &route, response.status().as_u16());
    response
}
