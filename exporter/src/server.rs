//! The `/metrics` endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Registry, TextEncoder};
use tower_http::trace::TraceLayer;

/// Creates the router serving `registry` in the text exposition format.
pub fn metrics_router(registry: Registry) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

async fn metrics(State(registry): State<Registry>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = String::new();

    match encoder.encode_utf8(&registry.gather(), &mut buffer) {
        Ok(()) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], buffer).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gauges::SensorGauges;
    use crate::sensors::QingpingMetric;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use shared::staleness::GaugeSet;
    use tower::ServiceExt;

    async fn scrape(registry: Registry) -> (StatusCode, String, String) {
        let response = metrics_router(registry)
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let registry = Registry::new();
        let gauges = SensorGauges::<QingpingMetric>::register(&registry).unwrap();
        gauges.set(QingpingMetric::Temperature, 22.29);
        gauges.set(QingpingMetric::Co2, 538.0);

        let (status, content_type, body) = scrape(registry).await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("# HELP upstairs_temperature_celsius Current room temperature."));
        assert!(body.contains("# TYPE upstairs_temperature_celsius gauge"));
        assert!(body.contains("upstairs_temperature_celsius 22.29"));
        assert!(body.contains("upstairs_co2_parts_per_million 538"));
        assert!(body.contains("upstairs_humidity_percentage 0"));
    }

    #[tokio::test]
    async fn test_unavailable_gauges_export_nan() {
        let registry = Registry::new();
        let gauges = SensorGauges::<QingpingMetric>::register(&registry).unwrap();
        gauges.mark_unavailable();

        let (_, _, body) = scrape(registry).await;

        assert!(body.contains("upstairs_pm10_micrograms_per_meter_cubed NaN"));
    }

    #[tokio::test]
    async fn test_unknown_path_returns_404() {
        let response = metrics_router(Registry::new())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
