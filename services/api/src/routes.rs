use crate::infra::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::Arc;
use yieldscope::error::AppError;
use yieldscope::pipeline::domain::{EvaluationResult, MarketRentSnapshot, SearchProfile};
use yieldscope::pipeline::EvaluationPipeline;
use yieldscope::providers::TextGenerator;

/// Router exposing the pipeline plus the operational endpoints.
pub(crate) fn with_pipeline_routes<S, P>(pipeline: Arc<EvaluationPipeline<S, P>>) -> Router
where
    S: TextGenerator + 'static,
    P: TextGenerator + 'static,
{
    Router::new()
        .route("/api/evaluate", post(evaluate_endpoint::<S, P>))
        .route("/api/estimate-rent", post(estimate_rent_endpoint::<S, P>))
        .with_state(pipeline)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn evaluate_endpoint<S, P>(
    State(pipeline): State<Arc<EvaluationPipeline<S, P>>>,
    Json(profile): Json<SearchProfile>,
) -> Result<Json<EvaluationResult>, AppError>
where
    S: TextGenerator + 'static,
    P: TextGenerator + 'static,
{
    let result = pipeline.evaluate(&profile).await?;
    Ok(Json(result))
}

pub(crate) async fn estimate_rent_endpoint<S, P>(
    State(pipeline): State<Arc<EvaluationPipeline<S, P>>>,
    Json(profile): Json<SearchProfile>,
) -> Result<Json<MarketRentSnapshot>, AppError>
where
    S: TextGenerator + 'static,
    P: TextGenerator + 'static,
{
    let snapshot = pipeline.estimate_rent(&profile).await?;
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tower::util::ServiceExt;
    use yieldscope::pipeline::{PipelineConfig, RentSource};
    use yieldscope::providers::ProviderError;

    struct ScriptedGenerator {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            self.replies
                .lock()
                .expect("script mutex poisoned")
                .pop_front()
                .ok_or(ProviderError::Envelope {
                    service: "scripted",
                    detail: "script exhausted".to_string(),
                })
        }
    }

    fn profile_body() -> Body {
        Body::from(
            r#"{"minPrice":300000,"maxPrice":550000,"area":"Brooklyn, NY","bedrooms":2,"minSqft":700,"maxSqft":1100}"#,
        )
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds")
    }

    fn idle_router_with_state(readiness: Arc<AtomicBool>) -> Router {
        let state = AppState {
            readiness,
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let pipeline = Arc::new(EvaluationPipeline::new(
            ScriptedGenerator::new(&[]),
            ScriptedGenerator::new(&[]),
            PipelineConfig::default(),
        ));
        with_pipeline_routes(pipeline).layer(Extension(state))
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(profile_body())
            .expect("request builds")
    }

    #[tokio::test]
    async fn evaluate_endpoint_returns_ranked_properties() {
        let searcher = ScriptedGenerator::new(&[
            r#"{"average_rent": 2600, "currency": "USD"}"#,
            "- 123 Main St: $450,000, 2 bd (https://zillow.com/x)",
        ]);
        let structurer = ScriptedGenerator::new(&[
            r#"{"properties": [{"id": "prop-1", "address": "123 Main St", "price_usd": 450000, "bedrooms": 2, "sqft": 850}]}"#,
        ]);
        let pipeline = Arc::new(EvaluationPipeline::new(
            searcher,
            structurer,
            PipelineConfig::default(),
        ));

        let response = with_pipeline_routes(pipeline)
            .oneshot(post("/api/evaluate"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body is JSON");
        assert_eq!(body["averageRent"], 2600.0);
        assert_eq!(body["currency"], "USD");
        assert_eq!(body["properties"][0]["id"], "prop-1");
        assert_eq!(body["properties"][0]["estimatedRent"], 2600.0);
    }

    #[tokio::test]
    async fn evaluate_endpoint_maps_empty_normalization_to_not_found() {
        let searcher = ScriptedGenerator::new(&[
            r#"{"average_rent": 2600}"#,
            "no listings today",
        ]);
        let structurer = ScriptedGenerator::new(&[r#"{"properties": []}"#]);
        let pipeline = Arc::new(EvaluationPipeline::new(
            searcher,
            structurer,
            PipelineConfig::default(),
        ));

        let response = with_pipeline_routes(pipeline)
            .oneshot(post("/api/evaluate"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn estimate_rent_endpoint_returns_the_scalar() {
        let searcher = ScriptedGenerator::new(&[
            r#"{"average_rent": 2600, "min_rent": 2200, "max_rent": 3100, "market_analysis": "Tight market."}"#,
        ]);
        let structurer = ScriptedGenerator::new(&[]);
        let pipeline = Arc::new(EvaluationPipeline::new(
            searcher,
            structurer,
            PipelineConfig {
                rent_source: RentSource::MarketScalar,
                max_listings: 10,
            },
        ));

        let response = with_pipeline_routes(pipeline)
            .oneshot(post("/api/estimate-rent"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body is JSON");
        assert_eq!(body["averageRent"], 2600.0);
        assert_eq!(body["analysis"], "Tight market.");
    }

    #[tokio::test]
    async fn readiness_flips_from_unavailable_to_ok_with_the_flag() {
        let readiness = Arc::new(AtomicBool::new(false));
        let app = idle_router_with_state(readiness.clone());

        let response = app
            .clone()
            .oneshot(get_request("/ready"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        readiness.store(true, Ordering::Release);
        let response = app
            .oneshot(get_request("/ready"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body is JSON");
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_prometheus_text() {
        let app = idle_router_with_state(Arc::new(AtomicBool::new(true)));

        let response = app
            .oneshot(get_request("/metrics"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }
}
