use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use yieldscope::config::UpstreamConfig;
use yieldscope::error::AppError;
use yieldscope::pipeline::{EvaluationPipeline, PipelineConfig, PipelineError};
use yieldscope::providers::ChatCompletionsClient;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Pipeline wired to the two production chat-completions upstreams.
pub(crate) type ProductionPipeline =
    EvaluationPipeline<ChatCompletionsClient, ChatCompletionsClient>;

pub(crate) fn build_pipeline(
    upstream: &UpstreamConfig,
    pipeline: PipelineConfig,
) -> Result<ProductionPipeline, AppError> {
    let searcher = ChatCompletionsClient::searcher(
        upstream.search_base_url.clone(),
        upstream.search_api_key.clone(),
        upstream.search_model.clone(),
        upstream.request_timeout,
    )
    .map_err(PipelineError::from)?;

    let structurer = ChatCompletionsClient::structurer(
        upstream.parser_base_url.clone(),
        upstream.parser_api_key.clone(),
        upstream.parser_model.clone(),
        upstream.request_timeout,
    )
    .map_err(PipelineError::from)?;

    Ok(EvaluationPipeline::new(
        Arc::new(searcher),
        Arc::new(structurer),
        pipeline,
    ))
}
