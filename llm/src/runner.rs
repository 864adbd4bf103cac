use futures_util::StreamExt;
use pipeline::{PredictionStream, Result};

use crate::client::LlmPipeline;
use crate::config::LlmConfig;
use crate::types::{LlmPrediction, LlmQuery};

/// Drain a chat stream, returning every partial reply and the final one.
pub async fn collect_stream(
    mut stream: PredictionStream<LlmPrediction>,
) -> Result<(Vec<LlmPrediction>, Option<LlmPrediction>)> {
    let mut partials = Vec::new();
    let mut last = None;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.is_final {
            last = Some(chunk.payload);
        } else {
            partials.push(chunk.payload);
        }
    }
    Ok((partials, last))
}

/// Create an [`LlmPipeline`] from the `LLM_*` environment variables.
pub fn pipeline_from_env() -> Result<LlmPipeline> {
    LlmPipeline::new(&LlmConfig::from_env())
}

/// Convenience helper to ask a single question using environment configuration.
pub async fn chat_from_env(text: &str) -> Result<LlmPrediction> {
    let pipeline = pipeline_from_env()?;
    pipeline.predict(&LlmQuery::new(text)).await
}
