use async_trait::async_trait;
use pipeline::{PredictionStream, Result, ServiceState};

use crate::types::{LlmPrediction, LlmQuery};

/// Something that can answer an [`LlmQuery`].
///
/// [`crate::LocalBackend`] talks to the model server's own routes;
/// [`crate::HostedBackend`] talks to an OpenAI-compatible completion API.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn predict(&self, query: &LlmQuery) -> Result<LlmPrediction>;

    async fn stream_predict(&self, query: &LlmQuery) -> Result<PredictionStream<LlmPrediction>>;

    async fn check_state(&self) -> ServiceState;
}
