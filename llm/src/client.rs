//! Backends for the chat pipeline.
//!
//! The local backend goes through the shared dispatch core. The hosted
//! backend speaks the OpenAI chat-completions dialect to a third-party
//! service, keeping the conversation history on the client side.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use pipeline::decode;
use pipeline::diagnose;
use pipeline::route;
use pipeline::transport::{Method, Request};
use pipeline::{
    Capability, Framing, HttpTransport, Payload, Pipeline, PipelineError, PredictionStream, Query,
    Result, ServiceState, Transport, Url, STREAMING_ROUTES,
};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::traits::LlmBackend;
use crate::types::{Conversation, LlmPrediction, LlmQuery, Role};

fn encode(query: &LlmQuery) -> Result<Query> {
    Query::simple(query)
}

/// The chat service on a model server.
pub const LLM: Capability<LlmQuery, LlmPrediction> = Capability {
    service: "llm",
    routes: STREAMING_ROUTES,
    encode,
    decode: decode::json::<LlmPrediction>,
    framing: Framing::Json,
};

/// Chat through the model server's `llm` routes.
pub struct LocalBackend {
    pipeline: Pipeline<LlmQuery, LlmPrediction>,
}

impl LocalBackend {
    pub fn new(config: &LlmConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self {
            pipeline: Pipeline::with_transport(config, LLM, transport)?,
        })
    }
}

#[async_trait]
impl LlmBackend for LocalBackend {
    async fn predict(&self, query: &LlmQuery) -> Result<LlmPrediction> {
        self.pipeline.predict(query).await
    }

    async fn stream_predict(&self, query: &LlmQuery) -> Result<PredictionStream<LlmPrediction>> {
        self.pipeline.stream_predict(query).await
    }

    async fn check_state(&self) -> ServiceState {
        self.pipeline.check_state().await
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat through a hosted OpenAI-compatible API such as Moonshot or DeepSeek.
pub struct HostedBackend {
    model: String,
    api_key: Option<String>,
    temperature: Option<f64>,
    url: Url,
    transport: Arc<dyn Transport>,
}

impl HostedBackend {
    /// Only `server_url` itself is validated; the model server routes are
    /// never used on this path.
    pub fn new(config: &LlmConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| PipelineError::Config("hosted chat needs a model name".into()))?;
        let base = route::validate(&config.server_url)?;
        Ok(Self {
            url: route::join(&base, "chat/completions")?,
            model,
            api_key: config.api_key.clone(),
            temperature: config.temperature(),
            transport,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, query: &LlmQuery) -> Result<String> {
        let mut messages: Vec<Message<'_>> = query
            .history
            .iter()
            .map(|c| Message {
                role: c.role,
                content: &c.content,
            })
            .collect();
        messages.push(Message {
            role: Role::User,
            content: &query.text,
        });
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            stream: false,
        };
        debug!("hosted completion with {} for {} messages", self.model, body.messages.len());
        let body =
            serde_json::to_value(&body).map_err(|e| PipelineError::Encoding(e.to_string()))?;
        let request = Request::new(Method::POST, self.url.clone(), Payload::Json(body))
            .bearer(self.api_key.clone());
        let res = self.transport.send(request).await?;
        decode::check_status(res.status, &res.body)?;
        let completion: Completion = decode::json(&res.body)?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PipelineError::Validation {
                message: "completion has no message content".into(),
                body: String::from_utf8_lossy(&res.body).into_owned(),
            })
    }
}

#[async_trait]
impl LlmBackend for HostedBackend {
    async fn predict(&self, query: &LlmQuery) -> Result<LlmPrediction> {
        let response = diagnose::resolve(self.complete(query).await)?;
        let mut history = query.history.clone();
        history.push(Conversation::user(query.text.clone()));
        history.push(Conversation::assistant(response.clone()));
        Ok(LlmPrediction { response, history })
    }

    async fn stream_predict(&self, _query: &LlmQuery) -> Result<PredictionStream<LlmPrediction>> {
        Err(PipelineError::Unsupported(format!(
            "streaming is not available for hosted model {}",
            self.model
        )))
    }

    async fn check_state(&self) -> ServiceState {
        ServiceState::unknown(format!("hosted model {} has no state route", self.model))
    }
}

/// Chat pipeline: hosted when the config names a model, local otherwise.
#[derive(Clone)]
pub struct LlmPipeline {
    backend: Arc<dyn LlmBackend>,
}

impl LlmPipeline {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: &LlmConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        if !config.enable {
            return Err(PipelineError::Config(
                "the llm pipeline is disabled in your config".into(),
            ));
        }
        let backend: Arc<dyn LlmBackend> = if config.is_hosted() {
            Arc::new(HostedBackend::new(config, transport)?)
        } else {
            Arc::new(LocalBackend::new(config, transport)?)
        };
        Ok(Self { backend })
    }

    pub fn from_backend(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub async fn predict(&self, query: &LlmQuery) -> Result<LlmPrediction> {
        self.backend.predict(query).await
    }

    pub async fn stream_predict(&self, query: &LlmQuery) -> Result<PredictionStream<LlmPrediction>> {
        self.backend.stream_predict(query).await
    }

    pub async fn check_state(&self) -> ServiceState {
        self.backend.check_state().await
    }
}
