//! Chat with a large language model.
//!
//! [`LlmPipeline`] either talks to the model server's `llm` routes or, when
//! [`LlmConfig::model`] is set, to a hosted OpenAI-compatible API. Both keep
//! the same contract: an [`LlmQuery`] in, an [`LlmPrediction`] carrying the
//! updated conversation out.

pub mod client;
pub mod config;
pub mod runner;
pub mod traits;
pub mod types;

pub use client::{HostedBackend, LlmPipeline, LocalBackend, LLM};
pub use config::LlmConfig;
pub use pipeline::{PipelineError, Result};
pub use runner::{chat_from_env, collect_stream, pipeline_from_env};
pub use traits::LlmBackend;
pub use types::{Conversation, LlmPrediction, LlmQuery, Role};
