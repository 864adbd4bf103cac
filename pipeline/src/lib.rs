//! Uniform request/response dispatch for remote model services.
//!
//! Speech recognition, chat, captioning, OCR, speech synthesis and the rest
//! all speak the same contract: a query goes to `<base>/<service>/predict`
//! (or `stream-predict`), a prediction comes back, and `<base>/<service>/state`
//! reports health. This crate holds that contract once; service crates only
//! supply a [`Capability`] describing their payloads.

pub mod client;
pub mod config;
pub mod decode;
pub mod diagnose;
pub mod error;
pub mod payload;
pub mod pipeline;
pub mod route;
pub mod state;
pub mod stream;
pub mod transport;

pub use client::ServiceClient;
pub use config::{PipelineConfig, ServiceConfig};
pub use decode::{Audio, AudioFormat, Framing};
pub use diagnose::Diagnosis;
pub use error::{PipelineError, Result};
pub use payload::{FileField, Payload, Query};
pub use pipeline::{Capability, Pipeline, STREAMING_ROUTES, UNARY_ROUTES};
pub use route::{Route, RouteMap};
pub use state::{AppStatus, ServiceState};
pub use stream::{PredictionStream, StreamChunk};
pub use transport::{HttpTransport, Transport};
pub use url::Url;
