//! Speech recognition on a model server.
//!
//! A recording on disk is uploaded as the `audio` part of a multipart
//! request. Live audio goes through [`AsrPipeline::stream_predict`] with the
//! samples carried inline in an [`AsrStreamQuery`].

use log::debug;
use pipeline::config::{enabled_by_default, env_flag, env_or, env_parse};
use pipeline::{
    decode, Capability, FileField, Framing, Pipeline, PipelineError, PredictionStream, Query,
    ServiceConfig, ServiceState, STREAMING_ROUTES,
};
use serde::{Deserialize, Serialize};

pub use pipeline::Result;

pub const DEFAULT_URL: &str = "http://127.0.0.1:11001";

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_format() -> String {
    "float32".into()
}

fn default_media_type() -> String {
    "wav".into()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsrConfig {
    #[serde(default = "enabled_by_default")]
    pub enable: bool,
    pub server_url: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Sample encoding of streamed audio; the servers accept `float32`.
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl AsrConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            enable: true,
            server_url: server_url.into(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            format: default_format(),
        }
    }

    /// Read `ASR_URL`, `ASR_ENABLE`, `ASR_SAMPLE_RATE` and `ASR_CHANNELS`.
    pub fn from_env() -> Self {
        Self {
            enable: env_flag("ASR_ENABLE", true),
            server_url: env_or("ASR_URL", DEFAULT_URL),
            sample_rate: env_parse("ASR_SAMPLE_RATE", default_sample_rate()),
            channels: env_parse("ASR_CHANNELS", default_channels()),
            format: default_format(),
        }
    }
}

impl ServiceConfig for AsrConfig {
    fn enabled(&self) -> bool {
        self.enable
    }

    fn server_url(&self) -> &str {
        &self.server_url
    }
}

/// Transcribe a recording.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsrQuery {
    pub audio_path: String,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

impl AsrQuery {
    pub fn new(audio_path: impl Into<String>) -> Self {
        Self {
            audio_path: audio_path.into(),
            media_type: default_media_type(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

/// Transcribe a slice of live audio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AsrStreamQuery {
    /// Last slice of the utterance.
    pub is_final: bool,
    #[serde(skip)]
    pub audio_data: Vec<u8>,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

impl AsrStreamQuery {
    /// Raw samples laid out as `config` describes.
    pub fn new(config: &AsrConfig, audio_data: Vec<u8>, is_final: bool) -> Self {
        Self {
            is_final,
            audio_data,
            media_type: config.format.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsrPrediction {
    pub transcript: String,
}

const AUDIO: FileField = FileField {
    field: "audio_path",
    part: "audio",
};

fn encode(query: &AsrQuery) -> Result<Query> {
    Query::file(query, vec![AUDIO])
}

fn encode_stream(query: &AsrStreamQuery) -> Result<Query> {
    if query.media_type == "float32" {
        check_float32(&query.audio_data)?;
    }
    Query::stream(query, "audio_data", "audio", query.audio_data.clone())
}

/// The speech recognition service on a model server.
pub const ASR: Capability<AsrQuery, AsrPrediction> = Capability {
    service: "asr",
    routes: STREAMING_ROUTES,
    encode,
    decode: decode::json::<AsrPrediction>,
    framing: Framing::Json,
};

#[derive(Clone)]
pub struct AsrPipeline {
    inner: Pipeline<AsrQuery, AsrPrediction>,
}

impl AsrPipeline {
    pub fn new(config: &AsrConfig) -> Result<Self> {
        Ok(Self {
            inner: Pipeline::new(config, ASR)?,
        })
    }

    pub fn from_pipeline(inner: Pipeline<AsrQuery, AsrPrediction>) -> Self {
        Self { inner }
    }

    /// Transcribe a recording. A path that does not exist locally is sent
    /// as-is for the server to open.
    pub async fn predict(&self, query: &AsrQuery) -> Result<AsrPrediction> {
        self.inner.predict(query).await
    }

    /// Send one slice of live audio; fails with
    /// [`PipelineError::InvalidQuery`] when the slice is empty.
    pub async fn stream_predict(
        &self,
        query: &AsrStreamQuery,
    ) -> Result<PredictionStream<AsrPrediction>> {
        debug!(
            "streaming {} bytes of audio (final: {})",
            query.audio_data.len(),
            query.is_final
        );
        match encode_stream(query) {
            Ok(q) => self.inner.stream_query(q).await,
            Err(e) => Err(pipeline::diagnose::inspect(e)),
        }
    }

    pub async fn check_state(&self) -> ServiceState {
        self.inner.check_state().await
    }
}

/// Little-endian `float32` bytes for `samples`, the layout the servers expect.
pub fn f32_samples_to_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Reject audio that is obviously not `float32` samples.
pub fn check_float32(bytes: &[u8]) -> Result<()> {
    if bytes.len() % 4 != 0 {
        return Err(PipelineError::InvalidQuery(format!(
            "{} bytes is not a whole number of float32 samples",
            bytes.len()
        )));
    }
    Ok(())
}
