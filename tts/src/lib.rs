//! Synthesize speech on a model server.
//!
//! The request is plain JSON; the reply is raw audio whose container is
//! recognised from its leading bytes. Streamed replies are checked chunk by
//! chunk.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use log::debug;
use pipeline::config::{enabled_by_default, env_flag, env_or};
use pipeline::{
    decode, AudioFormat, Capability, Framing, Pipeline, PredictionStream, Query, ServiceConfig,
    ServiceState, STREAMING_ROUTES,
};
use serde::{Deserialize, Serialize};

pub use pipeline::{PipelineError, Result};

pub const DEFAULT_URL: &str = "http://127.0.0.1:11006";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "enabled_by_default")]
    pub enable: bool,
    pub server_url: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl TtsConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            enable: true,
            server_url: server_url.into(),
        }
    }

    /// Read `TTS_URL` and `TTS_ENABLE`.
    pub fn from_env() -> Self {
        Self {
            enable: env_flag("TTS_ENABLE", true),
            server_url: env_or("TTS_URL", DEFAULT_URL),
        }
    }
}

impl ServiceConfig for TtsConfig {
    fn enabled(&self) -> bool {
        self.enable
    }

    fn server_url(&self) -> &str {
        &self.server_url
    }
}

fn default_language() -> String {
    "zh".into()
}

fn default_cut_punc() -> String {
    "，。".into()
}

/// Text to speak, in the voice of a reference recording.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsQuery {
    pub text: String,
    #[serde(default = "default_language")]
    pub text_language: String,
    /// Reference audio. A path that exists locally is sent in absolute form,
    /// anything else is taken to exist on the server.
    pub refer_wav_path: String,
    #[serde(default)]
    pub prompt_text: String,
    #[serde(default = "default_language")]
    pub prompt_language: String,
    #[serde(default = "default_cut_punc")]
    pub cut_punc: String,
}

impl TtsQuery {
    pub fn new(text: impl Into<String>, refer_wav_path: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            text_language: default_language(),
            refer_wav_path: refer_wav_path.into(),
            prompt_text: String::new(),
            prompt_language: default_language(),
            cut_punc: default_cut_punc(),
        }
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        let lang = lang.into();
        self.text_language = lang.clone();
        self.prompt_language = lang;
        self
    }

    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.prompt_text = text.into();
        self
    }
}

/// Synthesized audio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TtsPrediction {
    pub wave_data: Vec<u8>,
    pub audio_type: AudioFormat,
}

impl TtsPrediction {
    /// Write the audio to `stem` with the extension of its container.
    pub fn save(&self, stem: impl AsRef<Path>) -> Result<PathBuf> {
        let path = stem.as_ref().with_extension(self.audio_type.extension());
        std::fs::write(&path, &self.wave_data)?;
        Ok(path)
    }
}

fn encode(query: &TtsQuery) -> Result<Query> {
    Query::simple(query)
}

/// Send a reference recording that exists locally by its absolute path.
async fn resolve_reference(query: &TtsQuery) -> Result<Cow<'_, TtsQuery>> {
    if !tokio::fs::try_exists(&query.refer_wav_path).await? {
        return Ok(Cow::Borrowed(query));
    }
    let absolute = tokio::fs::canonicalize(&query.refer_wav_path).await?;
    debug!("using local reference audio {}", absolute.display());
    Ok(Cow::Owned(TtsQuery {
        refer_wav_path: absolute.to_string_lossy().into_owned(),
        ..query.clone()
    }))
}

fn decode_audio(body: &[u8]) -> Result<TtsPrediction> {
    let audio = decode::audio(body)?;
    Ok(TtsPrediction {
        wave_data: audio.data,
        audio_type: audio.format,
    })
}

/// The speech synthesis service on a model server.
pub const TTS: Capability<TtsQuery, TtsPrediction> = Capability {
    service: "tts",
    routes: STREAMING_ROUTES,
    encode,
    decode: decode_audio,
    framing: Framing::Chunks,
};

#[derive(Clone)]
pub struct TtsPipeline {
    inner: Pipeline<TtsQuery, TtsPrediction>,
}

impl TtsPipeline {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        Ok(Self {
            inner: Pipeline::new(config, TTS)?,
        })
    }

    pub fn from_pipeline(inner: Pipeline<TtsQuery, TtsPrediction>) -> Self {
        Self { inner }
    }

    pub async fn predict(&self, query: &TtsQuery) -> Result<TtsPrediction> {
        let query = resolve_reference(query).await?;
        self.inner.predict(&query).await
    }

    /// Audio segments as the server produces them; each one is sniffed.
    pub async fn stream_predict(&self, query: &TtsQuery) -> Result<PredictionStream<TtsPrediction>> {
        let query = resolve_reference(query).await?;
        self.inner.stream_predict(&query).await
    }

    /// Stream `query` and gather every segment in order.
    pub async fn synthesize_all(&self, query: &TtsQuery) -> Result<Vec<TtsPrediction>> {
        let mut stream = self.stream_predict(query).await?;
        let mut segments = Vec::new();
        while let Some(chunk) = stream.next().await {
            segments.push(chunk?.payload);
        }
        Ok(segments)
    }

    pub async fn check_state(&self) -> ServiceState {
        self.inner.check_state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn local_reference_becomes_absolute() {
        let mut wav = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        wav.write_all(b"RIFF\0\0\0\0WAVE").unwrap();
        let query = TtsQuery::new("hi", wav.path().to_string_lossy());
        let resolved = resolve_reference(&query).await.unwrap();
        assert!(matches!(resolved, Cow::Owned(_)));
        assert!(Path::new(&resolved.refer_wav_path).is_absolute());
    }

    #[tokio::test]
    async fn remote_reference_is_untouched() {
        let query = TtsQuery::new("hi", "refs/speaker.wav");
        let resolved = resolve_reference(&query).await.unwrap();
        assert!(matches!(resolved, Cow::Borrowed(_)));
        let Query::Simple(fields) = encode(&resolved).unwrap() else {
            panic!("tts queries are plain JSON");
        };
        assert_eq!(fields["refer_wav_path"], "refs/speaker.wav");
        assert_eq!(fields["cut_punc"], "，。");
    }

    #[test]
    fn save_uses_container_extension() {
        let dir = tempfile::tempdir().unwrap();
        let pred = TtsPrediction {
            wave_data: b"OggS rest".to_vec(),
            audio_type: AudioFormat::Ogg,
        };
        let path = pred.save(dir.path().join("reply")).unwrap();
        assert_eq!(path.extension().unwrap(), "ogg");
        assert_eq!(std::fs::read(path).unwrap(), b"OggS rest");
    }
}
