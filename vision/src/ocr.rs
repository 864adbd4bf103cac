//! Optical character recognition.
//!
//! The server answers with one [`RegionResult`] per block of text it found.
//! [`stringify`] renders them for a prompt, one numbered line each.

use std::fmt::Write;

use pipeline::{decode, Capability, Framing, Pipeline, PipelineConfig, Query, ServiceState, UNARY_ROUTES};
use serde::{Deserialize, Serialize};

use crate::{Result, IMAGE};

pub const DEFAULT_URL: &str = "http://127.0.0.1:11004";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrQuery {
    pub img_path: String,
}

impl OcrQuery {
    pub fn new(img_path: impl Into<String>) -> Self {
        Self {
            img_path: img_path.into(),
        }
    }
}

/// A corner of a text region, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionResult {
    #[serde(default)]
    pub position: Vec<Position>,
    pub content: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPrediction {
    pub region_results: Vec<RegionResult>,
}

/// Mean confidence over all regions; `0.0` when nothing was recognized.
pub fn avg_confidence(prediction: &OcrPrediction) -> f64 {
    let n = prediction.region_results.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = prediction.region_results.iter().map(|r| r.confidence).sum();
    sum / n as f64
}

/// `[i] content ` lines, newline terminated, in recognition order.
pub fn stringify(regions: &[RegionResult]) -> String {
    let mut out = String::new();
    for (i, region) in regions.iter().enumerate() {
        let _ = writeln!(out, "[{i}] {} ", region.content);
    }
    out
}

fn encode(query: &OcrQuery) -> Result<Query> {
    Query::file(query, vec![IMAGE])
}

pub const OCR: Capability<OcrQuery, OcrPrediction> = Capability {
    service: "ocr",
    routes: UNARY_ROUTES,
    encode,
    decode: decode::json::<OcrPrediction>,
    framing: Framing::Json,
};

#[derive(Clone)]
pub struct OcrPipeline {
    inner: Pipeline<OcrQuery, OcrPrediction>,
}

impl OcrPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            inner: Pipeline::new(config, OCR)?,
        })
    }

    /// Read `OCR_URL` and `OCR_ENABLE`.
    pub fn config_from_env() -> PipelineConfig {
        PipelineConfig::from_env("OCR", DEFAULT_URL)
    }

    pub async fn predict(&self, query: &OcrQuery) -> Result<OcrPrediction> {
        self.inner.predict(query).await
    }

    pub async fn check_state(&self) -> ServiceState {
        self.inner.check_state().await
    }
}
