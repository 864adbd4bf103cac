use pipeline::{decode, Capability, Framing, Pipeline, PipelineConfig, Query, ServiceState, UNARY_ROUTES};
use serde::{Deserialize, Serialize};

use crate::{Result, IMAGE};

pub const DEFAULT_URL: &str = "http://127.0.0.1:11003";

fn default_prompt() -> String {
    "There".into()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImgCapQuery {
    pub img_path: String,
    /// Text the caption continues from.
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

impl ImgCapQuery {
    pub fn new(img_path: impl Into<String>) -> Self {
        Self {
            img_path: img_path.into(),
            prompt: default_prompt(),
        }
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImgCapPrediction {
    pub caption: String,
    #[serde(default)]
    pub lang: String,
}

fn encode(query: &ImgCapQuery) -> Result<Query> {
    Query::file(query, vec![IMAGE])
}

pub const IMG_CAP: Capability<ImgCapQuery, ImgCapPrediction> = Capability {
    service: "img-cap",
    routes: UNARY_ROUTES,
    encode,
    decode: decode::json::<ImgCapPrediction>,
    framing: Framing::Json,
};

/// Image captioning.
#[derive(Clone)]
pub struct ImgCapPipeline {
    inner: Pipeline<ImgCapQuery, ImgCapPrediction>,
}

impl ImgCapPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            inner: Pipeline::new(config, IMG_CAP)?,
        })
    }

    /// Read `IMG_CAP_URL` and `IMG_CAP_ENABLE`.
    pub fn config_from_env() -> PipelineConfig {
        PipelineConfig::from_env("IMG_CAP", DEFAULT_URL)
    }

    pub async fn predict(&self, query: &ImgCapQuery) -> Result<ImgCapPrediction> {
        self.inner.predict(query).await
    }

    pub async fn check_state(&self) -> ServiceState {
        self.inner.check_state().await
    }
}
