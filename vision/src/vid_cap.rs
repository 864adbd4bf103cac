use log::debug;
use pipeline::{decode, diagnose, Capability, Framing, Pipeline, PipelineConfig, PipelineError, Query, ServiceState, UNARY_ROUTES};
use serde::{Deserialize, Serialize};

use crate::Result;

pub const DEFAULT_URL: &str = "http://127.0.0.1:11005";

/// Caption a video. The server reads the file itself, so it must be on a
/// filesystem both sides can see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VidCapQuery {
    pub vid_path: String,
}

impl VidCapQuery {
    pub fn new(vid_path: impl Into<String>) -> Self {
        Self {
            vid_path: vid_path.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VidCapPrediction {
    pub caption: String,
    #[serde(default)]
    pub lang: String,
}

fn encode(query: &VidCapQuery) -> Result<Query> {
    Query::simple(query)
}

pub const VID_CAP: Capability<VidCapQuery, VidCapPrediction> = Capability {
    service: "vid-cap",
    routes: UNARY_ROUTES,
    encode,
    decode: decode::json::<VidCapPrediction>,
    framing: Framing::Json,
};

#[derive(Clone)]
pub struct VidCapPipeline {
    inner: Pipeline<VidCapQuery, VidCapPrediction>,
}

impl VidCapPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            inner: Pipeline::new(config, VID_CAP)?,
        })
    }

    /// Read `VID_CAP_URL` and `VID_CAP_ENABLE`.
    pub fn config_from_env() -> PipelineConfig {
        PipelineConfig::from_env("VID_CAP", DEFAULT_URL)
    }

    /// Fails with [`PipelineError::InvalidQuery`] before sending anything
    /// when `vid_path` does not exist.
    pub async fn predict(&self, query: &VidCapQuery) -> Result<VidCapPrediction> {
        if !tokio::fs::try_exists(&query.vid_path).await.unwrap_or(false) {
            debug!("refusing to caption {}", query.vid_path);
            return Err(diagnose::inspect(PipelineError::InvalidQuery(format!(
                "video does not exist: {}",
                query.vid_path
            ))));
        }
        self.inner.predict(query).await
    }

    pub async fn check_state(&self) -> ServiceState {
        self.inner.check_state().await
    }
}
