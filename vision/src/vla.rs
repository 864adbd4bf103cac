//! ShowUI: given a screenshot and an instruction, predict the GUI actions
//! that carry it out.

use pipeline::{decode, Capability, Framing, Pipeline, PipelineConfig, Query, ServiceState, UNARY_ROUTES};
use serde::{Deserialize, Serialize};

use crate::{Result, IMAGE};

pub const DEFAULT_URL: &str = "http://127.0.0.1:11009";

/// One GUI action, e.g. `CLICK` at a relative `position`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowUiAction {
    pub action: String,
    #[serde(default)]
    pub value: Option<String>,
    /// `[x, y]` relative to the screenshot, each in `0..=1`.
    #[serde(default)]
    pub position: Option<Vec<f64>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowUiQuery {
    pub img_path: String,
    pub query: String,
    /// Environment the screenshot came from, e.g. `web` or `phone`.
    #[serde(default)]
    pub env: Option<String>,
    /// Actions already taken for this instruction.
    #[serde(default)]
    pub history: Vec<ShowUiAction>,
}

impl ShowUiQuery {
    pub fn new(img_path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            img_path: img_path.into(),
            query: query.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowUiPrediction {
    pub actions: Vec<ShowUiAction>,
}

fn encode(query: &ShowUiQuery) -> Result<Query> {
    Query::file(query, vec![IMAGE])
}

pub const SHOW_UI: Capability<ShowUiQuery, ShowUiPrediction> = Capability {
    service: "vla/showui",
    routes: UNARY_ROUTES,
    encode,
    decode: decode::json::<ShowUiPrediction>,
    framing: Framing::Json,
};

#[derive(Clone)]
pub struct ShowUiPipeline {
    inner: Pipeline<ShowUiQuery, ShowUiPrediction>,
}

impl ShowUiPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            inner: Pipeline::new(config, SHOW_UI)?,
        })
    }

    /// Read `SHOWUI_URL` and `SHOWUI_ENABLE`.
    pub fn config_from_env() -> PipelineConfig {
        PipelineConfig::from_env("SHOWUI", DEFAULT_URL)
    }

    pub async fn predict(&self, query: &ShowUiQuery) -> Result<ShowUiPrediction> {
        self.inner.predict(query).await
    }

    pub async fn check_state(&self) -> ServiceState {
        self.inner.check_state().await
    }
}
