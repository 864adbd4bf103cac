//! Client for a Milvus vector database fronted by the model server.
//!
//! Texts are embedded server side; this crate only ships rows in and
//! similarity queries out, both as JSON over the shared dispatch core.

use log::debug;
use pipeline::config::{enabled_by_default, env_flag, env_or};
use pipeline::{Route, ServiceClient, ServiceConfig, ServiceState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use pipeline::{PipelineError, Result};

pub const DEFAULT_URL: &str = "http://127.0.0.1:11010";

const INSERT: Route = Route::Named("insert");
const SEARCH: Route = Route::Named("search");
const ROUTES: &[Route] = &[INSERT, SEARCH, Route::State];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilvusConfig {
    #[serde(default = "enabled_by_default")]
    pub enable: bool,
    pub server_url: String,
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl MilvusConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            enable: true,
            server_url: server_url.into(),
        }
    }

    /// Read `MILVUS_URL` and `MILVUS_ENABLE`.
    pub fn from_env() -> Self {
        Self {
            enable: env_flag("MILVUS_ENABLE", true),
            server_url: env_or("MILVUS_URL", DEFAULT_URL),
        }
    }
}

impl ServiceConfig for MilvusConfig {
    fn enabled(&self) -> bool {
        self.enable
    }

    fn server_url(&self) -> &str {
        &self.server_url
    }
}

/// A text to embed and store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertRow {
    pub id: i64,
    pub text: String,
    /// Free-form tag to filter on, e.g. who said it.
    pub subject: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilvusInsert {
    pub collection_name: String,
    pub texts: Vec<InsertRow>,
    /// Recreate the collection before inserting.
    #[serde(default)]
    pub drop_if_exists: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilvusInsertResult {
    pub insert_count: u64,
    #[serde(default)]
    pub ids: Vec<i64>,
}

fn default_limit() -> u32 {
    10
}

fn default_output_fields() -> Vec<String> {
    vec!["text".into(), "subject".into()]
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilvusQuery {
    pub collection_name: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_output_fields")]
    pub output_fields: Vec<String>,
    pub query: String,
}

impl MilvusQuery {
    pub fn new(collection_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            limit: default_limit(),
            output_fields: default_output_fields(),
            query: query.into(),
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// A stored row close to the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    pub id: i64,
    pub distance: f64,
    /// The requested `output_fields` of the row.
    #[serde(default)]
    pub entity: Map<String, Value>,
}

impl QueryRow {
    /// `entity[field]` as a string, when it is one.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.entity.get(field).and_then(Value::as_str)
    }
}

/// Hits per query text, nearest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MilvusQueryResult {
    pub result: Vec<Vec<QueryRow>>,
}

#[derive(Clone)]
pub struct MilvusPipeline {
    client: ServiceClient,
}

impl MilvusPipeline {
    pub fn new(config: &MilvusConfig) -> Result<Self> {
        Ok(Self {
            client: ServiceClient::new(config, "milvus", ROUTES)?,
        })
    }

    pub fn from_client(client: ServiceClient) -> Self {
        Self { client }
    }

    pub async fn insert(&self, insert: &MilvusInsert) -> Result<MilvusInsertResult> {
        debug!(
            "inserting {} rows into {}",
            insert.texts.len(),
            insert.collection_name
        );
        self.client.post_json(INSERT, insert).await
    }

    pub async fn search(&self, query: &MilvusQuery) -> Result<MilvusQueryResult> {
        self.client.post_json(SEARCH, query).await
    }

    pub async fn check_state(&self) -> ServiceState {
        self.client.check_state().await
    }
}
