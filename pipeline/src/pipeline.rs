//! The dispatch core shared by every model service.
//!
//! A concrete service is a [`Capability`] record: its name, the routes it
//! offers, how its query becomes a wire [`Query`], and how a response body
//! becomes its prediction. [`Pipeline`] composes that record with a
//! validated [`ServiceClient`].

use std::fmt;
use std::sync::Arc;

use reqwest::Method;

use crate::client::ServiceClient;
use crate::config::ServiceConfig;
use crate::decode::Framing;
use crate::diagnose;
use crate::error::Result;
use crate::payload::Query;
use crate::route::Route;
use crate::state::ServiceState;
use crate::stream::{self, PredictionStream};
use crate::transport::Transport;

/// Routes of a service that predicts both unary and streamed.
pub const STREAMING_ROUTES: &[Route] = &[Route::Predict, Route::StreamPredict, Route::State];
/// Routes of a service that only predicts unary.
pub const UNARY_ROUTES: &[Route] = &[Route::Predict, Route::State];

/// Per-service specialization of the dispatch core.
pub struct Capability<Q, P> {
    /// Path segment under the server's base URL, e.g. `asr` or `vla/showui`.
    pub service: &'static str,
    pub routes: &'static [Route],
    pub encode: fn(&Q) -> Result<Query>,
    pub decode: fn(&[u8]) -> Result<P>,
    /// How streamed bodies are split into elements.
    pub framing: Framing,
}

impl<Q, P> Clone for Capability<Q, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Q, P> Copy for Capability<Q, P> {}

impl<Q, P> fmt::Debug for Capability<Q, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("service", &self.service)
            .field("routes", &self.routes)
            .field("framing", &self.framing)
            .finish()
    }
}

/// Client for one model service.
pub struct Pipeline<Q, P> {
    capability: Capability<Q, P>,
    client: ServiceClient,
}

impl<Q, P> Clone for Pipeline<Q, P> {
    fn clone(&self) -> Self {
        Self {
            capability: self.capability,
            client: self.client.clone(),
        }
    }
}

impl<Q, P> Pipeline<Q, P>
where
    P: Send + 'static,
{
    /// Fails with a config error when the service is disabled or any of its
    /// routes is not an http(s) URL.
    pub fn new(config: &impl ServiceConfig, capability: Capability<Q, P>) -> Result<Self> {
        let client = ServiceClient::new(config, capability.service, capability.routes)?;
        Ok(Self { capability, client })
    }

    pub fn with_transport(
        config: &impl ServiceConfig,
        capability: Capability<Q, P>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let client = ServiceClient::with_transport(
            config,
            capability.service,
            capability.routes,
            transport,
        )?;
        Ok(Self { capability, client })
    }

    pub fn capability(&self) -> &Capability<Q, P> {
        &self.capability
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    /// Encode, POST to `predict`, decode.
    pub async fn predict(&self, query: &Q) -> Result<P> {
        match (self.capability.encode)(query) {
            Ok(q) => self.predict_query(q).await,
            Err(e) => Err(diagnose::inspect(e)),
        }
    }

    /// [`Pipeline::predict`] for an already encoded query.
    pub async fn predict_query(&self, query: Query) -> Result<P> {
        let result = async {
            let body = self.client.call(Method::POST, Route::Predict, query).await?;
            (self.capability.decode)(&body)
        }
        .await;
        diagnose::resolve(result)
    }

    /// Encode, open `stream-predict`, and return the decoded chunks as a
    /// lazy stream. Nothing past the response status is read until the
    /// caller polls.
    pub async fn stream_predict(&self, query: &Q) -> Result<PredictionStream<P>> {
        match (self.capability.encode)(query) {
            Ok(q) => self.stream_query(q).await,
            Err(e) => Err(diagnose::inspect(e)),
        }
    }

    /// [`Pipeline::stream_predict`] for an already encoded query.
    pub async fn stream_query(&self, query: Query) -> Result<PredictionStream<P>> {
        let result = self
            .client
            .open_stream(Method::GET, Route::StreamPredict, query)
            .await
            .map(|body| stream::predictions(body, self.capability.framing, self.capability.decode));
        diagnose::resolve(result)
    }

    /// Probe the service. Never fails; see [`ServiceClient::check_state`].
    pub async fn check_state(&self) -> ServiceState {
        self.client.check_state().await
    }
}
