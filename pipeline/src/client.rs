use std::sync::Arc;

use bytes::Bytes;
use log::{info, warn};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::ServiceConfig;
use crate::decode;
use crate::diagnose;
use crate::error::{PipelineError, Result};
use crate::payload::{self, Payload, Query};
use crate::route::{Route, RouteMap};
use crate::state::ServiceState;
use crate::transport::{ByteStream, HttpTransport, Request, Transport};

/// Validated endpoints plus a transport, for one remote service.
///
/// Holds no per-call state, so one client can serve concurrent callers.
#[derive(Clone)]
pub struct ServiceClient {
    routes: RouteMap,
    transport: Arc<dyn Transport>,
    api_key: Option<String>,
}

impl ServiceClient {
    /// Check that the service is enabled and every route resolves to an
    /// http(s) URL. No request is made.
    pub fn new(config: &impl ServiceConfig, service: &str, routes: &[Route]) -> Result<Self> {
        Self::with_transport(config, service, routes, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(
        config: &impl ServiceConfig,
        service: &str,
        routes: &[Route],
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        if !config.enabled() {
            return Err(PipelineError::Config(format!(
                "the {service} pipeline is disabled in your config"
            )));
        }
        let routes = RouteMap::build(config.server_url(), service, routes)?;
        info!("{service} pipeline ready at {}", config.server_url());
        Ok(Self {
            routes,
            transport,
            api_key: config.api_key().map(str::to_string),
        })
    }

    pub fn service(&self) -> &str {
        self.routes.service()
    }

    pub fn url(&self, route: Route) -> Result<&Url> {
        self.routes.get(route)
    }

    pub fn has_route(&self, route: Route) -> bool {
        self.routes.contains(route)
    }

    fn request(&self, method: Method, route: Route, payload: Payload) -> Result<Request> {
        let url = self.routes.get(route)?.clone();
        Ok(Request::new(method, url, payload).bearer(self.api_key.clone()))
    }

    /// Encode `query`, send it to `route` and return the body of a 2xx reply.
    pub async fn call(&self, method: Method, route: Route, query: Query) -> Result<Bytes> {
        self.routes.get(route)?;
        let payload = payload::encode(query).await?;
        let res = self.transport.send(self.request(method, route, payload)?).await?;
        decode::check_status(res.status, &res.body)?;
        Ok(res.body)
    }

    /// Encode `query` and open a streamed reply from `route`.
    pub async fn open_stream(&self, method: Method, route: Route, query: Query) -> Result<ByteStream> {
        self.routes.get(route)?;
        let payload = payload::encode(query).await?;
        self.transport.stream(self.request(method, route, payload)?).await
    }

    /// POST `body` as JSON to `route` and decode the JSON reply.
    pub async fn post_json<B, T>(&self, route: Route, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let result = async {
            let bytes = self.call(Method::POST, route, Query::simple(body)?).await?;
            decode::json(&bytes)
        }
        .await;
        diagnose::resolve(result)
    }

    /// Probe the `state` route. Never fails: anything that goes wrong is
    /// reported as an unknown state carrying the failure's message.
    pub async fn check_state(&self) -> ServiceState {
        let result = async {
            let request = self.request(Method::GET, Route::State, Payload::Empty)?;
            let res = self.transport.send(request).await?;
            decode::check_status(res.status, &res.body)?;
            decode::json::<ServiceState>(&res.body)
        }
        .await;
        match result {
            Ok(state) => state,
            Err(e) => {
                match e.diagnosis() {
                    Some(d) => warn!("{} state probe failed: {e}: {}", self.service(), d.hint()),
                    None => warn!("{} state probe failed: {e}", self.service()),
                }
                ServiceState::unknown(e.to_string())
            }
        }
    }
}
