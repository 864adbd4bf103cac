//! Endpoint resolution for a service.
//!
//! A service named `asr` served from `http://host:11001` exposes
//! `http://host:11001/asr/predict`, `.../asr/stream-predict` and
//! `.../asr/state`. A [`RouteMap`] is built and validated once; it is never
//! mutated afterwards.

use std::collections::HashMap;
use std::fmt;

use url::Url;

use crate::error::{PipelineError, Result};

/// A named operation offered by a remote service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Predict,
    StreamPredict,
    State,
    /// Service-specific route such as `insert` or `search`.
    Named(&'static str),
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Predict => "predict",
            Route::StreamPredict => "stream-predict",
            Route::State => "state",
            Route::Named(name) => *name,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse `url` and accept it only if it is an absolute http/https URL.
pub fn validate(url: &str) -> Result<Url> {
    let parsed =
        Url::parse(url).map_err(|e| PipelineError::Config(format!("invalid URL {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(PipelineError::Config(format!(
            "invalid URL {url:?}: scheme {other:?} is not http or https"
        ))),
    }
}

/// Join the relative `path` onto `base`, keeping any path prefix on `base`.
pub fn join(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let prefixed = format!("{}/", base.path());
        base.set_path(&prefixed);
    }
    let joined = base
        .join(path.trim_start_matches('/'))
        .map_err(|e| PipelineError::Config(format!("cannot join {path:?} onto {base}: {e}")))?;
    validate(joined.as_str())
}

/// `<base>/<service>/<route>`.
pub fn resolve(base: &Url, service: &str, route: Route) -> Result<Url> {
    join(base, &format!("{}/{}", service.trim_matches('/'), route.name()))
}

/// Resolved endpoints for one service.
#[derive(Clone, Debug)]
pub struct RouteMap {
    service: String,
    urls: HashMap<Route, Url>,
}

impl RouteMap {
    /// Resolve every route in `routes` against `server_url`. Fails with
    /// [`PipelineError::Config`] on the first unusable URL; no network I/O.
    pub fn build(server_url: &str, service: &str, routes: &[Route]) -> Result<Self> {
        let base = validate(server_url)?;
        let mut urls = HashMap::with_capacity(routes.len());
        for route in routes {
            urls.insert(*route, resolve(&base, service, *route)?);
        }
        Ok(Self {
            service: service.to_string(),
            urls,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn get(&self, route: Route) -> Result<&Url> {
        self.urls.get(&route).ok_or_else(|| {
            PipelineError::Unsupported(format!("{} has no {route} route", self.service))
        })
    }

    pub fn contains(&self, route: Route) -> bool {
        self.urls.contains_key(&route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_service_routes() {
        let map = RouteMap::build(
            "http://127.0.0.1:11001",
            "asr",
            &[Route::Predict, Route::StreamPredict, Route::State],
        )
        .unwrap();
        assert_eq!(
            map.get(Route::Predict).unwrap().as_str(),
            "http://127.0.0.1:11001/asr/predict"
        );
        assert_eq!(
            map.get(Route::StreamPredict).unwrap().as_str(),
            "http://127.0.0.1:11001/asr/stream-predict"
        );
        assert_eq!(map.get(Route::State).unwrap().as_str(), "http://127.0.0.1:11001/asr/state");
    }

    #[test]
    fn keeps_base_path_and_nested_service() {
        let map = RouteMap::build("https://gw.example/zerolan", "vla/showui", &[Route::Predict])
            .unwrap();
        assert_eq!(
            map.get(Route::Predict).unwrap().as_str(),
            "https://gw.example/zerolan/vla/showui/predict"
        );
    }

    #[test]
    fn rejects_bad_urls() {
        for bad in ["", "127.0.0.1:11001", "ftp://host/x", "not a url"] {
            assert!(
                matches!(RouteMap::build(bad, "llm", &[Route::State]), Err(PipelineError::Config(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn missing_route_is_unsupported() {
        let map = RouteMap::build("http://localhost:1", "ocr", &[Route::Predict]).unwrap();
        assert!(!map.contains(Route::StreamPredict));
        assert!(matches!(map.get(Route::StreamPredict), Err(PipelineError::Unsupported(_))));
    }
}
