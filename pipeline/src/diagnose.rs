//! Human-actionable hints for pipeline failures.
//!
//! [`resolve`] wraps every public pipeline entry point. It logs a
//! [`Diagnosis`] when one applies and hands the same error back
//! untouched, so callers always see the failure they would have seen anyway.

use log::error;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PipelineError;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<(html|head|body|div|span|p|a|img|table|tr|td|th|ul|ol|li|form|input|textarea|select|option)[^>]*>",
    )
    .unwrap()
});

/// Known failure signatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagnosis {
    MalformedJson,
    HtmlResponse,
    Connectivity,
    NotFound,
    ServerError,
}

impl Diagnosis {
    pub fn hint(&self) -> &'static str {
        match self {
            Diagnosis::MalformedJson => {
                "decoding error while reading the response. Check the connection to the \
                 model server and whether something intercepts the request (open the URL in a browser)."
            }
            Diagnosis::HtmlResponse => {
                "the server returned an HTML page instead of JSON. The request was likely blocked \
                 by authentication, a proxy, a firewall or a misconfigured reverse proxy."
            }
            Diagnosis::Connectivity => {
                "connectivity error. Check the configured server URL and the network path to it."
            }
            Diagnosis::NotFound => "endpoint not found (HTTP 404). Check the configured server URL.",
            Diagnosis::ServerError => {
                "server-side error (HTTP 500). This is common and usually worth a look at the \
                 model server's own logs."
            }
        }
    }
}

/// Whether `s` contains something that looks like an HTML tag.
pub fn is_html(s: &str) -> bool {
    HTML_TAG.is_match(s)
}

/// Classify `err` without consuming it.
pub fn diagnose(err: &PipelineError) -> Option<Diagnosis> {
    match err {
        PipelineError::Decode { body, .. } | PipelineError::Validation { body, .. }
            if is_html(body) =>
        {
            Some(Diagnosis::HtmlResponse)
        }
        PipelineError::Decode { .. } => Some(Diagnosis::MalformedJson),
        // A body cut off mid-transfer is a dropped connection too.
        PipelineError::Connectivity(e)
            if e.is_connect()
                || e.is_timeout()
                || e.is_request()
                || e.is_body()
                || e.is_decode() =>
        {
            Some(Diagnosis::Connectivity)
        }
        PipelineError::Http { status: 404, .. } => Some(Diagnosis::NotFound),
        PipelineError::Http { status: 500, .. } => Some(Diagnosis::ServerError),
        _ => None,
    }
}

/// Log the diagnosis for `err`, if any, and return it unchanged.
pub fn inspect(err: PipelineError) -> PipelineError {
    if let Some(d) = diagnose(&err) {
        error!("{err}: {}", d.hint());
    }
    err
}

/// Pass `result` through, logging a diagnosis on the error path.
pub fn resolve<T>(result: Result<T, PipelineError>) -> Result<T, PipelineError> {
    result.map_err(inspect)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_err(body: &str) -> PipelineError {
        let err = serde_json::from_str::<serde_json::Value>(body).unwrap_err();
        PipelineError::from_json(err, body.as_bytes())
    }

    #[test]
    fn html_detection() {
        assert!(is_html("<html><body>403 Forbidden</body></html>"));
        assert!(is_html("oops <div class=\"err\">"));
        assert!(!is_html("{\"response\": \"a < b\"}"));
    }

    #[test]
    fn html_body_wins_over_malformed_json() {
        let err = decode_err("<html><head><title>502</title></head></html>");
        assert_eq!(diagnose(&err), Some(Diagnosis::HtmlResponse));
        assert_eq!(diagnose(&decode_err("{\"a\":")), Some(Diagnosis::MalformedJson));
    }

    #[test]
    fn http_statuses() {
        let not_found = PipelineError::Http { status: 404, body: String::new() };
        let server = PipelineError::Http { status: 500, body: String::new() };
        let teapot = PipelineError::Http { status: 418, body: String::new() };
        assert_eq!(diagnose(&not_found), Some(Diagnosis::NotFound));
        assert_eq!(diagnose(&server), Some(Diagnosis::ServerError));
        assert_eq!(diagnose(&teapot), None);
    }

    #[test]
    fn resolve_keeps_the_error() {
        let res: Result<(), _> = resolve(Err(PipelineError::Http {
            status: 404,
            body: "missing".into(),
        }));
        match res {
            Err(PipelineError::Http { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "missing");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(resolve(Ok::<_, PipelineError>(3)).unwrap(), 3);
    }
}
