//! HTTP exchange with a model server.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
pub use reqwest::Method;
use url::Url;

use crate::error::{PipelineError, Result};
use crate::payload::{Payload, JSON_FIELD};

/// Body chunks in the order the server flushed them.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A fully encoded request.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub payload: Payload,
    /// Sent as `Authorization: Bearer ...` when set.
    pub bearer: Option<String>,
}

impl Request {
    pub fn new(method: Method, url: Url, payload: Payload) -> Self {
        Self {
            method,
            url,
            payload,
            bearer: None,
        }
    }

    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// Status and complete body of a unary exchange.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

/// Performs requests. The default is [`HttpTransport`]; tests and alternate
/// backends may supply their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// One round trip: send, then wait for the whole body.
    async fn send(&self, request: Request) -> Result<Response>;

    /// Send, check the status once, then hand out body chunks lazily. A
    /// non-2xx status fails here, before any chunk is produced.
    async fn stream(&self, request: Request) -> Result<ByteStream>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, request: Request) -> reqwest::RequestBuilder {
        debug!("{} {}", request.method, request.url);
        let mut builder = self.client.request(request.method, request.url);
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        match request.payload {
            Payload::Empty => builder,
            Payload::Json(value) => builder.json(&value),
            Payload::Multipart { json, attachments } => {
                let mut form = Form::new().text(JSON_FIELD, json);
                for attachment in attachments {
                    let mut part = Part::bytes(attachment.bytes);
                    if let Some(name) = attachment.file_name {
                        part = part.file_name(name);
                    }
                    form = form.part(attachment.part, part);
                }
                builder.multipart(form)
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let res = self.build(request).send().await?;
        let status = res.status().as_u16();
        let body = res.bytes().await?;
        Ok(Response { status, body })
    }

    async fn stream(&self, request: Request) -> Result<ByteStream> {
        let res = self.build(request).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let chunks = res
            .bytes_stream()
            .map(|chunk| chunk.map_err(PipelineError::from));
        Ok(Box::pin(chunks))
    }
}
