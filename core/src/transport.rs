//! Executing `HttpRequest`s.
//!
//! `Transport` is the seam between the deterministic core and the network.
//! `UreqTransport` runs each blocking ureq call on tokio's blocking pool so
//! the awaiting operation suspends without stalling other tasks.

use std::future::Future;

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Implementations return non-2xx responses as data; only failures that
/// produce no response at all are errors.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, ApiError>>;
}

/// Transport backed by a shared ureq agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Disables ureq's status-code-as-error behavior so 4xx/5xx responses
    /// come back as data for the core client to interpret.
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || send(&agent, request))
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
    }
}

fn send(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    debug!(method = req.method.as_str(), path = %req.path, "sending request");

    let result = match req.method {
        HttpMethod::Get => with_headers(agent.get(&req.path), &req.headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(&req.path), &req.headers).call(),
        HttpMethod::Post => {
            let builder = with_headers(agent.post(&req.path), &req.headers);
            match &req.body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
        HttpMethod::Put => {
            let builder = with_headers(agent.put(&req.path), &req.headers);
            match &req.body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    };
    let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    debug!(status, "received response");
    Ok(HttpResponse { status, headers, body })
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}
