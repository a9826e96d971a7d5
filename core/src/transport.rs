//! Default `Transport` backed by ureq.

use std::time::Duration;

use ureq::Agent;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Blocking transport built on a shared `ureq::Agent`.
///
/// The agent is configured with `http_status_as_error(false)` so 4xx/5xx
/// responses come back as data and the client decides what they mean.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// `timeout` of `None` keeps ureq's defaults.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match req.method {
            HttpMethod::Get => self.agent.get(&req.path).with_parts(req).call(),
            HttpMethod::Delete => match &req.body {
                Some(body) => self
                    .agent
                    .delete(&req.path)
                    .force_send_body()
                    .with_parts(req)
                    .send(body.as_bytes()),
                None => self.agent.delete(&req.path).with_parts(req).call(),
            },
            HttpMethod::Post => {
                let builder = self.agent.post(&req.path).with_parts(req);
                match &req.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = self.agent.put(&req.path).with_parts(req);
                match &req.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(map_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(map_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

trait WithParts: Sized {
    fn with_parts(self, req: &HttpRequest) -> Self;
}

impl<B> WithParts for ureq::RequestBuilder<B> {
    fn with_parts(self, req: &HttpRequest) -> Self {
        let builder = req
            .query
            .iter()
            .fold(self, |b, (key, value)| b.query(key.as_str(), value.as_str()));
        req.headers
            .iter()
            .fold(builder, |b, (name, value)| b.header(name.as_str(), value.as_str()))
    }
}

fn map_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Connection(other.to_string()),
    }
}
