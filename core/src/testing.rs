//! Scripted transport for unit tests.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, Transport};

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// Answers every request with a closure and records what was sent.
pub(crate) struct ScriptedTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always reply with `status` and the JSON `body`.
    pub(crate) fn replying(status: u16, body: Value) -> Arc<Self> {
        Self::new(move |_| Ok(HttpResponse::json(status, &body)))
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

/// A client over `transport` with an empty in-memory session.
pub(crate) fn client_with(transport: Arc<ScriptedTransport>) -> crate::client::ApiClient {
    crate::client::ApiClient::with_transport(
        crate::config::ClientConfig::new("http://fleet.test/api"),
        Arc::new(crate::session::SessionStore::in_memory()),
        transport,
    )
}

/// A transport that answers `{"success": true}` to everything.
pub(crate) fn accepting() -> Arc<ScriptedTransport> {
    ScriptedTransport::replying(200, serde_json::json!({"success": true}))
}
