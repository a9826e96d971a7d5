//! The configured HTTP entry point shared by every resource module.
//!
//! # Design
//! `ApiClient` owns the transport, the base URL and a handle to the shared
//! `SessionStore`. Every request goes through `send`, which:
//!
//! 1. reads the token from the session *at send time* and attaches it as a
//!    bearer credential;
//! 2. executes the request through the `Transport`;
//! 3. on a 401, asks the session to expire the token the request carried and,
//!    if that call is the one that ended the session, fires the
//!    session-expired callback. Concurrent 401s therefore clear the session
//!    and notify the host exactly once.
//!
//! Everything else is passed through untouched. Callers pick a convention
//! with `Call::envelope`, `Call::strict` or `Call::document`.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::document::{to_document, DocumentResult, PDF_CONTENT_TYPE};
use crate::envelope::{normalize, Envelope, Operation};
use crate::error::{ApiError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::session::SessionStore;
use crate::transport::UreqTransport;

type ExpiredCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    on_session_expired: Option<ExpiredCallback>,
}

impl ApiClient {
    /// A client using the default ureq transport.
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout));
        Self::with_transport(config, session, transport)
    }

    pub fn with_transport(
        config: ClientConfig,
        session: Arc<SessionStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            transport,
            session,
            on_session_expired: None,
        }
    }

    /// Register the hook that runs when a 401 ends the session.
    ///
    /// The host decides what "go to login" means; the client only emits.
    pub fn on_session_expired(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Build a request for `path` relative to the base URL.
    pub fn build(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.config.url(path))
    }

    /// Execute `request` with the current credentials and run the
    /// unauthorized handling.
    pub fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let token = self.session.token();
        if let Some(token) = &token {
            request
                .headers
                .push(("authorization".to_string(), format!("Bearer {token}")));
        }
        if request.header("accept").is_none() {
            request
                .headers
                .push(("accept".to_string(), "application/json".to_string()));
        }

        debug!(
            method = request.method.as_str(),
            url = %request.path,
            authenticated = token.is_some(),
            "Sending request"
        );
        let response = self.transport.execute(&request).inspect_err(|e| {
            warn!(
                method = request.method.as_str(),
                url = %request.path,
                error = %e,
                "Transport error"
            );
        })?;
        debug!(status = response.status, url = %request.path, "Response received");

        if response.status == 401 {
            self.handle_unauthorized(token.as_deref());
        }
        Ok(response)
    }

    fn handle_unauthorized(&self, sent_token: Option<&str>) {
        if !self.session.expire(sent_token) {
            debug!("Unauthorized response for an already-ended session");
            return;
        }
        info!("Session expired by the backend");
        if let Some(callback) = &self.on_session_expired {
            callback();
        }
    }

    /// Start a call. The request is only sent when a convention is chosen.
    pub fn call(&self, method: HttpMethod, path: &str, op: Operation) -> Call<'_> {
        Call {
            client: self,
            request: Ok(self.build(method, path)),
            op,
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("on_session_expired", &self.on_session_expired.is_some())
            .finish()
    }
}

/// A prepared request plus the texts used if it fails.
///
/// Builder errors (payload encoding) are held until a convention is chosen
/// so they surface through that convention like any other failure.
#[must_use = "a call does nothing until a convention is chosen"]
pub struct Call<'a> {
    client: &'a ApiClient,
    request: Result<HttpRequest, ApiError>,
    op: Operation,
}

impl<'a> Call<'a> {
    pub fn query<F: Serialize + ?Sized>(mut self, filter: &F) -> Self {
        self.request = self.request.and_then(|r| r.with_query(filter));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.request = self.request.and_then(|r| r.with_json(body));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.request = self.request.map(|r| r.with_header(name, value));
        self
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    /// The request as it will be handed to `send`, before credentials.
    pub fn request(&self) -> Result<&HttpRequest, &ApiError> {
        self.request.as_ref()
    }

    /// Strict convention, returning the whole successful envelope.
    pub fn strict_envelope<T: DeserializeOwned>(self) -> Result<Envelope<T>, ApiError> {
        let request = self.request?;
        normalize(self.client.send(request), &self.op)
    }

    /// Strict convention: the envelope's `data`, or the failure as an error.
    ///
    /// A missing `data` decodes as JSON `null`, which suits `Value`, `()` and
    /// `Option<_>` targets and is a `MalformedResponse` for anything else.
    pub fn strict<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let fallback = self.op.fallback.clone();
        let envelope: Envelope<Value> = self.strict_envelope()?;
        serde_json::from_value(envelope.data.unwrap_or(Value::Null)).map_err(|e| {
            warn!(error = %e, "Response data has an unexpected shape");
            ApiError::MalformedResponse { message: fallback }
        })
    }

    /// Envelope convention: always an `Envelope`, never an error.
    pub fn envelope<T: DeserializeOwned>(self) -> Envelope<T> {
        self.strict_envelope().unwrap_or_else(Envelope::from_error)
    }

    /// Document convention for PDF report endpoints.
    pub fn document(self) -> DocumentResult {
        let call = self.header("accept", &format!("{PDF_CONTENT_TYPE}, application/json"));
        match call.request {
            Ok(request) => to_document(call.client.send(request)),
            Err(e) => DocumentResult {
                success: false,
                message: e.to_string(),
                file: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    use serde_json::json;

    use super::*;
    use crate::profile::UserProfile;
    use crate::testing::ScriptedTransport;

    fn op() -> Operation {
        Operation::new("An error occurred while fetching vehicles", "Vehicle not found")
    }

    fn client(transport: Arc<ScriptedTransport>) -> ApiClient {
        ApiClient::with_transport(
            ClientConfig::new("http://fleet.test/api"),
            Arc::new(SessionStore::in_memory()),
            transport,
        )
    }

    fn profile() -> UserProfile {
        UserProfile::from_value(json!({"id": 1, "name": "Ana", "lastname": "Lopez"})).unwrap()
    }

    #[test]
    fn anonymous_request_has_no_authorization() {
        let transport = ScriptedTransport::replying(200, json!({"success": true}));
        let client = client(transport.clone());
        let _: Envelope = client.call(HttpMethod::Get, "/vehiculos", op()).envelope();

        let sent = transport.last_request();
        assert_eq!(sent.path, "http://fleet.test/api/vehiculos");
        assert!(sent.header("authorization").is_none());
        assert_eq!(sent.header("accept"), Some("application/json"));
    }

    #[test]
    fn token_is_read_at_send_time() {
        let transport = ScriptedTransport::replying(200, json!({"success": true}));
        let client = client(transport.clone());

        let call = client.call(HttpMethod::Get, "/vehiculos", op());
        client.session().establish("first", profile());
        let _: Envelope = call.envelope();
        assert_eq!(transport.last_request().header("authorization"), Some("Bearer first"));

        client.session().clear();
        let _: Envelope = client.call(HttpMethod::Get, "/vehiculos", op()).envelope();
        assert!(transport.last_request().header("authorization").is_none());
    }

    #[test]
    fn unauthorized_clears_session_and_notifies_once() {
        let transport = ScriptedTransport::replying(401, json!({"message": "Unauthenticated."}));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let client = client(transport).on_session_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        client.session().establish("tok", profile());

        let env: Envelope = client.call(HttpMethod::Get, "/vehiculos", op()).envelope();
        assert!(!env.success);
        assert_eq!(env.message(), "Unauthenticated.");
        assert!(client.session().token().is_none());

        let _: Envelope = client.call(HttpMethod::Get, "/vehiculos", op()).envelope();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_unauthorized_replies_notify_once() {
        let barrier = Arc::new(Barrier::new(2));
        let gate = Arc::clone(&barrier);
        // Both requests are in flight with the same token before either
        // response is handled.
        let transport = ScriptedTransport::new(move |_| {
            gate.wait();
            Ok(HttpResponse::json(401, &json!({"message": "Unauthenticated."})))
        });
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let client = client(transport).on_session_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        client.session().establish("tok", profile());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let client = client.clone();
                std::thread::spawn(move || {
                    let env: Envelope = client.call(HttpMethod::Get, "/vehiculos", op()).envelope();
                    env.success
                })
            })
            .collect();
        for handle in handles {
            assert!(!handle.join().unwrap());
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(client.session().token().is_none());
    }

    #[test]
    fn stale_unauthorized_does_not_end_a_new_session() {
        let transport = ScriptedTransport::replying(401, json!({}));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let client = client(transport).on_session_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        // A 401 for a request sent anonymously, e.g. a failed login.
        let _: Envelope = client.call(HttpMethod::Post, "/login", op()).envelope();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn strict_returns_data_or_error() {
        let transport =
            ScriptedTransport::replying(200, json!({"success": true, "data": {"id": 9}}));
        let client = client(transport);
        let data: Value = client.call(HttpMethod::Get, "/vehiculos/9", op()).strict().unwrap();
        assert_eq!(data["id"], 9);

        let transport = ScriptedTransport::replying(404, json!({}));
        let client = self::client(transport);
        let err = client
            .call(HttpMethod::Get, "/vehiculos/9", op())
            .strict::<Value>()
            .unwrap_err();
        assert_eq!(err.to_string(), "Vehicle not found");
    }

    #[test]
    fn strict_preserves_validation_detail() {
        let transport = ScriptedTransport::replying(422, json!({"errors": {"name": ["required"]}}));
        let client = client(transport);
        let err = client
            .call(HttpMethod::Post, "/users", op())
            .json(&json!({}))
            .strict::<Value>()
            .unwrap_err();
        assert_eq!(err.field_errors().unwrap()["name"], vec!["required".to_string()]);
    }

    #[test]
    fn query_and_body_reach_the_transport() {
        let transport = ScriptedTransport::replying(200, json!({"success": true}));
        let client = client(transport.clone());
        let _: Envelope = client
            .call(HttpMethod::Delete, "/carga-combustibles/3", op())
            .query(&json!({"page": 1, "search": null}))
            .json(&json!({"deletion_reason": "duplicate"}))
            .envelope();

        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Delete);
        assert_eq!(sent.query, vec![("page".to_string(), "1".to_string())]);
        assert_eq!(sent.body.as_deref(), Some(r#"{"deletion_reason":"duplicate"}"#));
    }

    #[test]
    fn document_asks_for_pdf() {
        let transport = ScriptedTransport::new(|_| {
            Ok(HttpResponse {
                status: 200,
                headers: vec![("content-type".to_string(), "application/pdf".to_string())],
                body: b"%PDF".to_vec(),
            })
        });
        let client = client(transport.clone());
        let result = client.call(HttpMethod::Get, "/vehiculos/reportes/cdt", op()).document();
        assert!(result.success);
        assert_eq!(
            transport.last_request().header("accept"),
            Some("application/pdf, application/json")
        );
    }

    #[test]
    fn transport_timeout_becomes_fallback_envelope() {
        let transport = ScriptedTransport::new(|_| Err(TransportError::Timeout));
        let client = client(transport);
        let env: Envelope<Vec<Value>> = client.call(HttpMethod::Get, "/vehiculos", op()).envelope();
        assert!(!env.success);
        assert_eq!(env.message(), "An error occurred while fetching vehicles");
    }
}
