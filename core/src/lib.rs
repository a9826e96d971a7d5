//! Blocking API client core for the fleet fuel-management backend.
//!
//! # Overview
//! `ApiClient` turns resource operations (vehicles, cards, charges, ...) into
//! `HttpRequest` values, hands them to a `Transport`, and normalizes every
//! reply into a uniform `Envelope` or an `ApiError`. The default transport
//! is `UreqTransport`; tests plug in their own.
//!
//! # Design
//! - Session state lives in an explicit `Arc<SessionStore>` shared by all
//!   clones of the client. The bearer token is read at send time.
//! - A 401 answered to the current token clears the session once and fires
//!   the `on_session_expired` callback once, even under concurrent calls.
//! - Two calling conventions coexist: *envelope* (never fails) and *strict*
//!   (`Result<T, ApiError>`). PDF reports use a third, *document*.
//! - `Resource` implements the list/get/create/update/delete family once;
//!   the modules under `resources` pick a convention per operation.

pub mod client;
pub mod config;
pub mod document;
pub mod envelope;
pub mod error;
pub mod http;
pub mod profile;
pub mod resource;
pub mod resources;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{ApiClient, Call};
pub use config::ClientConfig;
pub use document::{Document, DocumentResult};
pub use envelope::{Envelope, Operation, PageInfo};
pub use error::{ApiError, FieldErrors, StorageError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use profile::UserProfile;
pub use resource::{Id, Pagination, Record};
pub use resources::auth::{AuthSession, Credentials, Registration};
pub use resources::ReportPeriod;
pub use session::{ProfileSource, SessionState, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use transport::UreqTransport;
