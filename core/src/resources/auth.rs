//! Login, registration, logout and the current user's profile.
//!
//! Convention: strict. `logout` is the exception and never fails; the local
//! session is cleared whatever the backend answers.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::envelope::Operation;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::profile::UserProfile;
use crate::resource::Record;
use crate::session::ProfileSource;

const LOGIN_FAILED: &str = "Invalid credentials";
const REGISTER_FAILED: &str = "Registration failed. Please try again.";
const LOGOUT_FAILED: &str = "An error occurred while logging out";
const PROFILE_FAILED: &str = "An error occurred while fetching the profile";
const PROFILE_UPDATE_FAILED: &str = "An error occurred while updating the profile";
const MISSING_TOKEN: &str = "No authentication token was received";
const MALFORMED_REPLY: &str = "Invalid response format from server";

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Credentials returned by login and registration.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

pub struct Auth<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn auth(&self) -> Auth<'_> {
        Auth { client: self }
    }

    /// Load the current profile into the session.
    pub fn load_profile(&self) -> Result<UserProfile, ApiError> {
        self.session().load_profile(self)
    }

    /// Token presence, loading the profile first when it is not cached.
    pub fn ensure_authenticated(&self) -> bool {
        self.session().ensure_authenticated(self)
    }
}

impl ProfileSource for ApiClient {
    fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.auth().profile()
    }
}

impl Auth<'_> {
    /// `POST /login`. On success the token and user are stored in the session.
    pub fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        let data: Value = self
            .client
            .call(HttpMethod::Post, "/login", Operation::new(LOGIN_FAILED, LOGIN_FAILED))
            .json(credentials)
            .strict()?;

        let token = token_from(&data).ok_or_else(|| ApiError::MalformedResponse {
            message: MISSING_TOKEN.to_string(),
        })?;
        let user = match data.get("user") {
            Some(user) if user.is_object() => profile_from(user.clone())?,
            _ => UserProfile::default(),
        };
        self.client.session().establish(&token, user.clone());
        info!(user_id = ?user.id, "Logged in");
        Ok(AuthSession { token, user })
    }

    /// `POST /register`. Logs the new user in.
    ///
    /// Validation failures are summarized as `field: msg, msg; field: msg`
    /// while the per-field detail stays on the error.
    pub fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        let data: Value = self
            .client
            .call(
                HttpMethod::Post,
                "/register",
                Operation::new(REGISTER_FAILED, REGISTER_FAILED),
            )
            .json(registration)
            .strict()
            .map_err(|e| match e {
                ApiError::Validation { errors, .. } => ApiError::Validation {
                    message: summarize(&errors),
                    errors,
                },
                other => other,
            })?;

        let malformed = || ApiError::MalformedResponse {
            message: MALFORMED_REPLY.to_string(),
        };
        let token = token_from(&data).ok_or_else(malformed)?;
        let user = match data.get("user") {
            Some(user) if user.is_object() => profile_from(user.clone())?,
            _ => return Err(malformed()),
        };
        self.client.session().establish(&token, user.clone());
        info!(user_id = ?user.id, "Registered");
        Ok(AuthSession { token, user })
    }

    /// `POST /logout`, then clear the local session regardless of the reply.
    pub fn logout(&self) {
        let result = self
            .client
            .call(HttpMethod::Post, "/logout", Operation::new(LOGOUT_FAILED, LOGOUT_FAILED))
            .strict_envelope::<Value>();
        if let Err(e) = result {
            warn!(error = %e, "Logout request failed");
        }
        self.client.session().clear();
    }

    /// `GET /user`: the authenticated user's profile with display fields.
    pub fn profile(&self) -> Result<UserProfile, ApiError> {
        let data: Value = self
            .client
            .call(HttpMethod::Get, "/user", Operation::new(PROFILE_FAILED, PROFILE_FAILED))
            .strict()?;
        profile_from(data)
    }

    /// `PUT /user/profile`. When the reply carries `user`, the session's
    /// cached and persisted profile is replaced with it.
    pub fn update_profile<B: Serialize + ?Sized>(&self, changes: &B) -> Result<Record, ApiError> {
        let data: Value = self
            .client
            .call(
                HttpMethod::Put,
                "/user/profile",
                Operation::new(PROFILE_UPDATE_FAILED, PROFILE_UPDATE_FAILED),
            )
            .json(changes)
            .strict()?;
        if let Some(user) = data.get("user").filter(|u| u.is_object()) {
            let profile = profile_from(user.clone())?;
            self.client.session().update_profile(profile);
        }
        Ok(data)
    }
}

fn token_from(data: &Value) -> Option<String> {
    data.get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn profile_from(value: Value) -> Result<UserProfile, ApiError> {
    UserProfile::from_value(value).map_err(|e| {
        warn!(error = %e, "Profile has an unexpected shape");
        ApiError::MalformedResponse {
            message: MALFORMED_REPLY.to_string(),
        }
    })
}

fn summarize(errors: &crate::error::FieldErrors) -> String {
    let summary = errors
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ");
    if summary.is_empty() {
        "Validation failed".to_string()
    } else {
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::ClientConfig;
    use crate::http::HttpResponse;
    use crate::session::{SessionState, SessionStore};
    use crate::testing::ScriptedTransport;

    fn client(transport: Arc<ScriptedTransport>) -> ApiClient {
        ApiClient::with_transport(
            ClientConfig::new("http://fleet.test/api"),
            Arc::new(SessionStore::in_memory()),
            transport,
        )
    }

    fn registration() -> Registration {
        Registration {
            name: "Ana".into(),
            lastname: "Lopez".into(),
            email: "ana@example.com".into(),
            phone: "555".into(),
            password: "secret".into(),
            password_confirmation: "secret".into(),
        }
    }

    #[test]
    fn login_establishes_the_session() {
        let transport = ScriptedTransport::replying(
            200,
            json!({
                "success": true,
                "data": {"token": "t-1", "user": {"id": 1, "name": "Ana", "lastname": "Lopez"}}
            }),
        );
        let client = client(transport.clone());
        let session = client.auth().login(&Credentials::new("ana", "secret")).unwrap();

        assert_eq!(session.token, "t-1");
        assert_eq!(session.user.initials, "AL");
        assert_eq!(client.session().token().as_deref(), Some("t-1"));
        assert_eq!(client.session().state(), SessionState::Authenticated);

        let sent = transport.last_request();
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "ana", "password": "secret"}));
    }

    #[test]
    fn login_accepts_loosely_typed_user_fields() {
        let client = client(ScriptedTransport::replying(
            200,
            json!({"data": {"token": "t-2", "user": {"id": "9", "name": "Ana", "phone": 5550100}}}),
        ));
        let session = client.auth().login(&Credentials::new("ana", "secret")).unwrap();
        assert_eq!(session.user.id, Some(9));
        assert_eq!(session.user.phone.as_deref(), Some("5550100"));
        assert_eq!(client.session().token().as_deref(), Some("t-2"));
    }

    #[test]
    fn profile_reply_of_wrong_shape_is_malformed() {
        let client = client(ScriptedTransport::replying(
            200,
            json!({"data": ["not", "a", "user"]}),
        ));
        client.session().establish("tok", UserProfile::default());
        let err = client.auth().profile().unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse { .. }));
        assert_eq!(err.to_string(), MALFORMED_REPLY);
    }

    #[test]
    fn login_without_token_fails() {
        let client = client(ScriptedTransport::replying(200, json!({"success": true, "data": {}})));
        let err = client.auth().login(&Credentials::new("ana", "x")).unwrap_err();
        assert_eq!(err.to_string(), MISSING_TOKEN);
        assert!(client.session().token().is_none());
    }

    #[test]
    fn rejected_login_uses_backend_or_default_message() {
        let client = client(ScriptedTransport::replying(401, json!({})));
        let err = client.auth().login(&Credentials::new("ana", "x")).unwrap_err();
        assert_eq!(err.to_string(), LOGIN_FAILED);
    }

    #[test]
    fn register_summarizes_validation_errors() {
        let client = client(ScriptedTransport::replying(
            422,
            json!({
                "message": "The given data was invalid.",
                "errors": {"email": ["taken"], "password": ["too short", "weak"]}
            }),
        ));
        let err = client.auth().register(&registration()).unwrap_err();
        assert_eq!(err.to_string(), "email: taken; password: too short, weak");
        assert_eq!(err.field_errors().unwrap()["email"], vec!["taken".to_string()]);
    }

    #[test]
    fn register_requires_user_in_reply() {
        let client = client(ScriptedTransport::replying(200, json!({"data": {"token": "t"}})));
        let err = client.auth().register(&registration()).unwrap_err();
        assert_eq!(err.to_string(), MALFORMED_REPLY);
    }

    #[test]
    fn logout_clears_even_when_backend_fails() {
        let transport = ScriptedTransport::new(|_| Ok(HttpResponse::json(500, &json!({}))));
        let client = client(transport);
        client
            .session()
            .establish("tok", UserProfile::from_value(json!({"name": "Ana"})).unwrap());
        client.auth().logout();
        assert!(client.session().token().is_none());
        assert!(client.session().persisted_profile().is_none());
    }

    #[test]
    fn load_profile_through_the_client() {
        let client = client(ScriptedTransport::replying(
            200,
            json!({"data": {"id": 5, "name": "juan", "lastname": "perez"}}),
        ));
        client
            .session()
            .establish("tok", UserProfile::default());
        let profile = client.load_profile().unwrap();
        assert_eq!(profile.initials, "JP");
        assert_eq!(client.session().profile().unwrap().fullname, "juan perez");
    }

    #[test]
    fn failed_profile_load_carries_upstream_message() {
        let client = client(ScriptedTransport::replying(500, json!({"message": "boom"})));
        client.session().establish("tok", UserProfile::default());
        let err = client.load_profile().unwrap_err();
        assert_eq!(err, ApiError::ProfileLoad("boom".to_string()));
        assert_eq!(client.session().last_error().as_deref(), Some("boom"));
    }

    #[test]
    fn update_profile_refreshes_the_session() {
        let client = client(ScriptedTransport::replying(
            200,
            json!({"data": {"user": {"id": 1, "name": "Ana", "lastname": "Diaz"}}}),
        ));
        let ana = UserProfile::from_value(json!({"name": "Ana", "lastname": "Lopez"})).unwrap();
        client.session().establish("tok", ana);
        client.auth().update_profile(&json!({"lastname": "Diaz"})).unwrap();
        assert_eq!(client.session().profile().unwrap().initials, "AD");
        assert_eq!(client.session().persisted_profile().unwrap().fullname, "Ana Diaz");
    }
}
