//! Companies (`/empresas`), edited from the user form.
//!
//! Convention: strict.

use serde::Serialize;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::resource::{Id, Record, Resource, ResourceDef};

pub const COMPANIES: ResourceDef = ResourceDef::new("/empresas", "company", "companies");

pub struct Companies<'a> {
    resource: Resource<'a>,
}

impl ApiClient {
    pub fn companies(&self) -> Companies<'_> {
        Companies {
            resource: Resource::new(self, COMPANIES),
        }
    }
}

impl Companies<'_> {
    /// The company a user belongs to.
    pub fn by_user(&self, user_id: Id) -> Result<Record, ApiError> {
        self.resource
            .at(
                HttpMethod::Get,
                &format!("by-user/{user_id}"),
                COMPANIES.record_op("fetching"),
            )
            .strict()
    }

    pub fn update<B: Serialize + ?Sized>(&self, id: Id, company: &B) -> Result<Record, ApiError> {
        self.resource.update(id, company).strict()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{client_with, ScriptedTransport};

    #[test]
    fn by_user_returns_data() {
        let transport = ScriptedTransport::replying(
            200,
            json!({"success": true, "data": {"id": 3, "nombre": "Transportes Sur"}}),
        );
        let client = client_with(transport.clone());
        let company = client.companies().by_user(11).unwrap();
        assert_eq!(company["nombre"], "Transportes Sur");
        assert_eq!(transport.last_request().path, "http://fleet.test/api/empresas/by-user/11");
    }

    #[test]
    fn update_failure_is_an_error() {
        let client = client_with(ScriptedTransport::replying(500, json!({})));
        let err = client.companies().update(3, &json!({"nombre": ""})).unwrap_err();
        assert_eq!(err.to_string(), "An error occurred while updating the company");
        assert_eq!(err.status(), Some(500));
    }
}
