//! Users of the caller's company.
//!
//! Conventions: the paginated list and the selector loader return envelopes;
//! form operations and `by_company` are strict.

use serde::Serialize;

use crate::client::ApiClient;
use crate::envelope::{Envelope, Operation};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::resource::{Id, Pagination, Record, Resource, ResourceDef};

pub const USERS: ResourceDef = ResourceDef::new("/users", "user", "users");

pub struct Users<'a> {
    resource: Resource<'a>,
}

impl ApiClient {
    pub fn users(&self) -> Users<'_> {
        Users {
            resource: Resource::new(self, USERS),
        }
    }
}

impl Users<'_> {
    /// `GET /users?page&itemsPerPage&search`.
    pub fn list(&self, filter: &Pagination) -> Envelope<Vec<Record>> {
        self.resource.list(filter).envelope()
    }

    /// `GET /users/users-by-enterprise`: users selectable as "registered by".
    pub fn by_enterprise(&self) -> Envelope<Vec<Record>> {
        self.resource
            .at(HttpMethod::Get, "users-by-enterprise", USERS.collection_op("loading"))
            .envelope()
    }

    /// `GET /users/by-empresa`: the whole reply, failing on error.
    pub fn by_company(&self, filter: &Pagination) -> Result<Envelope<Vec<Record>>, ApiError> {
        self.resource
            .at(
                HttpMethod::Get,
                "by-empresa",
                Operation::new(
                    "An error occurred while fetching users of the same company",
                    USERS.not_found(),
                ),
            )
            .query(filter)
            .strict_envelope()
    }

    pub fn get(&self, id: Id) -> Result<Record, ApiError> {
        self.resource.get(id).strict()
    }

    pub fn create<B: Serialize + ?Sized>(&self, user: &B) -> Result<Record, ApiError> {
        self.resource.create(user).strict()
    }

    pub fn update<B: Serialize + ?Sized>(&self, id: Id, user: &B) -> Result<Record, ApiError> {
        self.resource.update(id, user).strict()
    }

    /// Returns the backend's confirmation message.
    pub fn delete(&self, id: Id) -> Result<String, ApiError> {
        let envelope = self.resource.delete(id).strict_envelope::<Record>()?;
        Ok(envelope.message.unwrap_or_else(|| "User deleted".to_string()))
    }
}
