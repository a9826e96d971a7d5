//! Drivers (`/choferes`).
//!
//! Conventions: list and names return envelopes; form operations are strict.

use serde::Serialize;

use crate::client::ApiClient;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::resource::{Id, Pagination, Record, Resource, ResourceDef};

pub const DRIVERS: ResourceDef = ResourceDef::new("/choferes", "driver", "drivers");

pub struct Drivers<'a> {
    resource: Resource<'a>,
}

impl ApiClient {
    pub fn drivers(&self) -> Drivers<'_> {
        Drivers {
            resource: Resource::new(self, DRIVERS),
        }
    }
}

impl Drivers<'_> {
    pub fn list(&self, filter: &Pagination) -> Envelope<Vec<Record>> {
        self.resource.list(filter).envelope()
    }

    /// Id/name pairs for driver selectors.
    pub fn names(&self) -> Envelope<Vec<Record>> {
        self.resource.names().envelope()
    }

    pub fn get(&self, id: Id) -> Result<Record, ApiError> {
        self.resource.get(id).strict()
    }

    /// `GET /choferes/get-details/{id}`: the driver with assigned vehicles
    /// and cards.
    pub fn details(&self, id: Id) -> Result<Record, ApiError> {
        self.resource
            .at(
                HttpMethod::Get,
                &format!("get-details/{id}"),
                DRIVERS.record_op("fetching details of"),
            )
            .strict()
    }

    pub fn create<B: Serialize + ?Sized>(&self, driver: &B) -> Result<Record, ApiError> {
        self.resource.create(driver).strict()
    }

    pub fn update<B: Serialize + ?Sized>(&self, id: Id, driver: &B) -> Result<Record, ApiError> {
        self.resource.update(id, driver).strict()
    }

    pub fn delete(&self, id: Id) -> Result<String, ApiError> {
        let envelope = self.resource.delete(id).strict_envelope::<Record>()?;
        Ok(envelope.message.unwrap_or_else(|| "Driver deleted".to_string()))
    }
}
