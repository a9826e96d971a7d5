//! Vehicles (`/vehiculos`).
//!
//! Convention: envelope for every operation; the CDT report uses the
//! document convention.

use serde::Serialize;

use crate::client::ApiClient;
use crate::document::DocumentResult;
use crate::envelope::{Envelope, Operation};
use crate::http::HttpMethod;
use crate::resource::{Id, Pagination, Record, Resource, ResourceDef};
use crate::resources::ReportPeriod;

pub const VEHICLES: ResourceDef = ResourceDef::new("/vehiculos", "vehicle", "vehicles");

/// Vehicle kinds offered by the vehicle form.
pub const VEHICLE_TYPES: [&str; 4] = ["auto", "camión", "camioneta", "moto"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VehicleFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chofer_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_combustible_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado_tecnico: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_vehiculo: Option<String>,
}

pub struct Vehicles<'a> {
    resource: Resource<'a>,
}

impl ApiClient {
    pub fn vehicles(&self) -> Vehicles<'_> {
        Vehicles {
            resource: Resource::new(self, VEHICLES),
        }
    }
}

impl Vehicles<'_> {
    pub fn list(&self, filter: &VehicleFilter) -> Envelope<Vec<Record>> {
        self.resource.list(filter).envelope()
    }

    pub fn get(&self, id: Id) -> Envelope<Record> {
        self.resource.get(id).envelope()
    }

    pub fn create<B: Serialize + ?Sized>(&self, vehicle: &B) -> Envelope<Record> {
        self.resource.create(vehicle).envelope()
    }

    pub fn update<B: Serialize + ?Sized>(&self, id: Id, vehicle: &B) -> Envelope<Record> {
        self.resource.update(id, vehicle).envelope()
    }

    pub fn delete(&self, id: Id) -> Envelope<Record> {
        self.resource.delete(id).envelope()
    }

    /// `GET /vehiculos/reportes/cdt` as a PDF, optionally for one card.
    pub fn cdt_report(&self, period: ReportPeriod, card_id: Option<Id>) -> DocumentResult {
        self.resource
            .at(
                HttpMethod::Get,
                "reportes/cdt",
                Operation::new(
                    "An error occurred while generating the CDT report",
                    VEHICLES.not_found(),
                ),
            )
            .query(&period.for_card(card_id))
            .document()
    }

    pub fn vehicle_types(&self) -> &'static [&'static str] {
        &VEHICLE_TYPES
    }
}
