//! Fuel charges (`/carga-combustibles`): fuel loaded onto a card.
//!
//! Convention: envelope.

use serde::Serialize;

use crate::client::ApiClient;
use crate::envelope::Envelope;
use crate::http::HttpMethod;
use crate::resource::{Id, Pagination, Record, Resource, ResourceDef};

pub const CHARGES: ResourceDef =
    ResourceDef::new("/carga-combustibles", "fuel charge", "fuel charges");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChargeFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tarjeta_combustible_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chofer_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_combustible_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrado_por_id: Option<Id>,
}

/// Approval or rejection of a charge. A rejection must carry a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeValidation {
    valid: bool,
    validado_por_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    motivo_rechazo: Option<String>,
}

impl ChargeValidation {
    pub fn approve(validated_by: Id) -> Self {
        Self {
            valid: true,
            validado_por_id: validated_by,
            motivo_rechazo: None,
        }
    }

    pub fn reject(validated_by: Id, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            validado_por_id: validated_by,
            motivo_rechazo: Some(reason.into()),
        }
    }
}

#[derive(Serialize)]
struct Deletion<'r> {
    deletion_reason: &'r str,
}

pub struct Charges<'a> {
    resource: Resource<'a>,
}

impl ApiClient {
    pub fn charges(&self) -> Charges<'_> {
        Charges {
            resource: Resource::new(self, CHARGES),
        }
    }
}

impl Charges<'_> {
    pub fn list(&self, filter: &ChargeFilter) -> Envelope<Vec<Record>> {
        self.resource.list(filter).envelope()
    }

    pub fn get(&self, id: Id) -> Envelope<Record> {
        self.resource.get(id).envelope()
    }

    pub fn create<B: Serialize + ?Sized>(&self, charge: &B) -> Envelope<Record> {
        self.resource.create(charge).envelope()
    }

    /// Soft-delete a charge; the backend keeps `reason` for the audit trail.
    pub fn delete(&self, id: Id, reason: &str) -> Envelope<Record> {
        self.resource
            .delete(id)
            .json(&Deletion {
                deletion_reason: reason,
            })
            .envelope()
    }

    /// `POST /carga-combustibles/{id}/validar`.
    pub fn validate(&self, id: Id, validation: &ChargeValidation) -> Envelope<Record> {
        self.resource
            .at(
                HttpMethod::Post,
                &format!("{id}/validar"),
                CHARGES.record_op("validating"),
            )
            .json(validation)
            .envelope()
    }
}
