//! Fuel withdrawals (`/retiros-combustible`).
//!
//! Convention: envelope.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::envelope::{Envelope, Operation};
use crate::http::HttpMethod;
use crate::resource::{Id, Pagination, Record, Resource, ResourceDef};

pub const WITHDRAWALS: ResourceDef =
    ResourceDef::new("/retiros-combustible", "fuel withdrawal", "fuel withdrawals");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WithdrawalFilter {
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
    /// Include soft-deleted withdrawals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_trashed: Option<bool>,
}

/// Withdrawals the current user has already opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccessedIds {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub ids: Vec<Id>,
}

pub struct Withdrawals<'a> {
    resource: Resource<'a>,
}

impl ApiClient {
    pub fn withdrawals(&self) -> Withdrawals<'_> {
        Withdrawals {
            resource: Resource::new(self, WITHDRAWALS),
        }
    }
}

impl Withdrawals<'_> {
    pub fn list(&self, filter: &WithdrawalFilter) -> Envelope<Vec<Record>> {
        self.resource.list(filter).envelope()
    }

    pub fn create<B: Serialize + ?Sized>(&self, withdrawal: &B) -> Envelope<Record> {
        self.resource.create(withdrawal).envelope()
    }

    pub fn accessed_ids(&self) -> Envelope<AccessedIds> {
        self.resource
            .at(
                HttpMethod::Get,
                "accessed-ids",
                Operation::new(
                    "An error occurred while fetching accessed withdrawals",
                    WITHDRAWALS.not_found(),
                ),
            )
            .envelope()
    }
}
