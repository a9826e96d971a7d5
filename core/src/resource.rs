//! Generic binding of `ApiClient` to one backend path family.
//!
//! # Design
//! Every entity endpoint follows the same shape: `GET /path` with a filter
//! set, `GET /path/get-names` for dropdowns, and `GET|PUT|DELETE /path/{id}`
//! plus `POST /path` for forms. `Resource` implements those requests once,
//! parameterized by a `ResourceDef` (path + nouns for messages) and by the
//! filter type. It returns a `Call` so each resource module picks the
//! convention (envelope or strict) per operation family.

use serde::Serialize;
use serde_json::Value;

use crate::client::{ApiClient, Call};
use crate::envelope::Operation;
use crate::http::HttpMethod;

/// Domain records are passed through as the backend shaped them.
pub type Record = Value;

/// Backend identifier of a record.
pub type Id = u64;

/// Path and nouns for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDef {
    pub path: &'static str,
    pub singular: &'static str,
    pub plural: &'static str,
}

impl ResourceDef {
    pub const fn new(path: &'static str, singular: &'static str, plural: &'static str) -> Self {
        Self {
            path,
            singular,
            plural,
        }
    }

    /// "Vehicle not found".
    pub fn not_found(&self) -> String {
        let mut chars = self.singular.chars();
        match chars.next() {
            Some(first) => format!("{}{} not found", first.to_uppercase(), chars.as_str()),
            None => "Not found".to_string(),
        }
    }

    /// Texts for an operation on the collection, e.g. "fetching vehicles".
    pub fn collection_op(&self, verb: &str) -> Operation {
        Operation::new(
            format!("An error occurred while {verb} {}", self.plural),
            self.not_found(),
        )
    }

    /// Texts for an operation on one record, e.g. "updating the vehicle".
    pub fn record_op(&self, verb: &str) -> Operation {
        Operation::new(
            format!("An error occurred while {verb} the {}", self.singular),
            self.not_found(),
        )
    }
}

/// Common paging and free-text search parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(rename = "itemsPerPage", skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Pagination {
    pub fn page(page: u32, items_per_page: u32) -> Self {
        Self {
            page: Some(page),
            items_per_page: Some(items_per_page),
            search: None,
        }
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

/// `ApiClient` bound to one `ResourceDef`.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    client: &'a ApiClient,
    def: ResourceDef,
}

impl<'a> Resource<'a> {
    pub fn new(client: &'a ApiClient, def: ResourceDef) -> Self {
        Self { client, def }
    }

    pub fn def(&self) -> ResourceDef {
        self.def
    }

    pub fn client(&self) -> &'a ApiClient {
        self.client
    }

    /// `GET /path` with `filter` as query parameters.
    pub fn list<F: Serialize + ?Sized>(&self, filter: &F) -> Call<'a> {
        self.client
            .call(HttpMethod::Get, self.def.path, self.def.collection_op("fetching"))
            .query(filter)
    }

    /// `GET /path` without filters.
    pub fn all(&self) -> Call<'a> {
        self.client
            .call(HttpMethod::Get, self.def.path, self.def.collection_op("fetching"))
    }

    /// `GET /path/get-names`: id/name pairs for selectors.
    pub fn names(&self) -> Call<'a> {
        self.client.call(
            HttpMethod::Get,
            &format!("{}/get-names", self.def.path),
            self.def.collection_op("loading"),
        )
    }

    pub fn get(&self, id: u64) -> Call<'a> {
        self.client.call(
            HttpMethod::Get,
            &self.member(id),
            self.def.record_op("fetching"),
        )
    }

    pub fn create<B: Serialize + ?Sized>(&self, body: &B) -> Call<'a> {
        self.client
            .call(HttpMethod::Post, self.def.path, self.def.record_op("creating"))
            .json(body)
    }

    pub fn update<B: Serialize + ?Sized>(&self, id: u64, body: &B) -> Call<'a> {
        self.client
            .call(HttpMethod::Put, &self.member(id), self.def.record_op("updating"))
            .json(body)
    }

    pub fn delete(&self, id: u64) -> Call<'a> {
        self.client.call(
            HttpMethod::Delete,
            &self.member(id),
            self.def.record_op("deleting"),
        )
    }

    /// Any other endpoint under this path, e.g. `reportes/cdt`.
    pub fn at(&self, method: HttpMethod, suffix: &str, op: Operation) -> Call<'a> {
        let path = format!("{}/{}", self.def.path, suffix.trim_start_matches('/'));
        self.client.call(method, &path, op)
    }

    fn member(&self, id: u64) -> String {
        format!("{}/{id}", self.def.path)
    }
}
