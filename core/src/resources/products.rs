//! Catalogue products (`/products`) and their stored images.
//!
//! Convention: envelope.

use serde::Serialize;

use crate::client::ApiClient;
use crate::envelope::{Envelope, Operation};
use crate::http::HttpMethod;
use crate::resource::{Id, Record, Resource, ResourceDef};

pub const PRODUCTS: ResourceDef = ResourceDef::new("/products", "product", "products");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Listing filters. Keys keep the backend's camelCase names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_category: Option<Id>,
    #[serde(rename = "selectedSubCategory", skip_serializing_if = "Option::is_none")]
    pub selected_subcategory: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_destacated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_visible: Option<bool>,
}

#[derive(Serialize)]
struct ImagePath<'p> {
    path: &'p str,
}

pub struct Products<'a> {
    resource: Resource<'a>,
}

impl ApiClient {
    pub fn products(&self) -> Products<'_> {
        Products {
            resource: Resource::new(self, PRODUCTS),
        }
    }
}

impl Products<'_> {
    pub fn list(&self, filter: &ProductFilter) -> Envelope<Vec<Record>> {
        self.resource.list(filter).envelope()
    }

    pub fn get(&self, id: Id) -> Envelope<Record> {
        self.resource.get(id).envelope()
    }

    /// Code the backend will assign to the next product.
    pub fn next_code(&self) -> Envelope<Record> {
        self.resource
            .at(
                HttpMethod::Get,
                "get-next-product-code",
                Operation::new(
                    "An error occurred while fetching the next product code",
                    PRODUCTS.not_found(),
                ),
            )
            .envelope()
    }

    pub fn create<B: Serialize + ?Sized>(&self, product: &B) -> Envelope<Record> {
        self.resource.create(product).envelope()
    }

    pub fn update<B: Serialize + ?Sized>(&self, id: Id, product: &B) -> Envelope<Record> {
        self.resource.update(id, product).envelope()
    }

    pub fn delete(&self, id: Id) -> Envelope<Record> {
        self.resource.delete(id).envelope()
    }

    /// Remove a stored image by its storage path.
    pub fn delete_image(&self, path: &str) -> Envelope<Record> {
        self.resource
            .at(
                HttpMethod::Post,
                "image-delete",
                Operation::new(
                    "An error occurred while deleting the image",
                    "Image not found",
                ),
            )
            .json(&ImagePath { path })
            .envelope()
    }
}
