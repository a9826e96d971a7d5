//! Product categories (`/categories`) and subcategories (`/subcategories`).
//!
//! Convention: envelope. Selector loaders can be reshaped into
//! `SelectOption`s for dropdowns.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::envelope::{Envelope, Operation};
use crate::http::HttpMethod;
use crate::resource::{Id, Record, Resource, ResourceDef};

pub const CATEGORIES: ResourceDef = ResourceDef::new("/categories", "category", "categories");
pub const SUBCATEGORIES: ResourceDef =
    ResourceDef::new("/subcategories", "subcategory", "subcategories");

/// `{id, name}` as returned by the name loaders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedRecord {
    pub id: Id,
    pub name: String,
}

/// Dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub title: String,
    pub value: Id,
}

impl From<NamedRecord> for SelectOption {
    fn from(record: NamedRecord) -> Self {
        Self {
            title: record.name,
            value: record.id,
        }
    }
}

/// Turn a names envelope into dropdown options.
pub fn select_options(names: Envelope<Vec<NamedRecord>>) -> Envelope<Vec<SelectOption>> {
    names.map(|records| records.into_iter().map(SelectOption::from).collect())
}

#[derive(Serialize)]
struct CategoryBody<'n> {
    name: &'n str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subcategory {
    pub name: String,
    pub category_id: Id,
}

impl Subcategory {
    pub fn new(name: impl Into<String>, category_id: Id) -> Self {
        Self {
            name: name.into(),
            category_id,
        }
    }
}

pub struct Categories<'a> {
    categories: Resource<'a>,
    subcategories: Resource<'a>,
}

impl ApiClient {
    pub fn categories(&self) -> Categories<'_> {
        Categories {
            categories: Resource::new(self, CATEGORIES),
            subcategories: Resource::new(self, SUBCATEGORIES),
        }
    }
}

impl Categories<'_> {
    pub fn names(&self) -> Envelope<Vec<NamedRecord>> {
        self.categories.names().envelope()
    }

    pub fn create(&self, name: &str) -> Envelope<Record> {
        self.categories.create(&CategoryBody { name }).envelope()
    }

    pub fn update(&self, id: Id, name: &str) -> Envelope<Record> {
        self.categories.update(id, &CategoryBody { name }).envelope()
    }

    pub fn delete(&self, id: Id) -> Envelope<Record> {
        self.categories.delete(id).envelope()
    }

    /// Subcategories of one category. A 404 means the category is unknown.
    pub fn subcategories(&self, category_id: Id) -> Envelope<Vec<NamedRecord>> {
        self.subcategories
            .at(
                HttpMethod::Get,
                &format!("by-category/{category_id}"),
                Operation::new(
                    "An error occurred while loading subcategories",
                    CATEGORIES.not_found(),
                ),
            )
            .envelope()
    }

    pub fn create_subcategory(&self, subcategory: &Subcategory) -> Envelope<Record> {
        self.subcategories.create(subcategory).envelope()
    }

    pub fn update_subcategory(&self, id: Id, subcategory: &Subcategory) -> Envelope<Record> {
        self.subcategories.update(id, subcategory).envelope()
    }

    pub fn delete_subcategory(&self, id: Id) -> Envelope<Record> {
        self.subcategories.delete(id).envelope()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{accepting, client_with, ScriptedTransport};

    #[test]
    fn names_map_to_select_options() {
        let client = client_with(ScriptedTransport::replying(
            200,
            json!({
                "success": true,
                "data": [{"id": 1, "name": "Lubricants"}, {"id": 2, "name": "Filters"}]
            }),
        ));
        let options = select_options(client.categories().names());
        assert!(options.success);
        assert_eq!(
            options.data.unwrap(),
            vec![
                SelectOption { title: "Lubricants".into(), value: 1 },
                SelectOption { title: "Filters".into(), value: 2 },
            ]
        );
    }

    #[test]
    fn unknown_category_has_specific_message() {
        let transport = ScriptedTransport::replying(404, json!({"message": "No query results"}));
        let client = client_with(transport.clone());
        let env = client.categories().subcategories(40);
        assert!(!env.success);
        assert_eq!(env.message(), "Category not found");
        assert_eq!(
            transport.last_request().path,
            "http://fleet.test/api/subcategories/by-category/40"
        );
    }

    #[test]
    fn subcategory_body_names_parent() {
        let transport = accepting();
        let client = client_with(transport.clone());
        let _ = client.categories().update_subcategory(5, &Subcategory::new("Oil", 1));
        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.path, "http://fleet.test/api/subcategories/5");
        assert_eq!(sent.body.as_deref(), Some(r#"{"name":"Oil","category_id":1}"#));
    }

    #[test]
    fn create_category_sends_name_only() {
        let transport = accepting();
        let client = client_with(transport.clone());
        let _ = client.categories().create("Tyres");
        assert_eq!(transport.last_request().body.as_deref(), Some(r#"{"name":"Tyres"}"#));
    }
}
