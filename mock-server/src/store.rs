//! In-memory backend data: JSON records per collection, accounts and tokens.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{json, Map, Value};
use uuid::Uuid;

/// One REST collection served under `/{path}`.
#[derive(Debug)]
pub struct CollectionSpec {
    pub path: &'static str,
    /// Capitalized noun used in confirmation messages.
    pub label: &'static str,
    /// Fields that must be present and non-empty on create.
    pub required: &'static [&'static str],
    /// `(query key, record field)` exact-match filters.
    pub filters: &'static [(&'static str, &'static str)],
    /// Fields matched by the free-text `search` / `searchTerm` parameter.
    pub search: &'static [&'static str],
    /// Field shown by `get-names`.
    pub name_field: &'static str,
    /// Deletes keep the record with a `deleted_at` mark and require a reason.
    pub soft_delete: bool,
}

const FLEET_FILTERS: &[(&str, &str)] = &[
    ("tarjeta_combustible_id", "tarjeta_combustible_id"),
    ("chofer_id", "chofer_id"),
    ("tipo_combustible_id", "tipo_combustible_id"),
    ("registrado_por_id", "registrado_por_id"),
];

pub const USERS: &CollectionSpec = &CollectionSpec {
    path: "users",
    label: "User",
    required: &["name", "email"],
    filters: &[("empresa_id", "empresa_id")],
    search: &["name", "lastname", "email"],
    name_field: "name",
    soft_delete: false,
};
pub const DRIVERS: &CollectionSpec = &CollectionSpec {
    path: "choferes",
    label: "Driver",
    required: &["name"],
    filters: &[],
    search: &["name", "lastname", "licencia"],
    name_field: "name",
    soft_delete: false,
};
pub const VEHICLES: &CollectionSpec = &CollectionSpec {
    path: "vehiculos",
    label: "Vehicle",
    required: &["placa"],
    filters: &[
        ("chofer_id", "chofer_id"),
        ("tipo_combustible_id", "tipo_combustible_id"),
        ("estado_tecnico", "estado_tecnico"),
        ("tipo_vehiculo", "tipo_vehiculo"),
    ],
    search: &["placa", "marca", "modelo"],
    name_field: "placa",
    soft_delete: false,
};
pub const CARDS: &CollectionSpec = &CollectionSpec {
    path: "tarjetas-combustible",
    label: "Fuel card",
    required: &["numero"],
    filters: &[
        ("chofer_id", "chofer_id"),
        ("tipo_combustible_id", "tipo_combustible_id"),
        ("activa", "activa"),
    ],
    search: &["numero"],
    name_field: "numero",
    soft_delete: false,
};
pub const CHARGES: &CollectionSpec = &CollectionSpec {
    path: "carga-combustibles",
    label: "Fuel charge",
    required: &["tarjeta_combustible_id", "cantidad"],
    filters: FLEET_FILTERS,
    search: &["observaciones"],
    name_field: "id",
    soft_delete: true,
};
pub const WITHDRAWALS: &CollectionSpec = &CollectionSpec {
    path: "retiros-combustible",
    label: "Fuel withdrawal",
    required: &["tarjeta_combustible_id", "cantidad"],
    filters: FLEET_FILTERS,
    search: &["observaciones"],
    name_field: "id",
    soft_delete: true,
};
pub const FUEL_TYPES: &CollectionSpec = &CollectionSpec {
    path: "tipo-combustibles",
    label: "Fuel type",
    required: &["name"],
    filters: &[],
    search: &["name"],
    name_field: "name",
    soft_delete: false,
};
pub const PRODUCTS: &CollectionSpec = &CollectionSpec {
    path: "products",
    label: "Product",
    required: &["name"],
    filters: &[
        ("selectedCategory", "category_id"),
        ("selectedSubCategory", "subcategory_id"),
        ("selectedDestacated", "destacated"),
        ("selectedVisible", "visible"),
    ],
    search: &["name", "code", "description"],
    name_field: "name",
    soft_delete: false,
};
pub const CATEGORIES: &CollectionSpec = &CollectionSpec {
    path: "categories",
    label: "Category",
    required: &["name"],
    filters: &[],
    search: &["name"],
    name_field: "name",
    soft_delete: false,
};
pub const SUBCATEGORIES: &CollectionSpec = &CollectionSpec {
    path: "subcategories",
    label: "Subcategory",
    required: &["name", "category_id"],
    filters: &[("category_id", "category_id")],
    search: &["name"],
    name_field: "name",
    soft_delete: false,
};
pub const COMPANIES: &CollectionSpec = &CollectionSpec {
    path: "empresas",
    label: "Company",
    required: &["nombre"],
    filters: &[],
    search: &["nombre"],
    name_field: "nombre",
    soft_delete: false,
};

pub const COLLECTIONS: &[&CollectionSpec] = &[
    USERS,
    DRIVERS,
    VEHICLES,
    CARDS,
    CHARGES,
    WITHDRAWALS,
    FUEL_TYPES,
    PRODUCTS,
    CATEGORIES,
    SUBCATEGORIES,
    COMPANIES,
];

pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;
pub const ADMIN_NAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "secret";

/// Field name -> messages, as in a 422 reply.
pub type FieldErrors = Map<String, Value>;

/// One page of a listing plus its `meta` object.
#[derive(Debug)]
pub struct Page {
    pub items: Vec<Value>,
    pub meta: Value,
}

#[derive(Debug, Default)]
pub struct Store {
    collections: HashMap<&'static str, BTreeMap<u64, Value>>,
    tokens: HashMap<String, u64>,
    accessed: HashMap<u64, BTreeSet<u64>>,
}

impl Store {
    /// A store with one company and its administrator.
    pub fn new() -> Self {
        let mut store = Self::default();
        let company = store.insert(COMPANIES, obj(json!({"nombre": "Fleet Demo"})));
        store.insert(
            USERS,
            obj(json!({
                "name": ADMIN_NAME,
                "lastname": "Fleet",
                "email": "admin@fleet.test",
                "phone": "555-0100",
                "password": ADMIN_PASSWORD,
                "empresa_id": company["id"],
            })),
        );
        store
    }

    pub fn insert(&mut self, spec: &CollectionSpec, mut record: Map<String, Value>) -> Value {
        let rows = self.collections.entry(spec.path).or_default();
        let id = rows.keys().next_back().map_or(1, |last| last + 1);
        record.insert("id".to_string(), json!(id));
        let record = Value::Object(record);
        rows.insert(id, record.clone());
        public(record)
    }

    /// Insert every record, e.g. to prepare a listing in tests.
    pub fn seed(&mut self, spec: &CollectionSpec, records: impl IntoIterator<Item = Value>) {
        for record in records {
            self.insert(spec, obj(record));
        }
    }

    pub fn get(&self, spec: &CollectionSpec, id: u64) -> Option<Value> {
        self.live(spec)
            .find(|r| r["id"] == json!(id))
            .cloned()
            .map(public)
    }

    /// Shallow merge of `changes` into the record. `id` is never overwritten.
    pub fn update(
        &mut self,
        spec: &CollectionSpec,
        id: u64,
        changes: Map<String, Value>,
    ) -> Option<Value> {
        let record = self.collections.get_mut(spec.path)?.get_mut(&id)?;
        if is_deleted(record) {
            return None;
        }
        let fields = record.as_object_mut()?;
        for (key, value) in changes {
            if key != "id" {
                fields.insert(key, value);
            }
        }
        Some(public(record.clone()))
    }

    /// Remove the record, or mark it deleted for soft-delete collections.
    pub fn delete(&mut self, spec: &CollectionSpec, id: u64, reason: Option<&str>) -> bool {
        let Some(rows) = self.collections.get_mut(spec.path) else {
            return false;
        };
        if !spec.soft_delete {
            return rows.remove(&id).is_some();
        }
        match rows.get_mut(&id).and_then(Value::as_object_mut) {
            Some(fields) if !fields.get("deleted_at").is_some_and(|v| !v.is_null()) => {
                fields.insert("deleted_at".to_string(), json!("2024-01-01T00:00:00Z"));
                fields.insert("deletion_reason".to_string(), json!(reason));
                true
            }
            _ => false,
        }
    }

    /// Filter, search, sort and paginate a collection from query parameters.
    pub fn list(&self, spec: &CollectionSpec, query: &HashMap<String, String>) -> Page {
        let param = |key: &str| query.get(key).map(String::as_str).filter(|v| !v.is_empty());
        let with_trashed = param("with_trashed") == Some("true");
        let search = param("search").or_else(|| param("searchTerm")).map(str::to_lowercase);

        let mut items: Vec<&Value> = self
            .collections
            .get(spec.path)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|r| with_trashed || !is_deleted(r))
            .filter(|r| {
                spec.filters.iter().all(|&(key, field)| match param(key) {
                    Some(wanted) => text(&r[field]) == wanted,
                    None => true,
                })
            })
            .filter(|r| match &search {
                Some(needle) => spec
                    .search
                    .iter()
                    .any(|field| text(&r[*field]).to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .collect();

        if let Some(field) = param("sortBy") {
            items.sort_by(|a, b| compare(&a[field], &b[field]));
            if param("orderBy") == Some("desc") {
                items.reverse();
            }
        }

        let total = items.len();
        let paged = param("page").and_then(|p| p.parse::<usize>().ok());
        let (page, per_page) = match paged {
            Some(page) => (
                page.max(1),
                param("itemsPerPage")
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_ITEMS_PER_PAGE),
            ),
            None => (1, total.max(1)),
        };
        let items = items
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .map(public)
            .collect();

        Page {
            items,
            meta: json!({
                "total": total,
                "page": page,
                "itemsPerPage": per_page,
                "lastPage": total.div_ceil(per_page).max(1),
            }),
        }
    }

    /// `{id, name}` pairs of live records.
    pub fn names(&self, spec: &CollectionSpec) -> Vec<Value> {
        self.live(spec)
            .map(|r| json!({"id": r["id"], "name": r[spec.name_field]}))
            .collect()
    }

    /// Live records whose `field` equals `value`.
    pub fn find_by(&self, spec: &CollectionSpec, field: &str, value: &Value) -> Vec<Value> {
        self.live(spec)
            .filter(|r| &r[field] == value)
            .cloned()
            .map(public)
            .collect()
    }

    pub fn next_id(&self, spec: &CollectionSpec) -> u64 {
        self.collections
            .get(spec.path)
            .and_then(|rows| rows.keys().next_back())
            .map_or(1, |last| last + 1)
    }

    /// Token for the account whose name or email is `login`.
    pub fn login(&mut self, login: &str, password: &str) -> Option<(String, Value)> {
        let user = self
            .live(USERS)
            .find(|u| (u["name"] == login || u["email"] == login) && u["password"] == password)?
            .clone();
        let id = user["id"].as_u64()?;
        Some((self.issue_token(id), public(user)))
    }

    pub fn issue_token(&mut self, user_id: u64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    pub fn revoke(&mut self, token: &str) {
        self.tokens.remove(token);
    }

    pub fn user_for_token(&self, token: &str) -> Option<u64> {
        self.tokens.get(token).copied()
    }

    pub fn email_taken(&self, email: &str) -> bool {
        self.live(USERS).any(|u| u["email"] == email)
    }

    pub fn mark_accessed(&mut self, user_id: u64, ids: impl IntoIterator<Item = u64>) {
        self.accessed.entry(user_id).or_default().extend(ids);
    }

    pub fn accessed(&self, user_id: u64) -> Vec<u64> {
        self.accessed
            .get(&user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn live<'s>(&'s self, spec: &CollectionSpec) -> impl Iterator<Item = &'s Value> + 's {
        self.collections
            .get(spec.path)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|r| !is_deleted(r))
    }
}

/// Required fields that are absent, null or blank.
pub fn missing_fields(spec: &CollectionSpec, body: &Map<String, Value>) -> Option<FieldErrors> {
    let errors: FieldErrors = spec
        .required
        .iter()
        .filter(|field| is_blank(body.get(**field)))
        .map(|field| (field.to_string(), json!(["required"])))
        .collect();
    (!errors.is_empty()).then_some(errors)
}

/// Required fields that an update tries to blank out.
pub fn blanked_fields(spec: &CollectionSpec, body: &Map<String, Value>) -> Option<FieldErrors> {
    let errors: FieldErrors = spec
        .required
        .iter()
        .filter(|field| body.contains_key(**field) && is_blank(body.get(**field)))
        .map(|field| (field.to_string(), json!(["required"])))
        .collect();
    (!errors.is_empty()).then_some(errors)
}

pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// A record as sent to clients.
pub fn public(mut record: Value) -> Value {
    if let Some(fields) = record.as_object_mut() {
        fields.remove("password");
    }
    record
}

pub fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn is_deleted(record: &Value) -> bool {
    record.get("deleted_at").is_some_and(|v| !v.is_null())
}

/// Query-string form of a field value.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => text(a).cmp(&text(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn vehicles(n: usize) -> Store {
        let mut store = Store::new();
        store.seed(
            VEHICLES,
            (1..=n).map(|i| json!({"placa": format!("XAB-{i:03}"), "chofer_id": i % 2})),
        );
        store
    }

    #[test]
    fn seeded_admin_can_log_in() {
        let mut store = Store::new();
        let (token, user) = store.login(ADMIN_NAME, ADMIN_PASSWORD).unwrap();
        assert_eq!(store.user_for_token(&token), Some(1));
        assert_eq!(user["email"], "admin@fleet.test");
        assert!(user.get("password").is_none());
        assert!(store.login(ADMIN_NAME, "wrong").is_none());
    }

    #[test]
    fn list_pages_and_reports_meta() {
        let store = vehicles(45);
        let page = store.list(VEHICLES, &params(&[("page", "3"), ("itemsPerPage", "20")]));
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0]["placa"], "XAB-041");
        assert_eq!(page.meta, json!({"total": 45, "page": 3, "itemsPerPage": 20, "lastPage": 3}));
    }

    #[test]
    fn list_far_past_the_end_is_empty() {
        let store = vehicles(45);
        let last = usize::MAX.to_string();
        let page = store.list(
            VEHICLES,
            &params(&[("page", last.as_str()), ("itemsPerPage", "1000")]),
        );
        assert!(page.items.is_empty());
        assert_eq!(page.meta["total"], 45);
        assert_eq!(page.meta["lastPage"], 1);
    }

    #[test]
    fn list_without_page_returns_everything() {
        let store = vehicles(12);
        let page = store.list(VEHICLES, &HashMap::new());
        assert_eq!(page.items.len(), 12);
        assert_eq!(page.meta["lastPage"], 1);
    }

    #[test]
    fn filters_and_search_combine() {
        let store = vehicles(10);
        let page = store.list(VEHICLES, &params(&[("chofer_id", "1"), ("search", "xab-00")]));
        let plates: Vec<_> = page.items.iter().map(|v| v["placa"].as_str().unwrap()).collect();
        assert_eq!(plates, ["XAB-001", "XAB-003", "XAB-005", "XAB-007", "XAB-009"]);
    }

    #[test]
    fn empty_filter_values_are_ignored() {
        let store = vehicles(4);
        let page = store.list(VEHICLES, &params(&[("chofer_id", ""), ("search", "")]));
        assert_eq!(page.meta["total"], 4);
    }

    #[test]
    fn soft_deleted_rows_need_with_trashed() {
        let mut store = Store::new();
        store.seed(CHARGES, [json!({"tarjeta_combustible_id": 1, "cantidad": 40})]);
        assert!(store.delete(CHARGES, 1, Some("duplicate")));
        assert!(!store.delete(CHARGES, 1, Some("again")));
        assert!(store.get(CHARGES, 1).is_none());
        assert_eq!(store.list(CHARGES, &HashMap::new()).meta["total"], 0);
        let trashed = store.list(CHARGES, &params(&[("with_trashed", "true")]));
        assert_eq!(trashed.items[0]["deletion_reason"], "duplicate");
    }

    #[test]
    fn sort_by_numeric_field_descending() {
        let mut store = Store::new();
        store.seed(PRODUCTS, [json!({"name": "b", "price": 9}), json!({"name": "a", "price": 20})]);
        let page = store.list(PRODUCTS, &params(&[("sortBy", "price"), ("orderBy", "desc")]));
        assert_eq!(page.items[0]["name"], "a");
    }

    #[test]
    fn required_fields_report_each_blank_one() {
        let charge = obj(json!({"cantidad": 10, "tarjeta_combustible_id": ""}));
        let errors = missing_fields(CHARGES, &charge).unwrap();
        assert_eq!(Value::Object(errors), json!({"tarjeta_combustible_id": ["required"]}));
        assert!(missing_fields(FUEL_TYPES, &obj(json!({"name": "Diesel"}))).is_none());
        assert!(blanked_fields(FUEL_TYPES, &obj(json!({"price": 1}))).is_none());
        assert!(blanked_fields(FUEL_TYPES, &obj(json!({"name": " "}))).is_some());
    }

    #[test]
    fn update_keeps_id() {
        let mut store = Store::new();
        store.seed(FUEL_TYPES, [json!({"name": "Diesel"})]);
        let updated = store
            .update(FUEL_TYPES, 1, obj(json!({"id": 99, "name": "Gasoil"})))
            .unwrap();
        assert_eq!(updated, json!({"name": "Gasoil", "id": 1}));
    }
}
