//! In-memory stand-in for the fleet backend.
//!
//! Serves the JSON envelope `{success, message, data, meta, errors}` for
//! every collection in `store::COLLECTIONS` under `/api`, with bearer-token
//! authentication, 422 validation replies and the PDF reports.

pub mod store;

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

use store::{
    CollectionSpec, FieldErrors, Store, CARDS, CATEGORIES, CHARGES, COLLECTIONS, COMPANIES, DRIVERS,
    PRODUCTS, SUBCATEGORIES, USERS, VEHICLES, WITHDRAWALS,
};

pub type Db = Arc<RwLock<Store>>;

/// Every route is served under this prefix.
pub const API_PREFIX: &str = "/api";

pub const INVALID_DATA: &str = "The given data was invalid.";

/// Authenticated caller, attached by `require_token`.
#[derive(Clone, Debug)]
struct Caller {
    id: u64,
    token: String,
}

type Params = HashMap<String, String>;

pub fn shared(store: Store) -> Db {
    Arc::new(RwLock::new(store))
}

pub fn app() -> Router {
    app_with_state(shared(Store::new()))
}

pub fn app_with_state(db: Db) -> Router {
    let mut protected = Router::new()
        .route("/logout", post(logout))
        .route("/user", get(current_user))
        .route("/user/profile", put(update_profile))
        .route("/users/users-by-enterprise", get(users_by_enterprise))
        .route("/users/by-empresa", get(users_by_company))
        .route("/choferes/get-details/{id}", get(driver_details))
        .route("/vehiculos/reportes/cdt", get(cdt_report))
        .route("/tarjetas-combustible/reportes/consumo-mes", get(consumption_report))
        .route("/carga-combustibles/{id}/validar", post(validate_charge))
        .route("/retiros-combustible/accessed-ids", get(accessed_withdrawals))
        .route("/subcategories/by-category/{id}", get(subcategories_by_category))
        .route("/products/get-next-product-code", get(next_product_code))
        .route("/products/image-delete", post(delete_image))
        .route("/empresas/by-user/{id}", get(company_by_user));

    for &spec in COLLECTIONS {
        protected = protected
            .route(
                &format!("/{}", spec.path),
                get(
                    move |State(db): State<Db>,
                          Extension(caller): Extension<Caller>,
                          Query(params): Query<Params>| list(spec, db, caller, params),
                )
                .post(move |State(db): State<Db>, body: Bytes| create(spec, db, body)),
            )
            .route(
                &format!("/{}/get-names", spec.path),
                get(move |State(db): State<Db>| names(spec, db)),
            )
            .route(
                &format!("/{}/{{id}}", spec.path),
                get(move |State(db): State<Db>, Path(id): Path<u64>| show(spec, db, id))
                    .put(move |State(db): State<Db>, Path(id): Path<u64>, body: Bytes| {
                        update(spec, db, id, body)
                    })
                    .delete(move |State(db): State<Db>, Path(id): Path<u64>, body: Bytes| {
                        destroy(spec, db, id, body)
                    }),
            );
    }

    let protected = protected.layer(middleware::from_fn_with_state(db.clone(), require_token));

    let api = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .merge(protected);

    Router::new().nest(API_PREFIX, api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

// --- replies ---

fn ok(data: Value) -> Response {
    Json(json!({"success": true, "data": data})).into_response()
}

fn done(status: StatusCode, message: &str, data: Value) -> Response {
    (status, Json(json!({"success": true, "message": message, "data": data}))).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "message": message}))).into_response()
}

fn invalid(errors: FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"success": false, "message": INVALID_DATA, "errors": errors})),
    )
        .into_response()
}

fn not_found() -> Response {
    fail(StatusCode::NOT_FOUND, "No query results for model.")
}

/// Parse a JSON object body; an empty body is an empty object.
fn object(body: &[u8]) -> Result<Map<String, Value>, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(fail(StatusCode::BAD_REQUEST, "The request body must be a JSON object.")),
    }
}

// --- auth ---

async fn require_token(State(db): State<Db>, mut request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let user = match &token {
        Some(token) => db.read().await.user_for_token(token),
        None => None,
    };
    match (user, token) {
        (Some(id), Some(token)) => {
            debug!(
                user_id = id,
                method = %request.method(),
                path = %request.uri().path(),
                "Authenticated request"
            );
            request.extensions_mut().insert(Caller { id, token });
            next.run(request).await
        }
        _ => fail(StatusCode::UNAUTHORIZED, "Unauthenticated."),
    }
}

#[derive(Deserialize)]
struct Login {
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
}

async fn login(State(db): State<Db>, body: Bytes) -> Response {
    let Ok(input) = serde_json::from_slice::<Login>(&body) else {
        return fail(StatusCode::BAD_REQUEST, "The request body must be a JSON object.");
    };
    match db.write().await.login(&input.name, &input.password) {
        Some((token, user)) => {
            info!(user_id = %user["id"], "Login");
            ok(json!({"token": token, "user": user}))
        }
        None => fail(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn register(State(db): State<Db>, body: Bytes) -> Response {
    let mut input = match object(&body) {
        Ok(input) => input,
        Err(reply) => return reply,
    };
    let mut errors = FieldErrors::new();
    for field in ["name", "lastname", "email", "phone", "password"] {
        if store::is_blank(input.get(field)) {
            errors.insert(field.to_string(), json!([format!("The {field} field is required.")]));
        }
    }
    if !errors.contains_key("password")
        && input.get("password") != input.get("password_confirmation")
    {
        errors.insert(
            "password".to_string(),
            json!(["The password field confirmation does not match."]),
        );
    }
    let mut store = db.write().await;
    if let Some(email) = input.get("email").and_then(Value::as_str) {
        if store.email_taken(email) {
            errors.insert("email".to_string(), json!(["The email has already been taken."]));
        }
    }
    if !errors.is_empty() {
        return invalid(errors);
    }

    input.remove("password_confirmation");
    input.insert("empresa_id".to_string(), json!(1));
    let user = store.insert(USERS, input);
    let Some(id) = user["id"].as_u64() else {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error");
    };
    let token = store.issue_token(id);
    info!(user_id = id, "Registered");
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered",
            "data": {"token": token, "user": user}
        })),
    )
        .into_response()
}

async fn logout(State(db): State<Db>, Extension(caller): Extension<Caller>) -> Response {
    db.write().await.revoke(&caller.token);
    done(StatusCode::OK, "Logged out", Value::Null)
}

async fn current_user(State(db): State<Db>, Extension(caller): Extension<Caller>) -> Response {
    match db.read().await.get(USERS, caller.id) {
        Some(user) => ok(user),
        None => not_found(),
    }
}

async fn update_profile(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Response {
    let mut changes = match object(&body) {
        Ok(changes) => changes,
        Err(reply) => return reply,
    };
    changes.remove("password");
    changes.remove("empresa_id");
    if let Some(errors) = store::blanked_fields(USERS, &changes) {
        return invalid(errors);
    }
    match db.write().await.update(USERS, caller.id, changes) {
        Some(user) => done(StatusCode::OK, "Profile updated", json!({"user": user})),
        None => not_found(),
    }
}

// --- generic collections ---

async fn list(spec: &'static CollectionSpec, db: Db, caller: Caller, params: Params) -> Response {
    let mut store = db.write().await;
    let page = store.list(spec, &params);
    if spec.path == WITHDRAWALS.path {
        let ids: Vec<u64> = page.items.iter().filter_map(|r| r["id"].as_u64()).collect();
        store.mark_accessed(caller.id, ids);
    }
    Json(json!({"success": true, "data": page.items, "meta": page.meta})).into_response()
}

async fn names(spec: &'static CollectionSpec, db: Db) -> Response {
    ok(Value::Array(db.read().await.names(spec)))
}

async fn show(spec: &'static CollectionSpec, db: Db, id: u64) -> Response {
    match db.read().await.get(spec, id) {
        Some(record) => ok(record),
        None => not_found(),
    }
}

async fn create(spec: &'static CollectionSpec, db: Db, body: Bytes) -> Response {
    let record = match object(&body) {
        Ok(record) => record,
        Err(reply) => return reply,
    };
    if let Some(errors) = store::missing_fields(spec, &record) {
        return invalid(errors);
    }
    let created = db.write().await.insert(spec, record);
    debug!(collection = spec.path, id = %created["id"], "Created");
    done(StatusCode::CREATED, &format!("{} created successfully", spec.label), created)
}

async fn update(spec: &'static CollectionSpec, db: Db, id: u64, body: Bytes) -> Response {
    let changes = match object(&body) {
        Ok(changes) => changes,
        Err(reply) => return reply,
    };
    if let Some(errors) = store::blanked_fields(spec, &changes) {
        return invalid(errors);
    }
    match db.write().await.update(spec, id, changes) {
        Some(record) => {
            let message = format!("{} updated successfully", spec.label);
            done(StatusCode::OK, &message, record)
        }
        None => not_found(),
    }
}

async fn destroy(spec: &'static CollectionSpec, db: Db, id: u64, body: Bytes) -> Response {
    let reason = match object(&body) {
        Ok(body) => body.get("deletion_reason").and_then(Value::as_str).map(str::to_string),
        Err(reply) => return reply,
    };
    if spec.soft_delete && reason.as_deref().is_none_or(|r| r.trim().is_empty()) {
        let mut errors = FieldErrors::new();
        errors.insert("deletion_reason".to_string(), json!(["required"]));
        return invalid(errors);
    }
    if db.write().await.delete(spec, id, reason.as_deref()) {
        done(StatusCode::OK, &format!("{} deleted successfully", spec.label), Value::Null)
    } else {
        not_found()
    }
}

// --- resource-specific endpoints ---

async fn users_by_enterprise(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
) -> Response {
    let store = db.read().await;
    let company = store.get(USERS, caller.id).map(|u| u["empresa_id"].clone()).unwrap_or_default();
    let users: Vec<Value> = store
        .find_by(USERS, "empresa_id", &company)
        .into_iter()
        .map(|u| json!({"id": u["id"], "name": u["name"], "lastname": u["lastname"]}))
        .collect();
    ok(Value::Array(users))
}

async fn users_by_company(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Query(mut params): Query<Params>,
) -> Response {
    let store = db.read().await;
    if let Some(company) = store.get(USERS, caller.id).and_then(|u| u["empresa_id"].as_u64()) {
        params.insert("empresa_id".to_string(), company.to_string());
    }
    let page = store.list(USERS, &params);
    Json(json!({"success": true, "data": page.items, "meta": page.meta})).into_response()
}

async fn driver_details(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let store = db.read().await;
    let Some(mut driver) = store.get(DRIVERS, id) else {
        return not_found();
    };
    driver["vehiculos"] = Value::Array(store.find_by(VEHICLES, "chofer_id", &json!(id)));
    driver["tarjetas"] = Value::Array(store.find_by(CARDS, "chofer_id", &json!(id)));
    ok(driver)
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    year: Option<i32>,
    month: Option<u32>,
    tarjeta_id: Option<u64>,
}

impl ReportQuery {
    fn validate(&self) -> Result<(i32, u32), Response> {
        let Some(year) = self.year else {
            return Err(fail(StatusCode::UNPROCESSABLE_ENTITY, "The year field is required."));
        };
        match self.month {
            Some(month @ 1..=12) => Ok((year, month)),
            Some(_) => Err(fail(
                StatusCode::UNPROCESSABLE_ENTITY,
                "The month field must be between 1 and 12.",
            )),
            None => Err(fail(StatusCode::UNPROCESSABLE_ENTITY, "The month field is required.")),
        }
    }
}

fn wants_pdf(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/pdf"))
}

fn pdf(title: &str, filename: &str) -> Response {
    let body = format!("%PDF-1.4\n% {title}\n%%EOF\n");
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response()
}

/// Per-card totals of the charges registered in `year`-`month`.
fn consumption(store: &Store, year: i32, month: u32, card: Option<u64>) -> Vec<Value> {
    let prefix = format!("{year:04}-{month:02}");
    let cards = match card {
        Some(id) => store.get(CARDS, id).into_iter().collect(),
        None => store.list(CARDS, &Params::new()).items,
    };
    cards
        .into_iter()
        .map(|card| {
            let charges: Vec<Value> = store
                .find_by(CHARGES, "tarjeta_combustible_id", &card["id"])
                .into_iter()
                .filter(|c| c["fecha"].as_str().is_some_and(|f| f.starts_with(&prefix)))
                .collect();
            let litres: f64 = charges.iter().filter_map(|c| c["cantidad"].as_f64()).sum();
            json!({
                "tarjeta_id": card["id"],
                "numero": card["numero"],
                "cargas": charges.len(),
                "cantidad": litres,
            })
        })
        .collect()
}

async fn consumption_report(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Response {
    let (year, month) = match query.validate() {
        Ok(period) => period,
        Err(reply) => return reply,
    };
    if wants_pdf(&headers) {
        return pdf(
            &format!("Fuel consumption {year}-{month:02}"),
            &format!("consumo-{year}-{month:02}.pdf"),
        );
    }
    let cards = consumption(&*db.read().await, year, month, query.tarjeta_id);
    ok(json!({"year": year, "month": month, "cards": cards}))
}

async fn cdt_report(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Response {
    let (year, month) = match query.validate() {
        Ok(period) => period,
        Err(reply) => return reply,
    };
    if let Some(card) = query.tarjeta_id {
        if db.read().await.get(CARDS, card).is_none() {
            return fail(StatusCode::NOT_FOUND, "Fuel card not found");
        }
    }
    if !wants_pdf(&headers) {
        return fail(StatusCode::NOT_ACCEPTABLE, "The CDT report is only available as PDF.");
    }
    pdf(&format!("CDT {year}-{month:02}"), &format!("cdt-{year}-{month:02}.pdf"))
}

#[derive(Debug, Deserialize)]
struct Validation {
    valid: Option<bool>,
    validado_por_id: Option<u64>,
    motivo_rechazo: Option<String>,
}

async fn validate_charge(State(db): State<Db>, Path(id): Path<u64>, body: Bytes) -> Response {
    let Ok(input) = serde_json::from_slice::<Validation>(&body) else {
        return fail(StatusCode::BAD_REQUEST, "The request body must be a JSON object.");
    };
    let mut errors = FieldErrors::new();
    if input.valid.is_none() {
        errors.insert("valid".to_string(), json!(["required"]));
    }
    if input.validado_por_id.is_none() {
        errors.insert("validado_por_id".to_string(), json!(["required"]));
    }
    let has_reason = input.motivo_rechazo.as_deref().is_some_and(|m| !m.trim().is_empty());
    if input.valid == Some(false) && !has_reason {
        errors.insert("motivo_rechazo".to_string(), json!(["required"]));
    }
    if !errors.is_empty() {
        return invalid(errors);
    }

    let approved = input.valid == Some(true);
    let mut changes = Map::new();
    changes.insert("estado".to_string(), json!(if approved { "VALIDADA" } else { "RECHAZADA" }));
    changes.insert("validado_por_id".to_string(), json!(input.validado_por_id));
    changes.insert("motivo_rechazo".to_string(), json!(input.motivo_rechazo));
    match db.write().await.update(CHARGES, id, changes) {
        Some(charge) => done(
            StatusCode::OK,
            if approved { "Charge validated" } else { "Charge rejected" },
            charge,
        ),
        None => not_found(),
    }
}

async fn accessed_withdrawals(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
) -> Response {
    let ids = db.read().await.accessed(caller.id);
    ok(json!({"count": ids.len(), "ids": ids}))
}

async fn subcategories_by_category(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let store = db.read().await;
    if store.get(CATEGORIES, id).is_none() {
        return fail(StatusCode::NOT_FOUND, "Category not found");
    }
    let subcategories: Vec<Value> = store
        .find_by(SUBCATEGORIES, "category_id", &json!(id))
        .into_iter()
        .map(|s| json!({"id": s["id"], "name": s["name"]}))
        .collect();
    ok(Value::Array(subcategories))
}

async fn next_product_code(State(db): State<Db>) -> Response {
    let next = db.read().await.next_id(PRODUCTS);
    ok(json!({"code": format!("P-{next:04}")}))
}

async fn delete_image(body: Bytes) -> Response {
    let input = match object(&body) {
        Ok(input) => input,
        Err(reply) => return reply,
    };
    if store::is_blank(input.get("path")) {
        let mut errors = FieldErrors::new();
        errors.insert("path".to_string(), json!(["required"]));
        return invalid(errors);
    }
    done(StatusCode::OK, "Image deleted", Value::Null)
}

async fn company_by_user(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let store = db.read().await;
    let company = store
        .get(USERS, id)
        .and_then(|u| u["empresa_id"].as_u64())
        .and_then(|company| store.get(COMPANIES, company));
    match company {
        Some(company) => ok(company),
        None => fail(StatusCode::NOT_FOUND, "Company not found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_an_empty_object() {
        assert!(object(b"").unwrap().is_empty());
        assert!(object(b"  \n").unwrap().is_empty());
        assert_eq!(object(br#"{"a":1}"#).unwrap()["a"], 1);
        assert!(object(b"[1]").is_err());
    }

    #[test]
    fn report_period_validation() {
        let query = |month| ReportQuery { year: Some(2024), month, tarjeta_id: None };
        assert_eq!(query(Some(6)).validate().ok(), Some((2024, 6)));
        assert!(query(Some(13)).validate().is_err());
        assert!(query(None).validate().is_err());
    }

    #[test]
    fn pdf_is_chosen_by_accept() {
        let mut headers = HeaderMap::new();
        assert!(!wants_pdf(&headers));
        headers.insert(header::ACCEPT, "application/pdf, application/json".parse().unwrap());
        assert!(wants_pdf(&headers));
    }

    #[test]
    fn consumption_sums_the_month_only() {
        let mut store = Store::new();
        store.seed(CARDS, [json!({"numero": "0001"}), json!({"numero": "0002"})]);
        store.seed(
            CHARGES,
            [
                json!({"tarjeta_combustible_id": 1, "cantidad": 40.0, "fecha": "2024-06-02"}),
                json!({"tarjeta_combustible_id": 1, "cantidad": 10.5, "fecha": "2024-06-20"}),
                json!({"tarjeta_combustible_id": 1, "cantidad": 99.0, "fecha": "2024-07-01"}),
            ],
        );
        let cards = consumption(&store, 2024, 6, None);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0]["cargas"], 2);
        assert_eq!(cards[0]["cantidad"], 50.5);
        assert_eq!(cards[1]["cargas"], 0);

        let one = consumption(&store, 2024, 6, Some(2));
        assert_eq!(one.len(), 1);
        assert_eq!(one[0]["numero"], "0002");
    }
}
