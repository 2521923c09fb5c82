use std::{collections::BTreeMap, collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// API key accepted in the `hapikey` query parameter.
pub const TEST_API_KEY: &str = "test-api-key";
/// OAuth token accepted as `Authorization: Bearer ...`.
pub const TEST_OAUTH_TOKEN: &str = "test-oauth-token";
/// Host written into pagination links, as the real service does.
pub const PUBLIC_HOST: &str = "https://api.hubapi.com";

const COMPANIES_PATH: &str = "/crm/v3/objects/companies";
const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;
const TIMESTAMP: &str = "2024-01-01T00:00:00.000Z";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub properties: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
    pub archived: bool,
}

#[derive(Deserialize)]
pub struct CompanyInput {
    pub properties: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NextPage {
    pub after: String,
    pub link: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paging {
    pub next: NextPage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompanyPage {
    pub results: Vec<Company>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
    pub correlation_id: Uuid,
    pub category: String,
}

#[derive(Default)]
pub struct Store {
    companies: BTreeMap<u64, Company>,
    next_id: u64,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route(COMPANIES_PATH, get(list_companies).post(create_company))
        .route(
            "/crm/v3/objects/companies/{id}",
            get(get_company).put(update_company).delete(delete_company),
        )
        .route_layer(middleware::from_fn(require_auth))
        .route("/__echo", any(echo))
        .route("/__delay/{ms}", get(delay))
        .route("/__not_json", get(not_json))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, category: &str, message: &str) -> Response {
    let body = ErrorBody {
        status: "error".to_string(),
        message: message.to_string(),
        correlation_id: Uuid::new_v4(),
        category: category.to_string(),
    };
    (status, Json(body)).into_response()
}

fn not_found(id: &str) -> Response {
    error(
        StatusCode::NOT_FOUND,
        "OBJECT_NOT_FOUND",
        &format!("Object with id {id} not found"),
    )
}

/// Accept either the test API key or the test bearer token.
async fn require_auth(request: Request, next: Next) -> Response {
    let api_key_ok = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .map(|Query(params)| params.get("hapikey").map(String::as_str) == Some(TEST_API_KEY))
        .unwrap_or(false);
    let token_ok = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(format!("Bearer {TEST_OAUTH_TOKEN}").as_str());

    if api_key_ok || token_ok {
        next.run(request).await
    } else {
        error(
            StatusCode::UNAUTHORIZED,
            "INVALID_AUTHENTICATION",
            "Authentication credentials not found",
        )
    }
}

async fn list_companies(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let limit = match params.get("limit").map(|raw| raw.parse::<usize>()) {
        None => DEFAULT_LIMIT,
        Some(Ok(limit)) if (1..=MAX_LIMIT).contains(&limit) => limit,
        Some(_) => return error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "invalid limit"),
    };
    let after = match params.get("after").map(|raw| raw.parse::<u64>()) {
        None => 0,
        Some(Ok(after)) => after,
        Some(Err(_)) => return error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "invalid after"),
    };

    let store = db.read().await;
    let mut remaining = store.companies.range(after.saturating_add(1)..);
    let results: Vec<Company> = remaining.by_ref().take(limit).map(|(_, c)| c.clone()).collect();
    let paging = match (results.last(), remaining.next()) {
        (Some(last), Some(_)) => Some(Paging {
            next: NextPage {
                after: last.id.clone(),
                link: format!("{PUBLIC_HOST}{COMPANIES_PATH}?after={}&limit={limit}", last.id),
            },
        }),
        _ => None,
    };
    Json(CompanyPage { results, paging }).into_response()
}

async fn create_company(State(db): State<Db>, Json(input): Json<CompanyInput>) -> Response {
    let mut store = db.write().await;
    store.next_id += 1;
    let id = store.next_id;
    let mut properties = input.properties;
    properties.insert("hs_object_id".to_string(), Value::String(id.to_string()));
    properties.insert("createdate".to_string(), Value::String(TIMESTAMP.to_string()));
    properties.insert("hs_lastmodifieddate".to_string(), Value::String(TIMESTAMP.to_string()));
    let company = Company {
        id: id.to_string(),
        properties,
        created_at: TIMESTAMP.to_string(),
        updated_at: TIMESTAMP.to_string(),
        archived: false,
    };
    store.companies.insert(id, company.clone());
    // The client only accepts 200 and 204 as success.
    (StatusCode::OK, Json(company)).into_response()
}

async fn get_company(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let store = db.read().await;
    match id.parse::<u64>().ok().and_then(|key| store.companies.get(&key)) {
        Some(company) => Json(company.clone()).into_response(),
        None => not_found(&id),
    }
}

async fn update_company(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<CompanyInput>,
) -> Response {
    let mut store = db.write().await;
    let company = match id.parse::<u64>() {
        Ok(key) => store.companies.get_mut(&key),
        Err(_) => None,
    };
    let Some(company) = company else {
        return not_found(&id);
    };
    for (name, value) in input.properties {
        company.properties.insert(name, value);
    }
    Json(company.clone()).into_response()
}

async fn delete_company(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let mut store = db.write().await;
    match id.parse::<u64>().ok().and_then(|key| store.companies.remove(&key)) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(&id),
    }
}

/// Reports what arrived, so tests can inspect composed requests.
async fn echo(
    method: Method,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    Json(serde_json::json!({
        "method": method.as_str(),
        "query": query,
        "authorization": header_value(header::AUTHORIZATION),
        "contentType": header_value(header::CONTENT_TYPE),
        "body": body,
    }))
}

async fn delay(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({}))
}

async fn not_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>maintenance</body></html>",
    )
}
