use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u64,
    pub name: String,
    pub provider: String,
}

#[derive(Deserialize)]
pub struct CampaignParams {
    pub name: String,
    #[serde(default = "default_provider")]
    pub provider: String,
}

#[derive(Deserialize)]
pub struct CreateCampaign {
    pub campaign: CampaignParams,
}

#[derive(Deserialize)]
pub struct CampaignPatch {
    pub name: Option<String>,
    pub provider: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCampaign {
    pub campaign: CampaignPatch,
}

fn default_provider() -> String {
    "dnd5".to_string()
}

pub struct Store {
    campaigns: RwLock<HashMap<u64, Campaign>>,
    next_id: AtomicU64,
}

pub type Db = Arc<Store>;

type Reply = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(Store {
        campaigns: RwLock::new(HashMap::new()),
        next_id: AtomicU64::new(1),
    });
    Router::new()
        .route("/frontend/campaigns.json", get(list_campaigns).post(create_campaign))
        .route(
            "/frontend/campaigns/{file}",
            get(get_campaign).patch(update_campaign).delete(delete_campaign),
        )
        .route("/frontend/campaigns/{id}/export.pdf", get(export_campaign))
        .route("/frontend/echo.json", any(echo))
        .route("/frontend/broken.json", get(broken))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn errors(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "errors_list": [message] })))
}

fn not_found() -> Reply {
    errors(StatusCode::NOT_FOUND, "Not found")
}

fn authorized(headers: &HeaderMap) -> Result<(), Reply> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or("");
    if token.is_empty() {
        return Err(errors(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }
    Ok(())
}

/// `42.json` -> `42`.
fn campaign_id(file: &str) -> Option<u64> {
    file.strip_suffix(".json")?.parse().ok()
}

async fn list_campaigns(State(db): State<Db>) -> Reply {
    let campaigns = db.campaigns.read().await;
    let mut list: Vec<Campaign> = campaigns.values().cloned().collect();
    list.sort_by_key(|campaign| campaign.id);
    (StatusCode::OK, Json(json!({ "campaigns": list })))
}

async fn create_campaign(State(db): State<Db>, headers: HeaderMap, Json(input): Json<CreateCampaign>) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    if input.campaign.name.trim().is_empty() {
        return errors(StatusCode::UNPROCESSABLE_ENTITY, "Name can't be blank");
    }
    let campaign = Campaign {
        id: db.next_id.fetch_add(1, Ordering::Relaxed),
        name: input.campaign.name,
        provider: input.campaign.provider,
    };
    tracing::debug!(id = campaign.id, "campaign created");
    db.campaigns.write().await.insert(campaign.id, campaign.clone());
    (StatusCode::CREATED, Json(json!({ "campaign": campaign })))
}

async fn get_campaign(State(db): State<Db>, Path(file): Path<String>) -> Reply {
    let Some(id) = campaign_id(&file) else {
        return not_found();
    };
    let campaigns = db.campaigns.read().await;
    match campaigns.get(&id) {
        Some(campaign) => (StatusCode::OK, Json(json!({ "campaign": campaign }))),
        None => not_found(),
    }
}

async fn update_campaign(
    State(db): State<Db>,
    Path(file): Path<String>,
    headers: HeaderMap,
    Json(input): Json<UpdateCampaign>,
) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let Some(id) = campaign_id(&file) else {
        return not_found();
    };
    let mut campaigns = db.campaigns.write().await;
    let Some(campaign) = campaigns.get_mut(&id) else {
        return not_found();
    };
    if let Some(name) = input.campaign.name {
        if name.trim().is_empty() {
            return errors(StatusCode::UNPROCESSABLE_ENTITY, "Name can't be blank");
        }
        campaign.name = name;
    }
    if let Some(provider) = input.campaign.provider {
        campaign.provider = provider;
    }
    (StatusCode::OK, Json(json!({ "campaign": campaign })))
}

async fn delete_campaign(State(db): State<Db>, Path(file): Path<String>, headers: HeaderMap) -> Reply {
    if let Err(reply) = authorized(&headers) {
        return reply;
    }
    let Some(id) = campaign_id(&file) else {
        return not_found();
    };
    match db.campaigns.write().await.remove(&id) {
        Some(_) => (StatusCode::OK, Json(json!({ "result": "ok" }))),
        None => not_found(),
    }
}

async fn export_campaign(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let campaigns = db.campaigns.read().await;
    let Some(campaign) = campaigns.get(&id) else {
        return not_found().into_response();
    };
    let format = query.get("format").map(String::as_str).unwrap_or("letter");
    let body = format!("%PDF-1.4\n% {} ({format})\n%%EOF\n", campaign.name);
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/pdf")], body).into_response()
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Reflects the request back so clients can check what they sent.
async fn echo(method: Method, RawQuery(raw): RawQuery, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let query: BTreeMap<String, String> = raw
        .as_deref()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "raw_query": raw,
        "authorization": header_str(&headers, header::AUTHORIZATION),
        "content_type": header_str(&headers, header::CONTENT_TYPE),
        "body": String::from_utf8_lossy(&body),
        "body_len": body.len(),
    }))
}

async fn broken() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>Down for maintenance</body></html>",
    )
}
