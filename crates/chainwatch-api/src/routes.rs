//! `/api` handlers.
//!
//! | Method | Path                 | Data                         |
//! |--------|----------------------|------------------------------|
//! | GET    | `/api/current-block` | latest observed height       |
//! | POST   | `/api/subscribe`     | `true` if newly registered   |
//! | GET    | `/api/txs?address=`  | matched transaction records  |
//! | GET    | `/api/stats`         | pipeline counters            |

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;

use chainwatch_core::WatchService;

use crate::error::ApiError;
use crate::response::{respond_failure, respond_success};
use crate::server::RequestId;

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct TxsQuery {
    #[serde(default)]
    pub address: String,
}

pub fn api_routes() -> Router<WatchService> {
    Router::new()
        .route("/current-block", get(current_block))
        .route("/subscribe", post(subscribe))
        .route("/txs", get(transactions))
        .route("/stats", get(stats))
}

async fn current_block(State(service): State<WatchService>, Extension(rid): Extension<RequestId>) -> Response {
    respond_success(&rid, service.current_height())
}

async fn subscribe(
    State(service): State<WatchService>,
    Extension(rid): Extension<RequestId>,
    body: Result<Json<SubscribeBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return respond_failure(&rid, ApiError::validation("body", rejection.body_text())),
    };
    if let Err(e) = validate_address(&body.address) {
        return respond_failure(&rid, e);
    }

    match service.subscribe(&body.address).await {
        Ok(created) => respond_success(&rid, created),
        Err(e) => respond_failure(&rid, e.into()),
    }
}

async fn transactions(
    State(service): State<WatchService>,
    Extension(rid): Extension<RequestId>,
    query: Result<Query<TxsQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return respond_failure(&rid, ApiError::validation("address", rejection.body_text())),
    };
    if let Err(e) = validate_address(&query.address) {
        return respond_failure(&rid, e);
    }

    match service.transactions_for(&query.address).await {
        Ok(txs) => respond_success(&rid, txs),
        Err(e) => respond_failure(&rid, e.into()),
    }
}

async fn stats(State(service): State<WatchService>, Extension(rid): Extension<RequestId>) -> Response {
    respond_success(&rid, service.stats())
}

/// `0x` followed by 40 hex digits, any letter case.
fn validate_address(address: &str) -> Result<(), ApiError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ApiError::validation("address", "must not be empty"));
    }
    let hex = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| ApiError::validation("address", "must start with 0x"))?;
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ApiError::validation("address", "must be 20 bytes of hex"));
    }
    Ok(())
}
