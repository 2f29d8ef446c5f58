//! Submit and poll.
//!
//! A submit only validates the URL and returns the request id; everything
//! else happens asynchronously. Clients poll the `by-request` location until
//! the digest shows up. A request that fails in the pipeline never does.
//! Store reads run on the blocking pool.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use store::StoredDigest;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub youtube_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestQuery {
    pub request_id: Option<String>,
}

/// `POST /api/v1/digests`
pub async fn submit(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<SubmitRequest>,
) -> ServerResult<impl IntoResponse> {
    if body.youtube_url.trim().is_empty() {
        return Err(ServerError::BadRequest("youtubeUrl is required".into()));
    }
    let request_id = state.ingestion.enqueue(&body.youtube_url)?;
    tracing::info!(request_id = %request_id, "digest_submitted");

    let location = format!("/api/v1/digests/by-request/{request_id}");
    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, location)],
        Json(SubmitResponse { request_id }),
    ))
}

/// `GET /api/v1/digests/{id}`
pub async fn get_by_id(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<Json<StoredDigest>> {
    state
        .read_store(move |store| store.find_by_id(&id))
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound)
}

/// `GET /api/v1/digests/by-request/{request_id}`
pub async fn get_by_request(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<String>,
) -> ServerResult<Json<StoredDigest>> {
    state
        .read_store(move |store| store.find_by_request_id(&request_id))
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound)
}

/// `GET /api/v1/digests?requestId=...`, or every digest when no request id
/// is given.
pub async fn query(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<DigestQuery>,
) -> ServerResult<axum::response::Response> {
    match params.request_id.as_deref().map(str::trim) {
        Some("") => Err(ServerError::BadRequest("requestId is blank".into())),
        Some(request_id) => {
            let request_id = request_id.to_owned();
            state
                .read_store(move |store| store.find_by_request_id(&request_id))
                .await?
                .map(|digest| Json(digest).into_response())
                .ok_or(ServerError::NotFound)
        }
        None => Ok(Json(state.read_store(|store| store.list()).await?).into_response()),
    }
}
