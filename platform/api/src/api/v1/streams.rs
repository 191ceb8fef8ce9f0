use std::sync::Arc;

use common::http::ext::*;
use common::http::RouteError;
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use routerify::{ext::RequestExt, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::api::error::Result;
use crate::api::ApiError;
use crate::database::Stream;
use crate::global::GlobalState;
use crate::reconciler;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamResponse {
    id: Uuid,
    user_id: Uuid,
    room_name: String,
    title: String,
    is_live: bool,
    viewer_count: i32,
    thumbnail_url: Option<String>,
    chat_enabled: bool,
    token_address: Option<String>,
}

impl From<Stream> for StreamResponse {
    fn from(stream: Stream) -> Self {
        Self {
            id: stream.id,
            user_id: stream.user_id,
            room_name: stream.room_name,
            title: stream.title,
            is_live: stream.is_live,
            viewer_count: stream.viewer_count,
            thumbnail_url: stream.thumbnail_url,
            chat_enabled: stream.chat_enabled,
            token_address: stream.token_address,
        }
    }
}

fn param_uuid(req: &Request<Body>, name: &str) -> Result<Uuid> {
    let raw = req
        .param(name)
        .map_err_route((StatusCode::BAD_REQUEST, "missing path parameter"))?;

    Uuid::parse_str(raw)
        .ok()
        .map_err_route((StatusCode::BAD_REQUEST, "invalid stream id"))
}

/// Read-only viewer count for one stream. Any media server failure collapses
/// to a zero count; liveness writes belong to the sweep.
async fn participants(req: Request<Body>) -> Result<Response<Body>> {
    let global: Arc<GlobalState> = req.get_global()?;
    let stream_id = param_uuid(&req, "id")?;

    let stream: Stream = sqlx::query_as("SELECT * FROM streams WHERE id = $1")
        .bind(stream_id)
        .fetch_optional(global.db.as_ref())
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch stream"))?
        .map_err_route((StatusCode::NOT_FOUND, "stream not found"))?;

    let count =
        crate::rooms::observed_viewer_count(global.rooms.as_ref(), &stream.room_name, stream.user_id)
            .await;

    Ok(make_response!(StatusCode::OK, json!({ "count": count })))
}

async fn sync(req: Request<Body>) -> Result<Response<Body>> {
    let global: Arc<GlobalState> = req.get_global()?;

    match reconciler::sweep(&global).await {
        Ok(stats) => Ok(make_response!(
            StatusCode::OK,
            json!({
                "success": true,
                "message": "live stream states synced",
                "stats": stats,
            })
        )),
        Err(err) => {
            tracing::error!(error = %err, "manual sweep failed");
            Ok(make_response!(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "success": false,
                    "message": "failed to sync live stream states",
                })
            ))
        }
    }
}

async fn reset_viewer_counts(req: Request<Body>) -> Result<Response<Body>> {
    let global: Arc<GlobalState> = req.get_global()?;

    sqlx::query(
        "UPDATE streams SET viewer_count = 0, updated_at = NOW() WHERE is_live = FALSE AND viewer_count <> 0",
    )
    .execute(global.db.as_ref())
    .await
    .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to reset viewer counts"))?;

    let streams: Vec<Stream> = sqlx::query_as("SELECT * FROM streams ORDER BY created_at")
        .fetch_all(global.db.as_ref())
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch streams"))?;

    let streams: Vec<StreamResponse> = streams.into_iter().map(Into::into).collect();

    Ok(make_response!(
        StatusCode::OK,
        json!({ "success": true, "streams": streams })
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailRequest {
    thumbnail_url: String,
}

/// Records the preview image the client captured and uploaded.
async fn record_thumbnail(req: Request<Body>) -> Result<Response<Body>> {
    let global: Arc<GlobalState> = req.get_global()?;
    let stream_id = param_uuid(&req, "id")?;

    let body = hyper::body::to_bytes(req.into_body())
        .await
        .map_err_route((StatusCode::BAD_REQUEST, "failed to read body"))?;

    let request: ThumbnailRequest = serde_json::from_slice(&body)
        .map_err_route((StatusCode::BAD_REQUEST, "invalid request body"))?;

    if request.thumbnail_url.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "thumbnailUrl is required").into());
    }

    let result = sqlx::query("UPDATE streams SET thumbnail_url = $1, updated_at = NOW() WHERE id = $2")
        .bind(&request.thumbnail_url)
        .bind(stream_id)
        .execute(global.db.as_ref())
        .await
        .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to update thumbnail"))?;

    if result.rows_affected() == 0 {
        return Err((StatusCode::NOT_FOUND, "stream not found").into());
    }

    Ok(make_response!(StatusCode::OK, json!({ "success": true })))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .get("/:id/participants", participants)
        .post("/sync", sync)
        .get("/sync", sync)
        .post("/reset-viewer-counts", reset_viewer_counts)
        .post("/:id/thumbnail", record_thumbnail)
        .build()
        .expect("failed to build router")
}
