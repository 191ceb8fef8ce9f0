use std::sync::Arc;

use common::http::ext::*;
use common::http::RouteError;
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde::Deserialize;
use serde_json::json;

use crate::api::error::Result;
use crate::api::ApiError;
use crate::global::GlobalState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaEvent {
    event: String,
    #[serde(default)]
    room_name: Option<String>,
    #[serde(default)]
    file_location: Option<String>,
}

/// Media server lifecycle events. Only `egress_ended` mutates state; room
/// liveness belongs to the reconciler sweep.
async fn media_webhook(req: Request<Body>) -> Result<Response<Body>> {
    let global: Arc<GlobalState> = req.get_global()?;

    let body = hyper::body::to_bytes(req.into_body())
        .await
        .map_err_route((StatusCode::BAD_REQUEST, "failed to read body"))?;

    let event: MediaEvent = serde_json::from_slice(&body)
        .map_err_route((StatusCode::BAD_REQUEST, "invalid event body"))?;

    match event.event.as_str() {
        "egress_ended" => {
            let (Some(room_name), Some(file_location)) = (event.room_name, event.file_location)
            else {
                return Err((StatusCode::BAD_REQUEST, "egress_ended requires roomName and fileLocation").into());
            };

            let result = sqlx::query(
                "UPDATE streams SET thumbnail_url = $1, updated_at = NOW() WHERE room_name = $2",
            )
            .bind(&file_location)
            .bind(&room_name)
            .execute(global.db.as_ref())
            .await
            .map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to record thumbnail"))?;

            if result.rows_affected() == 0 {
                tracing::warn!(room = %room_name, "egress for unknown room");
            }
        }
        "room_started" | "room_finished" => {
            tracing::debug!(event = %event.event, room = ?event.room_name, "room lifecycle event");
        }
        other => {
            tracing::debug!(event = %other, "ignoring media event");
        }
    }

    Ok(make_response!(StatusCode::OK, json!({ "success": true })))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .post("/media", media_webhook)
        .build()
        .expect("failed to build router")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_egress_event() {
        let event: MediaEvent = serde_json::from_str(
            r#"{"event":"egress_ended","roomName":"room-a","fileLocation":"https://cdn.example.com/thumbs/room-a.jpg"}"#,
        )
        .unwrap();

        assert_eq!(event.event, "egress_ended");
        assert_eq!(event.room_name.as_deref(), Some("room-a"));
        assert_eq!(
            event.file_location.as_deref(),
            Some("https://cdn.example.com/thumbs/room-a.jpg")
        );
    }

    #[test]
    fn test_parses_unknown_event() {
        let event: MediaEvent =
            serde_json::from_str(r#"{"event":"track_published","roomName":"room-a"}"#).unwrap();

        assert_eq!(event.event, "track_published");
        assert!(event.file_location.is_none());
    }
}
