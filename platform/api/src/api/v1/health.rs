use std::sync::Arc;

use common::http::RouteError;
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;

use crate::api::error::Result;
use crate::api::ApiError;
use crate::global::GlobalState;

async fn health(_: Request<Body>) -> Result<Response<Body>> {
    Ok(make_response!(StatusCode::OK, json!({ "status": "ok" })))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .get("/", health)
        .build()
        .expect("failed to build router")
}
