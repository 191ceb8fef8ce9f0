use std::convert::Infallible;
use std::sync::Arc;

use common::http::ext::*;
use common::http::RouteError;
use common::make_response;
use hyper::{Body, Request, Response, StatusCode};
use routerify::{ext::RequestExt, Router};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::api::error::Result;
use crate::api::ApiError;
use crate::global::GlobalState;

async fn price(req: Request<Body>) -> Result<Response<Body>> {
    let global: Arc<GlobalState> = req.get_global()?;
    let address = req
        .param("address")
        .map_err_route((StatusCode::BAD_REQUEST, "missing token address"))?;

    let quote = global.price_cache.get(address).await;

    Ok(make_response!(StatusCode::OK, json!({ "pair": quote })))
}

/// Server-sent events feed of quote updates from the shared poller.
async fn price_stream(req: Request<Body>) -> Result<Response<Body>> {
    let global: Arc<GlobalState> = req.get_global()?;
    let address = req
        .param("address")
        .map_err_route((StatusCode::BAD_REQUEST, "missing token address"))?;

    let mut rx = global.price_cache.subscribe(address).await;

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(quote) => {
                    let data = json!({ "pair": quote });
                    yield Ok::<_, Infallible>(format!("data: {}\n\n", data));
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .body(Body::wrap_stream(stream))
        .map_ignore_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to build response"))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .get("/:address/price", price)
        .get("/:address/price/stream", price_stream)
        .build()
        .expect("failed to build router")
}
