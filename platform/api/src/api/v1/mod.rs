use std::sync::Arc;

use common::http::RouteError;
use hyper::Body;
use routerify::Router;

use crate::global::GlobalState;

use super::ApiError;

mod health;
mod streams;
mod tokens;
mod webhooks;

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    Router::builder()
        .scope("/health", health::routes(global))
        .scope("/streams", streams::routes(global))
        .scope("/tokens", tokens::routes(global))
        .scope("/webhooks", webhooks::routes(global))
        .build()
        .expect("failed to build router")
}
