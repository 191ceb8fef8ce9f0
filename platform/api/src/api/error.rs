use common::http::RouteError;

pub type Result<T, E = RouteError<ApiError>> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to read http body: {0}")]
    ParseHttpBody(#[from] hyper::Error),
    #[error("failed to parse json: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
