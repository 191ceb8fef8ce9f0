use std::sync::Arc;
use std::time::Duration;

use common::http::RouteError;
use hyper::http::header;
use hyper::server::conn::Http;
use hyper::Body;
use routerify::{Middleware, RequestServiceBuilder, Router};
use tokio::net::TcpSocket;
use tokio::select;

use crate::global::GlobalState;

mod error;
mod v1;

pub use error::ApiError;

pub fn cors_middleware(_: &Arc<GlobalState>) -> Middleware<Body, RouteError<ApiError>> {
    Middleware::post(|mut resp| async move {
        resp.headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".parse().unwrap());
        resp.headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_METHODS, "*".parse().unwrap());
        resp.headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_HEADERS, "*".parse().unwrap());
        resp.headers_mut()
            .insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, "Date".parse().unwrap());
        resp.headers_mut().insert(
            header::ACCESS_CONTROL_MAX_AGE,
            Duration::from_secs(86400).as_secs().to_string().parse().unwrap(),
        );

        Ok(resp)
    })
}

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
    let weak = Arc::downgrade(global);
    Router::builder()
        .data(weak)
        .err_handler_with_info(common::http::error_handler::<ApiError>)
        .middleware(cors_middleware(global))
        .scope("/v1", v1::routes(global))
        .build()
        .expect("failed to build router")
}

pub async fn run(global: Arc<GlobalState>) -> anyhow::Result<()> {
    tracing::info!("API listening on {}", global.config.bind_address);
    let socket = if global.config.bind_address.is_ipv6() {
        TcpSocket::new_v6()?
    } else {
        TcpSocket::new_v4()?
    };

    socket.set_reuseaddr(true)?;
    socket.set_reuseport(true)?;
    socket.bind(global.config.bind_address)?;
    let listener = socket.listen(1024)?;

    // A Weak reference here lets shutdown complete even while keep-alive
    // connections are still holding the request service.
    let request_service =
        RequestServiceBuilder::new(routes(&global)).expect("failed to build request service");

    loop {
        select! {
            _ = global.ctx.done() => {
                return Ok(());
            },
            r = listener.accept() => {
                let (socket, addr) = r?;

                let service = request_service.build(addr);

                tracing::debug!("Accepted connection from {}", addr);

                tokio::spawn(async move {
                    Http::new().serve_connection(
                        socket,
                        service,
                    ).with_upgrades().await.ok();
                });
            },
        }
    }
}
