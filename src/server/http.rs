//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection.

use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::SessionTokens;
use crate::config::Args;
use crate::dashboard::Dashboard;
use crate::db::Store;
use crate::export::MediaLinks;
use crate::routes::{
    self,
    response::{cors_preflight, get_auth_header, not_found_response, BoxBody, BoxError},
};
use crate::types::{EncvError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Store,
    pub tokens: SessionTokens,
    pub dashboard: Dashboard,
    pub links: MediaLinks,
}

impl AppState {
    pub fn new(args: Args, store: Store) -> Result<Self> {
        let secret = args
            .jwt_secret()
            .ok_or_else(|| EncvError::Config("JWT_SECRET is required in production mode".into()))?;
        let tokens = SessionTokens::new(&secret, args.jwt_expiry_seconds)?;
        let links = MediaLinks::new(args.public_base_url.clone(), args.media_url.clone());

        Ok(Self {
            dashboard: Dashboard::new(store.clone()),
            args,
            store,
            tokens,
            links,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "ENCV listening on {} ({} store)",
        state.args.listen,
        state.store.backend_name()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - do not expose to participants");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req: Request<Incoming>| {
                        let state = Arc::clone(&state);
                        async move {
                            info!("[{}] {} {}", addr, req.method(), req.uri().path());
                            Ok::<_, hyper::Error>(handle_request(state, req).await)
                        }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route an incoming request
pub async fn handle_request<B>(state: Arc<AppState>, req: Request<B>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if path.starts_with("/auth") {
        return match routes::handle_auth_request(req, Arc::clone(&state)).await {
            Some(response) => response,
            None => not_found_response(&path),
        };
    }

    if path == "/dashboard" || path.starts_with("/dashboard/") {
        return routes::handle_dashboard_request(req, state).await;
    }

    match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(&state),

        (Method::OPTIONS, _) => cors_preflight(),

        (method, p) if p.starts_with("/downloaddata/") => {
            let auth_header = get_auth_header(&req).map(str::to_owned);
            routes::handle_download_request(&method, p, auth_header.as_deref(), state).await
        }

        _ => not_found_response(&path),
    }
}
