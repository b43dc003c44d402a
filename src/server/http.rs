//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::Database;
use crate::routes::{self, FullBody};
use crate::services::Services;
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub db: Database,
    pub jwt: JwtValidator,
    pub services: Services,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, db: Database, jwt: JwtValidator) -> Self {
        let services = Services::new(db.clone(), args.strict_schema);
        Self {
            args,
            db,
            jwt,
            services,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server; returns after Ctrl-C once the store is closed
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Folio listening on {}", state.args.listen);
    if state.args.dev_mode {
        warn!("Development mode enabled - insecure defaults in use");
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { handle_request(state, addr, req).await }
                        });

                        if let Err(err) = http1::Builder::new()
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
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    state.db.close().await;
    info!("Folio stopped");
    Ok(())
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<FullBody>, Infallible> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(routes::route(&state, req).await)
}
