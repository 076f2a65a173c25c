//! Edge service of a multi-tenant feedback, roadmap and changelog platform.
//!
//!
//!
//! # General Infrastructure
//! - Every request hits this service first
//! - The hostname decides which tenant ("project") a request belongs to
//! - Requests are rewritten onto one of four internal route trees: `/home`, `/dash`, `/api`, `/{project}`
//! - The rewritten request keeps its visible URL, the client never sees internal paths
//! - Tenant context travels as `x-pathname`/`x-project` headers, on the forwarded request and the response
//!
//!
//!
//! # Hosts
//!
//! | Host | Result |
//! |---|---|
//! | verified custom domain | `/{slug}{path}` |
//! | `dash.{root}` | `/dash{path}`, signed-in only apart from `/login`, `/signup`, `/invite/*` |
//! | `{root}` or the dev host | `/home{path}` for `home`/`dash`/`api`/`auth`, tenant path otherwise |
//! | `api.{root}` | `/api{path}` |
//! | any other subdomain | `/{label}{path}`, or untouched with `FALLBACK_POLICY=pass-through` |
//!
//! `/api/*`, `/auth/callback`, framework internals and root-level files like
//! `/favicon.ico` skip the router entirely.
//!
//!
//!
//! # Sessions
//!
//! - Session token in an `HttpOnly` cookie, looked up in Redis on every routed request
//! - Close to expiry? The key TTL is extended and a fresh cookie rides on whatever response goes out
//! - A Redis hiccup during the check counts as signed out, the dashboard fails closed
//!
//!
//!
//! # Notes
//!
//! ## Custom domains
//! A custom domain costs one Redis read per request. Not found and errors are
//! treated alike: the request passes through and 404s downstream. No retries.
//!
//! ## Local development
//! `acme.localhost:3000` is mapped onto `acme.{ROOT_DOMAIN}` before anything
//! else, so production-shaped hostnames can be tested locally.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 ROOT_DOMAIN=feedbase.app RUST_LOG=info cargo run -p backend
//! ```
//!
//! Load tenants.
//! ```sh
//! cargo run -p seed -- projects.json
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod decision;
pub mod error;
pub mod host;
pub mod matcher;
pub mod middleware;
pub mod request;
pub mod router;
pub mod routes;
pub mod session;
pub mod state;
pub mod tenant;

use config::Config;
use middleware::route_request;
use routes::{
    api_not_found_handler, auth_callback_handler, dash_handler, health_handler, home_handler,
    project_handler, sign_out_handler,
};
use state::AppState;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let app = build_app(state.clone());

    let address = format!("0.0.0.0:{}", state.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

/// Route trees behind the edge router.
///
/// The tenant router sits on an outer router whose only route is the fallback,
/// so it sees every request before the inner trees are matched against the
/// rewritten URI.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let trees = Router::new()
        .route("/", get(home_handler))
        .route("/home", get(home_handler))
        .route("/home/{*rest}", get(home_handler))
        .route("/dash", get(dash_handler))
        .route("/dash/{*rest}", get(dash_handler))
        .route("/auth/callback", get(auth_callback_handler))
        .route("/api/v1/auth/signout", post(sign_out_handler))
        .route("/api/{*rest}", get(api_not_found_handler))
        .route("/health", get(health_handler))
        .route("/{project}", get(project_handler))
        .route("/{project}/{*rest}", get(project_handler))
        .with_state(state.clone());

    Router::new()
        .fallback_service(trees)
        .layer(from_fn_with_state(state, route_request))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
