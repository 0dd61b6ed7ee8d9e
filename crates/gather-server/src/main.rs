use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use gather_api::auth::{self, AppState, AppStateInner};
use gather_api::middleware::require_auth;
use gather_api::{bookings, events, users};
use gather_types::api::MessageResponse;

/// Server-wide configuration, read from the environment exactly once at
/// startup and injected from here — the signing secret and CORS
/// allow-list are never read ad hoc downstream.
struct Config {
    host: String,
    port: u16,
    db_path: String,
    jwt_secret: String,
    frontend_url: String,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = match std::env::var("GATHER_JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                warn!("GATHER_JWT_SECRET not set, using development secret");
                "dev-secret-change-me".into()
            }
        };
        Ok(Self {
            host: std::env::var("GATHER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("GATHER_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            db_path: std::env::var("GATHER_DB_PATH").unwrap_or_else(|_| "gather.db".into()),
            jwt_secret,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:1234".into()),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gather=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = gather_db::Database::open(&PathBuf::from(&config.db_path))?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
    });

    let app = router(state, &config)?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Gather server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/signin", post(auth::signin))
        .route("/events", get(events::list_events))
        .route("/events/{id}", get(events::get_event))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/validate", get(auth::validate))
        .route("/events", post(events::create_event))
        .route(
            "/events/{id}",
            put(events::update_event).delete(events::delete_event),
        )
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/guest", get(bookings::guest_bookings))
        .route("/bookings/host", get(bookings::host_bookings))
        .route("/bookings/{id}/cancel", put(bookings::cancel_booking))
        .route("/bookings/{id}/notes", put(bookings::set_host_notes))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user).put(users::update_user))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    warn!("404 - route not found: {} {}", method, uri);
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse {
            message: format!("Cannot {method} {uri}"),
        }),
    )
}
