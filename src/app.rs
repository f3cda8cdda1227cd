use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use std::{env, net::SocketAddr, sync::Arc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{self, Capability, Identity};
use crate::catalog::{CatalogError, CatalogService};
use crate::models::{ListQuery, MovieInput, MoviePatch};
use crate::store::{MemoryStore, MovieStore};
use crate::validation::{self, ValidationError};

const MAX_BODY_BYTES: usize = 64 * 1024;
const DEFAULT_PORT: u16 = 3000;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub auth_secret: String,
}

pub async fn run_server() -> Result<()> {
    let auth_secret = env::var("CATALOG_AUTH_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("CATALOG_AUTH_SECRET must be set"))?;

    let store: Arc<dyn MovieStore> = Arc::new(MemoryStore::default());
    let state = AppState {
        catalog: CatalogService::new(store),
        auth_secret,
    };

    let app = build_router(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/movies", post(create_movie).get(list_movies))
        .route(
            "/movies/:id",
            get(get_movie).patch(update_movie).delete(delete_movie),
        )
        .route("/movies/vote/:id", patch(vote_movie))
        .route("/movies/unvote/:id", patch(unvote_movie))
        .route("/health", get(health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::limit::RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// HTTP-facing failure. Catalog errors keep their taxonomy; the rest covers
/// authentication, authorization and body validation.
#[derive(Debug)]
pub enum ApiError {
    Catalog(CatalogError),
    Unauthorized,
    Forbidden,
    Validation(ValidationError),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Catalog(CatalogError::NotFound) => (
                StatusCode::NOT_FOUND,
                CatalogError::NotFound.code(),
                CatalogError::NotFound.to_string(),
            ),
            ApiError::Catalog(err) => (StatusCode::BAD_REQUEST, err.code(), err.to_string()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Please authenticate".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Forbidden".to_string(),
            ),
            ApiError::Validation(err) => {
                (StatusCode::BAD_REQUEST, "VALIDATION", err.to_string())
            }
        };
        (
            status,
            Json(json!({"status": "error", "code": code, "message": message})),
        )
            .into_response()
    }
}

type AuthHeader = Option<TypedHeader<Authorization<Bearer>>>;

fn authorize(
    state: &AppState,
    bearer: &AuthHeader,
    capability: Capability,
) -> Result<Identity, ApiError> {
    let token = bearer
        .as_ref()
        .map(|TypedHeader(Authorization(b))| b.token())
        .ok_or(ApiError::Unauthorized)?;
    let identity = auth::verify_token(token, &state.auth_secret).ok_or_else(|| {
        warn!("Rejected request with an invalid bearer token");
        ApiError::Unauthorized
    })?;
    if !auth::role_allows(identity.role, capability) {
        warn!(
            "'{}' ({}) lacks the required capability",
            identity.user_name,
            identity.role.as_str()
        );
        return Err(ApiError::Forbidden);
    }
    Ok(identity)
}

async fn create_movie(
    State(state): State<AppState>,
    bearer: AuthHeader,
    Json(input): Json<MovieInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &bearer, Capability::ManageMovies)?;
    let input = validation::validate_create(input)?;
    let movie = state.catalog.create(input).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (filter, options) = query.split();
    Json(state.catalog.query(&filter, &options).await)
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let movie = state.catalog.get_by_id(id).await?;
    Ok(Json(movie))
}

async fn update_movie(
    State(state): State<AppState>,
    bearer: AuthHeader,
    Path(id): Path<Uuid>,
    Json(patch): Json<MoviePatch>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &bearer, Capability::ManageMovies)?;
    let patch = validation::validate_patch(patch)?;
    let movie = state.catalog.update_by_id(id, patch).await?;
    Ok(Json(movie))
}

async fn delete_movie(
    State(state): State<AppState>,
    bearer: AuthHeader,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &bearer, Capability::ManageMovies)?;
    state.catalog.delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn vote_movie(
    State(state): State<AppState>,
    bearer: AuthHeader,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authorize(&state, &bearer, Capability::VoteMovies)?;
    let movie = state.catalog.vote_by_id(id, &identity.user_name).await?;
    Ok(Json(movie))
}

async fn unvote_movie(
    State(state): State<AppState>,
    bearer: AuthHeader,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authorize(&state, &bearer, Capability::VoteMovies)?;
    let movie = state.catalog.unvote_by_id(id, &identity.user_name).await?;
    Ok(Json(movie))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
