//! HTTP surface: shared state, router, and the task / auth handlers.
//!
//! `/auth/*` is public. Every `/tasks` route sits behind
//! [`auth::require_user`](crate::auth::require_user), so handlers only
//! ever see a verified [`AuthUser`] and pass its id into each store call.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use chrono::Utc;
use taskboard_proto::auth::{AuthResponse, Credentials};
use taskboard_proto::task::{DEFAULT_LIST, NewTask, StatusChange, Task, TaskId, TaskPatch};
use tracing::Instrument;

use crate::auth::{self, AuthUser, TokenKeys};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::store::{Store, StoreError, TaskDraft};

/// State shared by every handler.
pub struct AppState {
    /// Relational store for users and tasks.
    pub store: Store,
    /// Session token keys.
    pub keys: TokenKeys,
    /// bcrypt work factor for new accounts.
    pub bcrypt_cost: u32,
}

impl AppState {
    /// Assembles state from an opened store and the resolved configuration.
    #[must_use]
    pub fn new(store: Store, config: &ServerConfig) -> Self {
        Self {
            store,
            keys: TokenKeys::new(config.jwt_secret.as_bytes(), config.token_ttl),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    /// Opens the configured database file and assembles state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened.
    pub fn open(config: &ServerConfig) -> Result<Self, StoreError> {
        let store = Store::open(&config.database_path)?;
        Ok(Self::new(store, config))
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let tasks = Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .route("/tasks/{id}/status", patch(update_status))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_user,
        ));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .merge(tasks)
        .layer(middleware::from_fn(request_span))
        .with_state(state)
}

/// Start the HTTP server on the given address.
///
/// Returns the actual bound address and a join handle for the server task.
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>), std::io::Error> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Wraps each request in a span carrying a fresh request id.
async fn request_span(req: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        id = %uuid::Uuid::now_v7(),
        method = %req.method(),
        path = %req.uri().path(),
    );
    async move {
        let response = next.run(req).await;
        tracing::info!(status = response.status().as_u16(), "request finished");
        response
    }
    .instrument(span)
    .await
}

// ---------------------------------------------------------------------------
// Auth handlers
// ---------------------------------------------------------------------------

async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(creds) = body?;
    Ok(Json(auth::register(&state, creds).await?))
}

async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(creds) = body?;
    Ok(Json(auth::login(&state, creds).await?))
}

// ---------------------------------------------------------------------------
// Task handlers
// ---------------------------------------------------------------------------

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.store.list_tasks(user.id)?;
    tracing::debug!(user_id = user.id, count = tasks.len(), "listed tasks");
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = body?;
    let draft = draft_from(new)?;
    let task = state.store.insert_task(user.id, &draft)?;
    tracing::info!(user_id = user.id, task_id = %task.id, status = %task.status, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Path(id) = id?;
    let Json(mut patch) = body?;
    if let Some(title) = patch.title.take() {
        let title = title.trim();
        if title.is_empty() {
            return Err(ApiError::Validation("title cannot be empty".to_string()));
        }
        patch.title = Some(title.to_string());
    }
    let task = state
        .store
        .update_task(user.id, TaskId::new(id), &patch, Utc::now())?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(user_id = user.id, task_id = %task.id, "task updated");
    Ok(Json(task))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Path(id) = id?;
    let Json(change) = body?;
    let task = state
        .store
        .update_status(user.id, TaskId::new(id), &change, Utc::now())?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(
        user_id = user.id,
        task_id = %task.id,
        status = %task.status,
        order = task.order,
        "task moved"
    );
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if !state.store.delete_task(user.id, TaskId::new(id))? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(user_id = user.id, task_id = id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Applies creation defaults and checks the required fields.
fn draft_from(new: NewTask) -> Result<TaskDraft, ApiError> {
    let title = new.title.map(|t| t.trim().to_string()).unwrap_or_default();
    let (false, Some(status)) = (title.is_empty(), new.status) else {
        return Err(ApiError::Validation(
            "title and status are required".to_string(),
        ));
    };
    let now = Utc::now();
    Ok(TaskDraft {
        title,
        description: new.description.unwrap_or_default(),
        status,
        order: new.order.unwrap_or(0),
        deadline: new.deadline,
        list: new
            .list
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LIST.to_string()),
        created_at: new.created_at.unwrap_or(now),
        updated_at: new.updated_at.unwrap_or(now),
    })
}
