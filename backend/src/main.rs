//! DeptSync Backend
//!
//! REST backend for departmental project tracking: tasks, timeline events,
//! weekly reports and inspirations, with SQLite persistence, Tantivy
//! full-text search and AI-assisted report drafting.

mod ai;
mod api;
mod archive;
mod auth;
mod board;
mod clock;
mod config;
mod dashboard;
mod db;
mod errors;
mod listing;
mod models;
mod reporting;
mod search;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ai::{OpenAiClient, ReportService};
use auth::TokenSigner;
use clock::Clock;
use config::Config;
use db::{EventQuery, Repository};
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
    pub clock: Clock,
    pub ai: Arc<ReportService>,
    pub tokens: Arc<TokenSigner>,
}

/// Slack on top of the upload limit for multipart framing and text fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DeptSync Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.uses_default_secret() {
        tracing::warn!("DEPTSYNC_TOKEN_SECRET is not set. Tokens are signed with the built-in default!");
    }
    if config.ai.api_key.is_none() {
        tracing::warn!("No AI key configured (DEPTSYNC_OPENAI_API_KEY). Report generation will return a fallback notice.");
    }

    let bind_addr = config.bind_addr;
    let state = build_state(config).await?;

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Open storage, seed the administrator, build the search index and wire
/// the AI client.
pub async fn build_state(config: Config) -> Result<AppState, Box<dyn std::error::Error>> {
    let clock = Clock::new(config.utc_offset);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let admin_hash = auth::hash_password(&config.admin_password)?;
    if repo.ensure_admin(&admin_hash, clock.now()).await? {
        tracing::info!("Seeded administrator account '{}'", db::ADMIN_JOB_NUMBER);
    }

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build initial search index from database
    tracing::info!("Building search index...");
    let reports = repo.list_reports(None).await?;
    let events = repo.list_events(&EventQuery::default()).await?;
    let projects = repo.list_projects().await?;
    search.rebuild(&reports, &events, &projects).await?;

    let generator = OpenAiClient::new(&config.ai)?;
    let ai = Arc::new(ReportService::new(Arc::new(generator)));

    let tokens = Arc::new(TokenSigner::new(&config.token_secret, config.token_ttl));

    Ok(AppState {
        repo,
        search,
        config: Arc::new(config),
        clock,
        ai,
        tokens,
    })
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    // Routes reachable without a token
    let public_routes = Router::new()
        .route("/auth/login", post(api::login))
        .route("/auth/register", post(api::register))
        .route("/files/content/{*path}", get(api::file_content));

    // API routes
    let protected_routes = Router::new()
        .route("/auth/me", get(api::me))
        // Datastore
        .route("/datastore", get(api::get_datastore))
        .route("/datastore/revision", get(api::get_revision))
        // Users
        .route("/users", get(api::list_users))
        .route("/users/{id}", get(api::get_user).put(api::update_user))
        .route("/users/{id}/promote", post(api::promote_user))
        // Projects
        .route("/projects", get(api::list_projects).post(api::create_project))
        .route(
            "/projects/{id}",
            get(api::get_project)
                .put(api::update_project)
                .delete(api::delete_project),
        )
        .route("/projects/{id}/folders", get(api::project_folders))
        // Tasks
        .route("/tasks", get(api::list_tasks).post(api::create_task))
        .route("/tasks/board", get(api::task_board))
        .route(
            "/tasks/{id}",
            get(api::get_task)
                .put(api::update_task)
                .delete(api::delete_task),
        )
        .route("/tasks/{id}/progress", post(api::update_progress))
        // Timeline events
        .route("/events", get(api::list_events).post(api::create_event))
        .route(
            "/events/{id}",
            put(api::update_event).delete(api::delete_event),
        )
        .route(
            "/events/{id}/attachments/{index}/folder",
            put(api::move_attachment),
        )
        // Weekly reports
        .route("/reports", get(api::list_reports).post(api::create_report))
        .route("/reports/export", get(api::export_reports))
        .route("/reports/{id}", delete(api::delete_report))
        // Inspirations
        .route(
            "/inspirations",
            get(api::list_inspirations).post(api::create_inspiration),
        )
        .route("/inspirations/tags", get(api::inspiration_tags))
        .route(
            "/inspirations/{id}",
            put(api::update_inspiration).delete(api::delete_inspiration),
        )
        // AI report generation
        .route("/llm/dept-monthly-report", post(api::dept_monthly_report))
        .route("/llm/project-weekly-report", post(api::project_weekly_report))
        .route("/llm/project-report", post(api::project_report))
        .route("/llm/personal-report", post(api::personal_report))
        .route("/llm/generate-report", post(api::generate_report))
        // Files
        .route(
            "/files/upload",
            post(api::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Search and dashboard
        .route("/search", get(api::search))
        .route("/dashboard", get(api::get_dashboard))
        // Bearer-token authentication
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
