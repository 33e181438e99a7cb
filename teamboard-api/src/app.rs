/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use teamboard_api::{app::{build_router, AppState}, config::Config};
/// use teamboard_shared::{realtime::RealtimeHub, store::Storage};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(Storage::volatile()), Arc::new(RealtimeHub::new()), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth, security},
    routes,
};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method},
    middleware::Next,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use teamboard_shared::{
    realtime::RealtimeHub,
    store::{Repository, Storage},
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Multipart overhead allowed on top of a file ceiling
const MULTIPART_SLACK: usize = 64 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Dual-mode storage; pick the backing per call with [`AppState::repo`]
    pub storage: Arc<Storage>,

    /// Realtime fan-out hub
    pub hub: Arc<RealtimeHub>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(storage: Arc<Storage>, hub: Arc<RealtimeHub>, config: Config) -> Self {
        Self {
            storage,
            hub,
            config: Arc::new(config),
        }
    }

    /// The repository serving the current request
    pub fn repo(&self) -> &dyn Repository {
        self.storage.repo()
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /api/health                      # Liveness (public)
/// ├── /api/auth/                       # register, login, reset-password (public)
/// ├── /api/users/                      # directory and own profile
/// ├── /api/boards/                     # boards and sharing
/// ├── /api/messages/                   # direct messages
/// ├── /api/teams/                      # teams and joining
/// ├── /api/tasks/                      # team tasks, comments, attachments
/// ├── /api/admin/                      # user administration (admin only)
/// ├── /ws                              # realtime WebSocket
/// └── /uploads/*                       # uploaded files
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Gate (per router: `require_auth`, then `require_admin` for `/api/admin`)
pub fn build_router(state: AppState) -> Router {
    let require_auth = || axum::middleware::from_fn_with_state(state.clone(), auth::require_auth);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/reset-password", post(routes::auth::reset_password));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_directory))
        .route(
            "/me",
            get(routes::users::get_me).patch(routes::users::update_me),
        )
        .route(
            "/me/avatar",
            post(routes::users::upload_avatar).layer(DefaultBodyLimit::max(
                routes::uploads::AVATAR_MAX_BYTES + MULTIPART_SLACK,
            )),
        )
        .route(
            "/me/password",
            axum::routing::patch(routes::users::change_password),
        )
        .layer(require_auth());

    let board_routes = Router::new()
        .route(
            "/",
            get(routes::boards::list_boards).post(routes::boards::create_board),
        )
        .route(
            "/:id",
            get(routes::boards::get_board).put(routes::boards::update_board),
        )
        .route("/:id/share", post(routes::boards::share_board))
        .layer(require_auth());

    let message_routes = Router::new()
        .route("/unread/counts", get(routes::messages::unread_counts))
        .route(
            "/:user_id",
            get(routes::messages::conversation).post(routes::messages::send_message),
        )
        .route("/:user_id/read", post(routes::messages::mark_read))
        .layer(require_auth());

    let team_routes = Router::new()
        .route(
            "/",
            get(routes::teams::list_teams).post(routes::teams::create_team),
        )
        .route("/mine", get(routes::teams::my_teams))
        .route("/:id/join", post(routes::teams::join_team))
        .layer(require_auth());

    let task_routes = Router::new()
        .route(
            "/team/:team_id",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/:id/comments", post(routes::tasks::add_comment))
        .route(
            "/:id/attachments",
            post(routes::tasks::add_attachment).layer(DefaultBodyLimit::max(
                routes::uploads::ATTACHMENT_MAX_BYTES + MULTIPART_SLACK,
            )),
        )
        .layer(require_auth());

    let admin_routes = Router::new()
        .route(
            "/users",
            get(routes::admin::list_users).post(routes::admin::create_user),
        )
        .route("/users/new", post(routes::admin::create_user))
        .route(
            "/users/:id",
            get(routes::admin::get_user)
                .patch(routes::admin::update_user)
                .delete(routes::admin::delete_user),
        )
        .route("/stats", get(routes::admin::stats))
        .layer(axum::middleware::from_fn(auth::require_admin))
        .layer(require_auth());

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/boards", board_routes)
        .nest("/messages", message_routes)
        .nest("/teams", team_routes)
        .nest("/tasks", task_routes)
        .nest("/admin", admin_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(routes::socket::ws_handler))
        .nest_service("/uploads", ServeDir::new(&state.config.uploads.dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            security::security_headers(production, req, next)
        }))
        .with_state(state)
}
