use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod comment_tree;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod policy;
pub mod repository;
pub mod response;
pub mod storage;

// Routers split by access level (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document assembled from the `#[utoipa::path]` handlers and `ToSchema` models,
/// served at `/api-docs/openapi.json` and browsable under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::register_user, handlers::users::login_user, handlers::users::get_me,
        handlers::users::get_user,
        handlers::posts::get_posts, handlers::posts::get_post_details,
        handlers::posts::get_my_posts, handlers::posts::create_post,
        handlers::posts::update_post, handlers::posts::delete_post,
        handlers::posts::like_post, handlers::posts::unlike_post,
        handlers::posts::get_thumbnail_upload_url,
        handlers::comments::add_comment, handlers::comments::delete_comment,
        handlers::comments::get_post_comments,
        handlers::taxonomy::create_category, handlers::taxonomy::get_categories,
        handlers::taxonomy::create_tag, handlers::taxonomy::get_tags,
        handlers::admin::get_admin_stats, handlers::admin::get_admin_posts,
        handlers::admin::approve_post, handlers::admin::reject_post,
        handlers::admin::list_users, handlers::admin::create_user,
    ),
    components(
        schemas(
            models::User, models::Role, models::Post, models::PostStatus, models::Comment,
            models::Category, models::Tag, models::Like, models::RegisterRequest,
            models::LoginRequest, models::LoginResponse, models::CreatePostRequest,
            models::UpdatePostRequest, models::CreateCommentRequest,
            models::CreateCategoryRequest, models::CreateTagRequest,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::CommentDeletion, models::AdminDashboardStats,
        )
    ),
    tags(
        (name = "blog", description = "Blogging platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Object storage for post thumbnails.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` can be extracted. Handlers behind it
/// extract `AuthUser` again to learn who is calling.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Builds the full application: docs, the three access-level routers, and the request-id,
/// tracing and CORS layers around them.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes().route_layer(auth_layer.clone()))
        .nest("/admin", admin::admin_routes().route_layer(auth_layer))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, tagged with the `x-request-id` set by the layer above so that
/// every log line of the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
