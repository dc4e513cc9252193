pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use state::AppState;

/// Complete router: public routes, JWT-protected routes and global layers.
pub fn app(state: AppState) -> Router {
    let api = &state.config.api;
    let body_limit = DefaultBodyLimit::max(api.max_request_size_bytes);
    let request_logging = api.enable_request_logging;
    let cors = cors_layer(&state.config.security.cors_origins);

    let router = Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        .with_state(state)
        // Global middleware
        .layer(body_limit)
        .layer(cors);

    if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/auth/sign-up", post(auth::sign_up_post))
        .route("/auth/sign-in", post(auth::sign_in_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(user_routes())
        .merge(dashboard_routes())
        .route_layer(from_fn_with_state(state, middleware::jwt_auth_middleware))
}

fn user_routes() -> Router<AppState> {
    use handlers::protected::users;

    Router::new().route("/users/me", get(users::whoami_get))
}

fn dashboard_routes() -> Router<AppState> {
    use handlers::protected::dashboard;

    Router::new()
        .route(
            "/dashboard",
            get(dashboard::boards_get).post(dashboard::boards_post),
        )
        .route(
            "/dashboard/:board_id",
            get(dashboard::board_get)
                .put(dashboard::board_put)
                .delete(dashboard::board_delete)
                .post(dashboard::list_post),
        )
        .route(
            "/dashboard/:board_id/:list_id",
            put(dashboard::list_put)
                .delete(dashboard::list_delete)
                .post(dashboard::card_post),
        )
        .route(
            "/dashboard/:board_id/:list_id/:card_id",
            put(dashboard::card_put).delete(dashboard::card_delete),
        )
        .route(
            "/dashboard/:board_id/:list_id/:card_id/move",
            put(dashboard::card_move),
        )
        .route(
            "/dashboard/cards/:board_id/move/:card_id",
            put(dashboard::card_move_by_board),
        )
}
