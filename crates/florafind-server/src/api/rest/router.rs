//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Multipart framing and the non-image fields
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let limits = state.identify_limits;
    let identify_body_limit = limits
        .max_images
        .saturating_mul(limits.max_image_size)
        .saturating_add(MULTIPART_OVERHEAD);

    let auth_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/token", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route(
            "/password-reset-request",
            post(handlers::request_password_reset),
        )
        .route(
            "/password-reset",
            get(handlers::password_reset_form).post(handlers::reset_password),
        )
        .route("/me", get(handlers::get_me).put(handlers::update_me));

    let garden_routes = Router::new()
        .route(
            "/",
            get(handlers::list_gardens).post(handlers::create_garden),
        )
        .route(
            "/:id",
            get(handlers::get_garden)
                .put(handlers::update_garden)
                .delete(handlers::delete_garden),
        )
        .route(
            "/:id/plants",
            get(handlers::list_garden_plants).post(handlers::add_plant),
        )
        .route(
            "/plants/:plant_id",
            put(handlers::update_plant).delete(handlers::delete_plant),
        );

    let plant_routes = Router::new()
        .route("/", get(handlers::list_plants))
        .route("/:plant_id", get(handlers::get_plant))
        .route(
            "/:plant_id/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route("/notes/:note_id", put(handlers::update_note));

    let post_routes = Router::new()
        .route("/", get(handlers::list_posts).post(handlers::create_post))
        .route(
            "/:id",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        );

    // Build router with middleware
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route(
            "/identify",
            post(handlers::identify_plant).layer(DefaultBodyLimit::max(identify_body_limit)),
        )
        .nest("/auth", auth_routes)
        .nest("/gardens", garden_routes)
        .nest("/plants", plant_routes)
        .nest("/posts", post_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
