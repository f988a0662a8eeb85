use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Accounts
        .route("/users/register", post(handlers::register))
        .route("/users/login", post(handlers::login))
        .route("/users/me", get(handlers::profile))
        .route("/users/:user_id", delete(handlers::delete_user))
        // Catalogue and ratings
        .route("/movies", get(handlers::list_movies).post(handlers::create_movie))
        .route(
            "/movies/:movie_id",
            get(handlers::movie_detail).delete(handlers::delete_movie),
        )
        .route("/movies/:movie_id/rating", post(handlers::rate_movie))
        // Recommendations
        .route("/recommendations", get(handlers::user_recommendations))
        .route("/similar-movies/:movie_id", get(handlers::similar_movies))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
