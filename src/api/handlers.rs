use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{sort_by_title, Movie, NewMovie, Rating, Score, User},
    services::{
        accounts::{self, Registration},
        recommendations,
    },
};

use super::{
    extract::{CurrentUser, MaybeUser},
    AppState,
};

// Request/Response types

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            date_joined: user.date_joined,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub ratings: Vec<Rating>,
}

#[derive(Debug, Serialize)]
pub struct MovieDetailResponse {
    #[serde(flatten)]
    pub movie: Movie,
    pub current_rating: Option<Score>,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Movie>,
    /// Latest movies, offered only when there are no recommendations
    pub fallback: Vec<Movie>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SimilarMoviesResponse {
    pub movie: Movie,
    pub similar_movies: Vec<Movie>,
}

async fn require_movie(state: &AppState, movie_id: i64) -> AppResult<Movie> {
    state
        .store
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie {}", movie_id)))
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<Registration>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = accounts::register(state.store.as_ref(), form).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Check credentials and return the matching account
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = accounts::authenticate(state.store.as_ref(), &request.email, &request.password)
        .await?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(UserResponse::from(&user)))
}

/// The acting user's account and ratings
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ProfileResponse>> {
    let ratings = state.store.ratings_for_user(user.id).await?;
    Ok(Json(ProfileResponse {
        user: UserResponse::from(&user),
        ratings,
    }))
}

/// Delete an account together with its ratings
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<StatusCode> {
    if state.store.delete_user(user_id).await? {
        tracing::info!(user_id, "User deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("User {}", user_id)))
    }
}

/// All movies, ordered by title
pub async fn list_movies(State(state): State<AppState>) -> AppResult<Json<Vec<Movie>>> {
    let mut movies = state.store.all_movies().await?;
    sort_by_title(&mut movies);
    Ok(Json(movies))
}

/// Add a movie to the catalogue
pub async fn create_movie(
    State(state): State<AppState>,
    Json(request): Json<NewMovie>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }
    let movie = state.store.create_movie(request).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// A movie with the acting user's rating, if any
pub async fn movie_detail(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Json<MovieDetailResponse>> {
    let movie = require_movie(&state, movie_id).await?;

    let current_rating = match user {
        Some(user) => state
            .store
            .find_rating(user.id, movie_id)
            .await?
            .map(|r| r.score),
        None => None,
    };

    Ok(Json(MovieDetailResponse {
        movie,
        current_rating,
    }))
}

/// Delete a movie together with its ratings
pub async fn delete_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
) -> AppResult<StatusCode> {
    if state.store.delete_movie(movie_id).await? {
        tracing::info!(movie_id, "Movie deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Movie {}", movie_id)))
    }
}

/// Create or update the acting user's rating of a movie
pub async fn rate_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<RateRequest>,
) -> AppResult<Json<Rating>> {
    let score = Score::new(request.score).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    require_movie(&state, movie_id).await?;

    let rating = state.store.upsert_rating(user.id, movie_id, score).await?;

    tracing::info!(
        user_id = user.id,
        movie_id,
        score = %score,
        "Rating saved"
    );

    Ok(Json(rating))
}

/// Personalized recommendations for the acting user
pub async fn user_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CountQuery>,
) -> AppResult<Json<RecommendationsResponse>> {
    let count = query.count.unwrap_or(state.recommendation_count);

    tracing::info!(
        request_id = %request_id,
        user_id = user.id,
        count,
        "Processing recommendation request"
    );

    let recommendations =
        recommendations::user_recommendations(state.store.as_ref(), user.id, count).await?;

    if !recommendations.is_empty() {
        return Ok(Json(RecommendationsResponse {
            recommendations,
            fallback: Vec::new(),
            message: None,
        }));
    }

    let fallback = state.store.latest_movies(state.popular_count).await?;
    Ok(Json(RecommendationsResponse {
        recommendations,
        fallback,
        message: Some(
            "Not enough rating data to generate recommendations yet. Rate more movies!"
                .to_string(),
        ),
    }))
}

/// Movies rated most like the given one
pub async fn similar_movies(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(movie_id): Path<i64>,
    Query(query): Query<CountQuery>,
) -> AppResult<Json<SimilarMoviesResponse>> {
    let movie = require_movie(&state, movie_id).await?;
    let count = query.count.unwrap_or(state.recommendation_count);

    tracing::info!(
        request_id = %request_id,
        movie_id,
        count,
        "Processing similar movies request"
    );

    let similar_movies =
        recommendations::similar_movies(state.store.as_ref(), movie_id, count).await?;

    Ok(Json(SimilarMoviesResponse {
        movie,
        similar_movies,
    }))
}
