use crate::{
    db::MovieStore,
    error::AppResult,
    models::{sort_by_title, Movie},
    services::recommendation_engine::RecommendationEngine,
};

/// Number of results when the caller does not ask for a specific count
pub const DEFAULT_COUNT: usize = 5;

/// Generates personalized movie recommendations for a user
///
/// A fresh engine is built from the current store contents on every call.
/// The engine ranks candidates by boost; the returned movies are ordered by
/// title for display. An empty list means no recommendation is available.
pub async fn user_recommendations(
    store: &dyn MovieStore,
    user_id: i64,
    count: usize,
) -> AppResult<Vec<Movie>> {
    let engine = RecommendationEngine::load(store).await?;
    let ranked = engine.recommend_for_user(user_id, count);

    tracing::info!(
        user_id,
        requested = count,
        found = ranked.len(),
        "Computed user recommendations"
    );

    resolve_movies(store, &ranked).await
}

/// Finds movies rated most like the given one, ordered by title
pub async fn similar_movies(
    store: &dyn MovieStore,
    movie_id: i64,
    count: usize,
) -> AppResult<Vec<Movie>> {
    let engine = RecommendationEngine::load(store).await?;
    let ranked = engine.similar_movies(movie_id, count);

    tracing::info!(
        movie_id,
        requested = count,
        found = ranked.len(),
        "Computed similar movies"
    );

    resolve_movies(store, &ranked).await
}

async fn resolve_movies(store: &dyn MovieStore, ids: &[i64]) -> AppResult<Vec<Movie>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut movies = store.movies_by_ids(ids).await?;
    sort_by_title(&mut movies);
    Ok(movies)
}
