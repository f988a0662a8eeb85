use crate::{
    error::AppResult,
    models::{Movie, NewMovie, NewUser, Rating, Score, User, UserRef},
};

/// Data access for users, movies and ratings
///
/// The recommendation engine only needs the three "all" fetches plus
/// `movies_by_ids`; the rest backs the HTTP handlers. Implementations must
/// enforce one rating per (user, movie) pair and one account per email, and
/// must cascade user and movie deletion to the affected ratings.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieStore: Send + Sync {
    /// Every user, in a stable retrieval order (ascending id)
    async fn all_users(&self) -> AppResult<Vec<UserRef>>;

    /// Every movie, in a stable retrieval order (ascending id)
    async fn all_movies(&self) -> AppResult<Vec<Movie>>;

    async fn all_ratings(&self) -> AppResult<Vec<Rating>>;

    /// Movies whose id is in `ids`, ordered by title. Unknown ids are ignored.
    async fn movies_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Movie>>;

    /// The most recently added movies, newest first
    async fn latest_movies(&self, limit: usize) -> AppResult<Vec<Movie>>;

    async fn find_movie(&self, id: i64) -> AppResult<Option<Movie>>;

    async fn create_movie(&self, movie: NewMovie) -> AppResult<Movie>;

    /// Returns false when no such movie existed
    async fn delete_movie(&self, id: i64) -> AppResult<bool>;

    async fn find_user(&self, id: i64) -> AppResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Fails with `AppError::Conflict` when the email is already registered
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    /// Returns false when no such user existed
    async fn delete_user(&self, id: i64) -> AppResult<bool>;

    async fn find_rating(&self, user_id: i64, movie_id: i64) -> AppResult<Option<Rating>>;

    /// A user's ratings, newest first
    async fn ratings_for_user(&self, user_id: i64) -> AppResult<Vec<Rating>>;

    /// Creates the rating or replaces the score of the existing one.
    /// Fails with `AppError::NotFound` when the user or movie does not exist.
    async fn upsert_rating(&self, user_id: i64, movie_id: i64, score: Score)
        -> AppResult<Rating>;
}
