use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::MovieStore,
    error::{AppError, AppResult},
    models::{Movie, NewMovie, NewUser, Rating, Score, User, UserRef},
};

const MOVIE_COLUMNS: &str = "id, title, genre, release_year, description, poster_url";
const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, date_joined";
const RATING_COLUMNS: &str = "user_id, movie_id, score, created_at";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// `MovieStore` backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait::async_trait]
impl MovieStore for PgStore {
    async fn all_users(&self) -> AppResult<Vec<UserRef>> {
        let users = sqlx::query_as::<_, UserRef>(
            "SELECT id, username AS display_name FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn all_movies(&self) -> AppResult<Vec<Movie>> {
        let movies =
            sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        Ok(movies)
    }

    async fn all_ratings(&self) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn movies_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Movie>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ANY($1) ORDER BY title, id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn latest_movies(&self, limit: usize) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY id DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn find_movie(&self, id: i64) -> AppResult<Option<Movie>> {
        let movie =
            sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(movie)
    }

    async fn create_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let created = sqlx::query_as::<_, Movie>(&format!(
            r#"
            INSERT INTO movies (title, genre, release_year, description, poster_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MOVIE_COLUMNS}
            "#
        ))
        .bind(movie.title)
        .bind(movie.genre)
        .bind(movie.release_year)
        .bind(movie.description)
        .bind(movie.poster_url)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(movie_id = created.id, title = %created.title, "Movie created");
        Ok(created)
    }

    async fn delete_movie(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("This email is already registered.".to_string())
            } else {
                AppError::from(e)
            }
        })?;
        Ok(created)
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_rating(&self, user_id: i64, movie_id: i64) -> AppResult<Option<Rating>> {
        let rating = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = $1 AND movie_id = $2"
        ))
        .bind(user_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn ratings_for_user(&self, user_id: i64) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn upsert_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        score: Score,
    ) -> AppResult<Rating> {
        let rating = sqlx::query_as::<_, Rating>(&format!(
            r#"
            INSERT INTO ratings (user_id, movie_id, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, movie_id) DO UPDATE SET score = EXCLUDED.score
            RETURNING {RATING_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(movie_id)
        .bind(score.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound(format!("User {} or movie {}", user_id, movie_id))
            } else {
                AppError::from(e)
            }
        })?;

        tracing::debug!(user_id, movie_id, score = %score, "Rating saved");
        Ok(rating)
    }
}
