use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    db::MovieStore,
    error::{AppError, AppResult},
    models::{sort_by_title, Movie, NewMovie, NewUser, Rating, Score, User, UserRef},
};

/// In-process `MovieStore` used by tests and `STORE=memory` runs
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

/// Tables that can be modified
#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    movies: BTreeMap<i64, Movie>,
    /// Insertion order; at most one entry per (user, movie)
    ratings: Vec<Rating>,
    last_user_id: i64,
    last_movie_id: i64,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MovieStore for MemoryStore {
    async fn all_users(&self) -> AppResult<Vec<UserRef>> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().map(UserRef::from).collect())
    }

    async fn all_movies(&self) -> AppResult<Vec<Movie>> {
        let tables = self.inner.read().await;
        Ok(tables.movies.values().cloned().collect())
    }

    async fn all_ratings(&self) -> AppResult<Vec<Rating>> {
        let tables = self.inner.read().await;
        Ok(tables.ratings.iter().rev().cloned().collect())
    }

    async fn movies_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Movie>> {
        let tables = self.inner.read().await;
        let mut movies: Vec<Movie> = tables
            .movies
            .values()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect();
        sort_by_title(&mut movies);
        Ok(movies)
    }

    async fn latest_movies(&self, limit: usize) -> AppResult<Vec<Movie>> {
        let tables = self.inner.read().await;
        Ok(tables.movies.values().rev().take(limit).cloned().collect())
    }

    async fn find_movie(&self, id: i64) -> AppResult<Option<Movie>> {
        let tables = self.inner.read().await;
        Ok(tables.movies.get(&id).cloned())
    }

    async fn create_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let mut tables = self.inner.write().await;
        tables.last_movie_id += 1;
        let movie = movie.into_movie(tables.last_movie_id);
        tables.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn delete_movie(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.inner.write().await;
        if tables.movies.remove(&id).is_none() {
            return Ok(false);
        }
        tables.ratings.retain(|r| r.movie_id != id);
        Ok(true)
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.inner.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(
                "This email is already registered.".to_string(),
            ));
        }
        tables.last_user_id += 1;
        let user = user.into_user(tables.last_user_id, Utc::now());
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.inner.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.ratings.retain(|r| r.user_id != id);
        Ok(true)
    }

    async fn find_rating(&self, user_id: i64, movie_id: i64) -> AppResult<Option<Rating>> {
        let tables = self.inner.read().await;
        Ok(tables
            .ratings
            .iter()
            .find(|r| r.user_id == user_id && r.movie_id == movie_id)
            .cloned())
    }

    async fn ratings_for_user(&self, user_id: i64) -> AppResult<Vec<Rating>> {
        let tables = self.inner.read().await;
        let mut ratings: Vec<Rating> = tables
            .ratings
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ratings)
    }

    async fn upsert_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        score: Score,
    ) -> AppResult<Rating> {
        let mut tables = self.inner.write().await;
        if !tables.users.contains_key(&user_id) || !tables.movies.contains_key(&movie_id) {
            return Err(AppError::NotFound(format!(
                "User {} or movie {}",
                user_id, movie_id
            )));
        }

        if let Some(existing) = tables
            .ratings
            .iter_mut()
            .find(|r| r.user_id == user_id && r.movie_id == movie_id)
        {
            existing.score = score;
            return Ok(existing.clone());
        }

        let rating = Rating {
            user_id,
            movie_id,
            score,
            created_at: Utc::now(),
        };
        tables.ratings.push(rating.clone());
        Ok(rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "not-a-real-hash".to_string(),
        }
    }

    fn score(value: i64) -> Score {
        Score::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_ids_are_assigned_in_order() {
        let store = MemoryStore::new();
        let a = store.create_movie(NewMovie::titled("Alien")).await.unwrap();
        let b = store.create_movie(NewMovie::titled("Brazil")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let ids: Vec<i64> = store.all_movies().await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("ada@example.com")).await.unwrap();
        let err = store
            .create_user(new_user("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_rating_per_pair() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ada@example.com")).await.unwrap();
        let movie = store.create_movie(NewMovie::titled("Heat")).await.unwrap();

        let first = store.upsert_rating(user.id, movie.id, score(2)).await.unwrap();
        let second = store.upsert_rating(user.id, movie.id, score(5)).await.unwrap();

        assert_eq!(second.score, score(5));
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(store.all_ratings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_ratings_newest_first() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada@example.com")).await.unwrap();
        let heat = store.create_movie(NewMovie::titled("Heat")).await.unwrap();
        let alien = store.create_movie(NewMovie::titled("Alien")).await.unwrap();
        let brazil = store.create_movie(NewMovie::titled("Brazil")).await.unwrap();

        for movie in [&heat, &alien, &brazil] {
            store.upsert_rating(ada.id, movie.id, score(3)).await.unwrap();
        }
        // Re-rating keeps its first position
        store.upsert_rating(ada.id, heat.id, score(5)).await.unwrap();

        let order: Vec<i64> = store
            .all_ratings()
            .await
            .unwrap()
            .iter()
            .map(|r| r.movie_id)
            .collect();
        assert_eq!(order, vec![brazil.id, alien.id, heat.id]);
        assert_eq!(store.ratings_for_user(ada.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_upsert_unknown_movie_is_not_found() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ada@example.com")).await.unwrap();
        let err = store.upsert_rating(user.id, 42, score(3)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_ratings() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada@example.com")).await.unwrap();
        let bob = store.create_user(new_user("bob@example.com")).await.unwrap();
        let heat = store.create_movie(NewMovie::titled("Heat")).await.unwrap();
        let alien = store.create_movie(NewMovie::titled("Alien")).await.unwrap();

        store.upsert_rating(ada.id, heat.id, score(4)).await.unwrap();
        store.upsert_rating(ada.id, alien.id, score(3)).await.unwrap();
        store.upsert_rating(bob.id, heat.id, score(5)).await.unwrap();

        assert!(store.delete_movie(heat.id).await.unwrap());
        assert_eq!(store.all_ratings().await.unwrap().len(), 1);

        assert!(store.delete_user(ada.id).await.unwrap());
        assert!(store.all_ratings().await.unwrap().is_empty());

        assert!(!store.delete_user(ada.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_movies_by_ids_ordered_by_title() {
        let store = MemoryStore::new();
        let zodiac = store.create_movie(NewMovie::titled("Zodiac")).await.unwrap();
        store.create_movie(NewMovie::titled("Brazil")).await.unwrap();
        let alien = store.create_movie(NewMovie::titled("Alien")).await.unwrap();

        let movies = store.movies_by_ids(&[zodiac.id, alien.id, 99]).await.unwrap();
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Alien", "Zodiac"]);
    }

    #[tokio::test]
    async fn test_latest_movies_newest_first() {
        let store = MemoryStore::new();
        for title in ["A", "B", "C"] {
            store.create_movie(NewMovie::titled(title)).await.unwrap();
        }
        let latest = store.latest_movies(2).await.unwrap();
        let ids: Vec<i64> = latest.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }
}
