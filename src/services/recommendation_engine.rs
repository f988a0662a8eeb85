//! Collaborative filtering over a dense user x movie rating matrix.
//!
//! The engine is a point-in-time snapshot: it is built from every user, movie
//! and rating the store holds, and later writes are not visible to it. Build a
//! new engine to see new ratings.
//!
//! Matrix rows follow the order users were retrieved in, columns the order
//! movies were retrieved in. A cell holds the rating score, or 0.0 when the
//! user has not rated the movie. Zero therefore doubles as "unrated" and as
//! the lowest possible weight in the similarity computation.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::{
    db::MovieStore,
    error::AppResult,
    models::{Movie, Rating, UserRef},
};

/// Similarity assigned to the target itself so it sorts last
const SELF_SIMILARITY: f64 = -1.0;

/// Immutable rating snapshot with user-user and movie-movie similarity lookups
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    user_ids: Vec<i64>,
    movie_ids: Vec<i64>,
    user_index: HashMap<i64, usize>,
    movie_index: HashMap<i64, usize>,
    matrix: Array2<f64>,
}

impl RecommendationEngine {
    /// Loads a full snapshot from the store and builds the rating matrix.
    ///
    /// Store failures are returned to the caller unchanged.
    pub async fn load(store: &dyn MovieStore) -> AppResult<Self> {
        let users = store.all_users().await?;
        let movies = store.all_movies().await?;
        let ratings = store.all_ratings().await?;
        Ok(Self::new(&users, &movies, &ratings))
    }

    /// Builds the rating matrix from an in-memory snapshot.
    ///
    /// Ratings that reference a user or movie missing from the snapshot are
    /// skipped; they never cause an error.
    pub fn new(users: &[UserRef], movies: &[Movie], ratings: &[Rating]) -> Self {
        let user_ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let movie_ids: Vec<i64> = movies.iter().map(|m| m.id).collect();

        let user_index: HashMap<i64, usize> =
            user_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let movie_index: HashMap<i64, usize> =
            movie_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut matrix = Array2::<f64>::zeros((user_ids.len(), movie_ids.len()));
        let mut orphaned = 0usize;

        for rating in ratings {
            match (
                user_index.get(&rating.user_id),
                movie_index.get(&rating.movie_id),
            ) {
                (Some(&row), Some(&col)) => matrix[[row, col]] = f64::from(rating.score.get()),
                _ => orphaned += 1,
            }
        }

        tracing::debug!(
            users = user_ids.len(),
            movies = movie_ids.len(),
            ratings = ratings.len() - orphaned,
            orphaned,
            "Rating matrix built"
        );

        Self {
            user_ids,
            movie_ids,
            user_index,
            movie_index,
            matrix,
        }
    }

    /// (users, movies) dimensions of the rating matrix
    #[cfg(test)]
    pub(crate) fn shape(&self) -> (usize, usize) {
        self.matrix.dim()
    }

    /// Score stored in the snapshot, 0.0 when unrated; `None` for unknown ids
    #[cfg(test)]
    pub(crate) fn score(&self, user_id: i64, movie_id: i64) -> Option<f64> {
        let row = *self.user_index.get(&user_id)?;
        let col = *self.movie_index.get(&movie_id)?;
        Some(self.matrix[[row, col]])
    }

    /// Other users ordered by descending cosine similarity to `user_id`,
    /// truncated to `count`. Empty for unknown users.
    #[cfg(test)]
    pub(crate) fn similar_users(&self, user_id: i64, count: usize) -> Vec<i64> {
        let Some(&user_idx) = self.user_index.get(&user_id) else {
            return Vec::new();
        };

        self.user_neighbors(user_idx)
            .into_iter()
            .take(count)
            .map(|(idx, _)| self.user_ids[idx])
            .collect()
    }

    /// Ranks movies the user has not rated, best first.
    ///
    /// Neighbors are visited from most to least similar. Every movie a
    /// neighbor rated and the user did not becomes a candidate, and its boost
    /// grows by that neighbor's similarity each time it is seen again. The walk
    /// stops as soon as `count` distinct candidates exist, so a movie only
    /// reachable through a less similar neighbor can be missed even if its
    /// total boost would have been higher. The result is an approximate top-k
    /// sorted by boost.
    ///
    /// Returns nothing for an unknown user or a user without ratings.
    pub fn recommend_for_user(&self, user_id: i64, count: usize) -> Vec<i64> {
        let Some(&user_idx) = self.user_index.get(&user_id) else {
            tracing::debug!(user_id, "Unknown user, no recommendations");
            return Vec::new();
        };

        let target = self.matrix.row(user_idx);
        if target.iter().all(|&score| score == 0.0) {
            tracing::debug!(user_id, "User has no ratings, no recommendations");
            return Vec::new();
        }

        let neighbors = self.user_neighbors(user_idx);
        tracing::debug!(
            user_id,
            nearest = ?neighbors.first().map(|&(idx, similarity)| (self.user_ids[idx], similarity)),
            "Walking rating neighbors"
        );

        let mut boosts: Vec<(usize, f64)> = Vec::new();
        let mut positions: HashMap<usize, usize> = HashMap::new();

        'neighbors: for (neighbor, similarity) in neighbors {
            if boosts.len() >= count {
                break;
            }

            for (movie_idx, &score) in self.matrix.row(neighbor).iter().enumerate() {
                if score <= 0.0 || target[movie_idx] > 0.0 {
                    continue;
                }
                if boosts.len() >= count {
                    break 'neighbors;
                }

                match positions.entry(movie_idx) {
                    Entry::Occupied(pos) => boosts[*pos.get()].1 += similarity,
                    Entry::Vacant(slot) => {
                        slot.insert(boosts.len());
                        boosts.push((movie_idx, similarity));
                    }
                }
            }
        }

        // Stable: equal boosts keep the order candidates were found in.
        boosts.sort_by(|a, b| b.1.total_cmp(&a.1));

        boosts
            .into_iter()
            .take(count)
            .map(|(movie_idx, _)| self.movie_ids[movie_idx])
            .collect()
    }

    /// Movies ordered by descending cosine similarity of their rating columns
    /// to `movie_id`'s column, excluding the movie itself, truncated to
    /// `count`. Empty for unknown movies.
    pub fn similar_movies(&self, movie_id: i64, count: usize) -> Vec<i64> {
        let Some(&movie_idx) = self.movie_index.get(&movie_id) else {
            tracing::debug!(movie_id, "Unknown movie, no similar movies");
            return Vec::new();
        };

        let mut similarities = cosine_against_rows(self.matrix.t(), self.matrix.column(movie_idx));
        similarities[movie_idx] = SELF_SIMILARITY;

        rank_descending(&similarities)
            .into_iter()
            .filter(|&idx| idx != movie_idx)
            .take(count)
            .map(|idx| self.movie_ids[idx])
            .collect()
    }

    /// Every other user with their similarity to `user_idx`, most similar first
    fn user_neighbors(&self, user_idx: usize) -> Vec<(usize, f64)> {
        let mut similarities = cosine_against_rows(self.matrix.view(), self.matrix.row(user_idx));
        similarities[user_idx] = SELF_SIMILARITY;

        rank_descending(&similarities)
            .into_iter()
            .filter(|&idx| idx != user_idx)
            .map(|idx| (idx, similarities[idx]))
            .collect()
    }
}

/// Cosine similarity of `target` against each row of `matrix`.
fn cosine_against_rows(matrix: ArrayView2<f64>, target: ArrayView1<f64>) -> Array1<f64> {
    let target_norm = target.dot(&target).sqrt();
    matrix
        .outer_iter()
        .map(|row| cosine_similarity(row, target, target_norm))
        .collect()
}

/// Zero-norm vectors have similarity 0.0 with everything.
fn cosine_similarity(a: ArrayView1<f64>, b: ArrayView1<f64>, b_norm: f64) -> f64 {
    let a_norm = a.dot(&a).sqrt();
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    a.dot(&b) / (a_norm * b_norm)
}

/// Indices sorted by descending value.
///
/// Ties keep ascending index order, so the earlier-retrieved user or movie
/// wins. This deliberately differs from reversing an ascending sort, which
/// would put the later one first.
fn rank_descending(values: &Array1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    order
}
