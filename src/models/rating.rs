use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;

/// Lowest accepted rating score
pub const MIN_SCORE: i16 = 1;
/// Highest accepted rating score
pub const MAX_SCORE: i16 = 5;

/// A rating score, always within `MIN_SCORE..=MAX_SCORE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Score(i16);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Score must be between {MIN_SCORE} and {MAX_SCORE}, got {0}")]
pub struct ScoreOutOfRange(pub i64);

impl Score {
    pub fn new(value: i64) -> Result<Self, ScoreOutOfRange> {
        if (MIN_SCORE as i64..=MAX_SCORE as i64).contains(&value) {
            Ok(Self(value as i16))
        } else {
            Err(ScoreOutOfRange(value))
        }
    }

    pub fn get(self) -> i16 {
        self.0
    }
}

impl TryFrom<i16> for Score {
    type Error = ScoreOutOfRange;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Score::new(value as i64)
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user's score for one movie. A (user, movie) pair has at most one rating.
#[derive(Debug, Clone, Serialize, PartialEq, sqlx::FromRow)]
pub struct Rating {
    pub user_id: i64,
    pub movie_id: i64,
    #[sqlx(try_from = "i16")]
    pub score: Score,
    pub created_at: DateTime<Utc>,
}
