mod movie;
mod rating;
mod user;

pub use movie::{sort_by_title, Movie, NewMovie};
pub use rating::{Rating, Score, ScoreOutOfRange, MAX_SCORE, MIN_SCORE};
pub use user::{NewUser, User, UserRef};
