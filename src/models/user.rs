use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered account
///
/// `password_hash` holds an argon2 PHC string and is never serialized.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

/// Fields required to create an account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn into_user(self, id: i64, date_joined: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            date_joined,
        }
    }
}

/// The only view of a user the recommendation engine needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserRef {
    pub id: i64,
    pub display_name: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.username.clone(),
        }
    }
}
