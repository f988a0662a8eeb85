use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::{
    db::MovieStore,
    error::{AppError, AppResult},
    models::{NewUser, User},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Form fields in the order their errors are reported
const FORM_FIELDS: [&str; 4] = ["username", "email", "password", "password_confirm"];

/// Registration form submitted by a new user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, message = "Username is required."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub password_confirm: String,
}

/// Picks the message of the first failing field, in form order
fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    FORM_FIELDS
        .iter()
        .filter_map(|field| fields.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(ToString::to_string))
        .unwrap_or_else(|| errors.to_string())
}

/// Creates an account after validating the form and hashing the password
pub async fn register(store: &dyn MovieStore, form: Registration) -> AppResult<User> {
    form
        .validate()
        .map_err(|errors| AppError::InvalidInput(first_message(&errors)))?;

    let email = form.email;
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "This email is already registered.".to_string(),
        ));
    }

    let user = store
        .create_user(NewUser {
            username: form.username.trim().to_string(),
            email,
            first_name: form.first_name,
            last_name: form.last_name,
            password_hash: hash_password(&form.password)?,
        })
        .await?;

    tracing::info!(user_id = user.id, "Account created");
    Ok(user)
}

/// Looks up the account for `email` and checks the password against its hash
pub async fn authenticate(store: &dyn MovieStore, email: &str, password: &str) -> AppResult<User> {
    let Some(user) = store.find_user_by_email(email.trim()).await? else {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "Failed login attempt");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    Ok(user)
}

/// Hashes a password with argon2id and a random salt, as a PHC string
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Returns false on a wrong password; malformed hashes are errors
pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(password_hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
