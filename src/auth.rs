//! Account registration and login checks.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::store::{NewUser, RecordStore};

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub async fn register(
    store: &dyn RecordStore,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User> {
    let email = normalize_email(email);
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }

    let salt = Uuid::new_v4().simple().to_string();
    let user = store
        .create_user(NewUser {
            email,
            name: name.trim().to_string(),
            password_hash: hash_password(password, &salt),
            salt,
        })
        .await?;

    tracing::info!("👤 Registered user {}", user.id);
    Ok(user)
}

pub async fn login(store: &dyn RecordStore, email: &str, password: &str) -> Result<User> {
    let credentials = store
        .find_credentials(&normalize_email(email))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if hash_password(password, &credentials.salt) != credentials.password_hash {
        tracing::info!("🔐 Failed login for {}", credentials.user.id);
        return Err(AppError::InvalidCredentials);
    }

    Ok(credentials.user)
}
