use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use shared::domain::Identity;
use storage::StoreHandle;
use tracing::info;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash password: {e}"))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn authenticate(
    store: &mut StoreHandle,
    username: &str,
    password: &str,
) -> Result<Option<Identity>> {
    let Some(credentials) = store.officer_credentials(username.trim()).await? else {
        info!(username, "login attempt for unknown officer");
        return Ok(None);
    };

    if !verify_password(password, &credentials.password_hash) {
        info!(username, "login attempt with wrong password");
        return Ok(None);
    }

    Ok(Some(credentials.identity))
}
