use anyhow::Context;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use secrecy::{ExposeSecret, Secret};

use crate::error::Result;
use crate::telemetry::spawn_blocking_with_tracing;

/// Verified against when no user matches, so unknown emails cost as much as wrong passwords
const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
gZiV/M1gPc22ElAH/Jh1Hw$\
CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

/// Hash a password on the blocking thread pool
#[tracing::instrument("Hash password", skip(password))]
pub async fn hash_password(password: Secret<String>) -> Result<String> {
    let hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed to spawn blocking task")??;
    Ok(hash)
}

/// Check a password against a stored hash, or against a dummy hash when there is none
#[tracing::instrument("Verify password", skip(password, password_hash))]
pub async fn verify_password(
    password: Secret<String>,
    password_hash: Option<String>,
) -> Result<bool> {
    let known_user = password_hash.is_some();
    let password_hash = password_hash.unwrap_or_else(|| DUMMY_PASSWORD_HASH.to_string());

    let matches =
        spawn_blocking_with_tracing(move || verify_password_hash(&password, &password_hash))
            .await
            .context("Failed to spawn blocking task")??;

    Ok(known_user && matches)
}

fn compute_password_hash(password: Secret<String>) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to hash password")?
        .to_string();
    Ok(hash)
}

fn verify_password_hash(password: &Secret<String>, password_hash: &str) -> anyhow::Result<bool> {
    let password_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to parse stored password hash")?;

    Ok(Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &password_hash)
        .is_ok())
}
