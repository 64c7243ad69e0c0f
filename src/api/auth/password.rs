//! Argon2id password hashing.
//!
//! Hashing is CPU bound, so the async wrappers run it on the blocking pool.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{
        rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};
use secrecy::{ExposeSecret, SecretString};

/// Argon2id with the crate's default cost parameters.
fn argon2() -> Argon2<'static> {
    Argon2::default()
}

/// Hash `plain` under a fresh random salt; the result is a PHC string that
/// carries the algorithm, parameters and salt.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|err| anyhow!("argon2 hashing failed: {err}"))
}

/// Check `candidate` against a stored PHC string.
///
/// A wrong password is `Ok(false)`. A stored value that is not a valid PHC
/// string, or any other argon2 failure, is an error.
pub fn verify_password(candidate: &str, stored: &str) -> Result<bool> {
    let phc = PasswordHash::new(stored).map_err(|err| anyhow!("stored hash is invalid: {err}"))?;
    match argon2().verify_password(candidate.as_bytes(), &phc) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(err) => Err(anyhow!("argon2 verification failed: {err}")),
    }
}

pub async fn hash(password: SecretString) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(password.expose_secret()))
        .await
        .context("password hashing task failed")?
}

pub async fn verify(password: SecretString, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(password.expose_secret(), &hash))
        .await
        .context("password verification task failed")?
}
