//! Password hashing helpers built around Argon2id.
//! Every stored password and password-history entry uses the same parameters.

use argon2::password_hash::SaltString;
use argon2::{
    password_hash, Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier,
    Version,
};
use rand::rngs::OsRng;

const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

fn argon2_config() -> Result<Argon2<'static>, password_hash::Error> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with Argon2id and returns the PHC string.
pub fn hash_password(plaintext: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = argon2_config()?;
    Ok(argon2.hash_password(plaintext.as_bytes(), &salt)?.to_string())
}

/// Verifies a plaintext password against a stored PHC string.
/// Malformed hashes verify as `false`.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(stored_hash) {
        Ok(hash) => hash,
        Err(_) => return false,
    };

    match argon2_config() {
        Ok(argon2) => argon2
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}

/// True when `plaintext` matches any of the given hashes.
pub fn matches_any<'a>(plaintext: &str, hashes: impl IntoIterator<Item = &'a String>) -> bool {
    hashes
        .into_iter()
        .any(|hash| verify_password(plaintext, hash))
}

/// [`hash_password`] on the blocking pool; Argon2 is deliberately slow.
pub async fn hash_password_blocking(plaintext: String) -> Result<String, password_hash::Error> {
    tokio::task::spawn_blocking(move || hash_password(&plaintext))
        .await
        .unwrap_or(Err(password_hash::Error::Crypto))
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(plaintext: String, stored_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&plaintext, &stored_hash))
        .await
        .unwrap_or(false)
}

/// [`matches_any`] on the blocking pool.
pub async fn matches_any_blocking(plaintext: String, hashes: Vec<String>) -> bool {
    tokio::task::spawn_blocking(move || matches_any(&plaintext, &hashes))
        .await
        .unwrap_or(false)
}
