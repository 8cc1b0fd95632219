//! Password hashing with argon2id.

use crate::AuthError;
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use restaurant_types::SecretString;

/// Hashes `password` with a fresh random salt and returns the PHC string.
pub fn hash_password(password: &SecretString) -> Result<String, AuthError> {
	let salt = SaltString::generate(&mut OsRng);
	password.with_exposed(|plain| {
		Argon2::default()
			.hash_password(plain.as_bytes(), &salt)
			.map(|hash| hash.to_string())
			.map_err(|e| AuthError::Hashing(e.to_string()))
	})
}

/// Checks `password` against a stored PHC string.
///
/// An unparseable hash counts as a mismatch.
pub fn verify_password(password: &SecretString, hash: &str) -> bool {
	let Ok(parsed) = PasswordHash::new(hash) else {
		tracing::warn!("Stored password hash could not be parsed");
		return false;
	};
	password.with_exposed(|plain| {
		Argon2::default()
			.verify_password(plain.as_bytes(), &parsed)
			.is_ok()
	})
}
