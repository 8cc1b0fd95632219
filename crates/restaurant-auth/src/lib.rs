//! Authentication and authorization for the restaurant backend.
//!
//! Passwords are stored as argon2 PHC strings. Callers authenticate with an
//! HS256 bearer token carrying their user id and role. Handlers check the
//! resulting [`Identity`] against the roles an operation allows with
//! [`authorize`].

use restaurant_types::Role;
use thiserror::Error;
use uuid::Uuid;

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenIssuer};

/// Errors that can occur while authenticating or authorizing a caller.
#[derive(Debug, Error)]
pub enum AuthError {
	/// No usable `Authorization` header was sent.
	#[error("Missing credentials")]
	MissingCredentials,
	/// The token is malformed, has a bad signature or wrong issuer.
	#[error("Invalid token: {0}")]
	InvalidToken(String),
	/// The token was valid but has expired.
	#[error("Token expired")]
	TokenExpired,
	/// The caller is authenticated but may not perform the operation.
	#[error("Insufficient permissions")]
	Forbidden,
	/// Wrong e-mail or password.
	#[error("Invalid credentials")]
	InvalidCredentials,
	/// Password hashing failed.
	#[error("Hashing error: {0}")]
	Hashing(String),
	/// A token could not be signed.
	#[error("Token signing error: {0}")]
	Signing(String),
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
	pub user_id: Uuid,
	pub role: Role,
}

impl Identity {
	pub fn new(user_id: Uuid, role: Role) -> Self {
		Self { user_id, role }
	}

	pub fn is_admin(&self) -> bool {
		self.role == Role::Admin
	}

	/// Admins and restaurant workers.
	pub fn is_staff(&self) -> bool {
		matches!(self.role, Role::Admin | Role::RestaurantWorker)
	}

	/// True when the identity is the given user.
	pub fn is_user(&self, user_id: Uuid) -> bool {
		self.user_id == user_id
	}
}

/// Fails with [`AuthError::Forbidden`] unless the caller holds one of `allowed`.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), AuthError> {
	if allowed.contains(&identity.role) {
		Ok(())
	} else {
		tracing::warn!(
			user_id = %identity.user_id,
			role = %identity.role,
			"Rejected request with insufficient role"
		);
		Err(AuthError::Forbidden)
	}
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
	let header = header.ok_or(AuthError::MissingCredentials)?;
	let (scheme, token) = header
		.trim()
		.split_once(' ')
		.ok_or(AuthError::MissingCredentials)?;

	if !scheme.eq_ignore_ascii_case("bearer") {
		return Err(AuthError::MissingCredentials);
	}
	let token = token.trim();
	if token.is_empty() || token.contains(' ') {
		return Err(AuthError::InvalidToken("Malformed bearer token".into()));
	}
	Ok(token)
}
