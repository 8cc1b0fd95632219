//! HS256 access tokens.

use crate::{AuthError, Identity};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use restaurant_config::AuthConfig;
use restaurant_types::{Role, TokenResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
	/// User id.
	pub sub: String,
	pub role: Role,
	pub iat: i64,
	pub exp: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
}

/// Issues and verifies access tokens with a shared secret.
pub struct TokenIssuer {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	ttl_seconds: i64,
	issuer: Option<String>,
}

impl TokenIssuer {
	pub fn new(config: &AuthConfig) -> Self {
		let (encoding_key, decoding_key) = config.jwt_secret.with_exposed(|secret| {
			(
				EncodingKey::from_secret(secret.as_bytes()),
				DecodingKey::from_secret(secret.as_bytes()),
			)
		});
		Self {
			encoding_key,
			decoding_key,
			ttl_seconds: i64::try_from(config.token_ttl_minutes.saturating_mul(60))
				.unwrap_or(i64::MAX),
			issuer: config.issuer.clone(),
		}
	}

	/// Issues a token for `user_id` acting as `role`.
	pub fn issue(&self, user_id: Uuid, role: Role) -> Result<TokenResponse, AuthError> {
		let now = Utc::now().timestamp();
		let claims = Claims {
			sub: user_id.to_string(),
			role,
			iat: now,
			exp: now.saturating_add(self.ttl_seconds),
			iss: self.issuer.clone(),
		};
		let access_token = self.sign(&claims)?;
		Ok(TokenResponse {
			access_token,
			token_type: "bearer".to_string(),
			expires_in: self.ttl_seconds.unsigned_abs(),
		})
	}

	fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
		encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
			.map_err(|e| AuthError::Signing(e.to_string()))
	}

	/// Verifies signature, expiry and issuer, and returns the caller.
	pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;
		if let Some(issuer) = &self.issuer {
			validation.set_issuer(&[issuer]);
			validation.set_required_spec_claims(&["exp", "iss"]);
		}

		let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
			match e.kind() {
				ErrorKind::ExpiredSignature => AuthError::TokenExpired,
				_ => AuthError::InvalidToken(e.to_string()),
			}
		})?;

		let user_id = Uuid::parse_str(&data.claims.sub)
			.map_err(|_| AuthError::InvalidToken("Subject is not a user id".into()))?;
		Ok(Identity::new(user_id, data.claims.role))
	}
}
