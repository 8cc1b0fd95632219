//! Route handlers of the restaurant API.
//!
//! Every protected handler starts with [`authenticate`] and then checks the
//! caller's role with [`require`]. Errors from the core services are turned
//! into [`APIError`] responses through [`IntoApiError`].

pub mod auth;
pub mod extract;
pub mod health;
pub mod menu;
pub mod order;
pub mod restaurant;
pub mod user;

use crate::server::AppState;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use restaurant_auth::{authorize, bearer_token, AuthError, Identity};
use restaurant_core::{CatalogError, OrderError, UserError};
use restaurant_types::{APIError, Role};
use uuid::Uuid;

/// Roles allowed to manage menus and move orders through the kitchen.
pub(crate) const STAFF: &[Role] = &[Role::Admin, Role::RestaurantWorker];
pub(crate) const ADMIN: &[Role] = &[Role::Admin];

/// Resolves the caller from the bearer token.
///
/// The user is reloaded so that a changed role or a deactivation takes
/// effect before the token expires.
pub(crate) async fn authenticate(
	state: &AppState,
	headers: &HeaderMap,
) -> Result<Identity, APIError> {
	let header = headers
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok());
	let token = bearer_token(header).map_err(IntoApiError::into_api_error)?;
	let claimed = state
		.backend
		.tokens()
		.verify(token)
		.map_err(IntoApiError::into_api_error)?;

	let user = match state.backend.users().get(claimed.user_id).await {
		Ok(user) => user,
		Err(UserError::NotFound(_)) => {
			tracing::warn!(user_id = %claimed.user_id, "Token for deleted user");
			return Err(APIError::unauthorized(
				"INVALID_TOKEN",
				"Token subject no longer exists",
			));
		},
		Err(e) => return Err(e.into_api_error()),
	};
	if !user.active {
		tracing::warn!(user_id = %user.id, "Request from deactivated user");
		return Err(APIError::unauthorized(
			"ACCOUNT_DISABLED",
			"Account is deactivated",
		));
	}
	Ok(Identity::new(user.id, user.role))
}

/// Fails with 403 unless the caller holds one of `allowed`.
pub(crate) fn require(identity: &Identity, allowed: &[Role]) -> Result<(), APIError> {
	authorize(identity, allowed).map_err(IntoApiError::into_api_error)
}

/// Parses a path segment as a UUID.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, APIError> {
	Uuid::parse_str(raw).map_err(|_| {
		APIError::bad_request(
			"INVALID_ID",
			format!("{} id must be a valid UUID: {}", what, raw),
		)
	})
}

fn internal(error: &dyn std::fmt::Display) -> APIError {
	tracing::error!(error = %error, "Request failed");
	APIError::internal("Internal server error")
}

/// Conversion of service errors into HTTP errors.
pub(crate) trait IntoApiError {
	fn into_api_error(self) -> APIError;
}

impl IntoApiError for OrderError {
	fn into_api_error(self) -> APIError {
		match &self {
			OrderError::NotFound { entity, .. } => {
				let code = format!("{}_NOT_FOUND", entity.to_uppercase().replace(' ', "_"));
				APIError::not_found(&code, self.to_string())
			},
			OrderError::InvalidTransition { .. } => {
				APIError::conflict("INVALID_TRANSITION", self.to_string())
			},
			OrderError::Validation(message) => APIError::bad_request("VALIDATION_ERROR", message),
			OrderError::Persistence(_) => internal(&self),
		}
	}
}

impl IntoApiError for CatalogError {
	fn into_api_error(self) -> APIError {
		match &self {
			CatalogError::RestaurantNotFound(_) => {
				APIError::not_found("RESTAURANT_NOT_FOUND", self.to_string())
			},
			CatalogError::MenuItemNotFound(_) => {
				APIError::not_found("MENU_ITEM_NOT_FOUND", self.to_string())
			},
			CatalogError::Validation(message) => APIError::bad_request("VALIDATION_ERROR", message),
			CatalogError::Persistence(_) => internal(&self),
		}
	}
}

impl IntoApiError for UserError {
	fn into_api_error(self) -> APIError {
		match &self {
			UserError::NotFound(_) => APIError::not_found("USER_NOT_FOUND", self.to_string()),
			UserError::DuplicateEmail(_) => APIError::conflict("DUPLICATE_EMAIL", self.to_string()),
			UserError::Validation(message) => APIError::bad_request("VALIDATION_ERROR", message),
			UserError::InvalidCredentials => {
				APIError::unauthorized("INVALID_CREDENTIALS", "Invalid e-mail or password")
			},
			UserError::Hashing(_) | UserError::Persistence(_) => internal(&self),
		}
	}
}

impl IntoApiError for AuthError {
	fn into_api_error(self) -> APIError {
		match &self {
			AuthError::MissingCredentials => {
				APIError::unauthorized("MISSING_CREDENTIALS", self.to_string())
			},
			AuthError::InvalidToken(_) => APIError::unauthorized("INVALID_TOKEN", self.to_string()),
			AuthError::TokenExpired => APIError::unauthorized("TOKEN_EXPIRED", self.to_string()),
			AuthError::Forbidden => APIError::forbidden(self.to_string()),
			AuthError::InvalidCredentials => {
				APIError::unauthorized("INVALID_CREDENTIALS", self.to_string())
			},
			AuthError::Hashing(_) | AuthError::Signing(_) => internal(&self),
		}
	}
}
