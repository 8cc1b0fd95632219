//! Registration and login.

use super::extract::Body;
use super::IntoApiError;
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use restaurant_types::{APIError, LoginRequest, NewUser, Role, TokenResponse, UserProfile};

/// Handles POST /api/auth/register.
///
/// Self-registration always creates an active customer, whatever role the
/// body asks for.
pub async fn register(
	State(state): State<AppState>,
	Body(mut request): Body<NewUser>,
) -> Result<(StatusCode, Json<UserProfile>), APIError> {
	request.role = Role::Customer;
	request.active = true;

	let profile = state
		.backend
		.users()
		.create(request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok((StatusCode::CREATED, Json(profile)))
}

/// Handles POST /api/auth/login.
pub async fn login(
	State(state): State<AppState>,
	Body(request): Body<LoginRequest>,
) -> Result<Json<TokenResponse>, APIError> {
	let profile = state
		.backend
		.users()
		.authenticate(&request.email, &request.password)
		.await
		.map_err(IntoApiError::into_api_error)?;

	let token = state
		.backend
		.tokens()
		.issue(profile.id, profile.role)
		.map_err(IntoApiError::into_api_error)?;
	tracing::info!(user_id = %profile.id, role = %profile.role, "Issued access token");
	Ok(Json(token))
}
