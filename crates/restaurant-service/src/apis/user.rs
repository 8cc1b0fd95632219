//! User administration and self-service profile endpoints.

use super::extract::{Body, Params};
use super::{authenticate, parse_id, require, IntoApiError, ADMIN};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use restaurant_auth::Identity;
use restaurant_types::{
	APIError, MessageResponse, NewUser, PasswordChange, UserFilter, UserProfile, UserUpdate,
};
use uuid::Uuid;

fn require_admin_or_self(caller: &Identity, user_id: Uuid) -> Result<(), APIError> {
	if caller.is_admin() || caller.is_user(user_id) {
		Ok(())
	} else {
		tracing::warn!(user_id = %caller.user_id, target_user = %user_id, "Access to another user's profile");
		Err(APIError::forbidden("Only admins can access other users"))
	}
}

/// Handles GET /api/users with an optional `role` query parameter.
pub async fn list_users(
	State(state): State<AppState>,
	headers: HeaderMap,
	filter: Result<Params<UserFilter>, APIError>,
) -> Result<Json<Vec<UserProfile>>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, ADMIN)?;
	let Params(filter) = filter?;
	let users = state
		.backend
		.users()
		.list(&filter)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(users))
}

/// Handles POST /api/users. Admins may create any role.
pub async fn create_user(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Result<Body<NewUser>, APIError>,
) -> Result<(StatusCode, Json<UserProfile>), APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, ADMIN)?;
	let Body(request) = request?;
	let profile = state
		.backend
		.users()
		.create(request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok((StatusCode::CREATED, Json(profile)))
}

/// Handles GET /api/users/{id}.
pub async fn get_user(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<UserProfile>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let id = parse_id(&id, "User")?;
	require_admin_or_self(&caller, id)?;
	let profile = state
		.backend
		.users()
		.get(id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(profile))
}

/// Handles PUT /api/users/{id}. Role and active flag are admin-only.
pub async fn update_user(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
	request: Result<Body<UserUpdate>, APIError>,
) -> Result<Json<UserProfile>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let id = parse_id(&id, "User")?;
	require_admin_or_self(&caller, id)?;
	let Body(request) = request?;
	if !caller.is_admin() && (request.role.is_some() || request.active.is_some()) {
		return Err(APIError::forbidden(
			"Only admins can change roles or deactivate accounts",
		));
	}

	let profile = state
		.backend
		.users()
		.update(id, request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(profile))
}

/// Handles DELETE /api/users/{id}. Orders of the user are kept.
pub async fn delete_user(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<MessageResponse>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, ADMIN)?;
	let id = parse_id(&id, "User")?;
	state
		.backend
		.users()
		.delete(id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(MessageResponse::new(format!("User {} deleted", id))))
}

/// Handles PUT /api/users/{id}/password. Only the user themself may call it.
pub async fn change_password(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
	request: Result<Body<PasswordChange>, APIError>,
) -> Result<Json<MessageResponse>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let id = parse_id(&id, "User")?;
	if !caller.is_user(id) {
		return Err(APIError::forbidden("Users can only change their own password"));
	}
	let Body(request) = request?;
	state
		.backend
		.users()
		.change_password(id, &request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(MessageResponse::new("Password changed")))
}

#[cfg(test)]
mod tests {
	use crate::server::tests::{admin_token, call, customer, login, staff, test_app};
	use axum::http::StatusCode;
	use serde_json::json;

	#[tokio::test]
	async fn test_admin_only_listing() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let (_, guest) = customer(&app, "guest@example.com").await;
		staff(&app, &admin, "cook@example.com", "restaurant_worker").await;

		let (status, _) = call(&app, "GET", "/api/users", Some(&guest), None).await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, all) = call(&app, "GET", "/api/users", Some(&admin), None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(all.as_array().unwrap().len(), 3);

		let (_, workers) = call(
			&app,
			"GET",
			"/api/users?role=restaurant_worker",
			Some(&admin),
			None,
		)
		.await;
		assert_eq!(workers.as_array().unwrap().len(), 1);
		assert_eq!(workers[0]["email"], "cook@example.com");
	}

	#[tokio::test]
	async fn test_self_service_profile() {
		let app = test_app().await;
		let (ana_id, ana) = customer(&app, "ana@example.com").await;
		let (bo_id, _) = customer(&app, "bo@example.com").await;
		let own = format!("/api/users/{}", ana_id);

		let (status, body) = call(&app, "GET", &own, Some(&ana), None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["email"], "ana@example.com");

		let (status, _) = call(&app, "GET", &format!("/api/users/{}", bo_id), Some(&ana), None).await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, body) = call(&app, "PUT", &own, Some(&ana), Some(json!({ "city": "Shelbyville" }))).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["city"], "Shelbyville");

		let (status, _) = call(&app, "PUT", &own, Some(&ana), Some(json!({ "role": "admin" }))).await;
		assert_eq!(status, StatusCode::FORBIDDEN);
	}

	#[tokio::test]
	async fn test_change_password() {
		let app = test_app().await;
		let (ana_id, ana) = customer(&app, "ana@example.com").await;
		let uri = format!("/api/users/{}/password", ana_id);

		let (status, _) = call(
			&app,
			"PUT",
			&uri,
			Some(&ana),
			Some(json!({ "old_password": "nope-nope-nope", "new_password": "fresh-password" })),
		)
		.await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);

		let (status, _) = call(
			&app,
			"PUT",
			&uri,
			Some(&ana),
			Some(json!({ "old_password": "guest-password", "new_password": "fresh-password" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		login(&app, "ana@example.com", "fresh-password").await;

		let admin = admin_token(&app).await;
		let (status, _) = call(
			&app,
			"PUT",
			&uri,
			Some(&admin),
			Some(json!({ "old_password": "fresh-password", "new_password": "admin-chosen" })),
		)
		.await;
		assert_eq!(status, StatusCode::FORBIDDEN);
	}

	#[tokio::test]
	async fn test_deactivated_or_deleted_user_loses_access() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let (ana_id, ana) = customer(&app, "ana@example.com").await;
		let (bo_id, bo) = customer(&app, "bo@example.com").await;

		let (status, _) = call(
			&app,
			"PUT",
			&format!("/api/users/{}", ana_id),
			Some(&admin),
			Some(json!({ "active": false })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		let (status, body) = call(&app, "GET", "/api/orders", Some(&ana), None).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(body["error"], "ACCOUNT_DISABLED");

		let (status, _) = call(&app, "DELETE", &format!("/api/users/{}", bo_id), Some(&admin), None).await;
		assert_eq!(status, StatusCode::OK);
		let (status, body) = call(&app, "GET", "/api/orders", Some(&bo), None).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(body["error"], "INVALID_TOKEN");
	}
}
