//! Restaurant endpoints. Reading is open to every role, writing to admins.

use super::extract::Body;
use super::{authenticate, parse_id, require, IntoApiError, ADMIN};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use restaurant_types::{APIError, MessageResponse, NewRestaurant, Restaurant, RestaurantUpdate};

/// Handles GET /api/restaurants.
pub async fn list_restaurants(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<Restaurant>>, APIError> {
	authenticate(&state, &headers).await?;
	let restaurants = state
		.backend
		.restaurants()
		.list()
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(restaurants))
}

/// Handles GET /api/restaurants/{id}.
pub async fn get_restaurant(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<Restaurant>, APIError> {
	authenticate(&state, &headers).await?;
	let id = parse_id(&id, "Restaurant")?;
	let restaurant = state
		.backend
		.restaurants()
		.get(id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(restaurant))
}

/// Handles POST /api/restaurants.
pub async fn create_restaurant(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Result<Body<NewRestaurant>, APIError>,
) -> Result<(StatusCode, Json<Restaurant>), APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, ADMIN)?;
	let Body(request) = request?;
	let restaurant = state
		.backend
		.restaurants()
		.create(request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok((StatusCode::CREATED, Json(restaurant)))
}

/// Handles PUT /api/restaurants/{id}.
pub async fn update_restaurant(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
	request: Result<Body<RestaurantUpdate>, APIError>,
) -> Result<Json<Restaurant>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, ADMIN)?;
	let id = parse_id(&id, "Restaurant")?;
	let Body(request) = request?;
	let restaurant = state
		.backend
		.restaurants()
		.update(id, request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(restaurant))
}

/// Handles DELETE /api/restaurants/{id}, taking its menu and orders along.
pub async fn delete_restaurant(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<MessageResponse>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, ADMIN)?;
	let id = parse_id(&id, "Restaurant")?;
	state
		.backend
		.restaurants()
		.delete(id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(MessageResponse::new(format!("Restaurant {} deleted", id))))
}
