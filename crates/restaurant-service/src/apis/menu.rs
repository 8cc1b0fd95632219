//! Menu endpoints, nested under a restaurant.

use super::extract::Body;
use super::{authenticate, parse_id, require, IntoApiError, STAFF};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use restaurant_types::{APIError, MenuItem, MenuItemUpdate, MessageResponse, NewMenuItem};

/// Handles GET /api/restaurants/{id}/menu_items.
pub async fn list_menu_items(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(restaurant_id): Path<String>,
) -> Result<Json<Vec<MenuItem>>, APIError> {
	authenticate(&state, &headers).await?;
	let restaurant_id = parse_id(&restaurant_id, "Restaurant")?;
	let items = state
		.backend
		.menu()
		.list(restaurant_id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(items))
}

/// Handles GET /api/restaurants/{id}/menu_items/{item_id}.
pub async fn get_menu_item(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path((restaurant_id, item_id)): Path<(String, String)>,
) -> Result<Json<MenuItem>, APIError> {
	authenticate(&state, &headers).await?;
	let restaurant_id = parse_id(&restaurant_id, "Restaurant")?;
	let item_id = parse_id(&item_id, "Menu item")?;
	let item = state
		.backend
		.menu()
		.get(restaurant_id, item_id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(item))
}

/// Handles POST /api/restaurants/{id}/menu_items.
pub async fn create_menu_item(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(restaurant_id): Path<String>,
	request: Result<Body<NewMenuItem>, APIError>,
) -> Result<(StatusCode, Json<MenuItem>), APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, STAFF)?;
	let Body(request) = request?;
	let restaurant_id = parse_id(&restaurant_id, "Restaurant")?;
	let item = state
		.backend
		.menu()
		.create(restaurant_id, request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok((StatusCode::CREATED, Json(item)))
}

/// Handles PUT /api/restaurants/{id}/menu_items/{item_id}.
pub async fn update_menu_item(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path((restaurant_id, item_id)): Path<(String, String)>,
	request: Result<Body<MenuItemUpdate>, APIError>,
) -> Result<Json<MenuItem>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, STAFF)?;
	let Body(request) = request?;
	let restaurant_id = parse_id(&restaurant_id, "Restaurant")?;
	let item_id = parse_id(&item_id, "Menu item")?;
	let item = state
		.backend
		.menu()
		.update(restaurant_id, item_id, request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(item))
}

/// Handles DELETE /api/restaurants/{id}/menu_items/{item_id}.
pub async fn delete_menu_item(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path((restaurant_id, item_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, STAFF)?;
	let restaurant_id = parse_id(&restaurant_id, "Restaurant")?;
	let item_id = parse_id(&item_id, "Menu item")?;
	state
		.backend
		.menu()
		.delete(restaurant_id, item_id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(MessageResponse::new(format!("Menu item {} deleted", item_id))))
}

#[cfg(test)]
mod tests {
	use crate::server::tests::{admin_token, call, customer, seed_menu, staff, test_app};
	use axum::http::StatusCode;
	use serde_json::json;

	#[tokio::test]
	async fn test_worker_edits_menu_customer_cannot() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let worker = staff(&app, &admin, "cook@example.com", "restaurant_worker").await;
		let (_, guest) = customer(&app, "guest@example.com").await;
		let (restaurant_id, item, _) = seed_menu(&app, &admin).await;
		let uri = format!("/api/restaurants/{}/menu_items/{}", restaurant_id, item);

		let (status, _) = call(
			&app,
			"PUT",
			&uri,
			Some(&guest),
			Some(json!({ "available": false })),
		)
		.await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, body) = call(
			&app,
			"PUT",
			&uri,
			Some(&worker),
			Some(json!({ "price": "10.00" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["price"], "10.00");

		let (status, list) = call(
			&app,
			"GET",
			&format!("/api/restaurants/{}/menu_items", restaurant_id),
			Some(&guest),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(list.as_array().unwrap().len(), 2);
	}

	#[tokio::test]
	async fn test_invalid_price_is_rejected() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let (restaurant_id, _, _) = seed_menu(&app, &admin).await;

		let (status, body) = call(
			&app,
			"POST",
			&format!("/api/restaurants/{}/menu_items", restaurant_id),
			Some(&admin),
			Some(json!({ "name": "Tiramisu", "price": "4.999", "category": "food" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "VALIDATION_ERROR");
	}

	#[tokio::test]
	async fn test_delete_and_item_of_other_restaurant() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let (restaurant_id, item, _) = seed_menu(&app, &admin).await;
		let (other_id, _, _) = seed_menu(&app, &admin).await;

		let (status, body) = call(
			&app,
			"GET",
			&format!("/api/restaurants/{}/menu_items/{}", other_id, item),
			Some(&admin),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "MENU_ITEM_NOT_FOUND");

		let uri = format!("/api/restaurants/{}/menu_items/{}", restaurant_id, item);
		let (status, _) = call(&app, "DELETE", &uri, Some(&admin), None).await;
		assert_eq!(status, StatusCode::OK);
		let (status, _) = call(&app, "GET", &uri, Some(&admin), None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}
}
