//! Order endpoints.
//!
//! Staff see every order. Customers only see, place and cancel their own;
//! an order of somebody else answers as if it did not exist.

use super::extract::{Body, Params};
use super::{authenticate, parse_id, require, IntoApiError, ADMIN, STAFF};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use restaurant_auth::Identity;
use restaurant_core::OrderError;
use restaurant_types::{
	APIError, MessageResponse, NewOrder, Order, OrderFilter, OrderItem, OrderStatus, OrderUpdate,
};
use uuid::Uuid;

/// Loads an order the caller may see.
async fn visible_order(
	state: &AppState,
	caller: &Identity,
	order_id: Uuid,
) -> Result<Order, APIError> {
	let order = state
		.backend
		.orders()
		.get_order(order_id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	if !caller.is_staff() && order.user_id != Some(caller.user_id) {
		tracing::warn!(
			user_id = %caller.user_id,
			order_id = %order_id,
			"Customer requested another user's order"
		);
		return Err(OrderError::NotFound {
			entity: "Order",
			id: order_id,
		}
		.into_api_error());
	}
	Ok(order)
}

async fn list_scoped(
	state: &AppState,
	caller: &Identity,
	mut filter: OrderFilter,
) -> Result<Vec<Order>, APIError> {
	if !caller.is_staff() {
		if filter.user_id.is_some_and(|id| id != caller.user_id) {
			return Err(APIError::forbidden("Customers can only list their own orders"));
		}
		filter.user_id = Some(caller.user_id);
	}
	state
		.backend
		.orders()
		.list_orders(&filter)
		.await
		.map_err(IntoApiError::into_api_error)
}

/// Handles GET /api/orders with optional `restaurant_id`, `user_id` and
/// `status` query parameters.
pub async fn list_orders(
	State(state): State<AppState>,
	headers: HeaderMap,
	filter: Result<Params<OrderFilter>, APIError>,
) -> Result<Json<Vec<Order>>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let Params(filter) = filter?;
	Ok(Json(list_scoped(&state, &caller, filter).await?))
}

/// Handles GET /api/orders/status/{status}.
pub async fn list_orders_by_status(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(status): Path<String>,
) -> Result<Json<Vec<Order>>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let status: OrderStatus = status
		.parse()
		.map_err(|e: restaurant_types::ParseOrderStatusError| {
			APIError::bad_request("INVALID_STATUS", e.to_string())
		})?;
	let filter = OrderFilter {
		status: Some(status),
		..Default::default()
	};
	Ok(Json(list_scoped(&state, &caller, filter).await?))
}

/// Handles POST /api/orders. The order and its items are stored together.
pub async fn create_order(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Result<Body<NewOrder>, APIError>,
) -> Result<(StatusCode, Json<Order>), APIError> {
	let caller = authenticate(&state, &headers).await?;
	let Body(mut request) = request?;
	if !caller.is_staff() {
		if request.user_id.is_some_and(|id| id != caller.user_id) {
			return Err(APIError::forbidden(
				"Customers can only place orders for themselves",
			));
		}
		request.user_id = Some(caller.user_id);
	}

	let order = state
		.backend
		.orders()
		.create_order(request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/orders/{id}.
pub async fn get_order(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let id = parse_id(&id, "Order")?;
	Ok(Json(visible_order(&state, &caller, id).await?))
}

/// Handles PUT /api/orders/{id}.
pub async fn update_order(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
	request: Result<Body<OrderUpdate>, APIError>,
) -> Result<Json<Order>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, STAFF)?;
	let id = parse_id(&id, "Order")?;
	let Body(request) = request?;
	let order = state
		.backend
		.orders()
		.update_order(id, request)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(order))
}

/// Handles DELETE /api/orders/{id}.
pub async fn delete_order(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<MessageResponse>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, ADMIN)?;
	let id = parse_id(&id, "Order")?;
	state
		.backend
		.orders()
		.delete_order(id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(MessageResponse::new(format!("Order {} deleted", id))))
}

/// Handles PUT /api/orders/{id}/next-status.
pub async fn advance_order(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, STAFF)?;
	let id = parse_id(&id, "Order")?;
	let order = state
		.backend
		.orders()
		.advance_order(id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(order))
}

/// Handles PUT /api/orders/{id}/cancel.
pub async fn cancel_order(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	let id = parse_id(&id, "Order")?;
	if !caller.is_staff() {
		visible_order(&state, &caller, id).await?;
	}
	let order = state
		.backend
		.orders()
		.cancel_order(id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(order))
}

/// Handles GET /api/orders/items/{item_id}.
pub async fn get_order_item(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(item_id): Path<String>,
) -> Result<Json<OrderItem>, APIError> {
	let caller = authenticate(&state, &headers).await?;
	require(&caller, STAFF)?;
	let item_id = parse_id(&item_id, "Order item")?;
	let item = state
		.backend
		.orders()
		.get_order_item(item_id)
		.await
		.map_err(IntoApiError::into_api_error)?;
	Ok(Json(item))
}

#[cfg(test)]
mod tests {
	use crate::server::tests::{admin_token, call, customer, seed_menu, staff, test_app};
	use axum::http::StatusCode;
	use axum::Router;
	use serde_json::{json, Value};

	async fn place(app: &Router, token: &str, restaurant: &str, item: &str) -> (StatusCode, Value) {
		call(
			app,
			"POST",
			"/api/orders",
			Some(token),
			Some(json!({
				"restaurant_id": restaurant,
				"name": "Table 4",
				"order_items": [
					{ "menu_item_id": item, "quantity": 2, "price": "9.50" }
				]
			})),
		)
		.await
	}

	#[tokio::test]
	async fn test_full_lifecycle_over_http() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let worker = staff(&app, &admin, "cook@example.com", "restaurant_worker").await;
		let (restaurant, item, _) = seed_menu(&app, &admin).await;

		let (status, order) = place(&app, &worker, &restaurant, &item).await;
		assert_eq!(status, StatusCode::CREATED);
		assert_eq!(order["status"], "pending");
		assert_eq!(order["order_items"].as_array().unwrap().len(), 1);
		assert_eq!(order["order_items"][0]["price"], "9.50");
		let id = order["id"].as_str().unwrap().to_string();
		let advance = format!("/api/orders/{}/next-status", id);

		for expected in ["preparing", "ready", "completed"] {
			let (status, body) = call(&app, "PUT", &advance, Some(&worker), None).await;
			assert_eq!(status, StatusCode::OK);
			assert_eq!(body["status"], expected);
		}

		let (status, body) = call(&app, "PUT", &advance, Some(&worker), None).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(body["error"], "INVALID_TRANSITION");

		let item_id = order["order_items"][0]["id"].as_str().unwrap();
		let (status, body) = call(
			&app,
			"GET",
			&format!("/api/orders/items/{}", item_id),
			Some(&worker),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["quantity"], 2);
	}

	#[tokio::test]
	async fn test_invalid_order_is_rejected() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let (restaurant, item, _) = seed_menu(&app, &admin).await;

		let (status, body) = call(
			&app,
			"POST",
			"/api/orders",
			Some(&admin),
			Some(json!({
				"restaurant_id": restaurant,
				"order_items": [{ "menu_item_id": item, "quantity": 0, "price": "9.50" }]
			})),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "VALIDATION_ERROR");

		let (status, list) = call(&app, "GET", "/api/orders", Some(&admin), None).await;
		assert_eq!(status, StatusCode::OK);
		assert!(list.as_array().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_customers_are_scoped_to_their_orders() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let (restaurant, item, _) = seed_menu(&app, &admin).await;
		let (ana_id, ana) = customer(&app, "ana@example.com").await;
		let (_, bo) = customer(&app, "bo@example.com").await;

		let (status, order) = place(&app, &ana, &restaurant, &item).await;
		assert_eq!(status, StatusCode::CREATED);
		assert_eq!(order["user_id"], ana_id.as_str());
		let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

		let (status, _) = call(&app, "GET", &uri, Some(&ana), None).await;
		assert_eq!(status, StatusCode::OK);
		let (status, body) = call(&app, "GET", &uri, Some(&bo), None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "ORDER_NOT_FOUND");

		let (_, listed) = call(&app, "GET", "/api/orders", Some(&bo), None).await;
		assert!(listed.as_array().unwrap().is_empty());
		let (status, _) = call(
			&app,
			"GET",
			&format!("/api/orders?user_id={}", ana_id),
			Some(&bo),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::FORBIDDEN);

		let (status, _) = call(&app, "PUT", &format!("{}/next-status", uri), Some(&ana), None).await;
		assert_eq!(status, StatusCode::FORBIDDEN);
		let (status, _) = call(&app, "PUT", &format!("{}/cancel", uri), Some(&bo), None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);

		let (status, body) = call(&app, "PUT", &format!("{}/cancel", uri), Some(&ana), None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "cancelled");
	}

	#[tokio::test]
	async fn test_filters_update_and_delete() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let (restaurant, item, _) = seed_menu(&app, &admin).await;
		let (_, first) = place(&app, &admin, &restaurant, &item).await;
		place(&app, &admin, &restaurant, &item).await;
		let first_uri = format!("/api/orders/{}", first["id"].as_str().unwrap());

		call(&app, "PUT", &format!("{}/next-status", first_uri), Some(&admin), None).await;

		let (_, preparing) = call(&app, "GET", "/api/orders/status/preparing", Some(&admin), None).await;
		assert_eq!(preparing.as_array().unwrap().len(), 1);
		let (_, pending) = call(&app, "GET", "/api/orders?status=pending", Some(&admin), None).await;
		assert_eq!(pending.as_array().unwrap().len(), 1);
		let (status, _) = call(&app, "GET", "/api/orders/status/lost", Some(&admin), None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);

		let (status, body) = call(
			&app,
			"PUT",
			&first_uri,
			Some(&admin),
			Some(json!({ "name": "Terrace" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["name"], "Terrace");
		assert_eq!(body["status"], "preparing");

		let (status, _) = call(&app, "DELETE", &first_uri, Some(&admin), None).await;
		assert_eq!(status, StatusCode::OK);
		let (status, _) = call(&app, "GET", &first_uri, Some(&admin), None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_malformed_input_uses_error_envelope() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let (restaurant, item, _) = seed_menu(&app, &admin).await;
		let body = json!({
			"restaurant_id": restaurant,
			"order_items": [{ "menu_item_id": item, "quantity": "two", "price": "9.50" }]
		});

		let (status, error) = call(&app, "POST", "/api/orders", Some(&admin), Some(body.clone())).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(error["error"], "INVALID_REQUEST");
		assert!(error["message"].is_string());

		let (status, error) = call(&app, "POST", "/api/orders", None, Some(body)).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(error["error"], "MISSING_CREDENTIALS");

		let (status, error) = call(&app, "GET", "/api/orders?status=lost", Some(&admin), None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(error["error"], "INVALID_REQUEST");
	}

	#[tokio::test]
	async fn test_update_with_null_detaches_user() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let (restaurant, item, _) = seed_menu(&app, &admin).await;
		let (ana_id, ana) = customer(&app, "ana@example.com").await;
		let (_, order) = place(&app, &ana, &restaurant, &item).await;
		assert_eq!(order["user_id"], ana_id.as_str());
		let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

		let (status, body) = call(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "ready" }))).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["user_id"], ana_id.as_str());
		assert_eq!(body["name"], "Table 4");

		let (status, body) = call(
			&app,
			"PUT",
			&uri,
			Some(&admin),
			Some(json!({ "user_id": null, "name": null })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert!(body["user_id"].is_null());
		assert!(body["name"].is_null());
		assert_eq!(body["status"], "ready");
	}
}
