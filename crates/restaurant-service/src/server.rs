//! HTTP server for the restaurant API.
//!
//! Every route lives under `/api`. Handlers are in [`crate::apis`].

use crate::apis::{auth, health, menu, order, restaurant, user};
use axum::{
	extract::DefaultBodyLimit,
	http::{header, HeaderName, HeaderValue, Method},
	routing::{get, post, put},
	Router,
};
use restaurant_config::{ApiConfig, CorsConfig};
use restaurant_core::RestaurantBackend;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub backend: Arc<RestaurantBackend>,
}

/// Builds the `/api` router with its middleware stack.
pub fn build_router(state: AppState, api_config: &ApiConfig) -> Router {
	let api = Router::new()
		.route("/health", get(health::health))
		.route("/auth/register", post(auth::register))
		.route("/auth/login", post(auth::login))
		.route(
			"/restaurants",
			get(restaurant::list_restaurants).post(restaurant::create_restaurant),
		)
		.route(
			"/restaurants/{id}",
			get(restaurant::get_restaurant)
				.put(restaurant::update_restaurant)
				.delete(restaurant::delete_restaurant),
		)
		.route(
			"/restaurants/{id}/menu_items",
			get(menu::list_menu_items).post(menu::create_menu_item),
		)
		.route(
			"/restaurants/{id}/menu_items/{item_id}",
			get(menu::get_menu_item)
				.put(menu::update_menu_item)
				.delete(menu::delete_menu_item),
		)
		.route("/orders", get(order::list_orders).post(order::create_order))
		.route("/orders/status/{status}", get(order::list_orders_by_status))
		.route("/orders/items/{item_id}", get(order::get_order_item))
		.route(
			"/orders/{id}",
			get(order::get_order)
				.put(order::update_order)
				.delete(order::delete_order),
		)
		.route("/orders/{id}/next-status", put(order::advance_order))
		.route("/orders/{id}/cancel", put(order::cancel_order))
		.route("/users", get(user::list_users).post(user::create_user))
		.route(
			"/users/{id}",
			get(user::get_user)
				.put(user::update_user)
				.delete(user::delete_user),
		)
		.route("/users/{id}/password", put(user::change_password));

	Router::new()
		.nest("/api", api)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				)))
				.layer(cors_layer(api_config.cors.as_ref()))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

/// Permissive without a `[api.cors]` section, otherwise the configured lists.
fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors else {
		return CorsLayer::permissive();
	};

	let origin = if cors.allowed_origins.iter().any(|origin| origin == "*") {
		AllowOrigin::any()
	} else {
		AllowOrigin::list(cors.allowed_origins.iter().filter_map(|origin| {
			HeaderValue::from_str(origin)
				.inspect_err(|_| tracing::warn!(origin = %origin, "Ignoring invalid CORS origin"))
				.ok()
		}))
	};

	let methods: Vec<Method> = if cors.allowed_methods.is_empty() {
		vec![Method::GET, Method::POST, Method::PUT, Method::DELETE]
	} else {
		cors.allowed_methods
			.iter()
			.filter_map(|method| {
				Method::from_bytes(method.to_uppercase().as_bytes())
					.inspect_err(|_| tracing::warn!(method = %method, "Ignoring invalid CORS method"))
					.ok()
			})
			.collect()
	};

	let headers: Vec<HeaderName> = if cors.allowed_headers.is_empty() {
		vec![header::AUTHORIZATION, header::CONTENT_TYPE]
	} else {
		cors.allowed_headers
			.iter()
			.filter_map(|name| {
				HeaderName::from_bytes(name.as_bytes())
					.inspect_err(|_| tracing::warn!(header = %name, "Ignoring invalid CORS header"))
					.ok()
			})
			.collect()
	};

	CorsLayer::new()
		.allow_origin(origin)
		.allow_methods(methods)
		.allow_headers(headers)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn start_server(
	api_config: ApiConfig,
	backend: Arc<RestaurantBackend>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(AppState { backend }, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Restaurant API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!(error = %e, "Failed to listen for shutdown signal");
			}
			tracing::info!("Shutdown signal received");
		})
		.await?;

	Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::{Request, StatusCode};
	use restaurant_config::{BootstrapAdmin, ConfigBuilder};
	use restaurant_core::BackendBuilder;
	use restaurant_storage::{get_all_implementations, StorageFactory};
	use restaurant_types::SecretString;
	use serde_json::{json, Value};
	use std::collections::HashMap;
	use tower::ServiceExt;

	pub(crate) const ADMIN_EMAIL: &str = "admin@example.com";
	pub(crate) const ADMIN_PASSWORD: &str = "admin-password";

	/// A router over fresh in-memory storage with one admin account.
	pub(crate) async fn test_app() -> Router {
		let config = ConfigBuilder::new()
			.bootstrap_admin(Some(BootstrapAdmin {
				name: "Admin".into(),
				email: ADMIN_EMAIL.into(),
				password: SecretString::from(ADMIN_PASSWORD),
			}))
			.build();
		let factories: HashMap<String, StorageFactory> = get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect();
		let backend = BackendBuilder::new(config).build(&factories).await.unwrap();
		build_router(
			AppState {
				backend: Arc::new(backend),
			},
			&ApiConfig::default(),
		)
	}

	/// Sends one request and returns the status with the parsed JSON body.
	pub(crate) async fn call(
		app: &Router,
		method: &str,
		uri: &str,
		token: Option<&str>,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let mut request = Request::builder().method(method).uri(uri);
		if let Some(token) = token {
			request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
		}
		let request = match body {
			Some(body) => request
				.header(header::CONTENT_TYPE, "application/json")
				.body(Body::from(body.to_string()))
				.unwrap(),
			None => request.body(Body::empty()).unwrap(),
		};

		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let json = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap_or(Value::Null)
		};
		(status, json)
	}

	pub(crate) async fn login(app: &Router, email: &str, password: &str) -> String {
		let (status, body) = call(
			app,
			"POST",
			"/api/auth/login",
			None,
			Some(json!({ "email": email, "password": password })),
		)
		.await;
		assert_eq!(status, StatusCode::OK, "login failed: {}", body);
		body["access_token"].as_str().unwrap().to_string()
	}

	pub(crate) async fn admin_token(app: &Router) -> String {
		login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
	}

	/// Registers a customer and returns their id and token.
	pub(crate) async fn customer(app: &Router, email: &str) -> (String, String) {
		let (status, body) = call(
			app,
			"POST",
			"/api/auth/register",
			None,
			Some(json!({ "name": "Guest", "email": email, "password": "guest-password" })),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
		let id = body["id"].as_str().unwrap().to_string();
		(id, login(app, email, "guest-password").await)
	}

	/// Creates a user with the given role through the admin API.
	pub(crate) async fn staff(app: &Router, admin: &str, email: &str, role: &str) -> String {
		let (status, body) = call(
			app,
			"POST",
			"/api/users",
			Some(admin),
			Some(json!({
				"name": "Staff",
				"email": email,
				"password": "staff-password",
				"role": role
			})),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED, "create user failed: {}", body);
		login(app, email, "staff-password").await
	}

	/// Creates a restaurant with two menu items. Returns their ids.
	pub(crate) async fn seed_menu(app: &Router, admin: &str) -> (String, String, String) {
		let (status, restaurant) = call(
			app,
			"POST",
			"/api/restaurants",
			Some(admin),
			Some(json!({
				"name": "Trattoria",
				"address": "1 Main St",
				"city": "Springfield",
				"state": "IL",
				"zip_code": "62701"
			})),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED);
		let restaurant_id = restaurant["id"].as_str().unwrap().to_string();

		let mut items = Vec::new();
		for (name, price) in [("Margherita", "9.50"), ("Lemonade", "3.00")] {
			let (status, item) = call(
				app,
				"POST",
				&format!("/api/restaurants/{}/menu_items", restaurant_id),
				Some(admin),
				Some(json!({ "name": name, "price": price, "category": "food" })),
			)
			.await;
			assert_eq!(status, StatusCode::CREATED, "menu item failed: {}", item);
			items.push(item["id"].as_str().unwrap().to_string());
		}
		(restaurant_id, items[0].clone(), items[1].clone())
	}

	#[tokio::test]
	async fn test_unknown_route_is_404() {
		let app = test_app().await;
		let (status, _) = call(&app, "GET", "/api/nope", None, None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_cors_preflight_is_answered() {
		let app = test_app().await;
		let request = Request::builder()
			.method("OPTIONS")
			.uri("/api/restaurants")
			.header(header::ORIGIN, "http://localhost:5173")
			.header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
			.body(Body::empty())
			.unwrap();
		let response = app.oneshot(request).await.unwrap();
		assert!(response.status().is_success());
		assert!(response
			.headers()
			.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
	}

	#[test]
	fn test_configured_cors_accepts_wildcard_and_lists() {
		let _ = cors_layer(Some(&CorsConfig {
			allowed_origins: vec!["*".into()],
			allowed_headers: vec![],
			allowed_methods: vec![],
		}));
		let _ = cors_layer(Some(&CorsConfig {
			allowed_origins: vec!["https://orders.example.com".into()],
			allowed_headers: vec!["authorization".into()],
			allowed_methods: vec!["get".into(), "put".into()],
		}));
	}

	#[tokio::test]
	async fn test_oversized_body_is_rejected() {
		let app = test_app().await;
		let admin = admin_token(&app).await;
		let padding = "x".repeat(ApiConfig::default().max_request_size + 1);
		let (status, body) = call(
			&app,
			"POST",
			"/api/restaurants",
			Some(&admin),
			Some(json!({ "name": padding })),
		)
		.await;
		assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
		assert_eq!(body["error"], "PAYLOAD_TOO_LARGE");
	}
}
