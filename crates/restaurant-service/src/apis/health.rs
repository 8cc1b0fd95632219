//! Liveness endpoint.

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use restaurant_types::HealthResponse;

/// Handles GET /api/health. Answers 503 when storage is unreachable.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
	match state.backend.health_check().await {
		Ok(()) => (
			StatusCode::OK,
			Json(HealthResponse {
				status: "ok".into(),
				storage: "ok".into(),
			}),
		),
		Err(_) => (
			StatusCode::SERVICE_UNAVAILABLE,
			Json(HealthResponse {
				status: "degraded".into(),
				storage: "unavailable".into(),
			}),
		),
	}
}

#[cfg(test)]
mod tests {
	use crate::server::tests::{call, test_app};
	use axum::http::StatusCode;

	#[tokio::test]
	async fn test_health_is_public() {
		let app = test_app().await;
		let (status, body) = call(&app, "GET", "/api/health", None, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "ok");
		assert_eq!(body["storage"], "ok");
	}
}
