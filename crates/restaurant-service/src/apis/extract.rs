//! Request extractors whose rejections use the API error envelope.
//!
//! Handlers that authenticate take these as `Result<Body<T>, APIError>` and
//! unwrap them after [`super::authenticate`], so an anonymous caller with a
//! broken body still gets 401.

use axum::{
	extract::{
		rejection::{JsonRejection, QueryRejection},
		FromRequest, FromRequestParts, Query, Request,
	},
	http::{request::Parts, StatusCode},
	Json,
};
use restaurant_types::APIError;
use serde::de::DeserializeOwned;

/// JSON request body.
pub(crate) struct Body<T>(pub T);

/// Query string parameters.
pub(crate) struct Params<T>(pub T);

impl<S, T> FromRequest<S> for Body<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = APIError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		Json::<T>::from_request(req, state)
			.await
			.map(|Json(value)| Body(value))
			.map_err(json_rejection)
	}
}

impl<S, T> FromRequestParts<S> for Params<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = APIError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		Query::<T>::from_request_parts(parts, state)
			.await
			.map(|Query(value)| Params(value))
			.map_err(query_rejection)
	}
}

fn json_rejection(rejection: JsonRejection) -> APIError {
	tracing::debug!(error = %rejection.body_text(), "Rejected request body");
	if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
		return APIError::payload_too_large(rejection.body_text());
	}
	APIError::bad_request("INVALID_REQUEST", rejection.body_text())
}

fn query_rejection(rejection: QueryRejection) -> APIError {
	tracing::debug!(error = %rejection.body_text(), "Rejected query string");
	APIError::bad_request("INVALID_REQUEST", rejection.body_text())
}
