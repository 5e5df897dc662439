use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// JSON response body indented with two spaces.
#[derive(Debug, Clone)]
pub struct PrettyJson<T>(pub T);

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec_pretty(&self.0) {
            Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
            Err(err) => {
                error!(%err, "Failed to encode response");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "HTTP 500: Internal Server Error",
                )
                    .into_response()
            }
        }
    }
}
