use crate::Result;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};


pub fn routes() -> Router {
	Router::new().route("/", get(handler_health))
}

async fn handler_health() -> Result<Json<Value>> {
	let body = Json(json!({
		"success": true,
		"status": "healthy",
		"message": "Image Organizer API is running"
	}));

	Ok(body)
}
