use crate::{model::ModelController, Result};
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};


pub fn routes(mc: ModelController) -> Router {
	Router::new()
		.route("/", get(handler_stats))
		.route("/recent", get(handler_recent))
		.route("/unidentified", get(handler_unidentified))
		.route("/people-summary", get(handler_people_summary))
		.with_state(mc)
}

async fn handler_stats(State(mc): State<ModelController>) -> Result<Json<Value>> {
	let stats = mc.get_stats().await?;
	Ok(Json(json!({ "success": true, "data": stats })))
}

async fn handler_recent(State(mc): State<ModelController>) -> Result<Json<Value>> {
	let images = mc.get_recent().await?;
	Ok(Json(json!({ "success": true, "data": images })))
}

async fn handler_unidentified(State(mc): State<ModelController>) -> Result<Json<Value>> {
	let images = mc.get_unidentified().await?;
	Ok(Json(json!({ "success": true, "data": images, "total": images.len() })))
}

async fn handler_people_summary(State(mc): State<ModelController>) -> Result<Json<Value>> {
	let people = mc.get_people_summary().await?;
	Ok(Json(json!({ "success": true, "data": people })))
}
