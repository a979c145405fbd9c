use crate::{domain::image::ImageQuery, model::ModelController, Result};
use axum::{extract::{DefaultBodyLimit, Multipart, Path, Query, State}, routing::{get, patch, post}, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

/// Largest accepted upload batch.
const UPLOAD_LIMIT: usize = 64 * 1024 * 1024;

pub fn routes(mc: ModelController) -> Router {
	Router::new()
		.route("/", get(handler_list))
		.route("/upload", post(handler_upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)))
		.route("/:id", get(handler_get).delete(handler_delete))
		.route("/:id/assign", patch(handler_assign))
		.route("/:id/reprocess", post(handler_reprocess))
		.with_state(mc)
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
	person_id: Option<String>,
}

async fn handler_list(State(mc): State<ModelController>, Query(query): Query<ImageQuery>) -> Result<Json<Value>> {
	let page = mc.get_images(query).await?;
	Ok(Json(json!({
		"success": true,
		"data": page.images,
		"pagination": page.pagination,
	})))
}

async fn handler_get(Path(image_id): Path<String>, State(mc): State<ModelController>) -> Result<Json<Value>> {
	let image = mc.get_image(&image_id).await?;
	Ok(Json(json!({ "success": true, "data": image })))
}

async fn handler_upload(State(mc): State<ModelController>, mut multipart: Multipart) -> Result<Json<Value>> {
	let mut files = vec![];
	while let Some(field) = multipart.next_field().await? {
		if field.name() != Some("files") {
			continue;
		}
		let filename = field.file_name().unwrap_or_default().to_string();
		let data = field.bytes().await?;
		files.push((filename, data.to_vec()));
	}

	let results = mc.ingest_images(files).await?;
	let successful = results.iter().filter(|r| r.success).count();
	Ok(Json(json!({
		"success": true,
		"message": format!("Uploaded {} of {} images", successful, results.len()),
		"results": results,
	})))
}

async fn handler_delete(Path(image_id): Path<String>, State(mc): State<ModelController>) -> Result<Json<Value>> {
	mc.remove_image(&image_id).await?;
	Ok(Json(json!({ "success": true, "message": "Image deleted successfully" })))
}

async fn handler_assign(Path(image_id): Path<String>, State(mc): State<ModelController>, Json(request): Json<AssignRequest>) -> Result<Json<Value>> {
	let image = mc.assign_image(&image_id, request.person_id.filter(|p| !p.is_empty())).await?;
	let message = match &image.person {
		Some(person) => format!("Image assigned to {}", person.name),
		None => "Image unassigned successfully".to_string(),
	};
	Ok(Json(json!({ "success": true, "message": message, "data": image })))
}

async fn handler_reprocess(Path(image_id): Path<String>, State(mc): State<ModelController>) -> Result<Json<Value>> {
	let processed = mc.reprocess_image(&image_id).await?;
	Ok(Json(json!({
		"success": true,
		"message": format!("Reprocessed image. Found {} face(s).", processed.faces_detected),
		"faces_detected": processed.faces_detected,
		"matched_person": processed.matched_person,
		"data": processed.image,
	})))
}
