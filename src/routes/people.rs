use crate::{domain::{image::ImageQuery, people::{PeopleQuery, PersonForAdd, PersonForUpdate}}, model::ModelController, Result};
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};


pub fn routes(mc: ModelController) -> Router {
	Router::new()
		.route("/", get(handler_list).post(handler_post))
		.route("/:id", get(handler_get).put(handler_put).delete(handler_delete))
		.route("/:id/images", get(handler_images))
		.with_state(mc)
}

#[derive(Debug, Deserialize, Default)]
struct DeleteOptions {
	#[serde(default)]
	delete_images: bool,
}

async fn handler_list(State(mc): State<ModelController>, Query(query): Query<PeopleQuery>) -> Result<Json<Value>> {
	let people = mc.get_people(query).await?;
	let body = Json(json!({
		"success": true,
		"total": people.len(),
		"data": people,
	}));
	Ok(body)
}

async fn handler_get(Path(person_id): Path<String>, State(mc): State<ModelController>) -> Result<Json<Value>> {
	let person = mc.get_person(&person_id).await?;
	Ok(Json(json!({ "success": true, "data": person })))
}

async fn handler_post(State(mc): State<ModelController>, Json(person): Json<PersonForAdd>) -> Result<(StatusCode, Json<Value>)> {
	let person = mc.add_person(person).await?;
	let body = Json(json!({
		"success": true,
		"message": "Person created successfully",
		"data": person,
	}));
	Ok((StatusCode::CREATED, body))
}

async fn handler_put(Path(person_id): Path<String>, State(mc): State<ModelController>, Json(update): Json<PersonForUpdate>) -> Result<Json<Value>> {
	let person = mc.update_person(&person_id, update).await?;
	Ok(Json(json!({
		"success": true,
		"message": "Person updated successfully",
		"data": person,
	})))
}

async fn handler_delete(Path(person_id): Path<String>, State(mc): State<ModelController>, Query(options): Query<DeleteOptions>) -> Result<Json<Value>> {
	let person = mc.remove_person(&person_id, options.delete_images).await?;
	let outcome = if options.delete_images { "deleted" } else { "unassigned" };
	Ok(Json(json!({
		"success": true,
		"message": format!("Person deleted successfully. Images {}.", outcome),
		"data": person,
	})))
}

async fn handler_images(Path(person_id): Path<String>, State(mc): State<ModelController>, Query(query): Query<ImageQuery>) -> Result<Json<Value>> {
	let (person, page) = mc.get_person_images(&person_id, query).await?;
	Ok(Json(json!({
		"success": true,
		"data": page.images,
		"person": person,
		"pagination": page.pagination,
	})))
}
