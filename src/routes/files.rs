use std::sync::Arc;

use crate::{tools::storage::local::LocalStorage, Result};
use axum::{extract::{Path, Query, State}, http::header, response::{IntoResponse, Response}, routing::get, Router};
use serde::Deserialize;


pub fn routes(storage: Arc<LocalStorage>) -> Router {
	Router::new()
		.route("/:reference", get(handler_file))
		.with_state(storage)
}

#[derive(Debug, Deserialize, Default)]
struct FileOptions {
	size: Option<String>,
}

async fn handler_file(Path(reference): Path<String>, State(storage): State<Arc<LocalStorage>>, Query(options): Query<FileOptions>) -> Result<Response> {
	if options.size.as_deref() == Some("thumb") {
		let data = storage.read_thumbnail(&reference).await?;
		return Ok(([(header::CONTENT_TYPE, "image/jpeg")], data).into_response());
	}
	let data = storage.read(&reference).await?;
	let mime = mime_guess::from_path(&reference).first_or_octet_stream();
	Ok(([(header::CONTENT_TYPE, mime.to_string())], data).into_response())
}
