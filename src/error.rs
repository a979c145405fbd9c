use std::sync::Arc;

use axum::{extract::multipart::MultipartError, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use derive_more::From;
use serde_json::json;
use serde_with::{serde_as, DisplayFromStr};
use nanoid::nanoid;

use crate::{tools::{log::{log_error, LogServiceType}, storage::error::StorageError}};

pub type Result<T> = core::result::Result<T, Error>;

#[serde_as]
#[derive(Debug, Serialize, From, strum_macros::AsRefStr)]
#[serde(tag = "type", content = "data")]
pub enum Error {
    // -- Servers errors.
	ServerMalformatedConfigFile,
	ServerUnableToAccessServerLocalFolder,

	// -- Externals

	#[from]
	Model(#[serde_as(as = "DisplayFromStr")] crate::model::error::Error),

	#[from]
	Storage(#[serde_as(as = "DisplayFromStr")] StorageError),

	#[from]
	Io(#[serde_as(as = "DisplayFromStr")] std::io::Error),

	#[from]
	Serde(#[serde_as(as = "DisplayFromStr")] serde_json::Error),

	#[from]
	Multipart(#[serde_as(as = "DisplayFromStr")] MultipartError),
}

// region:    --- Error Boilerplate
impl core::fmt::Display for Error {
	fn fmt(
		&self,
		fmt: &mut core::fmt::Formatter,
	) -> core::result::Result<(), core::fmt::Error> {
		write!(fmt, "{self:?}")
	}
}

impl std::error::Error for Error {}
// endregion: --- Error Boilerplate

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let nanoid = nanoid!();
		log_error(LogServiceType::Other, format!("{} {:?}", nanoid, self));
		let (status_code, client_error) = self.client_status_and_error();

		let error_json = json!({
						"success": false,
						"error": {
							"type": client_error.as_ref(),
							"message": self.client_message(),
							"req_uuid": nanoid.to_string(),
						}
					});

		let mut error_response = (status_code, Json(error_json)).into_response();

		// Insert the Error into the reponse.
		error_response.extensions_mut().insert(Arc::new(self));

		error_response
	}
}

impl Error {
	pub fn client_status_and_error(&self) -> (StatusCode, ClientError) {
		match self {
			Self::Model(err) => err.client_status_and_error(),
			Self::Storage(err) => err.client_status_and_error(),
			Self::Multipart(_) | Self::Serde(_) => (StatusCode::BAD_REQUEST, ClientError::VALIDATION_ERROR),

			// -- Fallback.
			_ => (
				StatusCode::INTERNAL_SERVER_ERROR,
				ClientError::SERVICE_ERROR,
			),
		}
	}

	pub fn client_message(&self) -> String {
		match self {
			Self::Model(err) => err.client_message(),
			Self::Storage(StorageError::NotFound(_)) => "Not found".to_string(),
			Self::Storage(_) => "External storage service failed".to_string(),
			Self::Multipart(err) => err.body_text(),
			_ => "Internal server error".to_string(),
		}
	}
}


#[derive(Debug, strum_macros::AsRefStr)]
#[allow(non_camel_case_types)]
pub enum ClientError {
	NOT_FOUND,
	INVALID_IDENTIFIER,
	VALIDATION_ERROR,
	EXTERNAL_SERVICE_ERROR,
	SERVICE_ERROR,
}
