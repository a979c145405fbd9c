use axum::http::StatusCode;
use derive_more::From;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::{error::ClientError, tools::storage::error::StorageError};


pub type Result<T> = core::result::Result<T, Error>;

#[serde_as]
#[derive(Debug, Serialize, From, strum_macros::AsRefStr)]
pub enum Error {
	InvalidIdentifier(String),

	PersonNotFound(String),
	ImageNotFound(String),

	// validation
	NameRequired,
	DuplicateName(String),
	NoFilesProvided,
	FileTypeNotAllowed(String),

	UnreadableImage(String),

    CannotOpenDatabase,

	// -- Externals
	#[from]
	Storage(#[serde_as(as = "DisplayFromStr")] StorageError),

	#[from]
	TokioRusqlite(#[serde_as(as = "DisplayFromStr")] tokio_rusqlite::Error),
	#[from]
	Rusqlite(#[serde_as(as = "DisplayFromStr")] rusqlite::Error),
	#[from]
	TokioIo(#[serde_as(as = "DisplayFromStr")] tokio::io::Error),
	#[from]
	Serde(#[serde_as(as = "DisplayFromStr")] serde_json::Error),
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


impl Error {
	pub fn client_status_and_error(&self) -> (StatusCode, ClientError) {
		match self {
			Error::PersonNotFound(_) | Error::ImageNotFound(_) => (StatusCode::NOT_FOUND, ClientError::NOT_FOUND),

			Error::InvalidIdentifier(_) => (StatusCode::BAD_REQUEST, ClientError::INVALID_IDENTIFIER),

			Error::NameRequired
			| Error::DuplicateName(_)
			| Error::NoFilesProvided
			| Error::FileTypeNotAllowed(_) => (StatusCode::BAD_REQUEST, ClientError::VALIDATION_ERROR),

			Error::UnreadableImage(_) => (StatusCode::BAD_GATEWAY, ClientError::EXTERNAL_SERVICE_ERROR),
			Error::Storage(s) => s.client_status_and_error(),

			_ => (StatusCode::INTERNAL_SERVER_ERROR, ClientError::SERVICE_ERROR),
		}
	}

	/// Human readable text returned to clients and recorded on batch items.
	pub fn client_message(&self) -> String {
		match self {
			Error::InvalidIdentifier(id) => format!("Invalid ID: {}", id),
			Error::PersonNotFound(_) => "Person not found".to_string(),
			Error::ImageNotFound(_) => "Image not found".to_string(),
			Error::NameRequired => "Name is required".to_string(),
			Error::DuplicateName(_) => "A person with this name already exists".to_string(),
			Error::NoFilesProvided => "No files provided".to_string(),
			Error::FileTypeNotAllowed(_) => "File type not allowed".to_string(),
			Error::UnreadableImage(_) => "Image could not be read".to_string(),
			Error::Storage(StorageError::NotFound(_)) => "Image file not found".to_string(),
			Error::Storage(StorageError::Fetch(_)) => "Failed to download image".to_string(),
			Error::Storage(StorageError::Upload(reason)) => format!("Upload failed: {}", reason),
			Error::Storage(_) => "External storage service failed".to_string(),
			_ => "Internal server error".to_string(),
		}
	}
}
