use axum::http::StatusCode;
use derive_more::From;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::error::ClientError;

pub type StorageResult<T> = core::result::Result<T, StorageError>;

#[serde_as]
#[derive(Debug, Serialize, From, strum_macros::AsRefStr)]
pub enum StorageError {
	NotFound(Option<String>),
	InvalidReference(String),
	Upload(String),
	Fetch(String),
	Delete(String),

	#[from]
	Io(#[serde_as(as = "DisplayFromStr")] std::io::Error),
	#[from]
	Reqwest(#[serde_as(as = "DisplayFromStr")] reqwest::Error),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for StorageError {
	fn fmt(
		&self,
		fmt: &mut core::fmt::Formatter,
	) -> core::result::Result<(), core::fmt::Error> {
		write!(fmt, "{self:?}")
	}
}

impl std::error::Error for StorageError {}

// endregion: --- Error Boilerplate

impl StorageError {
	pub fn client_status_and_error(&self) -> (StatusCode, ClientError) {
		match self {
			StorageError::NotFound(_) => (StatusCode::NOT_FOUND, ClientError::NOT_FOUND),
			StorageError::InvalidReference(_) => (StatusCode::BAD_REQUEST, ClientError::INVALID_IDENTIFIER),
			_ => (StatusCode::BAD_GATEWAY, ClientError::EXTERNAL_SERVICE_ERROR),
		}
	}
}
