pub mod store;
pub mod error;

pub mod ledger;
pub mod people;
pub mod images;
pub mod stats;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use crate::{domain::is_valid_id, tools::{recognition::{DescriptorExtractor, FaceMatcher}, storage::ObjectStorage}};

use self::store::SqliteStore;
use error::{Error, Result};


#[derive(Clone)]
pub struct ModelController {
	store: Arc<SqliteStore>,
	pub matcher: FaceMatcher,
	extractor: Arc<dyn DescriptorExtractor>,
	storage: Arc<dyn ObjectStorage>,
	allowed_extensions: Arc<Vec<String>>,
}


// Constructor
impl ModelController {
	pub fn new(store: SqliteStore, matcher: FaceMatcher, extractor: Arc<dyn DescriptorExtractor>, storage: Arc<dyn ObjectStorage>, allowed_extensions: Vec<String>) -> Self {
		Self {
			store: Arc::new(store),
			matcher,
			extractor,
			storage,
			allowed_extensions: Arc::new(allowed_extensions.into_iter().map(|e| e.to_lowercase()).collect()),
		}
	}
}

impl ModelController {
	pub fn check_id(id: &str) -> Result<()> {
		if is_valid_id(id) {
			Ok(())
		} else {
			Err(Error::InvalidIdentifier(id.to_string()))
		}
	}

	pub fn is_extension_allowed(&self, extension: &str) -> bool {
		let extension = extension.to_lowercase();
		self.allowed_extensions.iter().any(|e| *e == extension)
	}
}
