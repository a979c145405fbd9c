use std::{io::Cursor, path::PathBuf};

use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use nanoid::nanoid;
use tokio::fs;

use crate::{domain::image::StoredObject, tools::{log::{log_info, LogServiceType}, text_tools::file_extension}};

use super::{error::{StorageError, StorageResult}, ObjectStorage, THUMBNAIL_SIZE};

/// Keeps binaries in a local folder and exposes them under `{public_url}/files/{reference}`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalStorage {
    pub fn new(root: PathBuf, public_url: &str) -> Self {
        LocalStorage { root, public_url: public_url.trim_end_matches('/').to_string() }
    }

    pub fn check_reference(reference: &str) -> StorageResult<()> {
        let valid = !reference.is_empty()
            && !reference.starts_with('.')
            && reference.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if valid {
            Ok(())
        } else {
            Err(StorageError::InvalidReference(reference.to_string()))
        }
    }

    fn path_for(&self, reference: &str) -> StorageResult<PathBuf> {
        Self::check_reference(reference)?;
        Ok(self.root.join(reference))
    }

    pub async fn read(&self, reference: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(reference)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(Some(reference.to_string()))),
            Err(e) => Err(e.into()),
        }
    }

    /// Square centre crop, jpeg encoded.
    pub async fn read_thumbnail(&self, reference: &str) -> StorageResult<Vec<u8>> {
        let data = self.read(reference).await?;
        tokio::task::spawn_blocking(move || -> StorageResult<Vec<u8>> {
            let image = image::load_from_memory(&data).map_err(|e| StorageError::Fetch(e.to_string()))?;
            let thumb = DynamicImage::ImageRgb8(image.resize_to_fill(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle).to_rgb8());
            let mut output = Cursor::new(Vec::new());
            thumb.write_to(&mut output, ImageFormat::Jpeg).map_err(|e| StorageError::Fetch(e.to_string()))?;
            Ok(output.into_inner())
        }).await.map_err(|e| StorageError::Fetch(e.to_string()))?
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn store(&self, data: Vec<u8>, filename: &str) -> StorageResult<StoredObject> {
        let extension = file_extension(filename)
            .or_else(|| image::guess_format(&data).ok().and_then(|f| f.extensions_str().first().map(|e| e.to_string())))
            .unwrap_or_else(|| "bin".to_string());
        let reference = format!("{}.{}", nanoid!(), extension);
        fs::create_dir_all(&self.root).await.map_err(|e| StorageError::Upload(e.to_string()))?;
        fs::write(self.path_for(&reference)?, data).await.map_err(|e| StorageError::Upload(e.to_string()))?;
        let url = format!("{}/files/{}", self.public_url, reference);
        Ok(StoredObject { reference, url })
    }

    async fn fetch(&self, object: &StoredObject) -> StorageResult<Vec<u8>> {
        self.read(&object.reference).await
    }

    async fn delete(&self, reference: &str) -> StorageResult<()> {
        let path = self.path_for(reference)?;
        match fs::remove_file(&path).await {
            Ok(_) => {
                log_info(LogServiceType::Storage, format!("Deleted file {}", reference));
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete(e.to_string())),
        }
    }

    fn thumbnail_url(&self, url: &str) -> String {
        format!("{}?size=thumb", url)
    }
}
