use async_trait::async_trait;

use crate::domain::image::StoredObject;

use self::error::StorageResult;

pub mod error;
pub mod local;
pub mod cloudinary;

pub const THUMBNAIL_SIZE: u32 = 200;

/// External home of the image binaries.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn store(&self, data: Vec<u8>, filename: &str) -> StorageResult<StoredObject>;
    async fn fetch(&self, object: &StoredObject) -> StorageResult<Vec<u8>>;
    async fn delete(&self, reference: &str) -> StorageResult<()>;
    /// Pure url transformation, never touches the network.
    fn thumbnail_url(&self, url: &str) -> String;
}

/// Inserts a face-centred crop transformation after the `/upload/` segment.
/// Urls without that segment are returned unchanged.
pub fn cloudinary_thumbnail_url(url: &str, width: u32, height: u32) -> String {
    match url.split_once("/upload/") {
        Some((base, path)) => format!("{}/upload/c_fill,w_{},h_{},g_face/{}", base, width, height, path),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_transformation() {
        assert_eq!(
            cloudinary_thumbnail_url("https://res.cloudinary.com/demo/image/upload/v1/image-organizer/abc.jpg", 200, 200),
            "https://res.cloudinary.com/demo/image/upload/c_fill,w_200,h_200,g_face/v1/image-organizer/abc.jpg"
        );
        assert_eq!(cloudinary_thumbnail_url("https://example.com/abc.jpg", 200, 200), "https://example.com/abc.jpg");
    }
}
