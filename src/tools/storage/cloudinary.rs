use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::{domain::image::StoredObject, tools::{clock::now, log::{log_info, LogServiceType}}};

use super::{cloudinary_thumbnail_url, error::{StorageError, StorageResult}, ObjectStorage, THUMBNAIL_SIZE};

const API_HOST: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone)]
pub struct CloudinaryStorage {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Signature over the alphabetically sorted parameters followed by the secret.
pub fn sign_parameters(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<String>>().join("&");
    let mut hasher = Sha1::new();
    hasher.update(format!("{}{}", to_sign, api_secret).as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryStorage {
    pub fn new(cloud_name: String, api_key: String, api_secret: String, folder: String) -> Self {
        CloudinaryStorage { client: reqwest::Client::new(), cloud_name, api_key, api_secret, folder }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", API_HOST, self.cloud_name, action)
    }
}

#[async_trait]
impl ObjectStorage for CloudinaryStorage {
    async fn store(&self, data: Vec<u8>, filename: &str) -> StorageResult<StoredObject> {
        let timestamp = now().timestamp().to_string();
        let signature = sign_parameters(&[("folder", self.folder.clone()), ("timestamp", timestamp.clone())], &self.api_secret);
        let form = Form::new()
            .part("file", Part::bytes(data).file_name(filename.to_string()))
            .text("api_key", self.api_key.clone())
            .text("folder", self.folder.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self.client.post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload(format!("{}: {}", status, body)));
        }
        let uploaded: UploadResponse = response.json().await.map_err(|e| StorageError::Upload(e.to_string()))?;
        log_info(LogServiceType::Storage, format!("Uploaded {} as {}", filename, uploaded.public_id));
        Ok(StoredObject { reference: uploaded.public_id, url: uploaded.secure_url })
    }

    async fn fetch(&self, object: &StoredObject) -> StorageResult<Vec<u8>> {
        let response = self.client.get(&object.url)
            .send()
            .await
            .map_err(|e| StorageError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StorageError::Fetch(format!("Failed to download image: {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| StorageError::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, reference: &str) -> StorageResult<()> {
        let timestamp = now().timestamp().to_string();
        let signature = sign_parameters(&[("public_id", reference.to_string()), ("timestamp", timestamp.clone())], &self.api_secret);
        let params = [
            ("public_id", reference.to_string()),
            ("api_key", self.api_key.clone()),
            ("timestamp", timestamp),
            ("signature", signature),
        ];
        let response = self.client.post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| StorageError::Delete(e.to_string()))?;
        let destroyed: DestroyResponse = response.json().await.map_err(|e| StorageError::Delete(e.to_string()))?;
        // "not found" means the binary is already gone
        if destroyed.result == "ok" || destroyed.result == "not found" {
            Ok(())
        } else {
            Err(StorageError::Delete(destroyed.result))
        }
    }

    fn thumbnail_url(&self, url: &str) -> String {
        cloudinary_thumbnail_url(url, THUMBNAIL_SIZE, THUMBNAIL_SIZE)
    }
}
