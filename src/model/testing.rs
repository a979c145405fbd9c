use std::{collections::HashMap, sync::{atomic::{AtomicBool, Ordering}, Arc, Mutex}};

use async_trait::async_trait;

use crate::{domain::{face::{DetectedFace, FaceBox}, image::{ImageForInsert, StoredObject}, new_id, people::{Person, PersonForAdd}}, tools::{recognition::{DescriptorExtractor, ExtractionError, FaceMatcher}, storage::{cloudinary_thumbnail_url, error::{StorageError, StorageResult}, ObjectStorage, THUMBNAIL_SIZE}}};

use super::{store::SqliteStore, ModelController};

pub const UNREADABLE: &[u8] = b"unreadable";
pub const DETECTION_FAILS: &[u8] = b"detection fails";

/// Returns the faces registered for given bytes, nothing otherwise.
#[derive(Default)]
pub struct FakeExtractor {
    faces: Mutex<HashMap<Vec<u8>, Vec<DetectedFace>>>,
}

impl FakeExtractor {
    pub fn register(&self, bytes: &[u8], faces: Vec<DetectedFace>) {
        self.faces.lock().unwrap().insert(bytes.to_vec(), faces);
    }
}

#[async_trait]
impl DescriptorExtractor for FakeExtractor {
    async fn extract(&self, image: &[u8]) -> Result<Vec<DetectedFace>, ExtractionError> {
        if image == UNREADABLE {
            return Err(ExtractionError::Unreadable("not an image".to_string()));
        }
        if image == DETECTION_FAILS {
            return Err(ExtractionError::Failed("detector crashed".to_string()));
        }
        Ok(self.faces.lock().unwrap().get(image).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_store: AtomicBool,
    pub fail_fetch: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MemoryStorage {
    pub fn count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.objects.lock().unwrap().contains_key(reference)
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn store(&self, data: Vec<u8>, _filename: &str) -> StorageResult<StoredObject> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(StorageError::Upload("storage offline".to_string()));
        }
        let reference = new_id();
        self.objects.lock().unwrap().insert(reference.clone(), data);
        Ok(StoredObject { url: format!("https://res.cloudinary.com/test/image/upload/v1/{}.jpg", reference), reference })
    }

    async fn fetch(&self, object: &StoredObject) -> StorageResult<Vec<u8>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StorageError::Fetch("storage offline".to_string()));
        }
        self.objects.lock().unwrap().get(&object.reference).cloned().ok_or(StorageError::NotFound(Some(object.reference.clone())))
    }

    async fn delete(&self, reference: &str) -> StorageResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Delete("storage offline".to_string()));
        }
        self.objects.lock().unwrap().remove(reference);
        Ok(())
    }

    fn thumbnail_url(&self, url: &str) -> String {
        cloudinary_thumbnail_url(url, THUMBNAIL_SIZE, THUMBNAIL_SIZE)
    }
}

pub async fn test_controller() -> (ModelController, Arc<FakeExtractor>, Arc<MemoryStorage>) {
    let store = SqliteStore::new_in_memory().await.unwrap();
    let extractor = Arc::new(FakeExtractor::default());
    let storage = Arc::new(MemoryStorage::default());
    let extensions = ["png", "jpg", "jpeg", "gif", "webp"].iter().map(|e| e.to_string()).collect();
    let mc = ModelController::new(store, FaceMatcher::default(), extractor.clone(), storage.clone(), extensions);
    (mc, extractor, storage)
}

/// Two dimensional descriptor `[x, 0]`, handy to reason about distances.
pub fn face(x: f32) -> DetectedFace {
    DetectedFace { descriptor: vec![x, 0.0], bbox: FaceBox { top: 10, right: 60, bottom: 60, left: 10 } }
}

pub async fn add_person(mc: &ModelController, name: &str) -> String {
    mc.add_person(PersonForAdd { name: Some(name.to_string()) }).await.unwrap().id
}

pub async fn person(mc: &ModelController, person_id: &str) -> Person {
    mc.store.get_person(person_id).await.unwrap().unwrap()
}

/// Stores an unassociated image with the given faces, bypassing extraction and matching.
pub async fn stored_image(mc: &ModelController, faces: Vec<DetectedFace>) -> String {
    stored_image_from(mc, b"pixels", faces).await
}

/// Same as `stored_image` with chosen binary content, so reprocessing can see other faces.
pub async fn stored_image_from(mc: &ModelController, bytes: &[u8], faces: Vec<DetectedFace>) -> String {
    let object = mc.storage.store(bytes.to_vec(), "photo.jpg").await.unwrap();
    let image = ImageForInsert::new(object, Some("photo.jpg".to_string()), faces);
    let id = image.id.clone();
    mc.store.add_image(image).await.unwrap();
    id
}
