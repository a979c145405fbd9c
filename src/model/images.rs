use std::collections::HashMap;

use crate::{domain::{face::DetectedFace, image::{Image, ImageForInsert, ImagePage, ImageQuery, ImageResponse, IngestItemResult, ProcessedImage, split_faces}, people::Person, Pagination}, tools::{log::{log_error, log_info, LogServiceType}, recognition::ExtractionError, text_tools::{file_extension, sanitize_filename}}};

use super::{error::{Error, Result}, ModelController};


impl ModelController {

    pub(super) async fn get_image_or_fail(&self, image_id: &str) -> Result<Image> {
        Self::check_id(image_id)?;
        self.store.get_image(image_id).await?.ok_or_else(|| Error::ImageNotFound(image_id.to_string()))
    }

    /// Responses with their associated person embedded.
    pub(super) async fn images_with_people(&self, images: &[Image]) -> Result<Vec<ImageResponse>> {
        let mut people: HashMap<String, Option<Person>> = HashMap::new();
        for person_id in images.iter().filter_map(|i| i.person_ref.as_ref()) {
            if !people.contains_key(person_id) {
                let person = self.store.get_person(person_id).await?;
                people.insert(person_id.clone(), person);
            }
        }
        Ok(images.iter().map(|image| {
            let person = image.person_ref.as_ref().and_then(|p| people.get(p)).and_then(|p| p.as_ref());
            ImageResponse::from_image(image, person)
        }).collect())
    }

    pub(super) async fn get_image_page(&self, query: ImageQuery) -> Result<ImagePage> {
        let (page, per_page) = (query.page(), query.per_page());
        let query = ImageQuery { page: Some(page), per_page: Some(per_page), ..query };
        let total = self.store.count_images(query.clone()).await?;
        let images = self.store.get_images(query.clone()).await?;
        Ok(ImagePage {
            images: self.images_with_people(&images).await?,
            pagination: Pagination::new(page, per_page, total),
        })
    }

    pub async fn get_images(&self, query: ImageQuery) -> Result<ImagePage> {
        self.get_image_page(ImageQuery { person: None, after: None, ..query }).await
    }

    pub async fn get_image(&self, image_id: &str) -> Result<ImageResponse> {
        let image = self.get_image_or_fail(image_id).await?;
        let mut responses = self.images_with_people(&[image]).await?;
        responses.pop().ok_or_else(|| Error::ImageNotFound(image_id.to_string()))
    }

    /// Unreadable bytes are an error, any other detection failure counts as no face.
    async fn detect_faces(&self, data: &[u8]) -> Result<Vec<DetectedFace>> {
        match self.extractor.extract(data).await {
            Ok(faces) => Ok(faces),
            Err(ExtractionError::Unreadable(reason)) => Err(Error::UnreadableImage(reason)),
            Err(ExtractionError::Failed(reason)) => {
                log_error(LogServiceType::Recognition, format!("Face detection failed: {}", reason));
                Ok(vec![])
            },
        }
    }

    /// Each file is processed on its own: a failing file is reported in its
    /// result and never stops the batch.
    pub async fn ingest_images(&self, files: Vec<(String, Vec<u8>)>) -> Result<Vec<IngestItemResult>> {
        let files: Vec<(String, Vec<u8>)> = files.into_iter().filter(|(name, _)| !name.is_empty()).collect();
        if files.is_empty() {
            return Err(Error::NoFilesProvided);
        }
        let mut results = vec![];
        for (filename, data) in files {
            let result = match self.ingest_image(&filename, data).await {
                Ok(processed) => IngestItemResult::success(processed.image.original_filename.clone().unwrap_or(filename), processed),
                Err(error) => {
                    log_error(LogServiceType::Register, format!("Unable to ingest {}: {:?}", filename, error));
                    IngestItemResult::failure(filename, error.client_message())
                },
            };
            results.push(result);
        }
        let successful = results.iter().filter(|r| r.success).count();
        log_info(LogServiceType::Register, format!("Ingested {} of {} images", successful, results.len()));
        Ok(results)
    }

    pub async fn ingest_image(&self, filename: &str, data: Vec<u8>) -> Result<ProcessedImage> {
        let allowed = file_extension(filename).map(|e| self.is_extension_allowed(&e)).unwrap_or(false);
        if !allowed {
            return Err(Error::FileTypeNotAllowed(filename.to_string()));
        }
        let clean_filename = sanitize_filename(filename);

        let faces = self.detect_faces(&data).await?;
        let object = self.storage.store(data, &clean_filename).await?;

        let candidates = self.store.get_match_candidates().await?;
        let image = ImageForInsert::new(object, Some(clean_filename), faces);
        let matched = self.matcher.find_first_match(&image.descriptors, &candidates);

        let image_id = image.id.clone();
        let reference = image.storage.reference.clone();
        if let Err(error) = self.store.add_image(image).await {
            if let Err(delete_error) = self.storage.delete(&reference).await {
                log_error(LogServiceType::Storage, format!("Unable to clean up stored object {}: {:?}", reference, delete_error));
            }
            return Err(error);
        }

        let stored = self.get_image_or_fail(&image_id).await?;
        self.apply_association(&stored, matched.as_deref()).await?;

        Ok(ProcessedImage {
            image: self.get_image(&image_id).await?,
            faces_detected: stored.descriptors.len(),
            matched_person: matched,
        })
    }

    /// Associates, reassigns or (with `None`) unassigns an image.
    pub async fn assign_image(&self, image_id: &str, person_id: Option<String>) -> Result<ImageResponse> {
        let image = self.get_image_or_fail(image_id).await?;
        if let Some(person_id) = &person_id {
            self.get_person_or_fail(person_id).await?;
        }
        self.apply_association(&image, person_id.as_deref()).await?;
        self.get_image(image_id).await
    }

    /// Detects faces again on the stored binary and matches them against the current people.
    pub async fn reprocess_image(&self, image_id: &str) -> Result<ProcessedImage> {
        let image = self.get_image_or_fail(image_id).await?;
        let data = self.storage.fetch(&image.storage).await?;
        let faces = self.detect_faces(&data).await?;
        let (descriptors, boxes) = split_faces(faces);

        let candidates = self.store.get_match_candidates().await?;
        let matched = self.matcher.find_first_match(&descriptors, &candidates);

        self.store.update_image_faces(&image.id, &descriptors, &boxes).await?;
        let refreshed = self.get_image_or_fail(&image.id).await?;
        match (&matched, descriptors.is_empty()) {
            (Some(person_id), _) => { self.apply_association(&refreshed, Some(person_id.as_str())).await?; },
            (None, true) => { self.apply_association(&refreshed, None).await?; },
            // faces without a match keep the current association
            (None, false) => {},
        }
        log_info(LogServiceType::Recognition, format!("Reprocessed image {}: {} faces", image.id, descriptors.len()));

        Ok(ProcessedImage {
            image: self.get_image(&image.id).await?,
            faces_detected: descriptors.len(),
            matched_person: matched,
        })
    }

    /// Releases the owning person then deletes the record. The stored binary is left alone.
    pub(super) async fn remove_image_record(&self, image: &Image) -> Result<()> {
        if let Some(person_id) = &image.person_ref {
            self.release_image(person_id).await?;
        }
        self.store.remove_image(&image.id).await
    }

    pub async fn remove_image(&self, image_id: &str) -> Result<ImageResponse> {
        let image = self.get_image_or_fail(image_id).await?;
        let response = ImageResponse::from(&image);
        self.storage.delete(&image.storage.reference).await?;
        self.remove_image_record(&image).await?;
        log_info(LogServiceType::Register, format!("Removed image {}", image.id));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use crate::{domain::{image::{ImageFilter, ImageQuery}, new_id}, model::{error::Error, testing::{add_person, face, person, stored_image, test_controller, DETECTION_FAILS, UNREADABLE}}, tools::storage::error::StorageError};

    #[tokio::test]
    async fn ingest_matches_known_person() {
        let (mc, extractor, _) = test_controller().await;
        let alice = add_person(&mc, "Alice").await;
        let reference = stored_image(&mc, vec![face(0.0)]).await;
        mc.assign_image(&reference, Some(alice.clone())).await.unwrap();

        extractor.register(b"new photo", vec![face(2.0), face(0.3)]);
        let processed = mc.ingest_image("holiday shot.jpg", b"new photo".to_vec()).await.unwrap();

        assert_eq!(processed.faces_detected, 2);
        assert_eq!(processed.matched_person, Some(alice.clone()));
        assert_eq!(processed.image.original_filename, Some("holiday_shot.jpg".to_string()));
        assert!(processed.image.is_identified);
        assert_eq!(processed.image.person.as_ref().map(|p| p.image_count), Some(2));

        let alice_after = person(&mc, &alice).await;
        assert_eq!(alice_after.image_count, 2);
        assert_eq!(alice_after.descriptors, vec![face(0.0).descriptor, face(2.0).descriptor]);
    }

    #[tokio::test]
    async fn ingest_without_people_stays_unassociated() {
        let (mc, extractor, storage) = test_controller().await;
        extractor.register(b"portrait", vec![face(0.1)]);
        let processed = mc.ingest_image("portrait.png", b"portrait".to_vec()).await.unwrap();
        assert_eq!(processed.matched_person, None);
        assert!(processed.image.has_face);
        assert!(!processed.image.is_identified);
        assert_eq!(storage.count(), 1);
    }

    #[tokio::test]
    async fn batch_reports_errors_per_item() {
        let (mc, extractor, storage) = test_controller().await;
        extractor.register(b"one face", vec![face(0.1)]);
        let results = mc.ingest_images(vec![
            ("notes.txt".to_string(), b"hello".to_vec()),
            ("broken.jpg".to_string(), UNREADABLE.to_vec()),
            ("good.jpg".to_string(), b"one face".to_vec()),
            ("detector.webp".to_string(), DETECTION_FAILS.to_vec()),
        ]).await.unwrap();

        assert_eq!(results.len(), 4);
        assert!(!results[0].success);
        assert_eq!(results[0].error, Some("File type not allowed".to_string()));
        assert!(!results[1].success);
        assert!(results[2].success);
        assert_eq!(results[2].faces_detected, 1);
        assert!(results[3].success);
        assert_eq!(results[3].faces_detected, 0);
        assert_eq!(storage.count(), 2);

        let empty = mc.ingest_images(vec![]).await;
        assert!(matches!(empty, Err(Error::NoFilesProvided)));
    }

    #[tokio::test]
    async fn failed_upload_writes_nothing() {
        let (mc, extractor, storage) = test_controller().await;
        extractor.register(b"photo", vec![face(0.1)]);
        storage.fail_store.store(true, Ordering::SeqCst);
        let result = mc.ingest_image("photo.jpg", b"photo".to_vec()).await;
        assert!(matches!(result, Err(Error::Storage(StorageError::Upload(_)))));
        assert_eq!(mc.store.count_images(ImageQuery::new_empty()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn assign_validates_targets() {
        let (mc, _, _) = test_controller().await;
        let image = stored_image(&mc, vec![face(0.1)]).await;
        assert!(matches!(mc.assign_image(&image, Some(new_id())).await, Err(Error::PersonNotFound(_))));
        assert!(matches!(mc.assign_image(&new_id(), None).await, Err(Error::ImageNotFound(_))));
        assert!(matches!(mc.assign_image("bad id", None).await, Err(Error::InvalidIdentifier(_))));
        let unassigned = mc.assign_image(&image, None).await.unwrap();
        assert!(!unassigned.is_identified);
    }

    #[tokio::test]
    async fn reprocess_transitions() {
        let (mc, extractor, storage) = test_controller().await;
        let alice = add_person(&mc, "Alice").await;
        let bob = add_person(&mc, "Bob").await;
        let alice_ref = stored_image(&mc, vec![face(0.0)]).await;
        let bob_ref = stored_image(&mc, vec![face(5.0)]).await;
        mc.assign_image(&alice_ref, Some(alice.clone())).await.unwrap();
        mc.assign_image(&bob_ref, Some(bob.clone())).await.unwrap();

        extractor.register(b"pixels", vec![face(5.1)]);
        let target = stored_image(&mc, vec![face(0.05)]).await;
        mc.assign_image(&target, Some(alice.clone())).await.unwrap();
        assert_eq!(person(&mc, &alice).await.image_count, 2);

        // matched another person: moved
        let moved = mc.reprocess_image(&target).await.unwrap();
        assert_eq!(moved.matched_person, Some(bob.clone()));
        assert_eq!(moved.image.person_id, Some(bob.clone()));
        assert_eq!(person(&mc, &alice).await.image_count, 1);
        assert_eq!(person(&mc, &bob).await.image_count, 2);

        // faces but no match: association kept
        extractor.register(b"pixels", vec![face(20.0)]);
        let kept = mc.reprocess_image(&target).await.unwrap();
        assert_eq!(kept.matched_person, None);
        assert_eq!(kept.image.person_id, Some(bob.clone()));
        assert_eq!(person(&mc, &bob).await.image_count, 2);

        // no face at all: released
        extractor.register(b"pixels", vec![]);
        let released = mc.reprocess_image(&target).await.unwrap();
        assert_eq!(released.faces_detected, 0);
        assert!(!released.image.is_identified);
        assert!(!released.image.has_face);
        assert_eq!(person(&mc, &bob).await.image_count, 1);

        // fetch failure: nothing changes
        extractor.register(b"pixels", vec![face(0.0)]);
        storage.fail_fetch.store(true, Ordering::SeqCst);
        assert!(mc.reprocess_image(&target).await.is_err());
        assert!(!mc.get_image(&target).await.unwrap().has_face);
    }

    #[tokio::test]
    async fn remove_image_releases_person() {
        let (mc, _, storage) = test_controller().await;
        let alice = add_person(&mc, "Alice").await;
        let image = stored_image(&mc, vec![face(0.1)]).await;
        mc.assign_image(&image, Some(alice.clone())).await.unwrap();

        storage.fail_delete.store(true, Ordering::SeqCst);
        assert!(mc.remove_image(&image).await.is_err());
        assert_eq!(person(&mc, &alice).await.image_count, 1);

        storage.fail_delete.store(false, Ordering::SeqCst);
        mc.remove_image(&image).await.unwrap();
        assert_eq!(person(&mc, &alice).await.image_count, 0);
        assert_eq!(storage.count(), 0);
        assert!(matches!(mc.get_image(&image).await, Err(Error::ImageNotFound(_))));
    }

    #[tokio::test]
    async fn listing_filters_and_embeds_people() {
        let (mc, _, _) = test_controller().await;
        let alice = add_person(&mc, "Alice").await;
        let identified = stored_image(&mc, vec![face(0.1)]).await;
        stored_image(&mc, vec![face(0.2)]).await;
        stored_image(&mc, vec![]).await;
        mc.assign_image(&identified, Some(alice.clone())).await.unwrap();

        let all = mc.get_images(ImageQuery::new_empty()).await.unwrap();
        assert_eq!(all.pagination.total, 3);
        assert_eq!(all.pagination.per_page, ImageQuery::DEFAULT_PER_PAGE);

        let page = mc.get_images(ImageQuery { filter: ImageFilter::Identified, ..Default::default() }).await.unwrap();
        assert_eq!(page.images.len(), 1);
        assert_eq!(page.images[0].person.as_ref().map(|p| p.name.as_str()), Some("Alice"));

        let unidentified = mc.get_images(ImageQuery { filter: ImageFilter::Unidentified, ..Default::default() }).await.unwrap();
        assert_eq!(unidentified.pagination.total, 1);
    }
}
