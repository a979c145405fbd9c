use serde::{Deserialize, Serialize};

use crate::tools::clock::{now_millis, Clock};

use super::{Pagination, face::{Descriptor, DetectedFace, FaceBox}, new_id, people::{Person, PersonResponse}};

/// Handle on the binary held by the object storage.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoredObject {
    pub reference: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Image {
    pub id: String,
    pub storage: StoredObject,
    pub filename: Option<String>,
    pub descriptors: Vec<Descriptor>,
    pub boxes: Vec<FaceBox>,
    pub person_ref: Option<String>,
    pub created: i64,
    pub modified: i64,
}

impl Image {
    pub fn has_face(&self) -> bool {
        !self.descriptors.is_empty()
    }

    pub fn is_identified(&self) -> bool {
        self.person_ref.is_some()
    }

    /// Only the first detected face teaches the associated person.
    pub fn first_descriptor(&self) -> Option<&Descriptor> {
        self.descriptors.first()
    }
}

#[derive(Debug, Clone)]
pub struct ImageForInsert {
    pub id: String,
    pub storage: StoredObject,
    pub filename: Option<String>,
    pub descriptors: Vec<Descriptor>,
    pub boxes: Vec<FaceBox>,
    pub created: i64,
}

impl ImageForInsert {
    /// New images always start unassociated; descriptors and boxes stay aligned.
    pub fn new(storage: StoredObject, filename: Option<String>, faces: Vec<DetectedFace>) -> Self {
        let (descriptors, boxes) = split_faces(faces);
        ImageForInsert {
            id: new_id(),
            storage,
            filename,
            descriptors,
            boxes,
            created: now_millis(),
        }
    }
}

pub fn split_faces(faces: Vec<DetectedFace>) -> (Vec<Descriptor>, Vec<FaceBox>) {
    faces.into_iter().map(|f| (f.descriptor, f.bbox)).unzip()
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFilter {
    #[default]
    All,
    Identified,
    /// Images with at least one face and no association.
    Unidentified,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ImageQuery {
    #[serde(default)]
    pub filter: ImageFilter,
    #[serde(skip)]
    pub person: Option<String>,
    #[serde(skip)]
    pub after: Option<i64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ImageQuery {
    pub const DEFAULT_PER_PAGE: u64 = 20;

    pub fn new_empty() -> ImageQuery {
        ImageQuery { ..Default::default() }
    }
    pub fn from_person(person_id: &str) -> ImageQuery {
        ImageQuery { person: Some(person_id.to_owned()), ..Default::default() }
    }

    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
    pub fn per_page(&self) -> u64 {
        self.per_page.unwrap_or(Self::DEFAULT_PER_PAGE).clamp(1, 500)
    }
    /// `(limit, offset)` when the query is paginated. The offset stays within
    /// what SQLite accepts, pages past the end are simply empty.
    pub fn window(&self) -> Option<(u64, u64)> {
        if self.page.is_none() && self.per_page.is_none() {
            None
        } else {
            let offset = (self.page() - 1).saturating_mul(self.per_page()).min(i64::MAX as u64);
            Some((self.per_page(), offset))
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageResponse {
    pub id: String,
    pub url: String,
    pub original_filename: Option<String>,
    pub has_face: bool,
    pub is_identified: bool,
    pub face_count: usize,
    pub person_id: Option<String>,
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<PersonResponse>,
}

impl ImageResponse {
    pub fn from_image(image: &Image, person: Option<&Person>) -> Self {
        ImageResponse {
            id: image.id.clone(),
            url: image.storage.url.clone(),
            original_filename: image.filename.clone(),
            has_face: image.has_face(),
            is_identified: image.is_identified(),
            face_count: image.boxes.len(),
            person_id: image.person_ref.clone(),
            created_at: image.created.print(),
            person: person.map(PersonResponse::from),
        }
    }
}

impl From<&Image> for ImageResponse {
    fn from(image: &Image) -> Self {
        ImageResponse::from_image(image, None)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImagePage {
    pub images: Vec<ImageResponse>,
    pub pagination: Pagination,
}

/// Image after face detection and matching.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProcessedImage {
    pub image: ImageResponse,
    pub faces_detected: usize,
    pub matched_person: Option<String>,
}

/// Outcome of one file of an upload batch.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestItemResult {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageResponse>,
    pub faces_detected: usize,
    pub matched_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestItemResult {
    pub fn success(filename: String, processed: ProcessedImage) -> Self {
        IngestItemResult {
            filename,
            success: true,
            faces_detected: processed.faces_detected,
            matched_person: processed.matched_person,
            image: Some(processed.image),
            error: None,
        }
    }

    pub fn failure(filename: String, error: String) -> Self {
        IngestItemResult { filename, success: false, image: None, faces_detected: 0, matched_person: None, error: Some(error) }
    }
}
