use std::io::Cursor;

use async_trait::async_trait;
use image::ImageReader;
use serde::{Deserialize, Serialize};

use crate::domain::face::{Descriptor, DetectedFace};

use super::log::{log_info, LogServiceType};

pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// A person that can be matched: only people with at least one reference
/// descriptor are ever built into candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub person_id: String,
    pub descriptors: Vec<Descriptor>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FaceComparison {
    pub is_match: bool,
    pub distance: f32,
    pub confidence: f32,
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt())
}

/// Nearest neighbour matcher. Holds nothing but its tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMatcher {
    tolerance: f32,
}

impl Default for FaceMatcher {
    fn default() -> Self {
        FaceMatcher::new(DEFAULT_TOLERANCE)
    }
}

impl FaceMatcher {
    pub fn new(tolerance: f32) -> Self {
        FaceMatcher { tolerance }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Scans every reference descriptor of every candidate and returns the
    /// owner of the smallest distance strictly below the tolerance.
    /// On equal distances the first one encountered wins.
    pub fn find_match(&self, descriptor: &[f32], candidates: &[Candidate]) -> Option<String> {
        let mut best: Option<(&str, f32)> = None;
        for candidate in candidates {
            for reference in &candidate.descriptors {
                let Some(distance) = euclidean_distance(descriptor, reference) else { continue; };
                if distance >= self.tolerance {
                    continue;
                }
                let closer = match best {
                    Some((_, best_distance)) => distance < best_distance,
                    None => true,
                };
                if closer {
                    best = Some((candidate.person_id.as_str(), distance));
                }
            }
        }
        best.map(|(person_id, _)| person_id.to_string())
    }

    /// Tries each detected descriptor in order and stops at the first one that matches.
    pub fn find_first_match(&self, descriptors: &[Descriptor], candidates: &[Candidate]) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        descriptors.iter().find_map(|d| self.find_match(d, candidates))
    }

    pub fn compare(&self, a: &[f32], b: &[f32]) -> FaceComparison {
        match euclidean_distance(a, b) {
            Some(distance) => {
                let is_match = distance <= self.tolerance;
                let confidence = if is_match { (1.0 - distance / self.tolerance).max(0.0) } else { 0.0 };
                FaceComparison { is_match, distance, confidence }
            },
            None => FaceComparison { is_match: false, distance: f32::INFINITY, confidence: 0.0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// The bytes are not a decodable image.
    Unreadable(String),
    /// Detection itself failed; callers treat this as "no face found".
    Failed(String),
}

#[async_trait]
pub trait DescriptorExtractor: Send + Sync {
    /// Empty when no face is found.
    async fn extract(&self, image: &[u8]) -> Result<Vec<DetectedFace>, ExtractionError>;
}

#[derive(Debug, Deserialize)]
struct ExtractorResponse {
    faces: Vec<DetectedFace>,
}

/// Reads the format and dimensions from the header only, the pixels are left to the extractor.
pub fn check_readable(image: &[u8]) -> Result<(u32, u32), ExtractionError> {
    ImageReader::new(Cursor::new(image))
        .with_guessed_format()
        .map_err(|e| ExtractionError::Unreadable(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ExtractionError::Unreadable(e.to_string()))
}

/// Checks the image is readable locally, then hands detection to an external face
/// service over HTTP. Without an endpoint no face is ever detected.
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpExtractor {
    pub fn new(endpoint: Option<String>) -> Self {
        if endpoint.is_none() {
            log_info(LogServiceType::Recognition, "No extractor endpoint configured, face detection disabled".to_string());
        }
        HttpExtractor { client: reqwest::Client::new(), endpoint }
    }
}

#[async_trait]
impl DescriptorExtractor for HttpExtractor {
    async fn extract(&self, image: &[u8]) -> Result<Vec<DetectedFace>, ExtractionError> {
        check_readable(image)?;
        let Some(endpoint) = &self.endpoint else { return Ok(vec![]); };

        let response = self.client.post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| ExtractionError::Failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ExtractionError::Failed(format!("Extractor responded {}", response.status())));
        }
        let parsed: ExtractorResponse = response.json().await.map_err(|e| ExtractionError::Failed(e.to_string()))?;
        Ok(parsed.faces)
    }
}
