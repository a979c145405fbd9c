use serde::{Deserialize, Serialize};

use crate::{domain::{image::{ImageFilter, ImageQuery, ImageResponse}, people::{PeopleQuery, PeopleSort, PersonResponse, SortOrder}}, tools::clock::days_ago_millis};

use super::{error::Result, ModelController};

pub const RECENT_DAYS: i64 = 7;
pub const DASHBOARD_IMAGES: u64 = 12;
pub const DASHBOARD_PEOPLE: u64 = 8;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Stats {
    pub total_images: u64,
    pub total_people: u64,
    pub identified_images: u64,
    pub unidentified_faces: u64,
    /// Percentage of identified images, one decimal.
    pub identification_rate: f64,
}

pub fn identification_rate(identified: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = identified as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

impl ModelController {

    pub async fn get_stats(&self) -> Result<Stats> {
        let total_images = self.store.count_images(ImageQuery::new_empty()).await?;
        let total_people = self.store.count_people().await?;
        let identified_images = self.store.count_images(ImageQuery { filter: ImageFilter::Identified, ..Default::default() }).await?;
        let unidentified_faces = self.store.count_images(ImageQuery { filter: ImageFilter::Unidentified, ..Default::default() }).await?;
        Ok(Stats {
            total_images,
            total_people,
            identified_images,
            unidentified_faces,
            identification_rate: identification_rate(identified_images, total_images),
        })
    }

    /// Newest images of the last week.
    pub async fn get_recent(&self) -> Result<Vec<ImageResponse>> {
        let query = ImageQuery { after: Some(days_ago_millis(RECENT_DAYS)), page: Some(1), per_page: Some(DASHBOARD_IMAGES), ..Default::default() };
        let images = self.store.get_images(query).await?;
        self.images_with_people(&images).await
    }

    pub async fn get_unidentified(&self) -> Result<Vec<ImageResponse>> {
        let query = ImageQuery { filter: ImageFilter::Unidentified, page: Some(1), per_page: Some(DASHBOARD_IMAGES), ..Default::default() };
        let images = self.store.get_images(query).await?;
        Ok(images.iter().map(ImageResponse::from).collect())
    }

    pub async fn get_people_summary(&self) -> Result<Vec<PersonResponse>> {
        self.get_people(PeopleQuery { sort: PeopleSort::ImageCount, order: SortOrder::Desc, limit: Some(DASHBOARD_PEOPLE), ..Default::default() }).await
    }
}
