use rusqlite::{params, types::Type, OptionalExtension, Row};

use crate::{domain::{face::{Descriptor, FaceBox}, image::{Image, ImageFilter, ImageForInsert, ImageQuery, StoredObject}}, model::store::SqliteStore, tools::clock::now_millis};

use super::{OrderBuilder, RsQueryBuilder, SqlOrder, SqlWhereType};
use crate::model::error::Result;

const IMAGE_COLUMNS: &str = "id, storage_ref, url, filename, descriptors, boxes, person_ref, created, modified";

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, index: usize) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text).map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

impl SqliteStore {

    fn row_to_image(row: &Row) -> rusqlite::Result<Image> {
        let descriptors: Vec<Descriptor> = json_column(row, 4)?;
        let boxes: Vec<FaceBox> = json_column(row, 5)?;
        Ok(Image {
            id: row.get(0)?,
            storage: StoredObject { reference: row.get(1)?, url: row.get(2)? },
            filename: row.get(3)?,
            descriptors,
            boxes,
            person_ref: row.get(6)?,
            created: row.get(7)?,
            modified: row.get(8)?,
        })
    }

    fn image_query_builder(query: &ImageQuery) -> RsQueryBuilder {
        let mut where_query = RsQueryBuilder::new();
        match query.filter {
            ImageFilter::All => {},
            ImageFilter::Identified => where_query.add_where(SqlWhereType::Static("is_identified = 1".to_string())),
            ImageFilter::Unidentified => where_query.add_where(SqlWhereType::Static("has_face = 1 and is_identified = 0".to_string())),
        }
        if let Some(person) = &query.person {
            where_query.add_where(SqlWhereType::Equal("person_ref".to_string(), Box::new(person.clone())));
        }
        if let Some(after) = query.after {
            where_query.add_where(SqlWhereType::Since("created".to_string(), Box::new(after)));
        }
        where_query
    }

    /// Newest first.
    pub async fn get_images(&self, query: ImageQuery) -> Result<Vec<Image>> {
        let images = self.connection.call( move |conn| {
            let mut where_query = Self::image_query_builder(&query);
            where_query.add_order(OrderBuilder::new("created".to_string(), SqlOrder::DESC));
            where_query.add_order(OrderBuilder::new("id".to_string(), SqlOrder::ASC));
            where_query.set_window(query.window());

            let mut statement = conn.prepare(&format!("SELECT {} FROM images {}{}{}", IMAGE_COLUMNS, where_query.format(), where_query.format_order(), where_query.format_window()))?;
            let rows = statement.query_map(where_query.values(), Self::row_to_image)?;
            let images = rows.collect::<std::result::Result<Vec<Image>, rusqlite::Error>>()?;
            Ok(images)
        }).await?;
        Ok(images)
    }

    /// Count ignoring the pagination window of the query.
    pub async fn count_images(&self, query: ImageQuery) -> Result<u64> {
        let count = self.connection.call( move |conn| {
            let where_query = Self::image_query_builder(&query);
            let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM images {}", where_query.format()), where_query.values(), |row| row.get(0))?;
            Ok(count)
        }).await?;
        Ok(count as u64)
    }

    pub async fn get_image(&self, image_id: &str) -> Result<Option<Image>> {
        let image_id = image_id.to_string();
        let row = self.connection.call( move |conn| {
            let mut query = conn.prepare(&format!("SELECT {} FROM images WHERE id = ?", IMAGE_COLUMNS))?;
            let row = query.query_row([image_id], Self::row_to_image).optional()?;
            Ok(row)
        }).await?;
        Ok(row)
    }

    pub async fn add_image(&self, image: ImageForInsert) -> Result<()> {
        let descriptors = serde_json::to_string(&image.descriptors)?;
        let boxes = serde_json::to_string(&image.boxes)?;
        let has_face = !image.descriptors.is_empty();
        self.connection.call( move |conn| {
            conn.execute("INSERT INTO images (id, storage_ref, url, filename, descriptors, boxes, person_ref, has_face, is_identified, created, modified)
            VALUES (?, ?, ?, ?, ?, ?, NULL, ?, 0, ?, ?)", params![
                image.id,
                image.storage.reference,
                image.storage.url,
                image.filename,
                descriptors,
                boxes,
                has_face,
                image.created,
                image.created
            ])?;
            Ok(())
        }).await?;
        Ok(())
    }

    /// Only the association fields, counters are handled by the ledger.
    pub async fn set_image_person(&self, image_id: &str, person_id: Option<String>) -> Result<()> {
        let id = image_id.to_string();
        self.connection.call( move |conn| {
            let identified = person_id.is_some();
            conn.execute("UPDATE images SET person_ref = ?, is_identified = ?, modified = ? WHERE id = ?", params![person_id, identified, now_millis(), id])?;
            Ok(())
        }).await?;
        Ok(())
    }

    pub async fn touch_image(&self, image_id: &str) -> Result<()> {
        let id = image_id.to_string();
        self.connection.call( move |conn| {
            conn.execute("UPDATE images SET modified = ? WHERE id = ?", params![now_millis(), id])?;
            Ok(())
        }).await?;
        Ok(())
    }

    pub async fn update_image_faces(&self, image_id: &str, descriptors: &[Descriptor], boxes: &[FaceBox]) -> Result<()> {
        let id = image_id.to_string();
        let has_face = !descriptors.is_empty();
        let descriptors = serde_json::to_string(descriptors)?;
        let boxes = serde_json::to_string(boxes)?;
        self.connection.call( move |conn| {
            conn.execute("UPDATE images SET descriptors = ?, boxes = ?, has_face = ?, modified = ? WHERE id = ?", params![descriptors, boxes, has_face, now_millis(), id])?;
            Ok(())
        }).await?;
        Ok(())
    }

    pub async fn remove_image(&self, image_id: &str) -> Result<()> {
        let id = image_id.to_string();
        self.connection.call( move |conn| {
            conn.execute("DELETE FROM images WHERE id = ?", [id])?;
            Ok(())
        }).await?;
        Ok(())
    }
}
