use std::collections::HashMap;

use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use crate::{domain::{face::{descriptor_from_bytes, descriptor_to_bytes, Descriptor}, people::{name_key, PeopleQuery, Person, PersonForInsert, PersonForUpdate}}, model::store::SqliteStore, tools::{clock::now_millis, recognition::Candidate}};

use super::{contains_pattern, OrderBuilder, RsQueryBuilder, SqlOrder, SqlWhereType};
use crate::model::error::Result;

const PERSON_COLUMNS: &str = "id, name, thumbnail, image_count, created, modified";

impl SqliteStore {

    fn row_to_person(row: &Row) -> rusqlite::Result<Person> {
        let image_count: i64 = row.get(3)?;
        Ok(Person {
            id: row.get(0)?,
            name: row.get(1)?,
            descriptors: vec![],
            thumbnail: row.get(2)?,
            image_count: image_count.max(0) as u64,
            created: row.get(4)?,
            modified: row.get(5)?,
        })
    }

    fn fill_descriptors(conn: &rusqlite::Connection, people: &mut [Person]) -> rusqlite::Result<()> {
        if people.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = people.iter().map(|p| p.id.clone()).collect();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut query = conn.prepare(&format!("SELECT person_ref, descriptor FROM people_descriptors WHERE person_ref IN ({}) ORDER BY rowid", placeholders))?;
        let rows = query.query_map(params_from_iter(ids.iter()), |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))?;
        let mut by_person: HashMap<String, Vec<Descriptor>> = HashMap::new();
        for row in rows {
            let (person_ref, bytes) = row?;
            by_person.entry(person_ref).or_default().push(descriptor_from_bytes(&bytes));
        }
        for person in people.iter_mut() {
            person.descriptors = by_person.remove(&person.id).unwrap_or_default();
        }
        Ok(())
    }

    pub async fn get_people(&self, query: PeopleQuery) -> Result<Vec<Person>> {
        let people = self.connection.call( move |conn| {
            let mut where_query = RsQueryBuilder::new();
            if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
                where_query.add_where(SqlWhereType::Like("name_key".to_string(), Box::new(contains_pattern(&name_key(search.trim())))));
            }
            where_query.add_order(OrderBuilder::new(query.sort.to_string(), query.order.into()));
            where_query.add_order(OrderBuilder::new("id".to_string(), SqlOrder::ASC));
            where_query.set_window(query.limit.map(|l| (l, 0)));

            let mut statement = conn.prepare(&format!("SELECT {} FROM people {}{}{}", PERSON_COLUMNS, where_query.format(), where_query.format_order(), where_query.format_window()))?;
            let rows = statement.query_map(where_query.values(), Self::row_to_person)?;
            let mut people = rows.collect::<std::result::Result<Vec<Person>, rusqlite::Error>>()?;
            Self::fill_descriptors(conn, &mut people)?;
            Ok(people)
        }).await?;
        Ok(people)
    }

    pub async fn get_person(&self, person_id: &str) -> Result<Option<Person>> {
        let person_id = person_id.to_string();
        let row = self.connection.call( move |conn| {
            let mut query = conn.prepare(&format!("SELECT {} FROM people WHERE id = ?", PERSON_COLUMNS))?;
            let row = query.query_row([person_id], Self::row_to_person).optional()?;
            let Some(person) = row else { return Ok(None); };
            let mut people = vec![person];
            Self::fill_descriptors(conn, &mut people)?;
            Ok(people.pop())
        }).await?;
        Ok(row)
    }

    /// Case insensitive lookup, optionally ignoring one person (the one being renamed).
    pub async fn get_person_by_name(&self, name: &str, excluding: Option<String>) -> Result<Option<Person>> {
        let key = name_key(name);
        let row = self.connection.call( move |conn| {
            let mut query = conn.prepare(&format!("SELECT {} FROM people WHERE name_key = ? and id != ?", PERSON_COLUMNS))?;
            let row = query.query_row(params![key, excluding.unwrap_or_default()], Self::row_to_person).optional()?;
            Ok(row)
        }).await?;
        Ok(row)
    }

    pub async fn count_people(&self) -> Result<u64> {
        let count = self.connection.call( |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM people", [], |row| row.get(0))?;
            Ok(count)
        }).await?;
        Ok(count as u64)
    }

    /// People with at least one reference descriptor, oldest person first,
    /// descriptors in insertion order.
    pub async fn get_match_candidates(&self) -> Result<Vec<Candidate>> {
        let candidates = self.connection.call( |conn| {
            let mut query = conn.prepare("SELECT d.person_ref, d.descriptor FROM people_descriptors d
                INNER JOIN people p ON p.id = d.person_ref
                ORDER BY p.created, p.id, d.rowid")?;
            let rows = query.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))?;
            let mut candidates: Vec<Candidate> = vec![];
            for row in rows {
                let (person_ref, bytes) = row?;
                match candidates.last_mut() {
                    Some(last) if last.person_id == person_ref => last.descriptors.push(descriptor_from_bytes(&bytes)),
                    _ => candidates.push(Candidate { person_id: person_ref, descriptors: vec![descriptor_from_bytes(&bytes)] }),
                }
            }
            Ok(candidates)
        }).await?;
        Ok(candidates)
    }

    pub async fn add_person(&self, person: PersonForInsert) -> Result<()> {
        self.connection.call( move |conn| {
            conn.execute("INSERT INTO people (id, name, name_key, image_count, created, modified)
            VALUES (?, ?, ?, 0, ?, ?)", params![
                person.id,
                person.name,
                name_key(&person.name),
                person.created,
                person.created
            ])?;
            Ok(())
        }).await?;
        Ok(())
    }

    pub async fn update_person(&self, person_id: &str, update: PersonForUpdate) -> Result<()> {
        let id = person_id.to_string();
        self.connection.call( move |conn| {
            if let Some(name) = update.name {
                conn.execute("UPDATE people SET name = ?, name_key = ?, modified = ? WHERE id = ?", params![name, name_key(&name), now_millis(), id])?;
            } else {
                conn.execute("UPDATE people SET modified = ? WHERE id = ?", params![now_millis(), id])?;
            }
            Ok(())
        }).await?;
        Ok(())
    }

    pub async fn remove_person(&self, person_id: &str) -> Result<()> {
        let id = person_id.to_string();
        self.connection.call( move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM people_descriptors WHERE person_ref = ?", [&id])?;
            tx.execute("DELETE FROM people WHERE id = ?", [&id])?;
            tx.commit()?;
            Ok(())
        }).await?;
        Ok(())
    }

    /// Clears the association of every image of the person, then deletes the
    /// person, in one transaction. Returns the number of images unassigned.
    pub async fn unassign_images_and_remove_person(&self, person_id: &str) -> Result<usize> {
        let id = person_id.to_string();
        let unassigned = self.connection.call( move |conn| {
            let tx = conn.transaction()?;
            let unassigned = tx.execute("UPDATE images SET person_ref = NULL, is_identified = 0, modified = ? WHERE person_ref = ?", params![now_millis(), id])?;
            tx.execute("DELETE FROM people_descriptors WHERE person_ref = ?", [&id])?;
            tx.execute("DELETE FROM people WHERE id = ?", [&id])?;
            tx.commit()?;
            Ok(unassigned)
        }).await?;
        Ok(unassigned)
    }

    // region:    --- Per field atomic updates

    /// `false` when the person does not exist.
    pub async fn increment_person_image_count(&self, person_id: &str) -> Result<bool> {
        let id = person_id.to_string();
        let changed = self.connection.call( move |conn| {
            let changed = conn.execute("UPDATE people SET image_count = image_count + 1, modified = ? WHERE id = ?", params![now_millis(), id])?;
            Ok(changed)
        }).await?;
        Ok(changed == 1)
    }

    /// Never goes below zero: `false` when the person does not exist or its count is already 0.
    pub async fn decrement_person_image_count(&self, person_id: &str) -> Result<bool> {
        let id = person_id.to_string();
        let changed = self.connection.call( move |conn| {
            let changed = conn.execute("UPDATE people SET image_count = image_count - 1, modified = ? WHERE id = ? and image_count > 0", params![now_millis(), id])?;
            Ok(changed)
        }).await?;
        Ok(changed == 1)
    }

    /// Set insertion: `false` when the exact same descriptor is already known for this person.
    pub async fn add_person_descriptor(&self, person_id: &str, descriptor: &[f32]) -> Result<bool> {
        let id = person_id.to_string();
        let bytes = descriptor_to_bytes(descriptor);
        let inserted = self.connection.call( move |conn| {
            let inserted = conn.execute("INSERT OR IGNORE INTO people_descriptors (person_ref, descriptor, added) VALUES (?, ?, ?)", params![id, bytes, now_millis()])?;
            Ok(inserted)
        }).await?;
        Ok(inserted == 1)
    }

    /// Only writes when no thumbnail is set yet.
    pub async fn set_person_thumbnail_if_unset(&self, person_id: &str, thumbnail: &str) -> Result<bool> {
        let id = person_id.to_string();
        let thumbnail = thumbnail.to_string();
        let changed = self.connection.call( move |conn| {
            let changed = conn.execute("UPDATE people SET thumbnail = ? WHERE id = ? and thumbnail IS NULL", params![thumbnail, id])?;
            Ok(changed)
        }).await?;
        Ok(changed == 1)
    }

    pub async fn touch_person(&self, person_id: &str) -> Result<()> {
        let id = person_id.to_string();
        self.connection.call( move |conn| {
            conn.execute("UPDATE people SET modified = ? WHERE id = ?", params![now_millis(), id])?;
            Ok(())
        }).await?;
        Ok(())
    }

    // endregion: --- Per field atomic updates
}
