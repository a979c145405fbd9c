use serde::{Deserialize, Serialize};

use crate::tools::clock::{now_millis, Clock};

use super::{face::Descriptor, new_id};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Person {
    pub id: String,
    pub name: String,
    /// Reference descriptors used as match candidates, in insertion order.
    #[serde(default, skip_serializing)]
    pub descriptors: Vec<Descriptor>,
    pub thumbnail: Option<String>,
    pub image_count: u64,
    pub created: i64,
    pub modified: i64,
}

/// Key under which names are unique: full Unicode lowercase, so "Élodie" and "élodie" collide.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PersonForAdd {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PersonForUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PersonForInsert {
    pub id: String,
    pub name: String,
    pub created: i64,
}

impl PersonForInsert {
    pub fn new(name: String) -> Self {
        PersonForInsert { id: new_id(), name, created: now_millis() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PersonResponse {
    pub id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub image_count: u64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&Person> for PersonResponse {
    fn from(person: &Person) -> Self {
        PersonResponse {
            id: person.id.clone(),
            name: person.name.clone(),
            thumbnail_url: person.thumbnail.clone(),
            image_count: person.image_count,
            created_at: person.created.print(),
            updated_at: person.modified.print(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PeopleSort {
    #[default]
    Name,
    #[serde(alias = "created_at")]
    Created,
    ImageCount,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PeopleQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub sort: PeopleSort,
    #[serde(default)]
    pub order: SortOrder,
    pub limit: Option<u64>,
}

impl PeopleQuery {
    pub fn new_empty() -> PeopleQuery {
        PeopleQuery { ..Default::default() }
    }
    pub fn from_search(search: &str) -> PeopleQuery {
        PeopleQuery { search: Some(search.to_owned()), ..Default::default() }
    }
}
