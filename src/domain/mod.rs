use nanoid::nanoid;
use serde::{Deserialize, Serialize};

pub mod face;
pub mod people;
pub mod image;

/// Length of the identifiers produced by `nanoid!()`.
pub const ID_LENGTH: usize = 21;

pub fn new_id() -> String {
    nanoid!()
}

/// Identifiers are nanoids: 21 characters of `[A-Za-z0-9_-]`.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LENGTH && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let pages = if per_page == 0 { 0 } else { total.div_ceil(per_page) };
        Pagination { page, per_page, total, pages }
    }
}
