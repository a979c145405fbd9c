pub mod ping;
pub mod people;
pub mod images;
pub mod stats;
pub mod files;
