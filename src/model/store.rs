use std::path::PathBuf;

use tokio_rusqlite::Connection;

use crate::model::store::sql::migrate_database;
use crate::tools::log::{log_info, LogServiceType};

use super::error::{Result, Error};


pub mod sql;


pub struct SqliteStore {
	connection: Connection,
}

// Constructor
impl SqliteStore {
	pub async fn new(db_path: PathBuf) -> Result<Self> {
        log_info(LogServiceType::Database, format!("Opening database: {:?}", db_path));
        let connection = Connection::open(db_path).await.map_err(|_| Error::CannotOpenDatabase)?;
        Self::from_connection(connection).await
	}

    pub async fn new_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().await.map_err(|_| Error::CannotOpenDatabase)?;
        Self::from_connection(connection).await
    }

    async fn from_connection(connection: Connection) -> Result<Self> {
        let version = migrate_database(&connection).await?;
        log_info(LogServiceType::Database, format!("Current Database version: {}", version));
        Ok(Self { connection })
    }
}
