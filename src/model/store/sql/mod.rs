pub mod people;
pub mod images;

use rusqlite::{params_from_iter, ParamsFromIter, ToSql};
use tokio_rusqlite::Connection;

use crate::{domain::people::SortOrder, tools::log::{log_info, LogServiceType}};

use super::Result;


pub async fn migrate_database(connection: &Connection) -> Result<usize> {
    let version = connection.call( |conn| {
        let mut version = conn.query_row(
            "SELECT user_version FROM pragma_user_version;",
            [],
            |row| {
                let version: usize = row.get(0)?;
                Ok(version)
            })?;

            if version < 1 {
                let initial = String::from_utf8_lossy(include_bytes!("001 - INITIAL.sql"));
                conn.execute_batch(&initial)?;
                version = 1;
                conn.pragma_update(None, "user_version", version)?;
                log_info(LogServiceType::Database, format!("Update Database to version: {}", version));
            }

            Ok(version)
    }).await?;

    Ok(version)
}


pub enum SqlWhereType {
    Equal(String, Box<dyn ToSql>),
    Like(String, Box<dyn ToSql>),
    Since(String, Box<dyn ToSql>),
    Static(String),
}

impl SqlWhereType {
    fn format(&self) -> String {
        match self {
            SqlWhereType::Equal(name, _) => format!("{} = ?", name),
            SqlWhereType::Like(name, _) => format!("{} like ? ESCAPE '\\'", name),
            SqlWhereType::Since(name, _) => format!("{} >= ?", name),
            SqlWhereType::Static(s) => s.to_string(),
        }
    }

    fn value(&self) -> Option<&Box<dyn ToSql>> {
        match self {
            SqlWhereType::Equal(_, value) | SqlWhereType::Like(_, value) | SqlWhereType::Since(_, value) => Some(value),
            SqlWhereType::Static(_) => None,
        }
    }
}

/// `%term%` pattern matching `term` literally, for use with `ESCAPE '\'`.
pub fn contains_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

pub enum SqlOrder {
    ASC,
    DESC
}

impl From<SortOrder> for SqlOrder {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => SqlOrder::ASC,
            SortOrder::Desc => SqlOrder::DESC,
        }
    }
}

pub struct OrderBuilder {
    column: String,
    order: SqlOrder
}

impl OrderBuilder {
    pub fn new(column: String, order: SqlOrder) -> Self {
        OrderBuilder { column, order }
    }
    pub fn format(&self) -> String {
        match self.order {
            SqlOrder::ASC => self.column.clone(),
            SqlOrder::DESC => format!("{} DESC", self.column),
        }
    }
}

pub struct RsQueryBuilder {
    wheres: Vec<SqlWhereType>,
    orders: Vec<OrderBuilder>,
    window: Option<(u64, u64)>,
}

impl RsQueryBuilder {
    pub fn new() -> Self {
        Self {
            wheres: Vec::new(),
            orders: Vec::new(),
            window: None,
        }
    }

    pub fn add_where(&mut self, kind: SqlWhereType) {
        self.wheres.push(kind);
    }

    pub fn add_order(&mut self, order: OrderBuilder) {
        self.orders.push(order);
    }

    pub fn set_window(&mut self, window: Option<(u64, u64)>) {
        self.window = window;
    }

    pub fn format(&self) -> String {
        if self.wheres.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", self.wheres.iter().map(|w| w.format()).collect::<Vec<String>>().join(" and "))
        }
    }

    pub fn format_order(&self) -> String {
        if self.orders.is_empty() {
            "".to_string()
        } else {
            format!(" ORDER BY {}", self.orders.iter().map(|o| o.format()).collect::<Vec<String>>().join(", "))
        }
    }

    pub fn format_window(&self) -> String {
        match self.window {
            Some((limit, offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
            None => "".to_string(),
        }
    }

    pub fn values(&self) -> ParamsFromIter<Vec<&Box<dyn ToSql>>> {
        params_from_iter(self.wheres.iter().filter_map(|w| w.value()).collect::<Vec<&Box<dyn ToSql>>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_format() {
        let mut builder = RsQueryBuilder::new();
        assert_eq!(builder.format(), "");
        assert_eq!(builder.format_order(), "");
        builder.add_where(SqlWhereType::Equal("person_ref".to_string(), Box::new("abc".to_string())));
        builder.add_where(SqlWhereType::Static("has_face = 1".to_string()));
        builder.add_where(SqlWhereType::Since("created".to_string(), Box::new(10i64)));
        builder.add_order(OrderBuilder::new("created".to_string(), SqlOrder::DESC));
        builder.add_order(OrderBuilder::new("id".to_string(), SqlOrder::ASC));
        builder.set_window(Some((20, 40)));
        assert_eq!(builder.format(), "WHERE person_ref = ? and has_face = 1 and created >= ?");
        assert_eq!(builder.format_order(), " ORDER BY created DESC, id");
        assert_eq!(builder.format_window(), " LIMIT 20 OFFSET 40");
    }

    #[test]
    fn like_is_escaped() {
        let mut builder = RsQueryBuilder::new();
        builder.add_where(SqlWhereType::Like("name_key".to_string(), Box::new(contains_pattern("a"))));
        assert_eq!(builder.format(), "WHERE name_key like ? ESCAPE '\\'");
        assert_eq!(contains_pattern("ali"), "%ali%");
        assert_eq!(contains_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }
}
