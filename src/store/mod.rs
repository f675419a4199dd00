pub mod database;

pub use database::{format_value, Database, QueryResult};
