pub mod db;
pub mod json;
pub mod lock;
pub mod models;

pub use rusqlite;
