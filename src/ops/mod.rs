pub mod archive;
pub mod export;
pub mod loader;
pub mod record_store;
pub mod schema_store;
pub mod table;
pub mod timestamp;
