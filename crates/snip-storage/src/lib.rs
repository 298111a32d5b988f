//! Storage backends for the snip link store.
//!
//! Two backends satisfy the shared contract from `snip-core`: a durable,
//! transactional SQLite repository with a versioned schema migration
//! engine, and a flat-file store that keeps the whole collection in one
//! JSON document.

pub mod config;
pub mod flatfile;
pub mod migrate;
pub mod sqlite;

pub use config::{StoreConfig, StoreLocation, DEFAULT_DB_FILE};
pub use flatfile::{FlatFileStore, DEFAULT_LINKS_FILE};
pub use migrate::{apply_migrations, latest_version, schema_version};
pub use snip_core::{LinkStore, ReadStore, Result, StoreError};
pub use sqlite::SqliteRepository;
