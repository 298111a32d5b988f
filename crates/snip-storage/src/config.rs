use std::path::PathBuf;
use typed_builder::TypedBuilder;

/// Default on-disk database file, relative to the working directory.
pub const DEFAULT_DB_FILE: &str = "db.sqlite";

/// Where the durable backend keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A database file on disk, created empty on first open if missing.
    File(PathBuf),
    /// An ephemeral in-memory database that dies with the handle.
    Memory,
}

/// Configuration for opening the durable backend.
#[derive(Debug, Clone, TypedBuilder)]
pub struct StoreConfig {
    #[builder(default = StoreLocation::File(PathBuf::from(DEFAULT_DB_FILE)))]
    pub location: StoreLocation,
}

impl StoreConfig {
    /// Convenience for an ephemeral in-memory store.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_the_working_directory_file() {
        let config = StoreConfig::default();
        assert_eq!(
            config.location,
            StoreLocation::File(PathBuf::from("db.sqlite"))
        );
    }

    #[test]
    fn builder_accepts_a_custom_path() {
        let config = StoreConfig::builder()
            .location(StoreLocation::File(PathBuf::from("/tmp/links.sqlite")))
            .build();
        assert_eq!(
            config.location,
            StoreLocation::File(PathBuf::from("/tmp/links.sqlite"))
        );
    }
}
