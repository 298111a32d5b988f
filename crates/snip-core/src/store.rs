use crate::error::Result;
use crate::link::{ShortLink, User};
use async_trait::async_trait;

/// A read-only view of a link store.
///
/// This trait provides only the read operations from [`LinkStore`],
/// allowing resolve-only callers to have read-only access.
#[async_trait]
pub trait ReadStore: Send + Sync + 'static {
    /// Retrieves the link stored under a short code, with the owner's full
    /// user record attached when the link is owned.
    /// Fails with `StoreError::NotFound` if the code has no entry.
    async fn get(&self, short: &str) -> Result<ShortLink>;

    /// Checks whether a short code already has an entry.
    async fn exists(&self, short: &str) -> Result<bool>;
}

/// The contract both backends satisfy: create-or-replace by short code,
/// fetch by short code, delete behind an authorization predicate.
#[async_trait]
pub trait LinkStore: ReadStore {
    /// Inserts or fully replaces the link keyed by its short code.
    ///
    /// An empty short code is assigned a generated one first; the stored
    /// link (with the code filled in) is returned. If the link carries an
    /// owner, that user is upserted as a side effect so the reference can
    /// never dangle.
    async fn put(&self, link: ShortLink) -> Result<ShortLink>;

    /// Removes the link under `short` on behalf of `requester`.
    ///
    /// Fails with `StoreError::NotFound` if there is no entry, and with
    /// `StoreError::Unauthorized` — mutating nothing — unless the
    /// requester is an admin or owns the link.
    async fn remove(&self, short: &str, requester: &User) -> Result<()>;
}

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage;
/// collision handling is the calling store's concern.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Generates a candidate short code.
    fn generate(&self) -> String;
}
