//! Core types and traits for the snip link store.
//!
//! This crate provides the shared entities, the error taxonomy, and the
//! backend contract implemented by both the SQLite repository and the
//! flat-file store.

pub mod error;
pub mod link;
pub mod store;

pub use error::{Result, StoreError};
pub use link::{Role, ShortLink, User};
pub use store::{CodeGenerator, LinkStore, ReadStore};
