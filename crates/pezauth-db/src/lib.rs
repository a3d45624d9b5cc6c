//! PezAuth Database: SurrealDB connection management, the
//! organization record collection, and the persistence wrapper that
//! normalizes storage errors.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - The SurrealDB-backed collection ([`repository::SurrealCollection`])
//! - The domain persistence adapter ([`CollectionWrapper`])
//! - The shared reservation key store ([`SurrealKvStore`])
//! - Error types ([`DbError`])

mod connection;
mod error;
mod kv;
pub mod repository;
mod schema;
mod wrapper;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use kv::SurrealKvStore;
pub use schema::{run_migrations, schema_v1};
pub use wrapper::CollectionWrapper;
