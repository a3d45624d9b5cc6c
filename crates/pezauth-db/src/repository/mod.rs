//! SurrealDB collection implementations.

mod pivot_org;

pub use pivot_org::SurrealCollection;
