//! Domain models for PezAuth.

pub mod pivot_org;
