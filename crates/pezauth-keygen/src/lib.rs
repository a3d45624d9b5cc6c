//! PezAuth Keygen: reservation keys over a key-value command store.
//!
//! A reservation marks that an org allocation for a user is in flight
//! or recently completed. Keys are created from a [`GuidMaker`] and
//! stored as hashes through a [`CommandExecutor`], whose untyped
//! [`Reply`] values are validated before any field is read.

pub mod command;
pub mod error;
pub mod executor;
pub mod guid;
pub mod keygen;
pub mod memory;
pub mod reply;

pub use command::Command;
pub use error::KeyGenError;
pub use executor::CommandExecutor;
pub use guid::{Guid, GuidMaker, UuidGuidMaker};
pub use keygen::{KeyGen, Reservation, ReservationState};
pub use memory::{MemoryStore, MemoryStoreError, glob_match};
pub use reply::Reply;
