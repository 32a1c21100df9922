//! Domain core for hexagram casting and interpretation.
//!
//! Everything here is pure or talks to collaborators only through the
//! [`catalog::HexagramStore`] and [`record::DivinationRecordStore`] traits,
//! so it can be tested without a database.

pub mod catalog;
pub mod divination;
pub mod error;
pub mod hashing;
pub mod hexagram;
pub mod interpretation;
pub mod line;
pub mod record;
pub mod trigram;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
