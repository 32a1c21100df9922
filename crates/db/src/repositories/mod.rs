//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod divination_record_repo;
pub mod hexagram_repo;

pub use divination_record_repo::DivinationRecordRepo;
pub use hexagram_repo::HexagramRepo;
