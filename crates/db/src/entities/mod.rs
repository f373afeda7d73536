//! `SeaORM` entity definitions.

pub mod file_deletions;
pub mod file_records;
