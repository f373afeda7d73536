//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod deletion_audit;
pub mod file_record;

pub use deletion_audit::DeletionAuditRepository;
pub use file_record::FileRecordRepository;
