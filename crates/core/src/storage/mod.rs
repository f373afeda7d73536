//! Object storage adapter built on Apache OpenDAL.
//!
//! Supported backends:
//! - S3-compatible: AWS S3, Cloudflare R2, MinIO
//! - Google Cloud Storage
//! - Local filesystem (development only)
//! - Memory (tests)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Apache OpenDAL                              │
//! │          (Unified Storage API, RetryLayer per direction)         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ writer: op.write_with("key", data)  │ reader: op.stat("key")     │
//! │                                     │         op.reader("key")   │
//! │                                     │         op.delete("key")   │
//! │                                     │         op.list_with("/")  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod service;

pub use config::{RetryPolicy, StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::{ObjectStat, ObjectStream, ObjectWrite, StorageService, base_name};
