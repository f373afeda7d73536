//! Core business logic for Filedock.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//!
//! # Modules
//!
//! - `storage` - Object storage adapter over OpenDAL
//! - `upload` - Upload reconciliation, downloads, blob store and orphan sweep
//! - `signing` - HMAC-signed upload URLs for an external object store

pub mod signing;
pub mod storage;
pub mod upload;
