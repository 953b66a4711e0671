//! Filesystem access for the package refresh job.
//!
//! The archive folder and its quarantine (errors) folder are each exposed as a
//! [`StorageBackend`] rooted at that directory. Paths handed to a backend are
//! always relative to its root and validated before use, so an artifact name
//! derived from catalog data can never escape the folder it belongs to.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
