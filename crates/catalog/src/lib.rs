//! Project and package catalog.
//!
//! The catalog is the list of every (project, language) pair that is expected
//! to have a downloadable translation archive. It lives in an SQLite database
//! and is only ever *read* by the refresh job: which archives exist, and
//! whether they are fresh, is decided by the filesystem, not by the catalog.
//!
//! # Architecture
//! - **Projects**: a translation project with a source language, the base
//!   filename its archives are named after, and a published flag.
//! - **Packages**: one row per target language a project should be packaged
//!   for. Duplicate rows for the same (project, language) may exist; they
//!   are collapsed when candidates are fetched.

mod catalog;
mod db;
pub mod error;
mod filter;
mod models;
mod repo;

pub use crate::catalog::Catalog;
pub use crate::db::Database;
pub use crate::filter::ProjectIds;
pub use crate::models::{NewPackage, PackageRecord, Project};
pub use crate::repo::Repository;
