//! # carehub-core
//!
//! Core crate for CareHub. Contains the unified error system, the
//! configuration schemas, and typed identifiers shared by every other
//! crate in the workspace.
//!
//! This crate has **no** internal dependencies on other CareHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
