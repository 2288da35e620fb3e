//! # XR Tour Common Library
//!
//! Shared code for the XR tour player crates including:
//! - Event types (XrEvent enum) and the EventBus
//! - Configuration loading (TOML, with compiled defaults)
//! - The static XR content catalog
//! - Device-orientation permission types and persistence stores

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod permission;

pub use catalog::{ContentCatalog, XrContent};
pub use error::{Error, Result};
pub use permission::OrientationPermission;
