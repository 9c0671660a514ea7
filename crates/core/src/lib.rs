//! Core types for jextract-gen
//!
//! This crate holds everything the tool cache, the code generator and the CLI
//! agree on:
//! - Error types and the shared `Result` alias
//! - Platform classification rules, used both for downloads and for the
//!   detection logic emitted into generated loaders
//! - jextract version parsing and download URL templates
//! - Project configuration (`jextract.toml`)
//! - Well-known directories

mod error;
pub mod config;
pub mod paths;
pub mod platform;
pub mod version;

// Re-export error types at crate root
pub use error::{Error, Result};

pub use config::{LibraryDefinition, NativeLibraryLoadingConfig, ProjectConfig, ToolConfig};
pub use platform::{Architecture, HostPlatform, PlatformType, SupportedPlatform};
pub use version::{ToolVersion, UrlTemplate};
