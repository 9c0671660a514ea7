//! # jextract-codegen
//!
//! Java source generation around jextract output.
//!
//! This crate provides:
//! - A small Java model (class, fields, methods, statements) and renderer
//! - The native library loader generator (`<header>_NativeLibraryLoader.java`)
//! - The injector that wires `load()` into the generated header class
//!
//! ## Example
//!
//! ```no_run
//! use jextract_codegen::{LoaderInjector, LoaderOptions, NativeLoaderGenerator};
//! use std::path::Path;
//!
//! # fn main() -> jextract_core::Result<()> {
//! let output = Path::new("build/generated/sources/jextract/mylib");
//! let generator = NativeLoaderGenerator::new(
//!     "com.example.config",
//!     "config_h",
//!     LoaderOptions::new("native/{os.name}-{os.arch}/mylib"),
//! )?;
//! generator.generate(output)?;
//! LoaderInjector::new(generator.header_file(output), "config_h", generator.class_name()).inject()?;
//! # Ok(())
//! # }
//! ```

pub mod inject;
pub mod java;
pub mod loader;

pub use inject::{InjectOutcome, LoaderInjector, inject_loader};
pub use loader::{
    LOAD_METHOD, LoaderOptions, NativeLoaderGenerator, generate_loader, loader_class_name,
};
