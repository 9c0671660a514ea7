//! Error types shared by every jextract-gen crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for jextract-gen operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Version identifier does not match `<major>-jextract+<build>[-suffix]`
    #[error("Version string '{version}' does not match expected pattern: {pattern}")]
    #[diagnostic(
        code(jextract::version::invalid),
        help("Use a jextract early-access identifier such as 25-jextract+2-4")
    )]
    InvalidVersionFormat {
        /// The rejected version string
        version: String,
        /// The grammar the version was checked against
        pattern: &'static str,
    },

    /// Download URL template is missing a slot or carries an unknown one
    #[error("Invalid download URL template '{template}': {message}")]
    #[diagnostic(
        code(jextract::version::url_template),
        help("Templates must contain {{major}}, {{build}}, {{version}} and {{platform}} exactly")
    )]
    InvalidUrlTemplate {
        /// The rejected template
        template: String,
        /// What is wrong with it
        message: String,
    },

    /// Host operating system is not one of the supported platforms
    #[error("Unsupported OS/Arch combination: {os} / {arch}")]
    #[diagnostic(code(jextract::platform::unsupported))]
    UnsupportedPlatform {
        /// Lower-cased OS name that failed to match
        os: String,
        /// Lower-cased architecture reported alongside it
        arch: String,
    },

    /// Host CPU architecture is not recognized
    #[error("Unsupported architecture: {arch}")]
    #[diagnostic(code(jextract::platform::unsupported_arch))]
    UnsupportedArchitecture {
        /// Lower-cased architecture that failed to match
        arch: String,
    },

    /// Downloading or unpacking the tool archive failed
    #[error("Failed to download jextract {version} from {url}: {message}")]
    #[diagnostic(
        code(jextract::tool::acquisition),
        help("The partial cache entry was discarded; re-running retries the download")
    )]
    ToolAcquisitionFailed {
        /// Version being acquired
        version: String,
        /// URL that was attempted
        url: String,
        /// Underlying failure
        message: String,
    },

    /// HTTP transfer failed or returned a status other than 200
    #[error("Download from {url} failed: {message}")]
    #[diagnostic(code(jextract::http))]
    Http {
        /// Requested URL
        url: String,
        /// Transport error or status line
        message: String,
    },

    /// Archive was unpacked but contains no launcher
    #[error("Jextract binary '{binary}' not found in {}", dir.display())]
    #[diagnostic(code(jextract::tool::executable_not_found))]
    ExecutableNotFound {
        /// Launcher file name that was searched for
        binary: &'static str,
        /// Cache entry that was searched
        dir: PathBuf,
    },

    /// Generated header file does not declare the expected class
    #[error("Could not find class {class} in {}", path.display())]
    #[diagnostic(code(jextract::inject::class_not_found))]
    TargetClassNotFound {
        /// Class name that was searched for
        class: String,
        /// Source file that was scanned
        path: PathBuf,
    },

    /// Java source could not be tokenized
    #[error("Could not parse {}: {message}", path.display())]
    #[diagnostic(code(jextract::inject::malformed_source))]
    MalformedSource {
        /// Source file that was scanned
        path: PathBuf,
        /// What went wrong and where
        message: String,
    },

    /// Generated header file does not exist
    #[error("Header class not found: {}", path.display())]
    #[diagnostic(
        code(jextract::inject::artifact_missing),
        help("Run jextract for this library before injecting the native loader")
    )]
    TargetArtifactMissing {
        /// Expected location of the header class source
        path: PathBuf,
    },

    /// More than one library identification mechanism was configured
    #[error("Only one library loading option can be configured for '{library}': {options}")]
    #[diagnostic(code(jextract::config::mutually_exclusive))]
    MutuallyExclusiveConfiguration {
        /// Library definition name
        library: String,
        /// The options that were set together
        options: String,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(jextract::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Running the external tool failed
    #[error("jextract failed for '{library}': {message}")]
    #[diagnostic(code(jextract::exec))]
    Execution {
        /// Library definition name
        library: String,
        /// Exit status or spawn failure
        message: String,
    },

    /// I/O error with path context
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(jextract::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "create")
        operation: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a tool acquisition error
    #[must_use]
    pub fn tool_acquisition(
        version: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ToolAcquisitionFailed {
            version: version.into(),
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error
    #[must_use]
    pub fn http(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an execution error
    #[must_use]
    pub fn execution(library: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            library: library.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for jextract-gen operations
pub type Result<T> = std::result::Result<T, Error>;
