//! jextract version identifiers and download URL templating.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::platform::SupportedPlatform;
use crate::{Error, Result};

/// Version used when no tool version is configured.
pub const DEFAULT_VERSION: &str = "25-jextract+2-4";

/// Grammar of a jextract early-access version identifier.
pub const VERSION_PATTERN: &str = r"^(\d+)-jextract\+(\d+)(?:-.*)?$";

/// Default location of jextract early-access builds.
pub const DEFAULT_URL_TEMPLATE: &str = "https://download.java.net/java/early_access/jextract/{major}/{build}/openjdk-{version}_{platform}_bin.tar.gz";

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(VERSION_PATTERN).expect("version pattern is valid")
});

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{[^{}]*\}").expect("placeholder pattern is valid")
});

/// A parsed jextract version such as `25-jextract+2-4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolVersion {
    raw: String,
    major: u32,
    build: u32,
}

impl ToolVersion {
    /// Parse and validate a version identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersionFormat`] when the string does not match
    /// [`VERSION_PATTERN`].
    pub fn parse(version: &str) -> Result<Self> {
        let invalid = || Error::InvalidVersionFormat {
            version: version.to_string(),
            pattern: VERSION_PATTERN,
        };
        let captures = VERSION_RE.captures(version).ok_or_else(invalid)?;
        let major = captures[1].parse().map_err(|_| invalid())?;
        let build = captures[2].parse().map_err(|_| invalid())?;

        Ok(Self {
            raw: version.to_string(),
            major,
            build,
        })
    }

    /// The identifier exactly as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Feature release number (`25` in `25-jextract+2-4`).
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Build number (`2` in `25-jextract+2-4`).
    #[must_use]
    pub const fn build(&self) -> u32 {
        self.build
    }

    /// Cache folder name: every character outside `[a-zA-Z0-9.-]` becomes `_`.
    #[must_use]
    pub fn folder_name(&self) -> String {
        self.raw
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl Default for ToolVersion {
    fn default() -> Self {
        Self {
            raw: DEFAULT_VERSION.to_string(),
            major: 25,
            build: 2,
        }
    }
}

impl FromStr for ToolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A download URL template with exactly the four jextract slots.
///
/// Each of `{major}`, `{build}`, `{version}` and `{platform}` must appear and
/// no other `{...}` placeholder may, so rendering can never leave a slot
/// unfilled or fill one with the wrong value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

const URL_SLOTS: [&str; 4] = ["{major}", "{build}", "{version}", "{platform}"];

impl UrlTemplate {
    /// Validate a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrlTemplate`] for a missing or unknown slot.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let invalid = |message: String| Error::InvalidUrlTemplate {
            template: template.clone(),
            message,
        };

        for slot in URL_SLOTS {
            if !template.contains(slot) {
                return Err(invalid(format!("missing {slot}")));
            }
        }
        if let Some(unknown) = PLACEHOLDER_RE
            .find_iter(&template)
            .map(|m| m.as_str())
            .find(|m| !URL_SLOTS.contains(m))
        {
            return Err(invalid(format!("unknown placeholder {unknown}")));
        }

        Ok(Self { template })
    }

    /// Build the download URL for a version and platform.
    #[must_use]
    pub fn render(&self, version: &ToolVersion, platform: SupportedPlatform) -> String {
        self.template
            .replace("{major}", &version.major().to_string())
            .replace("{build}", &version.build().to_string())
            .replace("{version}", version.as_str())
            .replace("{platform}", platform.id())
    }

    /// The raw template string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_URL_TEMPLATE.to_string(),
        }
    }
}
