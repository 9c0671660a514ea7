//! Platform classification.
//!
//! The matching rules live in two tables, [`OS_RULES`] and [`ARCH_RULES`].
//! They drive both the download-time classification done here and the
//! detection code emitted into generated native loaders, which runs later in
//! a JVM where this crate is not present. Both sides read the same tables so
//! they cannot drift apart.
//!
//! Matching is case-insensitive substring matching, first rule wins:
//!
//! | input contains | result |
//! |---|---|
//! | `win` | windows |
//! | `mac` | macos |
//! | `nux` | linux |
//! | `amd64`, `x86_64` | amd64 |
//! | `aarch64`, `arm64` | aarch64 |
//! | `x86` | x86 |

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformType {
    /// Microsoft Windows
    Windows,
    /// Linux
    Linux,
    /// macOS
    MacOs,
}

/// OS rules in match order: `(needle, family)`.
pub const OS_RULES: &[(&str, PlatformType)] = &[
    ("win", PlatformType::Windows),
    ("mac", PlatformType::MacOs),
    ("nux", PlatformType::Linux),
];

impl PlatformType {
    /// Classify a raw OS name (`os.name` in Java, `std::env::consts::OS` here).
    pub fn classify(os_name: &str) -> Option<Self> {
        let os = os_name.to_lowercase();
        OS_RULES
            .iter()
            .find(|(needle, _)| os.contains(needle))
            .map(|(_, family)| *family)
    }

    /// Name substituted for `{os.name}` in resource path templates.
    #[must_use]
    pub const fn loader_name(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
        }
    }

    /// File name prefix of a shared library.
    #[must_use]
    pub const fn library_prefix(self) -> &'static str {
        match self {
            Self::Windows => "",
            Self::Linux | Self::MacOs => "lib",
        }
    }

    /// File extension of a shared library, without the dot.
    #[must_use]
    pub const fn library_extension(self) -> &'static str {
        match self {
            Self::Windows => "dll",
            Self::MacOs => "dylib",
            Self::Linux => "so",
        }
    }

    /// Decorate a bare library name: `mylib` becomes `libmylib.so` on Linux.
    #[must_use]
    pub fn library_file_name(self, name: &str) -> String {
        format!(
            "{}{}.{}",
            self.library_prefix(),
            name,
            self.library_extension()
        )
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.loader_name())
    }
}

/// CPU architecture family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    /// 64-bit x86
    Amd64,
    /// 64-bit ARM
    Aarch64,
    /// 32-bit x86
    X86,
}

/// Architecture rules in match order: `(needles, family)`.
pub const ARCH_RULES: &[(&[&str], Architecture)] = &[
    (&["amd64", "x86_64"], Architecture::Amd64),
    (&["aarch64", "arm64"], Architecture::Aarch64),
    (&["x86"], Architecture::X86),
];

impl Architecture {
    /// Classify a raw architecture name (`os.arch` in Java, `std::env::consts::ARCH` here).
    pub fn classify(arch: &str) -> Option<Self> {
        let arch = arch.to_lowercase();
        ARCH_RULES
            .iter()
            .find(|(needles, _)| needles.iter().any(|needle| arch.contains(needle)))
            .map(|(_, family)| *family)
    }

    /// Name substituted for `{os.arch}` in resource path templates.
    #[must_use]
    pub const fn loader_name(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Aarch64 => "aarch64",
            Self::X86 => "x86",
        }
    }

    /// Whether this is an ARM architecture.
    #[must_use]
    pub const fn is_arm(self) -> bool {
        matches!(self, Self::Aarch64)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.loader_name())
    }
}

/// Host as seen by a generated native loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    /// Operating system family
    pub os: PlatformType,
    /// CPU architecture family
    pub arch: Architecture,
}

impl HostPlatform {
    /// Classify raw OS and architecture names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for an unknown OS and
    /// [`Error::UnsupportedArchitecture`] for an unknown architecture.
    pub fn classify(os_name: &str, arch: &str) -> Result<Self> {
        let os = PlatformType::classify(os_name).ok_or_else(|| Error::UnsupportedPlatform {
            os: os_name.to_lowercase(),
            arch: arch.to_lowercase(),
        })?;
        let arch = Architecture::classify(arch).ok_or_else(|| Error::UnsupportedArchitecture {
            arch: arch.to_lowercase(),
        })?;
        Ok(Self { os, arch })
    }

    /// Classify the running host.
    ///
    /// # Errors
    ///
    /// Fails when the host is not a supported OS/architecture.
    pub fn current() -> Result<Self> {
        Self::classify(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Resolve a resource path template for this host.
    ///
    /// Substitutes `{os.name}` and `{os.arch}`, then decorates the last path
    /// segment with the platform's shared library prefix and extension. The
    /// directory portion is left unchanged.
    #[must_use]
    pub fn expand_resource_path(&self, template: &str) -> String {
        let path = template
            .replace("{os.name}", self.os.loader_name())
            .replace("{os.arch}", self.arch.loader_name());
        let split = path.rfind('/').map_or(0, |idx| idx + 1);
        let (dir, name) = path.split_at(split);
        format!("{dir}{}", self.os.library_file_name(name))
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// A platform jextract is published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedPlatform {
    /// `windows-x64`
    WindowsX64,
    /// `linux-x64`
    LinuxX64,
    /// `linux-aarch64`
    LinuxArm64,
    /// `macos-x64`
    MacosX64,
    /// `macos-aarch64`
    MacosArm64,
}

impl SupportedPlatform {
    /// Every supported platform.
    pub const ALL: [Self; 5] = [
        Self::WindowsX64,
        Self::LinuxX64,
        Self::LinuxArm64,
        Self::MacosX64,
        Self::MacosArm64,
    ];

    /// The OS family.
    #[must_use]
    pub const fn platform_type(self) -> PlatformType {
        match self {
            Self::WindowsX64 => PlatformType::Windows,
            Self::LinuxX64 | Self::LinuxArm64 => PlatformType::Linux,
            Self::MacosX64 | Self::MacosArm64 => PlatformType::MacOs,
        }
    }

    /// Identifier used verbatim in download URLs.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::WindowsX64 => "windows-x64",
            Self::LinuxX64 => "linux-x64",
            Self::LinuxArm64 => "linux-aarch64",
            Self::MacosX64 => "macos-x64",
            Self::MacosArm64 => "macos-aarch64",
        }
    }

    /// File name of the jextract launcher inside `bin/`.
    #[must_use]
    pub const fn executable_name(self) -> &'static str {
        match self.platform_type() {
            PlatformType::Windows => "jextract.bat",
            PlatformType::Linux | PlatformType::MacOs => "jextract",
        }
    }

    /// Classify raw OS and architecture names into a download platform.
    ///
    /// Windows always maps to `windows-x64`. On Linux and macOS the
    /// architecture only decides between the ARM and x64 builds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when either name matches no rule.
    pub fn classify(os_name: &str, arch: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedPlatform {
            os: os_name.to_lowercase(),
            arch: arch.to_lowercase(),
        };
        let os = PlatformType::classify(os_name).ok_or_else(unsupported)?;
        let is_arm = Architecture::classify(arch)
            .ok_or_else(unsupported)?
            .is_arm();

        Ok(match (os, is_arm) {
            (PlatformType::Windows, _) => Self::WindowsX64,
            (PlatformType::MacOs, true) => Self::MacosArm64,
            (PlatformType::MacOs, false) => Self::MacosX64,
            (PlatformType::Linux, true) => Self::LinuxArm64,
            (PlatformType::Linux, false) => Self::LinuxX64,
        })
    }

    /// Detect the platform of the running process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] on hosts jextract is not built for.
    pub fn current() -> Result<Self> {
        Self::classify(std::env::consts::OS, std::env::consts::ARCH)
    }
}

impl fmt::Display for SupportedPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SupportedPlatform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|platform| platform.id() == s)
            .ok_or_else(|| {
                let ids: Vec<_> = Self::ALL.iter().map(|p| p.id()).collect();
                Error::configuration(format!(
                    "Unknown platform '{s}', expected one of: {}",
                    ids.join(", ")
                ))
            })
    }
}

/// `(os.name, os.arch, expected loader pair)` as reported by real JVMs.
///
/// Both the classifier here and the one emitted into generated loaders must
/// agree on every entry; `None` means the host is rejected.
pub const HOST_VECTORS: &[(&str, &str, Option<(&str, &str)>)] = &[
    ("Windows 11", "amd64", Some(("windows", "amd64"))),
    ("Windows 10", "x86", Some(("windows", "x86"))),
    ("Linux", "amd64", Some(("linux", "amd64"))),
    ("Linux", "aarch64", Some(("linux", "aarch64"))),
    ("Mac OS X", "aarch64", Some(("macos", "aarch64"))),
    ("Mac OS X", "x86_64", Some(("macos", "amd64"))),
    ("FreeBSD", "amd64", None),
    ("Linux", "riscv64", None),
];
