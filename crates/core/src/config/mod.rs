//! Project configuration (`jextract.toml`).
//!
//! ```toml
//! [tool]
//! version = "25-jextract+2-4"
//!
//! [libraries.mylib]
//! header_file = "src/main/c/config.h"
//! target_package = "com.example.config"
//!
//! [libraries.mylib.native_library_loading]
//! resource_path = "native/{os.name}-{os.arch}/mylib"
//! enable_caching = true
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::paths;
use crate::version::{ToolVersion, UrlTemplate};
use crate::{Error, Result};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "jextract.toml";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Tool acquisition settings
    #[serde(default)]
    pub tool: ToolConfig,

    /// Library definitions keyed by name
    #[serde(default)]
    pub libraries: BTreeMap<String, LibraryDefinition>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub project_dir: PathBuf,
}

/// Which jextract to use and where to keep it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// jextract version, defaults to [`crate::version::DEFAULT_VERSION`]
    pub version: Option<String>,
    /// Cache root, defaults to [`paths::tool_cache_dir`]
    pub cache_dir: Option<PathBuf>,
    /// Download URL template for mirrors
    pub url_template: Option<String>,
}

/// One header file to generate bindings for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryDefinition {
    /// C header passed to jextract
    pub header_file: PathBuf,
    /// Java package of the generated classes
    pub target_package: String,
    /// Extra arguments passed through to jextract
    #[serde(default)]
    pub compiler_args: Vec<String>,
    /// Name of the main header class, derived from the header file if absent
    pub header_class_name: Option<String>,
    /// System library name passed to jextract as `-l`
    pub library_name: Option<String>,
    /// Output directory for generated sources
    pub output_dir: Option<PathBuf>,
    /// Loading the native library from bundled resources
    #[serde(default)]
    pub native_library_loading: NativeLibraryLoadingConfig,
}

/// Runtime loading of a native library bundled as a JAR resource.
///
/// The three fields are independent. Without a `resource_path` no loader is
/// generated at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativeLibraryLoadingConfig {
    /// Resource path template supporting `{os.name}` and `{os.arch}`,
    /// e.g. `native/{os.name}-{os.arch}/mylib`
    pub resource_path: Option<String>,
    /// Where extracted libraries are written; the JVM temp dir if unset
    pub extraction_dir: Option<PathBuf>,
    /// Reuse extracted libraries across runs, keyed by content hash
    #[serde(default)]
    pub enable_caching: bool,
}

impl NativeLibraryLoadingConfig {
    /// Whether a loader should be generated.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.resource_path.is_some()
    }
}

impl ProjectConfig {
    /// Load and validate a configuration file.
    ///
    /// Relative paths inside the file resolve against its directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or fails
    /// validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        let project_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        debug!(path = %path.display(), "Loading configuration");
        Self::from_toml_str(&content, project_dir)
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or fails validation.
    pub fn from_toml_str(content: &str, project_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Invalid {CONFIG_FILE_NAME}: {e}")))?;
        config.project_dir = project_dir.into();
        config.resolve_paths();
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self) {
        let base = self.project_dir.clone();
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        if let Some(dir) = self.tool.cache_dir.as_mut() {
            resolve(dir);
        }
        for library in self.libraries.values_mut() {
            resolve(&mut library.header_file);
            if let Some(dir) = library.output_dir.as_mut() {
                resolve(dir);
            }
            if let Some(dir) = library.native_library_loading.extraction_dir.as_mut() {
                resolve(dir);
            }
        }
    }

    /// Validate the tool section and every library definition.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate(&self) -> Result<()> {
        self.tool_version()?;
        self.url_template()?;
        for (name, library) in &self.libraries {
            library.validate(name)?;
        }
        Ok(())
    }

    /// The configured (or default) jextract version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersionFormat`] for a malformed version.
    pub fn tool_version(&self) -> Result<ToolVersion> {
        self.tool
            .version
            .as_deref()
            .map_or_else(|| Ok(ToolVersion::default()), ToolVersion::parse)
    }

    /// The configured (or default) download URL template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrlTemplate`] for a malformed template.
    pub fn url_template(&self) -> Result<UrlTemplate> {
        self.tool
            .url_template
            .clone()
            .map_or_else(|| Ok(UrlTemplate::default()), UrlTemplate::new)
    }

    /// Cache root: explicit override, `JEXTRACT_CACHE_DIR`, the config file, then the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if no cache directory can be determined.
    pub fn cache_dir(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = cli_override {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = paths::cache_dir_override() {
            return Ok(dir);
        }
        if let Some(dir) = &self.tool.cache_dir {
            return Ok(dir.clone());
        }
        paths::tool_cache_dir()
    }
}

impl LibraryDefinition {
    /// Check the definition for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MutuallyExclusiveConfiguration`] when both a system
    /// library name and resource-based loading are configured, or a
    /// configuration error for invalid Java names.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.library_name.is_some() && self.native_library_loading.is_configured() {
            return Err(Error::MutuallyExclusiveConfiguration {
                library: name.to_string(),
                options: "library_name and native_library_loading.resource_path".to_string(),
            });
        }
        if !is_java_package(&self.target_package) {
            return Err(Error::configuration(format!(
                "Library '{name}': '{}' is not a valid Java package name",
                self.target_package
            )));
        }
        let class = self.header_class_name()?;
        if !is_java_identifier(&class) {
            return Err(Error::configuration(format!(
                "Library '{name}': '{class}' is not a valid Java class name"
            )));
        }
        Ok(())
    }

    /// Name of the main header class: explicit, or the header file name with
    /// `.h` replaced by `_h` (`config.h` → `config_h`).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the header path has no file name.
    pub fn header_class_name(&self) -> Result<String> {
        if let Some(name) = &self.header_class_name {
            return Ok(name.clone());
        }
        self.header_file
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.replace(".h", "_h"))
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Header file '{}' has no file name",
                    self.header_file.display()
                ))
            })
    }

    /// Output directory, defaulting below the project directory.
    #[must_use]
    pub fn output_dir(&self, project_dir: &Path, name: &str) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| paths::default_output_dir(project_dir, name))
    }
}

/// Whether `name` is a valid Java identifier.
#[must_use]
pub fn is_java_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Whether `name` is a dotted sequence of Java identifiers.
#[must_use]
pub fn is_java_package(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_java_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::DEFAULT_VERSION;

    const FULL: &str = r#"
[tool]
version = "22-jextract+6-47"
cache_dir = "cache"

[libraries.config]
header_file = "src/main/c/config.h"
target_package = "com.example.config"
compiler_args = ["-I", "include"]

[libraries.config.native_library_loading]
resource_path = "native/{os.name}-{os.arch}/mylib"
enable_caching = true

[libraries.gl]
header_file = "/usr/include/GL/gl.h"
target_package = "org.lwjgl.gl"
header_class_name = "GL"
library_name = "GL"
output_dir = "/tmp/out"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = ProjectConfig::from_toml_str(FULL, "/project").unwrap();
        assert_eq!(config.tool_version().unwrap().as_str(), "22-jextract+6-47");
        assert_eq!(config.tool.cache_dir, Some(PathBuf::from("/project/cache")));
        assert_eq!(config.libraries.len(), 2);

        let lib = &config.libraries["config"];
        assert_eq!(lib.header_file, PathBuf::from("/project/src/main/c/config.h"));
        assert_eq!(lib.compiler_args, vec!["-I", "include"]);
        assert_eq!(lib.header_class_name().unwrap(), "config_h");
        assert!(lib.native_library_loading.is_configured());
        assert!(lib.native_library_loading.enable_caching);
        assert_eq!(lib.native_library_loading.extraction_dir, None);
        assert_eq!(
            lib.output_dir(&config.project_dir, "config"),
            PathBuf::from("/project/build/generated/sources/jextract/config")
        );

        let gl = &config.libraries["gl"];
        assert_eq!(gl.header_class_name().unwrap(), "GL");
        assert_eq!(gl.output_dir(&config.project_dir, "gl"), PathBuf::from("/tmp/out"));
        assert!(!gl.native_library_loading.is_configured());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ProjectConfig::from_toml_str("", ".").unwrap();
        assert_eq!(config.tool_version().unwrap().as_str(), DEFAULT_VERSION);
        assert_eq!(config.url_template().unwrap(), UrlTemplate::default());
        assert!(config.libraries.is_empty());
    }

    #[test]
    fn test_mutually_exclusive_library_options() {
        let toml = r#"
[libraries.bad]
header_file = "a.h"
target_package = "com.example"
library_name = "a"

[libraries.bad.native_library_loading]
resource_path = "native/a"
"#;
        let err = ProjectConfig::from_toml_str(toml, ".").unwrap_err();
        assert!(matches!(err, Error::MutuallyExclusiveConfiguration { ref library, .. } if library == "bad"));
    }

    #[test]
    fn test_invalid_version_rejected_at_load() {
        let err = ProjectConfig::from_toml_str("[tool]\nversion = \"latest\"\n", ".").unwrap_err();
        assert!(matches!(err, Error::InvalidVersionFormat { .. }));
    }

    #[test]
    fn test_invalid_url_template_rejected_at_load() {
        let err =
            ProjectConfig::from_toml_str("[tool]\nurl_template = \"https://x/{version}\"\n", ".")
                .unwrap_err();
        assert!(matches!(err, Error::InvalidUrlTemplate { .. }));
    }

    #[test]
    fn test_invalid_package_rejected() {
        let toml = r#"
[libraries.bad]
header_file = "a.h"
target_package = "com..example"
"#;
        let err = ProjectConfig::from_toml_str(toml, ".").unwrap_err();
        assert!(err.to_string().contains("not a valid Java package"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[libraries.bad]
header_file = "a.h"
target_package = "com.example"
libraryPath = "x"
"#;
        assert!(ProjectConfig::from_toml_str(toml, ".").is_err());
    }

    #[test]
    fn test_load_resolves_against_file_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[libraries.x]\nheader_file = \"x.h\"\ntarget_package = \"x\"\n",
        )
        .unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.libraries["x"].header_file, temp.path().join("x.h"));
        assert_eq!(config.project_dir, temp.path());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProjectConfig::load("/nonexistent/jextract.toml").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_cache_dir_precedence() {
        let config = ProjectConfig::from_toml_str("[tool]\ncache_dir = \"/from/config\"\n", ".")
            .unwrap();
        assert_eq!(
            config.cache_dir(Some(Path::new("/from/cli"))).unwrap(),
            PathBuf::from("/from/cli")
        );
        temp_env::with_var_unset(paths::CACHE_DIR_ENV, || {
            assert_eq!(config.cache_dir(None).unwrap(), PathBuf::from("/from/config"));
        });
        temp_env::with_var(paths::CACHE_DIR_ENV, Some("/from/env"), || {
            assert_eq!(config.cache_dir(None).unwrap(), PathBuf::from("/from/env"));
        });
        temp_env::with_var(paths::CACHE_DIR_ENV, Some(""), || {
            assert_eq!(config.cache_dir(None).unwrap(), PathBuf::from("/from/config"));
        });
    }

    #[test]
    fn test_java_names() {
        assert!(is_java_identifier("config_h"));
        assert!(is_java_identifier("$x1"));
        assert!(!is_java_identifier("1abc"));
        assert!(!is_java_identifier("a-b"));
        assert!(!is_java_identifier(""));
        assert!(is_java_package("com.example.config"));
        assert!(!is_java_package("com.example."));
        assert!(!is_java_package(""));
    }
}
