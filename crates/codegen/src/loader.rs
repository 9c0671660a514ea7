//! Native library loader synthesis.
//!
//! Emits `<base>_NativeLibraryLoader.java`, a self-contained utility class
//! whose `load()` finds the library resource for the running JVM's platform,
//! copies it out of the JAR and hands it to `System.load`. Platform detection
//! in the generated class is rendered from [`OS_RULES`] and [`ARCH_RULES`] so
//! it always agrees with the host-side classification.

use jextract_core::config::{NativeLibraryLoadingConfig, is_java_identifier, is_java_package};
use jextract_core::paths;
use jextract_core::platform::{ARCH_RULES, OS_RULES, PlatformType};
use jextract_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::inject::{InjectOutcome, LoaderInjector};
use crate::java::{Catch, ClassDecl, CompilationUnit, Field, Method, Stmt, string_literal};

/// Suffix appended to the header class name to name the loader class.
pub const LOADER_CLASS_SUFFIX: &str = "_NativeLibraryLoader";

/// Name of the generated entry point.
pub const LOAD_METHOD: &str = "load";

/// Extraction directory below `java.io.tmpdir` when none is configured.
pub const DEFAULT_EXTRACTION_SUBDIR: &str = "jextract-natives";

/// Loader class name for a header class: `config_h` → `config_h_NativeLibraryLoader`.
#[must_use]
pub fn loader_class_name(base_name: &str) -> String {
    format!("{base_name}{LOADER_CLASS_SUFFIX}")
}

/// What the generated loader does at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Resource path template with `{os.name}` / `{os.arch}` placeholders
    pub resource_path: String,
    /// Fixed extraction directory; the JVM temp dir when `None`
    pub extraction_dir: Option<PathBuf>,
    /// Reuse previously extracted copies keyed by SHA-256
    pub enable_caching: bool,
}

impl LoaderOptions {
    /// Options for a resource path with defaults for everything else.
    pub fn new(resource_path: impl Into<String>) -> Self {
        Self {
            resource_path: resource_path.into(),
            extraction_dir: None,
            enable_caching: false,
        }
    }

    /// Options from a library's configuration, `None` when no resource path is set.
    #[must_use]
    pub fn from_config(config: &NativeLibraryLoadingConfig) -> Option<Self> {
        config.resource_path.as_ref().map(|resource_path| Self {
            resource_path: resource_path.clone(),
            extraction_dir: config.extraction_dir.clone(),
            enable_caching: config.enable_caching,
        })
    }
}

/// Generates the native loader for one header class.
#[derive(Debug, Clone)]
pub struct NativeLoaderGenerator {
    package: String,
    base_name: String,
    options: LoaderOptions,
}

impl NativeLoaderGenerator {
    /// Create a generator.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the package or base name is not a
    /// valid Java name.
    pub fn new(
        package: impl Into<String>,
        base_name: impl Into<String>,
        options: LoaderOptions,
    ) -> Result<Self> {
        let package = package.into();
        let base_name = base_name.into();
        if !is_java_package(&package) {
            return Err(Error::configuration(format!(
                "'{package}' is not a valid Java package name"
            )));
        }
        if !is_java_identifier(&base_name) {
            return Err(Error::configuration(format!(
                "'{base_name}' is not a valid Java class name"
            )));
        }
        Ok(Self {
            package,
            base_name,
            options,
        })
    }

    /// Simple name of the generated class.
    #[must_use]
    pub fn class_name(&self) -> String {
        loader_class_name(&self.base_name)
    }

    /// Path of the generated file below `output_root`.
    #[must_use]
    pub fn output_file(&self, output_root: &Path) -> PathBuf {
        paths::package_dir(output_root, &self.package).join(format!("{}.java", self.class_name()))
    }

    /// Path of the header class source the loader is injected into.
    #[must_use]
    pub fn header_file(&self, output_root: &Path) -> PathBuf {
        paths::package_dir(output_root, &self.package).join(format!("{}.java", self.base_name))
    }

    /// Write the loader source and return its path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the package directory or file cannot be written.
    pub fn generate(&self, output_root: &Path) -> Result<PathBuf> {
        let path = self.output_file(output_root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create_dir_all"))?;
        }
        std::fs::write(&path, self.render()).map_err(|e| Error::io(e, &path, "write"))?;

        info!("Generated: {}", path.display());
        Ok(path)
    }

    /// Generate the loader and inject its `load()` call into the header class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetArtifactMissing`] when jextract did not produce
    /// the header class, plus any generation or injection failure.
    pub fn generate_and_inject(&self, output_root: &Path) -> Result<(PathBuf, InjectOutcome)> {
        let loader = self.generate(output_root)?;
        let outcome =
            LoaderInjector::new(self.header_file(output_root), &self.base_name, self.class_name())
                .inject()?;
        Ok((loader, outcome))
    }

    /// Render the loader source.
    #[must_use]
    pub fn render(&self) -> String {
        let class_name = self.class_name();
        let caching = self.options.enable_caching;

        let mut imports = vec![
            "java.io.IOException",
            "java.io.InputStream",
            "java.nio.file.Files",
            "java.nio.file.Path",
            "java.nio.file.StandardCopyOption",
            "java.util.Locale",
        ];
        if caching {
            imports.extend(["java.security.MessageDigest", "java.security.NoSuchAlgorithmException"]);
        }

        let mut methods = vec![
            self.load_method(),
            expand_resource_path_method(),
            library_file_name_method(),
            detect_os_name_method(),
            detect_os_arch_method(),
            self.extraction_directory_method(),
            extract_library_method(&class_name),
        ];
        if caching {
            methods.extend([
                cached_library_method(&class_name),
                cache_library_method(),
                compute_hash_method(),
            ]);
        }

        CompilationUnit {
            package: self.package.clone(),
            imports: imports.into_iter().map(str::to_string).collect(),
            class: ClassDecl {
                doc: vec![
                    "Auto-generated loader for platform-specific native libraries.".to_string(),
                    "Extracts the native library from JAR resources and loads it.".to_string(),
                ],
                modifiers: "public final".to_string(),
                name: class_name.clone(),
                fields: vec![Field::new("private static", "boolean", "loaded").init("false")],
                constructors: vec![Method::constructor("private", &class_name).body(vec![
                    Stmt::line("throw new UnsupportedOperationException(\"Utility class\");"),
                ])],
                methods,
            },
        }
        .render()
    }

    fn load_method(&self) -> Method {
        let mut body = vec![
            Stmt::if_then("loaded", vec![Stmt::line("return;")]),
            Stmt::line(format!(
                "final String resourcePath = expandResourcePath({});",
                string_literal(&self.options.resource_path)
            )),
            Stmt::line("final Path extractionDir = getExtractionDirectory();"),
        ];

        if self.options.enable_caching {
            body.push(Stmt::line(
                "final Path cachedLib = getCachedLibrary(resourcePath, extractionDir);",
            ));
            body.push(Stmt::if_then(
                "cachedLib != null && Files.exists(cachedLib)",
                vec![
                    Stmt::line("System.load(cachedLib.toAbsolutePath().toString());"),
                    Stmt::line("loaded = true;"),
                    Stmt::line("return;"),
                ],
            ));
            body.push(Stmt::line(
                "final Path extractedLib = extractLibrary(resourcePath, extractionDir);",
            ));
            body.push(Stmt::if_then(
                "cachedLib != null",
                vec![Stmt::line("cacheLibrary(extractedLib, cachedLib);")],
            ));
        } else {
            body.push(Stmt::line(
                "final Path extractedLib = extractLibrary(resourcePath, extractionDir);",
            ));
        }

        body.push(Stmt::line(
            "System.load(extractedLib.toAbsolutePath().toString());",
        ));
        body.push(Stmt::line("loaded = true;"));

        Method::new("public static synchronized", "void", LOAD_METHOD)
            .throws("IOException")
            .body(body)
    }

    fn extraction_directory_method(&self) -> Method {
        let body = match &self.options.extraction_dir {
            Some(dir) => vec![
                Stmt::line(format!(
                    "final Path configuredDir = Path.of({});",
                    string_literal(&dir.to_string_lossy())
                )),
                Stmt::line("Files.createDirectories(configuredDir);"),
                Stmt::line("return configuredDir;"),
            ],
            None => vec![
                Stmt::line("final String tmpDir = System.getProperty(\"java.io.tmpdir\");"),
                Stmt::line(format!(
                    "final Path extractDir = Path.of(tmpDir, {});",
                    string_literal(DEFAULT_EXTRACTION_SUBDIR)
                )),
                Stmt::line("Files.createDirectories(extractDir);"),
                Stmt::line("return extractDir;"),
            ],
        };

        Method::new("private static", "Path", "getExtractionDirectory")
            .throws("IOException")
            .body(body)
    }
}

/// Write the loader for `base_name` into `output_root` and return its path.
///
/// # Errors
///
/// Fails on invalid Java names or when the file cannot be written.
pub fn generate_loader(
    package: &str,
    base_name: &str,
    options: LoaderOptions,
    output_root: &Path,
) -> Result<PathBuf> {
    NativeLoaderGenerator::new(package, base_name, options)?.generate(output_root)
}

fn expand_resource_path_method() -> Method {
    Method::new("private static", "String", "expandResourcePath")
        .param("String", "template")
        .body(vec![
            Stmt::line("final String osName = detectOsName();"),
            Stmt::line("final String osArch = detectOsArch();"),
            Stmt::line(
                "final String path = template.replace(\"{os.name}\", osName).replace(\"{os.arch}\", osArch);",
            ),
            Stmt::comment("Add platform-specific library prefix and extension"),
            Stmt::line("return getLibraryFileName(path, osName);"),
        ])
}

/// `dirPath + "lib" + fileName + ".so"` for one OS family.
fn library_file_expr(os: PlatformType) -> String {
    let prefix = os.library_prefix();
    let ext = string_literal(&format!(".{}", os.library_extension()));
    if prefix.is_empty() {
        format!("dirPath + fileName + {ext}")
    } else {
        format!("dirPath + {} + fileName + {ext}", string_literal(prefix))
    }
}

fn library_file_name_method() -> Method {
    // Linux conventions are the fallback for anything not matched explicitly
    let branches = [PlatformType::Windows, PlatformType::MacOs]
        .into_iter()
        .map(|os| {
            (
                format!("osName.equals({})", string_literal(os.loader_name())),
                vec![Stmt::line(format!("return {};", library_file_expr(os)))],
            )
        })
        .collect();

    Method::new("private static", "String", "getLibraryFileName")
        .param("String", "basePath")
        .param("String", "osName")
        .body(vec![
            Stmt::line("final int slash = basePath.lastIndexOf('/');"),
            Stmt::line("final String fileName = basePath.substring(slash + 1);"),
            Stmt::line("final String dirPath = basePath.substring(0, slash + 1);"),
            Stmt::If {
                branches,
                otherwise: Some(vec![Stmt::line(format!(
                    "return {};",
                    library_file_expr(PlatformType::Linux)
                ))]),
            },
        ])
}

/// `var.contains("a") || var.contains("b")`
fn contains_any(var: &str, needles: &[&str]) -> String {
    needles
        .iter()
        .map(|needle| format!("{var}.contains({})", string_literal(needle)))
        .collect::<Vec<_>>()
        .join(" || ")
}

fn detect_os_name_method() -> Method {
    let branches = OS_RULES
        .iter()
        .map(|(needle, os)| {
            (
                contains_any("osName", &[*needle]),
                vec![Stmt::line(format!("return {};", string_literal(os.loader_name())))],
            )
        })
        .collect();

    Method::new("private static", "String", "detectOsName").body(vec![
        Stmt::line("final String osName = System.getProperty(\"os.name\").toLowerCase(Locale.ROOT);"),
        Stmt::If {
            branches,
            otherwise: None,
        },
        Stmt::line("throw new UnsupportedOperationException(\"Unsupported OS: \" + osName);"),
    ])
}

fn detect_os_arch_method() -> Method {
    let branches = ARCH_RULES
        .iter()
        .map(|(needles, arch)| {
            (
                contains_any("osArch", needles),
                vec![Stmt::line(format!("return {};", string_literal(arch.loader_name())))],
            )
        })
        .collect();

    Method::new("private static", "String", "detectOsArch").body(vec![
        Stmt::line("final String osArch = System.getProperty(\"os.arch\").toLowerCase(Locale.ROOT);"),
        Stmt::If {
            branches,
            otherwise: None,
        },
        Stmt::line(
            "throw new UnsupportedOperationException(\"Unsupported architecture: \" + osArch);",
        ),
    ])
}

fn resource_stream(class_name: &str) -> String {
    format!("InputStream in = {class_name}.class.getResourceAsStream(\"/\" + resourcePath)")
}

fn extract_library_method(class_name: &str) -> Method {
    Method::new("private static", "Path", "extractLibrary")
        .param("String", "resourcePath")
        .param("Path", "extractionDir")
        .throws("IOException")
        .body(vec![
            Stmt::line(
                "final String fileName = resourcePath.substring(resourcePath.lastIndexOf('/') + 1);",
            ),
            Stmt::line("final Path targetFile = extractionDir.resolve(fileName);"),
            Stmt::Try {
                resources: vec![resource_stream(class_name)],
                body: vec![
                    Stmt::if_then(
                        "in == null",
                        vec![Stmt::line(
                            "throw new IOException(\"Resource not found: \" + resourcePath);",
                        )],
                    ),
                    Stmt::line("Files.copy(in, targetFile, StandardCopyOption.REPLACE_EXISTING);"),
                ],
                catches: Vec::new(),
                finally: None,
            },
            Stmt::line("return targetFile;"),
        ])
}

fn cached_library_method(class_name: &str) -> Method {
    Method::new("private static", "Path", "getCachedLibrary")
        .param("String", "resourcePath")
        .param("Path", "extractionDir")
        .throws("IOException")
        .body(vec![Stmt::Try {
            resources: vec![resource_stream(class_name)],
            body: vec![
                Stmt::if_then("in == null", vec![Stmt::line("return null;")]),
                Stmt::line("final String hash = computeHash(in);"),
                Stmt::line(
                    "final String fileName = resourcePath.substring(resourcePath.lastIndexOf('/') + 1);",
                ),
                Stmt::line("return extractionDir.resolve(fileName + \".\" + hash);"),
            ],
            catches: Vec::new(),
            finally: None,
        }])
}

fn cache_library_method() -> Method {
    Method::new("private static", "void", "cacheLibrary")
        .param("Path", "extractedLib")
        .param("Path", "cachedLib")
        .body(vec![Stmt::Try {
            resources: Vec::new(),
            body: vec![
                Stmt::line(
                    "final Path tempFile = Files.createTempFile(cachedLib.getParent(), cachedLib.getFileName().toString(), \".tmp\");",
                ),
                Stmt::Try {
                    resources: Vec::new(),
                    body: vec![
                        Stmt::line(
                            "Files.copy(extractedLib, tempFile, StandardCopyOption.REPLACE_EXISTING);",
                        ),
                        Stmt::line(
                            "Files.move(tempFile, cachedLib, StandardCopyOption.ATOMIC_MOVE);",
                        ),
                    ],
                    catches: Vec::new(),
                    finally: Some(vec![Stmt::line("Files.deleteIfExists(tempFile);")]),
                },
            ],
            catches: vec![Catch {
                ty: "IOException".to_string(),
                name: "exception".to_string(),
                body: vec![Stmt::comment(
                    "Publishing is best effort; the extracted copy is loaded either way",
                )],
            }],
            finally: None,
        }])
}

fn compute_hash_method() -> Method {
    Method::new("private static", "String", "computeHash")
        .param("InputStream", "in")
        .throws("IOException")
        .body(vec![Stmt::Try {
            resources: Vec::new(),
            body: vec![
                Stmt::line("final MessageDigest digest = MessageDigest.getInstance(\"SHA-256\");"),
                Stmt::line("final byte[] buffer = new byte[8192];"),
                Stmt::line("int read;"),
                Stmt::block(
                    "while ((read = in.read(buffer)) != -1)",
                    vec![Stmt::line("digest.update(buffer, 0, read);")],
                ),
                Stmt::line("final StringBuilder hex = new StringBuilder();"),
                Stmt::block(
                    "for (final byte b : digest.digest())",
                    vec![Stmt::line("hex.append(String.format(\"%02x\", b));")],
                ),
                Stmt::line("return hex.toString();"),
            ],
            catches: vec![Catch {
                ty: "NoSuchAlgorithmException".to_string(),
                name: "exception".to_string(),
                body: vec![Stmt::line(
                    "throw new IOException(\"SHA-256 not available\", exception);",
                )],
            }],
            finally: None,
        }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = "native/{os.name}-{os.arch}/mylib";

    fn generator(caching: bool) -> NativeLoaderGenerator {
        let options = LoaderOptions {
            enable_caching: caching,
            ..LoaderOptions::new(TEMPLATE)
        };
        NativeLoaderGenerator::new("com.example.config", "config_h", options).unwrap()
    }

    #[test]
    fn test_class_name() {
        assert_eq!(loader_class_name("config_h"), "config_h_NativeLibraryLoader");
        assert_eq!(generator(false).class_name(), "config_h_NativeLibraryLoader");
    }

    #[test]
    fn test_render_structure() {
        let source = generator(false).render();

        assert!(source.starts_with("package com.example.config;\n"));
        assert!(source.contains("public final class config_h_NativeLibraryLoader {"));
        assert!(source.contains("private static boolean loaded = false;"));
        assert!(source.contains("private config_h_NativeLibraryLoader() {"));
        assert!(source.contains("throw new UnsupportedOperationException(\"Utility class\");"));
        assert!(source.contains("public static synchronized void load() throws IOException {"));
        assert!(source.contains("expandResourcePath(\"native/{os.name}-{os.arch}/mylib\")"));
        for method in [
            "expandResourcePath",
            "getLibraryFileName",
            "detectOsName",
            "detectOsArch",
            "getExtractionDirectory",
            "extractLibrary",
        ] {
            assert!(source.contains(&format!(" {method}(")), "missing {method}");
        }
        assert!(source.contains("System.load(extractedLib.toAbsolutePath().toString());"));
        assert!(source.contains("\"Resource not found: \" + resourcePath"));
        assert!(source.contains("StandardCopyOption.REPLACE_EXISTING"));
        assert!(source.ends_with("}\n"));
    }

    #[test]
    fn test_caching_disabled_omits_cache_members() {
        let source = generator(false).render();
        assert!(!source.contains("getCachedLibrary"));
        assert!(!source.contains("computeHash"));
        assert!(!source.contains("SHA-256"));
        assert!(!source.contains("MessageDigest"));
    }

    #[test]
    fn test_caching_enabled_adds_cache_members() {
        let source = generator(true).render();
        assert!(source.contains("private static Path getCachedLibrary(final String resourcePath, final Path extractionDir) throws IOException {"));
        assert!(source.contains("private static String computeHash(final InputStream in) throws IOException {"));
        assert!(source.contains("MessageDigest.getInstance(\"SHA-256\")"));
        assert!(source.contains("if (in == null) {\n                return null;"));
        assert!(source.contains("extractionDir.resolve(fileName + \".\" + hash)"));
        assert!(source.contains("String.format(\"%02x\", b)"));
        assert!(source.contains("if (cachedLib != null && Files.exists(cachedLib)) {"));
        assert!(source.contains("StandardCopyOption.ATOMIC_MOVE"));
        assert!(source.contains("\"SHA-256 not available\""));
    }

    #[test]
    fn test_cache_checked_before_extraction() {
        let source = generator(true).render();
        let cached = source.find("getCachedLibrary(resourcePath, extractionDir)").unwrap();
        let extracted = source.find("extractLibrary(resourcePath, extractionDir)").unwrap();
        assert!(cached < extracted);
    }

    #[test]
    fn test_os_detection_follows_rule_order() {
        let source = generator(false).render();
        let win = source.find("osName.contains(\"win\")").unwrap();
        let mac = source.find("} else if (osName.contains(\"mac\")) {").unwrap();
        let nux = source.find("} else if (osName.contains(\"nux\")) {").unwrap();
        assert!(win < mac && mac < nux);
        assert!(source.contains("\"Unsupported OS: \" + osName"));

        for (needle, os) in OS_RULES {
            assert!(source.contains(&format!("osName.contains(\"{needle}\")")));
            assert!(source.contains(&format!("return \"{}\";", os.loader_name())));
        }
    }

    #[test]
    fn test_arch_detection_follows_rule_order() {
        let source = generator(false).render();
        let amd64 = source
            .find("osArch.contains(\"amd64\") || osArch.contains(\"x86_64\")")
            .unwrap();
        let arm = source
            .find("osArch.contains(\"aarch64\") || osArch.contains(\"arm64\")")
            .unwrap();
        let x86 = source.find("} else if (osArch.contains(\"x86\")) {").unwrap();
        assert!(amd64 < arm && arm < x86);
        assert!(source.contains("\"Unsupported architecture: \" + osArch"));
    }

    #[test]
    fn test_library_file_name_conventions() {
        let source = generator(false).render();
        assert!(source.contains("if (osName.equals(\"windows\")) {\n            return dirPath + fileName + \".dll\";"));
        assert!(source.contains("} else if (osName.equals(\"macos\")) {\n            return dirPath + \"lib\" + fileName + \".dylib\";"));
        assert!(source.contains("} else {\n            return dirPath + \"lib\" + fileName + \".so\";"));
    }

    #[test]
    fn test_default_extraction_dir() {
        let source = generator(false).render();
        assert!(source.contains("System.getProperty(\"java.io.tmpdir\")"));
        assert!(source.contains("Path.of(tmpDir, \"jextract-natives\")"));
        assert!(source.contains("Files.createDirectories(extractDir);"));
    }

    #[test]
    fn test_configured_extraction_dir_is_escaped() {
        let options = LoaderOptions {
            extraction_dir: Some(PathBuf::from(r"C:\natives\cache")),
            ..LoaderOptions::new("mylib")
        };
        let source = NativeLoaderGenerator::new("a", "b_h", options).unwrap().render();
        assert!(source.contains(r#"final Path configuredDir = Path.of("C:\\natives\\cache");"#));
        assert!(source.contains("Files.createDirectories(configuredDir);"));
        assert!(!source.contains("java.io.tmpdir"));
    }

    #[test]
    fn test_resource_path_is_escaped() {
        let source = NativeLoaderGenerator::new("a", "b_h", LoaderOptions::new("we\"ird\\lib"))
            .unwrap()
            .render();
        assert!(source.contains(r#"expandResourcePath("we\"ird\\lib")"#));
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(NativeLoaderGenerator::new("com..x", "a", LoaderOptions::new("x")).is_err());
        assert!(NativeLoaderGenerator::new("com.x", "a-b", LoaderOptions::new("x")).is_err());
    }

    #[test]
    fn test_generate_writes_into_package_dir() {
        let temp = TempDir::new().unwrap();
        let path = generator(true).generate(temp.path()).unwrap();

        assert_eq!(
            path,
            temp.path()
                .join("com/example/config/config_h_NativeLibraryLoader.java")
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), generator(true).render());
    }

    #[test]
    fn test_from_config() {
        assert_eq!(LoaderOptions::from_config(&NativeLibraryLoadingConfig::default()), None);

        let config = NativeLibraryLoadingConfig {
            resource_path: Some(TEMPLATE.to_string()),
            extraction_dir: Some(PathBuf::from("/opt/natives")),
            enable_caching: true,
        };
        let options = LoaderOptions::from_config(&config).unwrap();
        assert_eq!(options.resource_path, TEMPLATE);
        assert_eq!(options.extraction_dir, Some(PathBuf::from("/opt/natives")));
        assert!(options.enable_caching);
    }
}
