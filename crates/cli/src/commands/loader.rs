use jextract_codegen::{InjectOutcome, LoaderOptions, NativeLoaderGenerator};
use jextract_core::Result;
use std::path::PathBuf;
use tracing::info;

/// Arguments of the `loader` command.
#[derive(Debug, Clone)]
pub struct LoaderArgs {
    pub package: String,
    pub base_name: String,
    pub output: PathBuf,
    pub resource_path: String,
    pub extraction_dir: Option<PathBuf>,
    pub enable_caching: bool,
    pub inject: bool,
}

impl LoaderArgs {
    fn generator(&self) -> Result<NativeLoaderGenerator> {
        let options = LoaderOptions {
            resource_path: self.resource_path.clone(),
            extraction_dir: self.extraction_dir.clone(),
            enable_caching: self.enable_caching,
        };
        NativeLoaderGenerator::new(&self.package, &self.base_name, options)
    }
}

/// Generate a loader for an existing jextract output tree.
#[allow(clippy::print_stdout)]
pub fn execute(args: &LoaderArgs) -> Result<()> {
    let generator = args.generator()?;

    let path = if args.inject {
        let (path, outcome) = generator.generate_and_inject(&args.output)?;
        if outcome == InjectOutcome::AlreadyPresent {
            info!("{} already loads {}", args.base_name, generator.class_name());
        }
        path
    } else {
        generator.generate(&args.output)?
    };

    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jextract_core::Error;
    use tempfile::TempDir;

    fn args(output: PathBuf, inject: bool) -> LoaderArgs {
        LoaderArgs {
            package: "com.example".to_string(),
            base_name: "config_h".to_string(),
            output,
            resource_path: "native/{os.name}-{os.arch}/config".to_string(),
            extraction_dir: None,
            enable_caching: false,
            inject,
        }
    }

    #[test]
    fn test_loader_without_inject_only_writes_loader() {
        let temp = TempDir::new().unwrap();
        execute(&args(temp.path().to_path_buf(), false)).unwrap();

        let package = temp.path().join("com/example");
        assert!(package.join("config_h_NativeLibraryLoader.java").is_file());
        assert!(!package.join("config_h.java").exists());
    }

    #[test]
    fn test_loader_inject_requires_header_class() {
        let temp = TempDir::new().unwrap();
        let err = execute(&args(temp.path().to_path_buf(), true)).unwrap_err();
        assert!(matches!(err, Error::TargetArtifactMissing { .. }));
    }

    #[test]
    fn test_loader_rejects_invalid_package() {
        let temp = TempDir::new().unwrap();
        let mut args = args(temp.path().to_path_buf(), false);
        args.package = "com.1example".to_string();
        assert!(matches!(execute(&args), Err(Error::Configuration { .. })));
    }
}
