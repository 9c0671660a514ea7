//! Subcommand implementations.
//!
//! Every command returns a [`jextract_core::Result`] so `main` can map the
//! error kind to an exit code.

pub mod fetch;
pub mod generate;
pub mod inject;
pub mod loader;
pub mod resource_path;
pub mod url;

use crate::cli::{Cli, Commands};
use jextract_core::config::CONFIG_FILE_NAME;
use jextract_core::{Error, ProjectConfig, Result, ToolVersion};
use jextract_tools::ToolCache;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Global options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit `--config` path
    pub config: Option<PathBuf>,
    /// Explicit `--cache-dir`
    pub cache_dir: Option<PathBuf>,
}

impl Context {
    /// Load the project configuration.
    ///
    /// An explicit `--config` must exist. Without it `./jextract.toml` is used
    /// when present; otherwise an empty configuration is returned unless
    /// `required` is set.
    pub fn project_config(&self, required: bool) -> Result<ProjectConfig> {
        if let Some(path) = &self.config {
            return ProjectConfig::load(path);
        }

        let default_path = Path::new(CONFIG_FILE_NAME);
        if default_path.is_file() {
            return ProjectConfig::load(default_path);
        }
        if required {
            return Err(Error::configuration(format!(
                "No {CONFIG_FILE_NAME} found in the current directory; pass --config"
            )));
        }

        debug!("No {CONFIG_FILE_NAME} found, using defaults");
        Ok(ProjectConfig {
            project_dir: PathBuf::from("."),
            ..ProjectConfig::default()
        })
    }

    /// Tool cache for a configuration, honouring `--cache-dir` and mirrors.
    pub fn tool_cache(&self, config: &ProjectConfig) -> Result<ToolCache> {
        let root = config.cache_dir(self.cache_dir.as_deref())?;
        debug!(root = %root.display(), "Using tool cache");
        Ok(ToolCache::with_http(root)?.with_url_template(config.url_template()?))
    }
}

/// Version from the command line, falling back to the configuration.
fn resolve_version(explicit: Option<&str>, config: &ProjectConfig) -> Result<ToolVersion> {
    explicit.map_or_else(|| config.tool_version(), ToolVersion::parse)
}

/// Dispatch a parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let context = Context {
        config: cli.config,
        cache_dir: cli.cache_dir,
    };

    match cli.command {
        Commands::Generate { libraries } => generate::execute(&context, &libraries).await,
        Commands::Fetch { version } => fetch::execute(&context, version.as_deref()).await,
        Commands::Loader {
            package,
            base_name,
            output,
            resource_path,
            extraction_dir,
            enable_caching,
            inject,
        } => loader::execute(&loader::LoaderArgs {
            package,
            base_name,
            output,
            resource_path,
            extraction_dir,
            enable_caching,
            inject,
        }),
        Commands::Inject {
            file,
            class,
            loader,
        } => inject::execute(&file, &class, &loader),
        Commands::ResourcePath { template, os, arch } => {
            resource_path::execute(&template, os.as_deref().zip(arch.as_deref()))
        }
        Commands::Url { version, platform } => {
            url::execute(&context, version.as_deref(), platform.as_deref())
        }
    }
}
