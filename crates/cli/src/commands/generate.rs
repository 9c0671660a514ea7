use super::Context;
use jextract_codegen::{LoaderOptions, NativeLoaderGenerator};
use jextract_core::{Error, LibraryDefinition, ProjectConfig, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// One library definition ready to run.
#[derive(Debug)]
struct LibraryRun<'a> {
    name: &'a str,
    definition: &'a LibraryDefinition,
    header_class: String,
    output_dir: PathBuf,
}

impl<'a> LibraryRun<'a> {
    fn new(config: &ProjectConfig, name: &'a str, definition: &'a LibraryDefinition) -> Result<Self> {
        Ok(Self {
            name,
            definition,
            header_class: definition.header_class_name()?,
            output_dir: definition.output_dir(&config.project_dir, name),
        })
    }

    /// jextract arguments in the order the tool expects.
    fn args(&self) -> Vec<OsString> {
        let definition = self.definition;
        let mut args: Vec<OsString> = vec![
            "--output".into(),
            self.output_dir.clone().into(),
            "--target-package".into(),
            definition.target_package.clone().into(),
            "--header-class-name".into(),
            self.header_class.clone().into(),
        ];
        args.extend(definition.compiler_args.iter().map(OsString::from));
        if let Some(library) = &definition.library_name {
            args.push("-l".into());
            args.push(library.into());
        }
        args.push(definition.header_file.clone().into());
        args
    }

    async fn run(&self, executable: &Path, project_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| Error::io(e, &self.output_dir, "create_dir_all"))?;

        let args = self.args();
        debug!(library = self.name, ?args, "Running jextract");
        let status = Command::new(executable)
            .args(&args)
            .current_dir(project_dir)
            .status()
            .await
            .map_err(|e| {
                Error::execution(
                    self.name,
                    format!("could not start {}: {e}", executable.display()),
                )
            })?;

        if !status.success() {
            return Err(Error::execution(self.name, format!("exited with {status}")));
        }
        info!(library = self.name, output = %self.output_dir.display(), "Generated bindings");

        if let Some(options) = LoaderOptions::from_config(&self.definition.native_library_loading)
        {
            NativeLoaderGenerator::new(
                &self.definition.target_package,
                &self.header_class,
                options,
            )?
            .generate_and_inject(&self.output_dir)?;
        }
        Ok(())
    }
}

/// Pick the libraries to run: all of them, or the named ones in the given order.
fn select<'a>(
    config: &'a ProjectConfig,
    names: &[String],
) -> Result<Vec<(&'a str, &'a LibraryDefinition)>> {
    if names.is_empty() {
        return Ok(config
            .libraries
            .iter()
            .map(|(name, definition)| (name.as_str(), definition))
            .collect());
    }

    names
        .iter()
        .map(|name| {
            config
                .libraries
                .get_key_value(name)
                .map(|(name, definition)| (name.as_str(), definition))
                .ok_or_else(|| {
                    let known: Vec<_> = config.libraries.keys().map(String::as_str).collect();
                    Error::configuration(format!(
                        "Unknown library '{name}', expected one of: {}",
                        known.join(", ")
                    ))
                })
        })
        .collect()
}

/// Run jextract for the selected library definitions.
pub async fn execute(context: &Context, names: &[String]) -> Result<()> {
    let config = context.project_config(true)?;
    let selected = select(&config, names)?;
    if selected.is_empty() {
        warn!("No libraries configured, nothing to generate");
        return Ok(());
    }

    let runs = selected
        .into_iter()
        .map(|(name, definition)| LibraryRun::new(&config, name, definition))
        .collect::<Result<Vec<_>>>()?;

    let version = config.tool_version()?;
    let executable = context.tool_cache(&config)?.executable(&version).await?;

    for run in &runs {
        run.run(&executable, &config.project_dir).await?;
    }
    Ok(())
}
