use super::{Context, resolve_version};
use jextract_core::{Result, SupportedPlatform};

/// Print the download URL for a version and platform.
#[allow(clippy::print_stdout)]
pub fn execute(context: &Context, version: Option<&str>, platform: Option<&str>) -> Result<()> {
    let config = context.project_config(false)?;
    let version = resolve_version(version, &config)?;
    let platform = platform.map_or_else(SupportedPlatform::current, str::parse)?;

    println!("{}", config.url_template()?.render(&version, platform));
    Ok(())
}
