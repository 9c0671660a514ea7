use super::{Context, resolve_version};
use jextract_core::Result;
use tracing::info;

/// Acquire jextract and print the launcher path.
#[allow(clippy::print_stdout)]
pub async fn execute(context: &Context, version: Option<&str>) -> Result<()> {
    let config = context.project_config(false)?;
    let version = resolve_version(version, &config)?;
    let cache = context.tool_cache(&config)?;

    let executable = cache.executable(&version).await?;
    info!(%version, path = %executable.display(), "jextract ready");
    println!("{}", executable.display());
    Ok(())
}
