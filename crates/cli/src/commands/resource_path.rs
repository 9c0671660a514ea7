use jextract_core::{HostPlatform, Result};

/// Resolve a resource path template for an `(os.name, os.arch)` pair, or the
/// running host when none is given.
pub fn resolve(template: &str, host: Option<(&str, &str)>) -> Result<String> {
    let platform = match host {
        Some((os, arch)) => HostPlatform::classify(os, arch)?,
        None => HostPlatform::current()?,
    };
    Ok(platform.expand_resource_path(template))
}

#[allow(clippy::print_stdout)]
pub fn execute(template: &str, host: Option<(&str, &str)>) -> Result<()> {
    println!("{}", resolve(template, host)?);
    Ok(())
}
