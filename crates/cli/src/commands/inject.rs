use jextract_codegen::{InjectOutcome, inject_loader};
use jextract_core::Result;
use std::path::Path;
use tracing::info;

/// Inject a `load()` call for `loader` into the header class at `file`.
pub fn execute(file: &Path, class: &str, loader: &str) -> Result<()> {
    match inject_loader(file, class, loader)? {
        InjectOutcome::Injected => info!(file = %file.display(), "Injected {loader} into {class}"),
        InjectOutcome::AlreadyPresent => {
            info!(file = %file.display(), "{class} already calls {loader}");
        }
    }
    Ok(())
}
