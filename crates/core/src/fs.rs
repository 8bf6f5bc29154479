//! Filesystem utilities

use std::fs;
use std::path::Path;

use log::info;

/// Create the parent directory of `path` (and its ancestors) if missing
///
/// Paths without a parent component are left alone.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent)?;
            info!("Created directory: {}", parent.display());
            Ok(())
        }
        _ => Ok(()),
    }
}
