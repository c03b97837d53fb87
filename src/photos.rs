use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

/// Copies a registration photo into the workspace blob store at
/// `photos/students/<student_id>.<ext>`, overwriting any previous upload for
/// the same identifier. Returns the stored file's absolute path. Callers
/// treat failure as non-fatal; the registration proceeds without a photo.
pub fn attach_photo(workspace: &Path, student_id: &str, source: &Path) -> anyhow::Result<PathBuf> {
    let Some(ext) = source.extension().and_then(|e| e.to_str()) else {
        bail!("photo file {} has no extension", source.display());
    };

    // The display identifier contains slashes, so the blob path nests.
    let dest = workspace
        .join("photos")
        .join("students")
        .join(format!("{}.{}", student_id, ext));
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    fs::copy(source, &dest)
        .with_context(|| format!("copy {} to {}", source.display(), dest.display()))?;
    Ok(dest)
}
