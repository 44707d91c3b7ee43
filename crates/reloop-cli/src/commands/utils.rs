use std::path::{Path, PathBuf};

use crate::error::{Result, ResultExt};

/// Absolute project directory: `--cwd` if given, else the current directory.
pub(crate) fn project_root(cwd: Option<&Path>) -> Result<PathBuf> {
    let dir = match cwd {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let root = dir.canonicalize().with_path(&dir)?;
    if !root.is_dir() {
        return Err(crate::error::CliError::InvalidArgument(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(root)
}
