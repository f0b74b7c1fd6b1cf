// 📂 File Collector - recursive listing of source files

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// List every regular file under `dir`, recursively.
///
/// Paths come back sorted so that merge order (and therefore dedup ties)
/// is the same on every run.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
