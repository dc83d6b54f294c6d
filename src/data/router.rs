// ============================================================
// Layer 4 - Good/Bad File Router
// ============================================================
// Moves a classified batch file into its destination folder
// without relying on platform rename-over-existing semantics:
//
//   1. refuse if <dest>/<name> already exists   (Collision)
//   2. copy to <dest>/.<name>.partial
//   3. verify the copy has the source's byte length
//   4. rename .partial -> <name>  (same directory)
//   5. delete the source
//
// A failure at any step leaves the source where it was; a
// leftover .partial file is removed on a best-effort basis.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("'{0}' already exists in the destination folder")]
    Collision(PathBuf),

    #[error("copy of '{path}' has {copied} bytes, source has {expected}")]
    Verification {
        path:     PathBuf,
        expected: u64,
        copied:   u64,
    },

    #[error("source path '{0}' has no file name")]
    NoFileName(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub struct FileRouter {
    good_dir: PathBuf,
    bad_dir:  PathBuf,
}

impl FileRouter {
    /// Creates both destination folders if they are missing.
    pub fn new(good_dir: impl Into<PathBuf>, bad_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let good_dir = good_dir.into();
        let bad_dir  = bad_dir.into();
        fs::create_dir_all(&good_dir)?;
        fs::create_dir_all(&bad_dir)?;
        Ok(Self { good_dir, bad_dir })
    }

    pub fn to_good(&self, src: &Path) -> Result<PathBuf, RoutingError> {
        move_verified(src, &self.good_dir)
    }

    pub fn to_bad(&self, src: &Path) -> Result<PathBuf, RoutingError> {
        move_verified(src, &self.bad_dir)
    }
}

pub fn move_verified(src: &Path, dest_dir: &Path) -> Result<PathBuf, RoutingError> {
    let name = src
        .file_name()
        .ok_or_else(|| RoutingError::NoFileName(src.to_path_buf()))?;
    let target = dest_dir.join(name);
    if target.exists() {
        return Err(RoutingError::Collision(target));
    }

    let partial = dest_dir.join(format!(".{}.partial", name.to_string_lossy()));
    let result = copy_then_rename(src, &partial, &target);
    if result.is_err() && partial.exists() {
        let _ = fs::remove_file(&partial);
    }
    result?;

    fs::remove_file(src)?;
    Ok(target)
}

fn copy_then_rename(src: &Path, partial: &Path, target: &Path) -> Result<(), RoutingError> {
    let expected = fs::metadata(src)?.len();
    let copied   = fs::copy(src, partial)?;
    let on_disk  = fs::metadata(partial)?.len();
    if copied != expected || on_disk != expected {
        return Err(RoutingError::Verification {
            path: src.to_path_buf(),
            expected,
            copied: on_disk,
        });
    }
    // Re-check right before the rename: another writer may have won.
    if target.exists() {
        return Err(RoutingError::Collision(target.to_path_buf()));
    }
    fs::rename(partial, target)?;
    Ok(())
}
