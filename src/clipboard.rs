//! Cut/paste of files between Finder folders.
//!
//! The cut set lives in memory only; the system pasteboard is never touched.
//! Paste moves each file into the destination folder and then clears the set,
//! whether or not every move succeeded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{FinderEnhanceError, Result};
use crate::logging;

/// Moves one filesystem entry.
pub trait FileMover {
    fn move_entry(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// `fs::rename`, falling back to copy + remove when crossing devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMover;

impl FileMover for FsMover {
    fn move_entry(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
                logging::log_debug(
                    "CLIPBOARD",
                    &format!("{} is on another device, copying", from.display()),
                );
                copy_recursive(from, to)?;
                if from.is_dir() {
                    fs::remove_dir_all(from)
                } else {
                    fs::remove_file(from)
                }
            }
            Err(e) => Err(e),
        }
    }
}

fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    if from.is_dir() {
        fs::create_dir(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutResult {
    pub count: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteResult {
    /// Destination paths of entries that were moved
    pub moved: Vec<PathBuf>,
    pub failures: Vec<PasteFailure>,
    pub message: String,
}

/// Owns the CutFileSet: ordered, deduplicated absolute paths.
pub struct ClipboardCoordinator<M: FileMover = FsMover> {
    cut: Vec<PathBuf>,
    mover: M,
}

impl ClipboardCoordinator<FsMover> {
    pub fn new() -> Self {
        Self::with_mover(FsMover)
    }
}

impl Default for ClipboardCoordinator<FsMover> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: FileMover> ClipboardCoordinator<M> {
    pub fn with_mover(mover: M) -> Self {
        Self {
            cut: Vec::new(),
            mover,
        }
    }

    /// Replace the cut set with the existing entries of `paths`.
    ///
    /// Errors, leaving the previous set intact, when none of them exist.
    pub fn cut_files(&mut self, paths: &[PathBuf]) -> Result<CutResult> {
        let mut valid: Vec<PathBuf> = Vec::with_capacity(paths.len());
        for path in paths {
            if path.exists() && !valid.contains(path) {
                valid.push(path.clone());
            }
        }

        if valid.is_empty() {
            return Err(FinderEnhanceError::Clipboard(
                "No valid files to cut".to_string(),
            ));
        }

        let count = valid.len();
        self.cut = valid;
        logging::log("CLIPBOARD", &format!("Cut {} item(s)", count));
        Ok(CutResult {
            count,
            message: format!("Cut {} item(s)", count),
        })
    }

    /// Move every cut entry into `dest`. A failed entry is recorded and the
    /// rest continue; the set is cleared after the pass.
    pub fn paste_files(&mut self, dest: &Path) -> Result<PasteResult> {
        if self.cut.is_empty() {
            return Err(FinderEnhanceError::Clipboard(
                "Nothing to paste".to_string(),
            ));
        }
        if !dest.is_dir() {
            return Err(FinderEnhanceError::Clipboard(format!(
                "Paste destination is not a folder: {}",
                dest.display()
            )));
        }

        let dest_real = fs::canonicalize(dest).unwrap_or_else(|_| dest.to_path_buf());
        let mut moved = Vec::new();
        let mut failures = Vec::new();

        for source in std::mem::take(&mut self.cut) {
            let Some(name) = source.file_name() else {
                failures.push(PasteFailure {
                    path: source.clone(),
                    reason: "path has no file name".to_string(),
                });
                continue;
            };
            let target = dest.join(name);

            if target == source {
                moved.push(target);
                continue;
            }
            let source_real = fs::canonicalize(&source).unwrap_or_else(|_| source.clone());
            if dest_real.starts_with(&source_real) {
                failures.push(PasteFailure {
                    path: source.clone(),
                    reason: "cannot move a folder into itself".to_string(),
                });
                continue;
            }
            if target.exists() {
                failures.push(PasteFailure {
                    path: source.clone(),
                    reason: format!("{} already exists", target.display()),
                });
                continue;
            }

            match self.mover.move_entry(&source, &target) {
                Ok(()) => moved.push(target),
                Err(e) => failures.push(PasteFailure {
                    path: source.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        for failure in &failures {
            logging::log(
                "CLIPBOARD",
                &format!("Move of {} failed: {}", failure.path.display(), failure.reason),
            );
        }

        let message = if failures.is_empty() {
            format!("Moved {} item(s)", moved.len())
        } else {
            format!("Moved {} item(s), {} failed", moved.len(), failures.len())
        };
        logging::log("CLIPBOARD", &message);

        Ok(PasteResult {
            moved,
            failures,
            message,
        })
    }

    pub fn has_cut_files(&self) -> bool {
        !self.cut.is_empty()
    }

    pub fn cut_files_snapshot(&self) -> Vec<PathBuf> {
        self.cut.clone()
    }

    pub fn clear(&mut self) {
        if !self.cut.is_empty() {
            logging::log("CLIPBOARD", &format!("Forgot {} cut item(s)", self.cut.len()));
        }
        self.cut.clear();
    }
}
