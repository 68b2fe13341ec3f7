//! Writable Folder Selection
//!
//! Picks a staging directory for native library files from an ordered list of
//! candidates, falling back to the system temp directory. Sandboxed hosts
//! often leave only one (or none) of the candidates usable, so callers pass a
//! validation predicate that probes writability however they see fit.

use std::env;
use std::path::{Path, PathBuf};

use crate::diag::TraceSink;

/// Select the first usable directory from `candidates`.
///
/// The system default temp directory is appended as a last-resort candidate
/// unless it already appears in the list. Entries that do not exist or are
/// not directories are skipped. When `validate` is given, a candidate is
/// accepted only if the predicate returns true; rejected candidates are
/// skipped, never retried.
///
/// Returns `None` when no candidate qualifies. That is a non-fatal condition:
/// the caller aborts the load with a descriptive error.
pub fn find_writable_folder(
    candidates: &[PathBuf],
    validate: Option<&dyn Fn(&Path) -> bool>,
    sink: &dyn TraceSink,
) -> Option<PathBuf> {
    let default_tmp = env::temp_dir();

    let mut folders: Vec<PathBuf> = candidates.to_vec();
    if !folders.contains(&default_tmp) {
        folders.push(default_tmp);
    }

    sink.trace(format_args!(
        "find_writable_folder: possible folders: {:?}",
        folders
    ));

    for folder in folders {
        if !folder.is_dir() {
            continue;
        }

        match validate {
            None => return Some(folder),
            Some(validate) if validate(&folder) => return Some(folder),
            Some(_) => continue,
        }
    }

    None
}
