//! Locating the external `solc` and `geth` executables.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Check that `path` names a regular file with an execute bit set.
///
/// Any of the owner, group or other bits counts. Telling which of them
/// applies to the current user needs the effective uid and gids, which std
/// does not expose; a binary the current user may not run still fails later, when
/// it is spawned, with the OS error attached.
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Search the process `PATH` for an executable called `name`
pub fn which(name: &str) -> Option<PathBuf> {
    let search_path = env::var_os("PATH")?;
    which_in(name, &search_path)
}

/// Search an explicit `PATH`-style list for an executable called `name`.
///
/// A name that already carries a directory component is checked as-is and
/// never looked up in the search path.
pub fn which_in(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    env::split_paths(search_path)
        .map(|dir| {
            // Windows-style quoted entries show up in some environments
            let raw = dir.to_string_lossy();
            PathBuf::from(raw.trim_matches('"')).join(name)
        })
        .find(|exe| is_executable(exe))
}

/// Determine which binary to use.
///
/// An explicitly given path wins, but only if it is an executable file; an
/// unusable explicit path yields `None` rather than silently falling back to
/// whatever happens to be on `PATH`. Without an explicit path the process
/// search path is scanned in order.
pub fn resolve(explicit: Option<&Path>, name: &str) -> Option<PathBuf> {
    match explicit {
        Some(path) => is_executable(path).then(|| path.to_path_buf()),
        None => which(name),
    }
}
