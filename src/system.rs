//! Contains all code dealing with system access.
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;

use std::{
    env::{split_paths, var_os},
    fs::read_dir,
    path::{Path, PathBuf},
};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::warn;
use trie_rs::TrieBuilder;

use crate::error::BuiltinError;

/// Changes the current directory.
pub fn change_directory(path: &Path) -> Result<(), BuiltinError> {
    std::env::set_current_dir(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => BuiltinError::NoSuchDirectory {
            path: path.to_path_buf(),
        },
        _ => BuiltinError::Io {
            name: "cd",
            source: e,
        },
    })
}

/// The user's home directory, taken from `HOME`.
pub fn home_directory() -> Option<PathBuf> {
    var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Gets a vector of all paths in the PATH environment variable.
pub fn get_path() -> Vec<PathBuf> {
    match var_os("PATH") {
        Some(path) => split_paths(&path).collect(),
        None => {
            warn!("no PATH environment variable found");
            Vec::new()
        }
    }
}

/// Starts a trie with the names of every executable file in `paths`.
pub fn trie_builder_with_path_executables(paths: &[PathBuf]) -> TrieBuilder<u8> {
    let mut builder = TrieBuilder::new();
    for path in paths {
        let Ok(entries) = read_dir(path) else {
            continue;
        };
        for dir_entry in entries.flatten() {
            let is_executable = dir_entry
                .metadata()
                .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
                .unwrap_or(false);
            if is_executable {
                if let Some(name) = dir_entry.file_name().to_str() {
                    builder.push(name);
                }
            }
        }
    }
    builder
}

extern "C" fn ignore_interrupt(_: nix::libc::c_int) {}

/// Keeps the shell alive when the terminal sends an interrupt while a
/// foreground pipeline runs. A caught signal is reset to its default action
/// on exec, so spawned programs are still interrupted.
pub fn install_interrupt_handler() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(ignore_interrupt),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler does nothing, so it is async-signal-safe.
    unsafe { sigaction(Signal::SIGINT, &action) }.map(|_| ())
}
