use std::path::PathBuf;

use thiserror::Error;

/// Error type used across the crate.
///
/// Variant shapes mirror the project's original hand-rolled `Error` enum
/// (`CannotCreate`, `ProcessCreation`, ...); deriving `thiserror::Error`
/// instead of bare `Debug` gives every variant a user-facing `Display`
/// message, which is what `main` prints on failure (see `error::report`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("current directory '{0}' is invalid: {1}")]
    CurrentDirInvalid(PathBuf, std::io::Error),

    #[error("cannot create '{0}': {1}")]
    CannotCreate(PathBuf, std::io::Error),

    #[error("cannot read '{0}': {1}")]
    CannotRead(PathBuf, std::io::Error),

    #[error("error running command: {0}")]
    ProcessExec(std::io::Error),

    #[error("cannot spawn '{0}': {1}")]
    ProcessCreation(PathBuf, std::io::Error),

    #[error("'{0}' does not exist")]
    BuildfileMissing(PathBuf),

    #[error("error executing '{0}'")]
    BuildfileFailed(PathBuf),

    #[error("cannot open directive file '{0}': {1}")]
    DirectiveFileOpen(PathBuf, std::io::Error),

    #[error("unknown default variable name '{0}'")]
    UnknownSetKey(String),

    #[error("unable to parse arguments for '{0}': {1}")]
    BadDirectiveArgs(String, String),

    #[error("unable to resolve need '{0}'")]
    UnresolvedNeed(String),

    #[error("no targets defined")]
    NoTargets,

    #[error("no target named '{0}'")]
    NoSuchTarget(String),

    #[error("{0}")]
    Quit(String),

    #[error("unable to change directory to '{0}': {1}")]
    ChdirFailed(PathBuf, std::io::Error),

    #[error("no usable C/C++ compiler found on this system")]
    NoCompilerFound,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Prints `err` to stderr the way the driver reports a fatal build error and
/// returns the process exit code to use.
pub fn report(err: &Error) -> i32 {
    eprintln!("shmake: {}", err);
    1
}
