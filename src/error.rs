use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

// ---------------------------------------------------------------------------
// OpenError
// ---------------------------------------------------------------------------

/// Setup failure: the walk root could not be resolved.
///
/// Reported once, before any entry is produced. Everything that goes wrong
/// after the root has been opened is attached to an entry as [`EntryError`].
#[derive(Error, Debug)]
pub enum OpenError {
    #[error("root path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied on root path: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("a component of the root path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid root path: {}", .path.display())]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OpenError {
    /// Classify an I/O failure hit while resolving `path`.
    pub(crate) fn from_io(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path),
            _ => Self::InvalidRoot { path, source },
        }
    }

    /// The root path that failed to open.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::NotADirectory(p) => p,
            Self::InvalidRoot { path, .. } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// EntryError
// ---------------------------------------------------------------------------

/// A recoverable failure attached to a single entry.
///
/// The walk continues past every `EntryError`. Sources are shared behind an
/// [`Arc`] so that entries carrying an error stay cheap to clone and can be
/// sent across threads once copied.
#[derive(Error, Debug, Clone)]
pub enum EntryError {
    #[error("failed to read directory '{}'", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed to inspect metadata for '{}'", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("broken symlink '{}'", .path.display())]
    BrokenSymlink {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("traversal error at '{}'", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },
}

impl EntryError {
    pub(crate) fn read_dir(path: PathBuf, source: io::Error) -> Self {
        Self::ReadDir { path, source: Arc::new(source) }
    }

    pub(crate) fn metadata(path: PathBuf, source: io::Error) -> Self {
        Self::Metadata { path, source: Arc::new(source) }
    }

    pub(crate) fn broken_symlink(path: PathBuf, source: io::Error) -> Self {
        Self::BrokenSymlink { path, source: Arc::new(source) }
    }

    pub(crate) fn walk(path: PathBuf, source: io::Error) -> Self {
        Self::Walk { path, source: Arc::new(source) }
    }

    /// The path this error occurred at.
    pub fn path(&self) -> &Path {
        match self {
            Self::ReadDir { path, .. }
            | Self::Metadata { path, .. }
            | Self::BrokenSymlink { path, .. }
            | Self::Walk { path, .. } => path,
        }
    }

    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::ReadDir { source, .. }
            | Self::Metadata { source, .. }
            | Self::BrokenSymlink { source, .. }
            | Self::Walk { source, .. } => &**source,
        }
    }

    /// Shorthand for the most common reason a subtree goes missing.
    pub fn is_permission_denied(&self) -> bool {
        self.io_error().kind() == io::ErrorKind::PermissionDenied
    }
}

// ---------------------------------------------------------------------------
// StepError
// ---------------------------------------------------------------------------

/// A walk step that failed without naming the object it failed on.
///
/// Never escapes the crate: the enumerator turns it into an error-tagged
/// entry located at the directory being read.
#[derive(Error, Debug)]
#[error("walk step failed at depth {depth}")]
pub(crate) struct StepError {
    pub depth: usize,
    #[source]
    pub source: io::Error,
}
