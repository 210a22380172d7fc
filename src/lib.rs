//! # fsenum
//!
//! Configurable filesystem tree enumeration, fts style.
//!
//! fsenum walks a directory tree and reports one entry per visited object:
//! files, directories (before and/or after their contents), symlinks, and
//! objects that could not be read. Traversal policy is a plain options
//! struct ([`TraversalOptions`]); failures below the root never abort the
//! walk, they arrive as entries with [`Entry::error`] set.
//!
//! # Live entries and snapshots
//!
//! Stepping the walk hands out an [`EntryRef`], a view that borrows the
//! cursor and is gone by the next step. [`EntryRef::to_entry`] copies it into
//! an [`Entry`], an immutable, `Send + Sync` snapshot that keeps its whole
//! parent chain alive.
//!
//! # Quick Start
//!
//! ```rust
//! use fsenum::{ByName, EntryType};
//!
//! let tmp = tempfile::tempdir().unwrap();
//! std::fs::write(tmp.path().join("a.txt"), "0123456789").unwrap();
//! std::fs::create_dir(tmp.path().join("b")).unwrap();
//! std::fs::write(tmp.path().join("b/c.txt"), "01234").unwrap();
//!
//! let mut seen = Vec::new();
//! let stats = fsenum::enumerate(tmp.path())
//!     .comparator(ByName)
//!     .run(|entry| {
//!         seen.push((entry.name().unwrap().to_string_lossy().into_owned(), entry.entry_type()));
//!         true
//!     })
//!     .unwrap();
//!
//! assert_eq!(stats.entries, 5);
//! assert_eq!(seen[1], ("a.txt".to_string(), EntryType::RegularFile));
//! assert_eq!(seen[4], ("b".to_string(), EntryType::DirectoryPostOrder));
//! ```
//!
//! # Pulling entries
//!
//! ```rust
//! use fsenum::{Enumerator, TraversalOptions};
//!
//! let tmp = tempfile::tempdir().unwrap();
//! std::fs::write(tmp.path().join("f"), "x").unwrap();
//!
//! let mut walk = Enumerator::open(tmp.path(), TraversalOptions::default()).unwrap();
//! let root = walk.next().unwrap().to_entry();
//! let file = walk.next().unwrap().to_entry();
//! assert!(walk.next().is_none());
//!
//! assert!(file.parent().unwrap().same_as(&root));
//! assert_eq!(file.size(), 1);
//! ```
//!
//! [`Enumerator::root_directory`] walks the whole filesystem from `/`; it is
//! shorthand for `Enumerator::open("/", options)`.

#![forbid(unsafe_code)]

pub mod raw;

mod builder;
mod engine;
mod entry;
mod error;
mod options;
mod results;
mod traits;

use std::path::{Path, PathBuf};

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::{ByName, DirsFirst, EnumeratorBuilder};
pub use engine::{Enumerator, Snapshots};
pub use entry::{Entry, EntryLevel, EntryRef, EntryType, Stat};
pub use error::{EntryError, OpenError};
pub use options::{DirectoryOrder, TraversalOptions};
pub use raw::{RawKind, RawRecord};
pub use results::RunStats;
pub use traits::{Comparator, Sibling};

// ── Entry points ──────────────────────────────────────────────────────────────

/// Create an [`EnumeratorBuilder`] rooted at `root`.
///
/// Relative roots are resolved against the working directory when the
/// enumerator is opened.
pub fn enumerate(root: impl Into<PathBuf>) -> EnumeratorBuilder {
    EnumeratorBuilder::new(root.into())
}

/// Walk `root` once, pushing every entry to `callback` until it returns
/// `false`.
///
/// # Errors
///
/// Returns [`OpenError`] if the root cannot be resolved; per-entry
/// failures are reported through [`EntryRef::error`].
pub fn iterate<F>(
    root: impl AsRef<Path>,
    options: TraversalOptions,
    callback: F,
) -> Result<RunStats, OpenError>
where
    F: FnMut(EntryRef<'_>) -> bool,
{
    Ok(Enumerator::open(root, options)?.run(callback))
}

/// [`iterate`] over raw records, skipping the entry model.
///
/// # Errors
///
/// Returns [`OpenError`] if the root cannot be resolved.
pub fn iterate_raw<F>(
    root: impl AsRef<Path>,
    options: TraversalOptions,
    callback: F,
) -> Result<RunStats, OpenError>
where
    F: FnMut(&RawRecord) -> bool,
{
    Ok(Enumerator::open(root, options)?.run_raw(callback))
}
