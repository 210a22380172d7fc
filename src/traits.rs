use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

// ---------------------------------------------------------------------------
// Sibling
// ---------------------------------------------------------------------------

/// A directory entry as seen by a [`Comparator`], before it is walked.
///
/// Wraps the walker's own entry. Only the information available straight
/// from `readdir` is cheap; [`metadata`](Sibling::metadata) issues a stat.
pub struct Sibling<'a>(pub(crate) &'a walkdir::DirEntry);

impl Sibling<'_> {
    /// Full path of the entry.
    pub fn path(&self) -> &Path {
        self.0.path()
    }

    /// Final path component.
    pub fn file_name(&self) -> &OsStr {
        self.0.file_name()
    }

    /// File type reported by the directory read. Symlinks are only resolved
    /// when all symlinks are being followed.
    pub fn file_type(&self) -> fs::FileType {
        self.0.file_type()
    }

    /// Depth below the walk root.
    pub fn depth(&self) -> usize {
        self.0.depth()
    }

    /// Stat the entry.
    pub fn metadata(&self) -> std::io::Result<fs::Metadata> {
        self.0.metadata().map_err(std::io::Error::from)
    }
}

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

/// Orders the siblings of one directory before the walk descends into them.
///
/// Installed once at configuration time. Without a comparator, siblings come
/// out in native directory order.
///
/// # Panics
///
/// The walk does not guard against a comparator that panics. Keeping the
/// comparison total and panic-free is the caller's responsibility.
///
/// # Example
///
/// ```rust
/// use std::cmp::Ordering;
/// use fsenum::{Comparator, Sibling};
///
/// struct Largest;
///
/// impl Comparator for Largest {
///     fn compare(&self, a: &Sibling<'_>, b: &Sibling<'_>) -> Ordering {
///         let len = |s: &Sibling<'_>| s.metadata().map(|m| m.len()).unwrap_or(0);
///         len(b).cmp(&len(a))
///     }
/// }
/// ```
pub trait Comparator: Send + Sync {
    /// Three-way comparison of two siblings.
    fn compare(&self, a: &Sibling<'_>, b: &Sibling<'_>) -> Ordering;
}

impl<F> Comparator for F
where
    F: Fn(&Sibling<'_>, &Sibling<'_>) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &Sibling<'_>, b: &Sibling<'_>) -> Ordering {
        self(a, b)
    }
}
