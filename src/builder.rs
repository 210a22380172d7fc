use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::Enumerator;
use crate::entry::EntryRef;
use crate::error::OpenError;
use crate::options::{DirectoryOrder, TraversalOptions};
use crate::results::RunStats;
use crate::traits::{Comparator, Sibling};

// ---------------------------------------------------------------------------
// EnumeratorBuilder
// ---------------------------------------------------------------------------

/// Configures an [`Enumerator`].
///
/// Created via [`fsenum::enumerate()`](crate::enumerate). Configure with
/// chained builder methods, then [`open()`](EnumeratorBuilder::open) it, or
/// [`run()`](EnumeratorBuilder::run) it in one go.
///
/// # Example
///
/// ```rust,no_run
/// use fsenum::{ByName, DirectoryOrder};
///
/// let mut walk = fsenum::enumerate("/etc")
///     .directory_order(DirectoryOrder::PreOnly)
///     .fetch_metadata(false)
///     .comparator(ByName)
///     .open()?;
///
/// while let Some(entry) = walk.next() {
///     println!("{}", entry.path().display());
/// }
/// # Ok::<(), fsenum::OpenError>(())
/// ```
pub struct EnumeratorBuilder {
    root:       PathBuf,
    options:    TraversalOptions,
    comparator: Option<Arc<dyn Comparator>>,
}

impl EnumeratorBuilder {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            root,
            options:    TraversalOptions::default(),
            comparator: None,
        }
    }

    /// Replace every option at once.
    pub fn options(mut self, options: TraversalOptions) -> Self {
        self.options = options;
        self
    }

    // ── Symlinks ──────────────────────────────────────────────────────────

    /// Dereference the root if it is a symlink. Off by default.
    pub fn follow_root_symlink(mut self, yes: bool) -> Self {
        self.options.follow_root_symlink = yes;
        self
    }

    /// Dereference every symlink and walk it as its target. Links back into
    /// the open path are reported as cycles instead. Off by default.
    pub fn follow_all_symlinks(mut self, yes: bool) -> Self {
        self.options.follow_all_symlinks = yes;
        self
    }

    // ── What gets reported ────────────────────────────────────────────────

    /// Stat every object. On by default; turning it off leaves every
    /// entry's metadata fields at zero.
    pub fn fetch_metadata(mut self, yes: bool) -> Self {
        self.options.fetch_metadata = yes;
        self
    }

    /// Report `.` and `..` in every directory. Off by default.
    pub fn include_dot_entries(mut self, yes: bool) -> Self {
        self.options.include_dot_entries = yes;
        self
    }

    /// Pre-order, post-order, or both. Both by default.
    pub fn directory_order(mut self, order: DirectoryOrder) -> Self {
        self.options.directory_order = order;
        self
    }

    // ── Walk shape ────────────────────────────────────────────────────────

    /// Descend into directories on other devices. On by default.
    pub fn cross_devices(mut self, yes: bool) -> Self {
        self.options.cross_devices = yes;
        self
    }

    /// Performance hint; accepted for compatibility, no visible effect.
    pub fn change_directories(mut self, yes: bool) -> Self {
        self.options.change_directories = yes;
        self
    }

    /// Sort the siblings of every directory before walking them.
    pub fn comparator(mut self, c: impl Comparator + 'static) -> Self {
        self.comparator = Some(Arc::new(c));
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Resolve the root and return the ready-to-consume enumerator.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError`] if the root cannot be resolved. Nothing after
    /// this point fails the enumeration as a whole.
    pub fn open(self) -> Result<Enumerator, OpenError> {
        Enumerator::with_comparator(self.root, self.options, self.comparator)
    }

    /// Open and push every entry to `callback`.
    ///
    /// # Errors
    ///
    /// Only the initial open can fail; see [`open`](Self::open).
    pub fn run<F>(self, callback: F) -> Result<RunStats, OpenError>
    where
        F: FnMut(EntryRef<'_>) -> bool,
    {
        Ok(self.open()?.run(callback))
    }
}

// ---------------------------------------------------------------------------
// Built-in comparators
// ---------------------------------------------------------------------------

/// Orders siblings by file name, byte-wise on Unix.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByName;

impl Comparator for ByName {
    fn compare(&self, a: &Sibling<'_>, b: &Sibling<'_>) -> Ordering {
        compare_file_names(a.file_name(), b.file_name())
    }
}

/// Orders directories before everything else, then by file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirsFirst;

impl Comparator for DirsFirst {
    fn compare(&self, a: &Sibling<'_>, b: &Sibling<'_>) -> Ordering {
        let (a_dir, b_dir) = (a.file_type().is_dir(), b.file_type().is_dir());
        b_dir
            .cmp(&a_dir)
            .then_with(|| compare_file_names(a.file_name(), b.file_name()))
    }
}

fn compare_file_names(left: &OsStr, right: &OsStr) -> Ordering {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        left.as_bytes().cmp(right.as_bytes())
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        left.encode_wide().cmp(right.encode_wide())
    }

    #[cfg(not(any(unix, windows)))]
    {
        left.to_string_lossy().cmp(&right.to_string_lossy())
    }
}
