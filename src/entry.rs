use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::EntryError;
use crate::raw::RawRecord;

// ---------------------------------------------------------------------------
// EntryType / EntryLevel
// ---------------------------------------------------------------------------

/// What a visited object is.
///
/// Objects that failed to open or stat keep the type they would have had
/// without the failure; the failure itself is in [`Entry::error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// A directory, reported before its contents.
    Directory,

    /// A directory, reported after its contents.
    DirectoryPostOrder,

    /// A regular file.
    RegularFile,

    /// A symbolic link that was not walked as its target.
    Symlink,

    /// Anything else: devices, pipes, sockets, `.` and `..`, unstat-able objects.
    Unknown,
}

/// Position of an entry in the tree.
///
/// Two sentinel levels exist: [`ROOT_PARENT`](Self::ROOT_PARENT) for the
/// synthetic parent of the walk root, and [`ROOT`](Self::ROOT) for the root
/// itself. Descendants count up from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryLevel(i32);

impl EntryLevel {
    pub const ROOT_PARENT: Self = Self(-1);
    pub const ROOT: Self = Self(0);

    pub(crate) fn from_depth(depth: usize) -> Self {
        Self(i32::try_from(depth).unwrap_or(i32::MAX))
    }

    pub fn get(self) -> i32 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

// ---------------------------------------------------------------------------
// Stat
// ---------------------------------------------------------------------------

/// The stat fields captured for an entry.
///
/// Only present when metadata fetching is enabled and the stat call
/// succeeded. Fields a platform cannot provide are zero or `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    pub device:   u64,
    pub inode:    u64,
    pub mode:     u32,
    pub uid:      u32,
    pub gid:      u32,
    pub size:     u64,
    pub accessed: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub changed:  Option<SystemTime>,
    pub created:  Option<SystemTime>,
}

impl Stat {
    #[cfg(unix)]
    pub(crate) fn from_metadata(m: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            device:   m.dev(),
            inode:    m.ino(),
            mode:     m.mode(),
            uid:      m.uid(),
            gid:      m.gid(),
            size:     m.len(),
            accessed: m.accessed().ok(),
            modified: m.modified().ok(),
            changed:  unix_time(m.ctime(), m.ctime_nsec()),
            created:  m.created().ok(),
        }
    }

    #[cfg(not(unix))]
    pub(crate) fn from_metadata(m: &fs::Metadata) -> Self {
        Self {
            size:     m.len(),
            accessed: m.accessed().ok(),
            modified: m.modified().ok(),
            created:  m.created().ok(),
            ..Self::default()
        }
    }
}

#[cfg(unix)]
fn unix_time(secs: i64, nsecs: i64) -> Option<SystemTime> {
    use std::time::{Duration, UNIX_EPOCH};

    let nanos = u32::try_from(nsecs).ok()?;
    if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::new(secs.unsigned_abs(), nanos))
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(secs.unsigned_abs()))?
            .checked_add(Duration::from_nanos(u64::from(nanos)))
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// An owned, immutable snapshot of one visited object.
///
/// Produced by [`EntryRef::to_entry`]. Cloning is a reference-count bump,
/// and a snapshot stays valid after the walk has moved on or finished.
/// The parent chain is held strongly, so a snapshot keeps every ancestor
/// snapshot alive up to the synthetic root parent.
#[derive(Clone)]
pub struct Entry(Arc<Snapshot>);

struct Snapshot {
    parent:     Option<Entry>,
    cycle:      Option<Entry>,
    path:       PathBuf,
    name:       Option<OsString>,
    error:      Option<EntryError>,
    level:      EntryLevel,
    entry_type: EntryType,
    stat:       Option<Stat>,
}

impl Entry {
    /// The synthetic parent of the walk root.
    pub(crate) fn root_parent(root: &Path) -> Self {
        let path = root.parent().unwrap_or(root).to_path_buf();
        Self(Arc::new(Snapshot {
            parent:     None,
            cycle:      None,
            name:       path.file_name().map(OsStr::to_os_string),
            path,
            error:      None,
            level:      EntryLevel::ROOT_PARENT,
            entry_type: EntryType::Directory,
            stat:       None,
        }))
    }

    /// The parent directory's snapshot. `None` only for the root parent.
    pub fn parent(&self) -> Option<&Entry> {
        self.0.parent.as_ref()
    }

    /// For a symlink that loops back into the open path, the ancestor it
    /// points at.
    pub fn cycle(&self) -> Option<&Entry> {
        self.0.cycle.as_ref()
    }

    /// Absolute path of the object.
    pub fn path(&self) -> &Path {
        &self.0.path
    }

    /// Final path component.
    pub fn name(&self) -> Option<&OsStr> {
        self.0.name.as_deref()
    }

    pub fn error(&self) -> Option<&EntryError> {
        self.0.error.as_ref()
    }

    pub fn level(&self) -> EntryLevel {
        self.0.level
    }

    pub fn entry_type(&self) -> EntryType {
        self.0.entry_type
    }

    /// Captured stat fields, if any were fetched.
    pub fn stat(&self) -> Option<&Stat> {
        self.0.stat.as_ref()
    }

    // ── Stat shorthands (zero / None without metadata) ────────────────────

    pub fn device(&self) -> u64 {
        self.stat().map_or(0, |s| s.device)
    }

    pub fn inode(&self) -> u64 {
        self.stat().map_or(0, |s| s.inode)
    }

    pub fn mode(&self) -> u32 {
        self.stat().map_or(0, |s| s.mode)
    }

    pub fn uid(&self) -> u32 {
        self.stat().map_or(0, |s| s.uid)
    }

    pub fn gid(&self) -> u32 {
        self.stat().map_or(0, |s| s.gid)
    }

    pub fn size(&self) -> u64 {
        self.stat().map_or(0, |s| s.size)
    }

    pub fn accessed(&self) -> Option<SystemTime> {
        self.stat().and_then(|s| s.accessed)
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.stat().and_then(|s| s.modified)
    }

    pub fn changed(&self) -> Option<SystemTime> {
        self.stat().and_then(|s| s.changed)
    }

    pub fn created(&self) -> Option<SystemTime> {
        self.stat().and_then(|s| s.created)
    }

    /// Whether both handles point at the same snapshot.
    pub fn same_as(&self, other: &Entry) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("path", &self.0.path)
            .field("type", &self.0.entry_type)
            .field("level", &self.0.level)
            .field("error", &self.0.error)
            .field("cycle", &self.0.cycle.as_ref().map(Entry::path))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EntryRef
// ---------------------------------------------------------------------------

/// The live entry for the current walk step.
///
/// Borrows the enumerator's cursor, so it cannot be held across the next
/// step. Call [`to_entry`](EntryRef::to_entry) to keep it.
#[derive(Clone, Copy)]
pub struct EntryRef<'w> {
    pub(crate) record:     &'w RawRecord,
    pub(crate) parent:     Option<&'w Entry>,
    pub(crate) cycle:      Option<&'w Entry>,
    pub(crate) own:        Option<&'w Entry>,
    pub(crate) entry_type: EntryType,
    pub(crate) error:      Option<&'w EntryError>,
}

impl<'w> EntryRef<'w> {
    pub fn parent(&self) -> Option<&'w Entry> {
        self.parent
    }

    pub fn cycle(&self) -> Option<&'w Entry> {
        self.cycle
    }

    pub fn path(&self) -> &'w Path {
        self.record.path()
    }

    pub fn name(&self) -> Option<&'w OsStr> {
        self.record.name()
    }

    pub fn error(&self) -> Option<&'w EntryError> {
        self.error
    }

    pub fn level(&self) -> EntryLevel {
        EntryLevel::from_depth(self.record.depth())
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn stat(&self) -> Option<Stat> {
        self.record.metadata().map(Stat::from_metadata)
    }

    /// The raw record underneath this entry.
    pub fn raw(&self) -> &'w RawRecord {
        self.record
    }

    /// Copy the live entry into an independent snapshot.
    ///
    /// A directory reported in pre-order already has a snapshot serving as
    /// its children's parent; that one is shared rather than duplicated.
    pub fn to_entry(&self) -> Entry {
        if let Some(own) = self.own {
            return own.clone();
        }
        Entry(Arc::new(Snapshot {
            parent:     self.parent.cloned(),
            cycle:      self.cycle.cloned(),
            path:       self.record.path().to_path_buf(),
            name:       self.record.name().map(OsStr::to_os_string),
            error:      self.error.cloned(),
            level:      self.level(),
            entry_type: self.entry_type,
            stat:       self.stat(),
        }))
    }
}

impl fmt::Debug for EntryRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryRef")
            .field("path", &self.record.path())
            .field("type", &self.entry_type)
            .field("level", &self.level())
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_around_root() {
        assert!(EntryLevel::ROOT_PARENT < EntryLevel::ROOT);
        assert!(EntryLevel::ROOT < EntryLevel::from_depth(1));
        assert_eq!(EntryLevel::from_depth(0), EntryLevel::ROOT);
        assert_eq!(EntryLevel::ROOT_PARENT.get(), -1);
    }

    #[test]
    fn root_parent_is_the_containing_directory() {
        let rp = Entry::root_parent(Path::new("/srv/data"));
        assert_eq!(rp.path(), Path::new("/srv"));
        assert_eq!(rp.level(), EntryLevel::ROOT_PARENT);
        assert!(rp.parent().is_none());
        assert_eq!(rp.size(), 0);
        assert!(rp.modified().is_none());

        let top = Entry::root_parent(Path::new("/"));
        assert_eq!(top.path(), Path::new("/"));
    }

    #[cfg(unix)]
    #[test]
    fn unix_time_handles_both_sides_of_epoch() {
        use std::time::{Duration, UNIX_EPOCH};

        assert_eq!(unix_time(10, 5), Some(UNIX_EPOCH + Duration::new(10, 5)));
        assert_eq!(
            unix_time(-2, 500),
            Some(UNIX_EPOCH - Duration::from_secs(2) + Duration::from_nanos(500))
        );
        assert_eq!(unix_time(0, -1), None);
    }
}
