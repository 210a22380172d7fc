//! The raw walk: `walkdir` plus the records it does not produce itself.
//!
//! `walkdir` yields every object once, in pre-order, and reports failures as
//! separate `Err` items. The adapter reshapes that stream into fts-style
//! records: post-order records for every directory it reported, `.`/`..`
//! records on request, unreadable directories folded into the directory's
//! own record, and symlink loops turned into cycle records.

use std::collections::VecDeque;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::entry::EntryType;
use crate::error::{EntryError, OpenError, StepError};
use crate::options::TraversalOptions;
use crate::traits::{Comparator, Sibling};

// ---------------------------------------------------------------------------
// RawKind / RawRecord
// ---------------------------------------------------------------------------

/// Classification of a raw record, one variant per thing the walk can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// A directory about to be walked.
    Directory,

    /// A directory whose contents have all been visited.
    DirectoryPostOrder,

    /// A directory whose contents could not be read.
    Unreadable,

    /// A regular file.
    File,

    /// A symlink reported as a link.
    Symlink,

    /// A symlink whose target does not resolve while following.
    BrokenSymlink,

    /// A symlink pointing back at a directory on the open path.
    Cycle,

    /// `.` or `..`.
    Dot,

    /// An object whose stat failed.
    NoStat,

    /// Any other per-object failure.
    Error,

    /// Devices, pipes, sockets.
    Other,
}

/// One step of the walk, exactly as the adapter produced it.
///
/// Borrowed from the cursor: a `&RawRecord` handed out by the enumerator is
/// only valid until the next step.
#[derive(Debug)]
pub struct RawRecord {
    kind:      RawKind,
    path:      PathBuf,
    depth:     usize,
    file_type: Option<fs::FileType>,
    metadata:  Option<fs::Metadata>,
    error:     Option<EntryError>,
    cycle:     Option<PathBuf>,
    dot:       Option<&'static str>,
    opens:     bool,
}

impl RawRecord {
    fn new(kind: RawKind, path: PathBuf, depth: usize) -> Self {
        Self {
            kind,
            path,
            depth,
            file_type: None,
            metadata:  None,
            error:     None,
            cycle:     None,
            dot:       None,
            opens:     false,
        }
    }

    pub fn kind(&self) -> RawKind {
        self.kind
    }

    /// Absolute path of the object.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component. `Path::file_name` normalizes `.` and `..`
    /// away, so dot records answer from their own name.
    pub fn name(&self) -> Option<&OsStr> {
        match self.dot {
            Some(dot) => Some(OsStr::new(dot)),
            None => self.path.file_name(),
        }
    }

    /// Depth below the root. The root is `0`.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// File type as far as it is known, either from the directory read or
    /// from a stat.
    pub fn file_type(&self) -> Option<fs::FileType> {
        self.file_type
    }

    /// Stat result, present only when metadata fetching is on and the
    /// stat succeeded.
    pub fn metadata(&self) -> Option<&fs::Metadata> {
        self.metadata.as_ref()
    }

    pub fn error(&self) -> Option<&EntryError> {
        self.error.as_ref()
    }

    /// For [`RawKind::Cycle`], the ancestor directory the link points at.
    pub fn cycle_ancestor(&self) -> Option<&Path> {
        self.cycle.as_deref()
    }

    /// Whether this record starts a directory that will later be closed by
    /// a [`RawKind::DirectoryPostOrder`] record.
    pub fn opens_directory(&self) -> bool {
        self.opens
    }

    /// The entry type this record maps to.
    pub fn entry_type(&self) -> EntryType {
        match self.kind {
            RawKind::Directory | RawKind::Unreadable => EntryType::Directory,
            RawKind::DirectoryPostOrder => EntryType::DirectoryPostOrder,
            RawKind::File => EntryType::RegularFile,
            RawKind::Symlink | RawKind::BrokenSymlink | RawKind::Cycle => EntryType::Symlink,
            RawKind::Dot | RawKind::Other => EntryType::Unknown,
            RawKind::NoStat | RawKind::Error => type_hint(self.file_type),
        }
    }

    /// A record for a step that failed without naming its object.
    pub(crate) fn step_failure(path: PathBuf, err: StepError) -> Self {
        let mut record = Self::new(RawKind::Error, path.clone(), err.depth);
        record.error = Some(EntryError::walk(path, err.source));
        record
    }
}

fn type_hint(file_type: Option<fs::FileType>) -> EntryType {
    match file_type {
        Some(ft) if ft.is_dir() => EntryType::Directory,
        Some(ft) if ft.is_file() => EntryType::RegularFile,
        Some(ft) if ft.is_symlink() => EntryType::Symlink,
        _ => EntryType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// RawWalk
// ---------------------------------------------------------------------------

/// A directory reported by the walk and not yet closed.
struct OpenDir {
    path:      PathBuf,
    depth:     usize,
    file_type: Option<fs::FileType>,
    metadata:  Option<fs::Metadata>,
    error:     Option<EntryError>,
}

/// Owns the `walkdir` cursor and turns its items into [`RawRecord`]s.
pub(crate) struct RawWalk {
    root:        PathBuf,
    options:     TraversalOptions,
    inner:       walkdir::IntoIter,
    lookahead:   Option<walkdir::Result<DirEntry>>,
    open:        Vec<OpenDir>,
    pending:     VecDeque<RawRecord>,
    current:     Option<RawRecord>,
    root_device: Option<u64>,
    finished:    bool,
}

impl RawWalk {
    /// Resolve and stat the root, then configure the walker.
    pub(crate) fn open(
        root: &Path,
        options: TraversalOptions,
        comparator: Option<Arc<dyn Comparator>>,
    ) -> Result<Self, OpenError> {
        let root = absolutize(root)?;

        let probe = if options.follows_root() {
            fs::metadata(&root)
        } else {
            fs::symlink_metadata(&root)
        };
        let root_meta = probe.map_err(|e| OpenError::from_io(root.clone(), e))?;

        let mut walk = WalkDir::new(&root)
            .follow_links(options.follow_all_symlinks)
            .follow_root_links(options.follows_root())
            .same_file_system(!options.cross_devices);

        if let Some(cmp) = comparator {
            walk = walk.sort_by(move |a, b| cmp.compare(&Sibling(a), &Sibling(b)));
        }

        let root_device = if options.cross_devices {
            None
        } else {
            device_of(&root_meta)
        };

        debug!(root = %root.display(), ?options, "opened walk");

        Ok(Self {
            root,
            options,
            inner: walk.into_iter(),
            lookahead: None,
            open: Vec::new(),
            pending: VecDeque::new(),
            current: None,
            root_device,
            finished: false,
        })
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// The record produced by the last successful [`advance`](Self::advance).
    pub(crate) fn current(&self) -> Option<&RawRecord> {
        self.current.as_ref()
    }

    /// Path of the innermost directory still open, or the root.
    pub(crate) fn open_path(&self) -> &Path {
        self.open.last().map_or(self.root.as_path(), |d| d.path.as_path())
    }

    /// Step to the next record. `Ok(None)` is the end of the walk.
    pub(crate) fn advance(&mut self) -> Result<Option<&RawRecord>, StepError> {
        self.current = None;

        loop {
            if let Some(record) = self.pending.pop_front() {
                return Ok(Some(&*self.current.insert(record)));
            }
            if self.finished {
                return Ok(None);
            }

            let item = match self.lookahead.take() {
                Some(item) => Some(item),
                None => self.inner.next(),
            };

            let Some(item) = item else {
                self.close_dirs(0);
                self.finished = true;
                debug!(root = %self.root.display(), "walk finished");
                continue;
            };

            // Every directory at or below this depth is done.
            let depth = match &item {
                Ok(dent) => dent.depth(),
                Err(err) => err.depth(),
            };
            if self.close_dirs(depth) {
                self.lookahead = Some(item);
                continue;
            }

            match item {
                Ok(dent) => self.visit(dent),
                Err(err) => self.visit_error(err)?,
            }
        }
    }

    /// Queue post-order records for open directories at `depth` or deeper.
    fn close_dirs(&mut self, depth: usize) -> bool {
        let mut closed = false;
        while self.open.last().is_some_and(|d| d.depth >= depth) {
            let Some(dir) = self.open.pop() else { break };
            trace!(path = %dir.path.display(), "leaving directory");

            let mut record = RawRecord::new(RawKind::DirectoryPostOrder, dir.path, dir.depth);
            record.file_type = dir.file_type;
            record.metadata = dir.metadata;
            record.error = dir.error;
            self.pending.push_back(record);
            closed = true;
        }
        closed
    }

    fn visit(&mut self, dent: DirEntry) {
        let depth = dent.depth();
        let path = dent.path().to_path_buf();
        let mut file_type = dent.file_type();
        let mut metadata = None;
        let mut stat_error = None;

        if depth == 0 && file_type.is_symlink() && self.options.follows_root() {
            // walkdir descends through a followed root but still reports it
            // as a link unless every link is followed.
            match fs::metadata(&path) {
                Ok(md) => {
                    file_type = md.file_type();
                    if self.options.fetch_metadata {
                        metadata = Some(md);
                    }
                }
                Err(e) => {
                    let mut record = RawRecord::new(RawKind::BrokenSymlink, path.clone(), depth);
                    record.file_type = Some(file_type);
                    record.error = Some(EntryError::broken_symlink(path, e));
                    self.pending.push_back(record);
                    return;
                }
            }
        } else if self.options.fetch_metadata {
            match dent.metadata() {
                Ok(md) => metadata = Some(md),
                Err(e) => stat_error = Some(EntryError::metadata(path.clone(), io::Error::from(e))),
            }
        }

        if file_type.is_dir() {
            self.visit_dir(path, depth, file_type, metadata, stat_error);
            return;
        }

        let kind = if stat_error.is_some() {
            RawKind::NoStat
        } else if file_type.is_file() {
            RawKind::File
        } else if file_type.is_symlink() {
            RawKind::Symlink
        } else {
            RawKind::Other
        };

        let mut record = RawRecord::new(kind, path, depth);
        record.file_type = Some(file_type);
        record.metadata = metadata;
        record.error = stat_error;
        self.pending.push_back(record);
    }

    fn visit_dir(
        &mut self,
        path: PathBuf,
        depth: usize,
        file_type: fs::FileType,
        metadata: Option<fs::Metadata>,
        stat_error: Option<EntryError>,
    ) {
        let descends = self.descends_into(&path, depth);
        let read_error = if descends { self.take_read_error(&path) } else { None };

        let kind = if read_error.is_some() {
            RawKind::Unreadable
        } else if stat_error.is_some() {
            RawKind::NoStat
        } else {
            RawKind::Directory
        };
        // A failed read outranks a failed stat; only one error is kept.
        if let (Some(_), Some(dropped)) = (&read_error, &stat_error) {
            trace!(path = %path.display(), error = %dropped, "stat error superseded by read error");
        }
        let error = read_error.or(stat_error);

        match &error {
            Some(err) => debug!(path = %path.display(), error = %err, "directory not walkable"),
            None => trace!(path = %path.display(), depth, "entering directory"),
        }

        self.open.push(OpenDir {
            path:      path.clone(),
            depth,
            file_type: Some(file_type),
            metadata:  metadata.clone(),
            error:     error.clone(),
        });

        let dots = self.options.include_dot_entries && descends && kind != RawKind::Unreadable;

        let mut record = RawRecord::new(kind, path, depth);
        record.file_type = Some(file_type);
        record.metadata = metadata;
        record.error = error;
        record.opens = true;

        if dots {
            let parent = record.path.clone();
            self.pending.push_back(record);
            for name in [".", ".."] {
                let dot = self.dot_record(&parent, name, depth + 1);
                self.pending.push_back(dot);
            }
        } else {
            self.pending.push_back(record);
        }
    }

    fn dot_record(&self, dir: &Path, name: &'static str, depth: usize) -> RawRecord {
        let mut record = RawRecord::new(RawKind::Dot, dir.join(name), depth);
        record.dot = Some(name);
        match fs::metadata(&record.path) {
            Ok(md) => {
                record.file_type = Some(md.file_type());
                if self.options.fetch_metadata {
                    record.metadata = Some(md);
                }
            }
            Err(e) => record.error = Some(EntryError::metadata(record.path.clone(), e)),
        }
        record
    }

    /// walkdir reports a failed `read_dir` as the item right after the
    /// directory itself. Pull that item and fold it in, or keep it for later.
    fn take_read_error(&mut self, dir: &Path) -> Option<EntryError> {
        match self.inner.next() {
            Some(Err(err)) if err.loop_ancestor().is_none() && err.path() == Some(dir) => {
                Some(EntryError::read_dir(dir.to_path_buf(), io::Error::from(err)))
            }
            other => {
                self.lookahead = other;
                None
            }
        }
    }

    /// Whether walkdir will list this directory's children.
    fn descends_into(&self, path: &Path, depth: usize) -> bool {
        match self.root_device {
            Some(root) if depth > 0 => fs::metadata(path)
                .ok()
                .and_then(|md| device_of(&md))
                .map_or(true, |dev| dev == root),
            _ => true,
        }
    }

    fn visit_error(&mut self, err: walkdir::Error) -> Result<(), StepError> {
        let depth = err.depth();

        if let (Some(ancestor), Some(path)) = (err.loop_ancestor(), err.path()) {
            debug!(
                link = %path.display(),
                ancestor = %ancestor.display(),
                "symlink cycle"
            );

            let mut record = RawRecord::new(RawKind::Cycle, path.to_path_buf(), depth);
            record.cycle = Some(ancestor.to_path_buf());
            match fs::symlink_metadata(path) {
                Ok(md) => {
                    record.file_type = Some(md.file_type());
                    if self.options.fetch_metadata {
                        record.metadata = Some(md);
                    }
                }
                Err(e) => record.error = Some(EntryError::metadata(path.to_path_buf(), e)),
            }
            self.pending.push_back(record);
            return Ok(());
        }

        let Some(path) = err.path().map(Path::to_path_buf) else {
            return Err(StepError { depth, source: io::Error::from(err) });
        };
        let source = io::Error::from(err);
        debug!(path = %path.display(), error = %source, "walk error");

        let record = match fs::symlink_metadata(&path) {
            Ok(md) if md.file_type().is_symlink() => {
                let mut record = RawRecord::new(RawKind::BrokenSymlink, path.clone(), depth);
                record.file_type = Some(md.file_type());
                record.error = Some(EntryError::broken_symlink(path, source));
                record
            }
            Ok(md) => {
                let mut record = RawRecord::new(RawKind::Error, path.clone(), depth);
                record.file_type = Some(md.file_type());
                record.error = Some(EntryError::walk(path, source));
                record
            }
            Err(_) => {
                let mut record = RawRecord::new(RawKind::NoStat, path.clone(), depth);
                record.error = Some(EntryError::metadata(path, source));
                record
            }
        };
        self.pending.push_back(record);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Anchor a relative root at the working directory without resolving links.
fn absolutize(path: &Path) -> Result<PathBuf, OpenError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    if path.as_os_str().is_empty() {
        return Err(OpenError::NotFound(path.to_path_buf()));
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| OpenError::from_io(path.to_path_buf(), e))
}

#[cfg(unix)]
fn device_of(md: &fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(md.dev())
}

#[cfg(not(unix))]
fn device_of(_md: &fs::Metadata) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(walk: &mut RawWalk) -> Vec<(RawKind, PathBuf, usize)> {
        let mut out = Vec::new();
        loop {
            match walk.advance() {
                Ok(Some(r)) => out.push((r.kind(), r.path().to_path_buf(), r.depth())),
                Ok(None) => break,
                Err(e) => panic!("unexpected step error: {e}"),
            }
        }
        out
    }

    fn by_name() -> Option<Arc<dyn Comparator>> {
        Some(Arc::new(crate::ByName))
    }

    #[test]
    fn post_order_records_close_every_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/f"), "x").unwrap();
        fs::write(root.join("z"), "x").unwrap();

        let mut walk = RawWalk::open(root, TraversalOptions::default(), by_name()).unwrap();
        let kinds = drain(&mut walk);

        let expected = vec![
            (RawKind::Directory, root.to_path_buf(), 0),
            (RawKind::Directory, root.join("a"), 1),
            (RawKind::Directory, root.join("a/b"), 2),
            (RawKind::File, root.join("a/b/f"), 3),
            (RawKind::DirectoryPostOrder, root.join("a/b"), 2),
            (RawKind::DirectoryPostOrder, root.join("a"), 1),
            (RawKind::File, root.join("z"), 1),
            (RawKind::DirectoryPostOrder, root.to_path_buf(), 0),
        ];
        assert_eq!(kinds, expected);
        assert!(walk.advance().unwrap().is_none(), "end of walk is sticky");
    }

    #[test]
    fn dot_records_follow_their_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("d")).unwrap();

        let opts = TraversalOptions { include_dot_entries: true, ..Default::default() };
        let mut walk = RawWalk::open(root, opts, by_name()).unwrap();

        let mut names = Vec::new();
        while let Some(r) = walk.advance().unwrap() {
            names.push((r.kind(), r.name().map(|n| n.to_string_lossy().into_owned())));
        }

        let name = |s: &str| Some(s.to_string());
        assert_eq!(names[1], (RawKind::Dot, name(".")));
        assert_eq!(names[2], (RawKind::Dot, name("..")));
        assert_eq!(names[3], (RawKind::Directory, name("d")));
        assert_eq!(names[4], (RawKind::Dot, name(".")));
        assert_eq!(names[5], (RawKind::Dot, name("..")));
        assert_eq!(names.iter().filter(|r| r.0 == RawKind::Dot).count(), 4);
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let cwd = env::current_dir().unwrap();
        let walk = RawWalk::open(Path::new("."), TraversalOptions::default(), None).unwrap();
        assert!(walk.root().is_absolute());
        assert_eq!(walk.root(), cwd.join("."));
    }

    #[test]
    fn missing_root_fails_to_open() {
        let err = RawWalk::open(
            Path::new("/nonexistent/path/for/fsenum"),
            TraversalOptions::default(),
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(err, OpenError::NotFound(_)));
        assert!(matches!(
            RawWalk::open(Path::new(""), TraversalOptions::default(), None),
            Err(OpenError::NotFound(_))
        ));
    }

    #[test]
    fn metadata_fetch_can_be_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("f"), "data").unwrap();

        let opts = TraversalOptions { fetch_metadata: false, ..Default::default() };
        let mut walk = RawWalk::open(tmp.path(), opts, None).unwrap();
        while let Some(record) = walk.advance().unwrap() {
            assert!(record.metadata().is_none());
            assert!(record.error().is_none());
        }
    }
}
