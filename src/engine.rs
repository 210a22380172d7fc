use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::entry::{Entry, EntryRef};
use crate::error::OpenError;
use crate::options::{DirectoryOrder, TraversalOptions};
use crate::raw::{RawKind, RawRecord, RawWalk};
use crate::results::RunStats;
use crate::traits::Comparator;

// ---------------------------------------------------------------------------
// Emit
// ---------------------------------------------------------------------------

/// What a step decided to hand out. Indexes point into the parent stack as
/// it stands right after the step.
#[derive(Debug, Clone, Copy)]
struct Emit {
    parent:     Option<usize>,
    cycle:      Option<usize>,
    own:        Option<usize>,
    keep_error: bool,
}

// ---------------------------------------------------------------------------
// Enumerator
// ---------------------------------------------------------------------------

/// A single walk over one root, consumed by pushing or pulling.
///
/// Every consumption method (`run`, `run_raw`, `next`, `next_raw`) advances
/// the same cursor, so they can be mixed freely: an entry taken by `next`
/// is not seen again by a later `run`.
///
/// # Example
///
/// ```rust,no_run
/// use fsenum::{Enumerator, EntryType, TraversalOptions};
///
/// let mut walk = Enumerator::open("/var/log", TraversalOptions::default())?;
/// let mut unreadable = Vec::new();
/// while let Some(entry) = walk.next() {
///     if entry.error().is_some() {
///         unreadable.push(entry.to_entry());
///     }
/// }
/// # Ok::<(), fsenum::OpenError>(())
/// ```
pub struct Enumerator {
    root:    PathBuf,
    options: TraversalOptions,
    walk:    Option<RawWalk>,
    stack:   Vec<Entry>,
    failed:  Option<RawRecord>,
}

impl Enumerator {
    /// Open a walk over `root` in native directory order.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError`] if the root cannot be resolved or stat-ed.
    pub fn open(root: impl AsRef<Path>, options: TraversalOptions) -> Result<Self, OpenError> {
        Self::with_comparator(root, options, None)
    }

    /// Open a walk over the whole filesystem, rooted at `/`.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError`] if `/` cannot be stat-ed.
    pub fn root_directory(options: TraversalOptions) -> Result<Self, OpenError> {
        Self::open(Path::new("/"), options)
    }

    pub(crate) fn with_comparator(
        root: impl AsRef<Path>,
        options: TraversalOptions,
        comparator: Option<Arc<dyn Comparator>>,
    ) -> Result<Self, OpenError> {
        let walk = RawWalk::open(root.as_ref(), options, comparator)?;
        let root = walk.root().to_path_buf();
        let stack = vec![Entry::root_parent(&root)];

        Ok(Self {
            root,
            options,
            walk: Some(walk),
            stack,
            failed: None,
        })
    }

    /// Absolute root of the walk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// Whether the walk has reached its end and released the cursor.
    pub fn is_finished(&self) -> bool {
        self.walk.is_none()
    }

    // ── Pull ──────────────────────────────────────────────────────────────

    /// The next entry, or `None` at the end of the walk.
    ///
    /// The entry is live: copy it with [`EntryRef::to_entry`] to keep it
    /// past the next call.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<EntryRef<'_>> {
        let emit = self.step()?;
        self.view(emit)
    }

    /// The next raw record, under the same directory-order policy as
    /// [`next`](Self::next).
    pub fn next_raw(&mut self) -> Option<&RawRecord> {
        self.step()?;
        self.record()
    }

    // ── Push ──────────────────────────────────────────────────────────────

    /// Feed entries to `callback` until the walk ends or the callback
    /// returns `false`. Nothing further is read from disk after a `false`.
    pub fn run<F>(&mut self, mut callback: F) -> RunStats
    where
        F: FnMut(EntryRef<'_>) -> bool,
    {
        let start = Instant::now();
        let mut stats = RunStats::default();

        while let Some(emit) = self.step() {
            let Some(entry) = self.view(emit) else { break };
            stats.count(entry.entry_type(), entry.error().is_some(), entry.cycle().is_some());
            if !callback(entry) {
                debug!(root = %self.root.display(), "enumeration halted by callback");
                stats.halted = true;
                break;
            }
        }

        stats.finish(start.elapsed())
    }

    /// [`run`](Self::run) over raw records.
    pub fn run_raw<F>(&mut self, mut callback: F) -> RunStats
    where
        F: FnMut(&RawRecord) -> bool,
    {
        let start = Instant::now();
        let mut stats = RunStats::default();

        while self.step().is_some() {
            let Some(record) = self.record() else { break };
            stats.count(
                record.entry_type(),
                record.error().is_some(),
                record.kind() == RawKind::Cycle,
            );
            if !callback(record) {
                debug!(root = %self.root.display(), "raw enumeration halted by callback");
                stats.halted = true;
                break;
            }
        }

        stats.finish(start.elapsed())
    }

    /// Turn the walk into an iterator of owned snapshots.
    pub fn snapshots(self) -> Snapshots {
        Snapshots(self)
    }

    // ── Step ──────────────────────────────────────────────────────────────

    /// Advance to the next record the policy lets through and maintain the
    /// parent stack. Shared by every consumption mode.
    fn step(&mut self) -> Option<Emit> {
        let order = self.options.directory_order;

        loop {
            self.failed = None;
            let walk = self.walk.as_mut()?;

            let record = match walk.advance() {
                Ok(Some(record)) => record,
                Ok(None) => {
                    debug!(root = %self.root.display(), "enumeration complete");
                    self.walk = None;
                    return None;
                }
                Err(err) => {
                    let path = walk.open_path().to_path_buf();
                    warn!(path = %path.display(), error = %err, "walk step failed");
                    self.failed = Some(RawRecord::step_failure(path, err));
                    return Some(Emit {
                        parent:     self.stack.len().checked_sub(1),
                        cycle:      None,
                        own:        None,
                        keep_error: true,
                    });
                }
            };

            if record.kind() == RawKind::DirectoryPostOrder {
                self.stack.pop();
                // The root is reported once: pre-order unless only post-order is wanted.
                let wanted = order.emits_post() && (!order.emits_pre() || record.depth() > 0);
                if !wanted {
                    trace!(path = %record.path().display(), "post-order suppressed");
                    continue;
                }
                // Under `Both` the pre-order entry already carried any error.
                return Some(Emit {
                    parent:     self.stack.len().checked_sub(1),
                    cycle:      None,
                    own:        None,
                    keep_error: order == DirectoryOrder::PostOnly,
                });
            }

            if record.opens_directory() {
                let snapshot = snapshot(record, self.stack.last());
                self.stack.push(snapshot);
                if !order.emits_pre() {
                    trace!(path = %record.path().display(), "pre-order suppressed");
                    continue;
                }
                let own = self.stack.len() - 1;
                return Some(Emit {
                    parent:     own.checked_sub(1),
                    cycle:      None,
                    own:        Some(own),
                    keep_error: true,
                });
            }

            let cycle = record
                .cycle_ancestor()
                .and_then(|ancestor| self.stack.iter().rposition(|e| e.path() == ancestor));

            return Some(Emit {
                parent: self.stack.len().checked_sub(1),
                cycle,
                own: None,
                keep_error: true,
            });
        }
    }

    /// The record behind the last step.
    fn record(&self) -> Option<&RawRecord> {
        self.failed
            .as_ref()
            .or_else(|| self.walk.as_ref().and_then(RawWalk::current))
    }

    fn view(&self, emit: Emit) -> Option<EntryRef<'_>> {
        let record = self.record()?;
        Some(EntryRef {
            record,
            parent:     emit.parent.and_then(|i| self.stack.get(i)),
            cycle:      emit.cycle.and_then(|i| self.stack.get(i)),
            own:        emit.own.and_then(|i| self.stack.get(i)),
            entry_type: record.entry_type(),
            error:      if emit.keep_error { record.error() } else { None },
        })
    }
}

/// Snapshot a directory as it is opened, for use as its children's parent.
fn snapshot(record: &RawRecord, parent: Option<&Entry>) -> Entry {
    EntryRef {
        record,
        parent,
        cycle: None,
        own: None,
        entry_type: record.entry_type(),
        error: record.error(),
    }
    .to_entry()
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Iterator of owned entries, created by [`Enumerator::snapshots`].
pub struct Snapshots(Enumerator);

impl Iterator for Snapshots {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        self.0.next().map(|entry| entry.to_entry())
    }
}
