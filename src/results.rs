use std::time::Duration;

use crate::entry::EntryType;

/// Counters for one [`run`](crate::Enumerator::run) or
/// [`run_raw`](crate::Enumerator::run_raw) call.
///
/// Only entries actually handed to the callback are counted; records
/// suppressed by the directory-order policy are not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Entries passed to the callback, including the one that stopped the run.
    pub entries: usize,

    /// Regular files.
    pub files: usize,

    /// Directory entries, pre-order and post-order alike.
    pub dirs: usize,

    /// Symlinks, cycles included.
    pub symlinks: usize,

    /// Entries that carried an error.
    pub errors: usize,

    /// Symlinks that pointed back at an open ancestor.
    pub cycles: usize,

    /// Whether the callback stopped the run before the walk ended.
    pub halted: bool,

    /// Wall-clock time spent in the call.
    pub duration: Duration,

    /// `entries / duration`, clamped to 0 on zero-duration runs.
    pub entries_per_sec: usize,
}

impl RunStats {
    pub(crate) fn count(&mut self, entry_type: EntryType, error: bool, cycle: bool) {
        self.entries += 1;
        match entry_type {
            EntryType::RegularFile => self.files += 1,
            EntryType::Directory | EntryType::DirectoryPostOrder => self.dirs += 1,
            EntryType::Symlink => self.symlinks += 1,
            EntryType::Unknown => {}
        }
        if error {
            self.errors += 1;
        }
        if cycle {
            self.cycles += 1;
        }
    }

    pub(crate) fn finish(mut self, duration: Duration) -> Self {
        let secs = duration.as_secs_f64();
        self.entries_per_sec = if secs > 0.0 {
            (self.entries as f64 / secs) as usize
        } else {
            0
        };
        self.duration = duration;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_classifies_entries() {
        let mut stats = RunStats::default();
        stats.count(EntryType::Directory, false, false);
        stats.count(EntryType::RegularFile, true, false);
        stats.count(EntryType::Symlink, false, true);
        stats.count(EntryType::DirectoryPostOrder, false, false);
        stats.count(EntryType::Unknown, false, false);

        assert_eq!(stats.entries, 5);
        assert_eq!(stats.dirs, 2);
        assert_eq!(stats.files, 1);
        assert_eq!(stats.symlinks, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.cycles, 1);
    }

    #[test]
    fn zero_duration_has_zero_rate() {
        let mut stats = RunStats::default();
        stats.count(EntryType::RegularFile, false, false);
        let stats = stats.finish(Duration::ZERO);
        assert_eq!(stats.entries_per_sec, 0);

        let mut stats = RunStats::default();
        stats.count(EntryType::RegularFile, false, false);
        stats.count(EntryType::RegularFile, false, false);
        let stats = stats.finish(Duration::from_secs(1));
        assert_eq!(stats.entries_per_sec, 2);
    }
}
