// ---------------------------------------------------------------------------
// DirectoryOrder
// ---------------------------------------------------------------------------

/// When directory entries are reported relative to their contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryOrder {
    /// Report each directory before its contents and again after them.
    #[default]
    Both,

    /// Report each directory once, before its contents.
    PreOnly,

    /// Report each directory once, after its contents.
    PostOnly,
}

impl DirectoryOrder {
    pub(crate) fn emits_pre(self) -> bool {
        matches!(self, Self::Both | Self::PreOnly)
    }

    pub(crate) fn emits_post(self) -> bool {
        matches!(self, Self::Both | Self::PostOnly)
    }
}

// ---------------------------------------------------------------------------
// TraversalOptions
// ---------------------------------------------------------------------------

/// Traversal policy for an [`Enumerator`](crate::Enumerator).
///
/// The default combination matches what an fts-style walker does when given
/// no flags: metadata is fetched, device boundaries are crossed, symlinks
/// are reported as links, and directories are reported in both orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOptions {
    /// Dereference the root path if it is a symlink.
    pub follow_root_symlink: bool,

    /// Performance hint carried for compatibility with the flag layout.
    /// Has no observable effect on the produced entries.
    pub change_directories: bool,

    /// Stat every visited object and fill the entry's metadata fields.
    pub fetch_metadata: bool,

    /// Dereference every symlink and walk it as its target.
    pub follow_all_symlinks: bool,

    /// Report `.` and `..` as the first children of every directory.
    pub include_dot_entries: bool,

    /// Descend into directories that live on a different device than the root.
    pub cross_devices: bool,

    /// Pre-order, post-order, or both.
    pub directory_order: DirectoryOrder,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            follow_root_symlink: false,
            change_directories:  true,
            fetch_metadata:      true,
            follow_all_symlinks: false,
            include_dot_entries: false,
            cross_devices:       true,
            directory_order:     DirectoryOrder::Both,
        }
    }
}

// ── Legacy flag layout ────────────────────────────────────────────────────

const FOLLOW_ROOT_SYMLINK: u32 = 1 << 0;
const CHANGE_DIRECTORIES:  u32 = 1 << 1;
const FETCH_METADATA:      u32 = 1 << 2;
const FOLLOW_ALL_SYMLINKS: u32 = 1 << 3;
const INCLUDE_DOT_ENTRIES: u32 = 1 << 4;
const CROSS_DEVICES:       u32 = 1 << 5;

const ORDER_SHIFT: u32 = 8;
const ORDER_MASK:  u32 = 3 << ORDER_SHIFT;

const KNOWN_BITS: u32 = FOLLOW_ROOT_SYMLINK
    | CHANGE_DIRECTORIES
    | FETCH_METADATA
    | FOLLOW_ALL_SYMLINKS
    | INCLUDE_DOT_ENTRIES
    | CROSS_DEVICES
    | ORDER_MASK;

impl TraversalOptions {
    /// Bit value of [`TraversalOptions::default()`].
    pub const DEFAULT_BITS: u32 = CHANGE_DIRECTORIES | FETCH_METADATA | CROSS_DEVICES;

    /// Decode the packed flag layout.
    ///
    /// Bits 0 to 5 are the boolean options in declaration order (follow
    /// root symlink, change directories, fetch metadata, follow all
    /// symlinks, dot entries, cross devices). Bits 8 and 9 select the
    /// directory order: `0` both, `1` pre-order only, `2` post-order only.
    ///
    /// Returns `None` for unknown bits or the unused order value `3`.
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits & !KNOWN_BITS != 0 {
            return None;
        }

        let directory_order = match (bits & ORDER_MASK) >> ORDER_SHIFT {
            0 => DirectoryOrder::Both,
            1 => DirectoryOrder::PreOnly,
            2 => DirectoryOrder::PostOnly,
            _ => return None,
        };

        Some(Self {
            follow_root_symlink: bits & FOLLOW_ROOT_SYMLINK != 0,
            change_directories:  bits & CHANGE_DIRECTORIES != 0,
            fetch_metadata:      bits & FETCH_METADATA != 0,
            follow_all_symlinks: bits & FOLLOW_ALL_SYMLINKS != 0,
            include_dot_entries: bits & INCLUDE_DOT_ENTRIES != 0,
            cross_devices:       bits & CROSS_DEVICES != 0,
            directory_order,
        })
    }

    /// Encode into the packed flag layout. Inverse of [`from_bits`](Self::from_bits).
    pub fn bits(&self) -> u32 {
        let flag = |on: bool, bit: u32| if on { bit } else { 0 };
        let order = match self.directory_order {
            DirectoryOrder::Both     => 0,
            DirectoryOrder::PreOnly  => 1,
            DirectoryOrder::PostOnly => 2,
        };

        flag(self.follow_root_symlink, FOLLOW_ROOT_SYMLINK)
            | flag(self.change_directories, CHANGE_DIRECTORIES)
            | flag(self.fetch_metadata, FETCH_METADATA)
            | flag(self.follow_all_symlinks, FOLLOW_ALL_SYMLINKS)
            | flag(self.include_dot_entries, INCLUDE_DOT_ENTRIES)
            | flag(self.cross_devices, CROSS_DEVICES)
            | (order << ORDER_SHIFT)
    }

    /// Whether the root itself is dereferenced when it is a symlink.
    pub(crate) fn follows_root(&self) -> bool {
        self.follow_root_symlink || self.follow_all_symlinks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_default_bits() {
        assert_eq!(TraversalOptions::default().bits(), TraversalOptions::DEFAULT_BITS);
        assert_eq!(
            TraversalOptions::from_bits(TraversalOptions::DEFAULT_BITS),
            Some(TraversalOptions::default())
        );
    }

    #[test]
    fn directory_order_bits() {
        let pre = TraversalOptions::from_bits(1 << 8).unwrap();
        assert_eq!(pre.directory_order, DirectoryOrder::PreOnly);
        assert!(!pre.fetch_metadata);

        let post = TraversalOptions::from_bits(FETCH_METADATA | (2 << 8)).unwrap();
        assert_eq!(post.directory_order, DirectoryOrder::PostOnly);
        assert!(post.fetch_metadata);

        assert!(TraversalOptions::from_bits(3 << 8).is_none());
    }

    #[test]
    fn unknown_bits_are_rejected() {
        assert!(TraversalOptions::from_bits(1 << 6).is_none());
        assert!(TraversalOptions::from_bits(1 << 31).is_none());
    }

    #[test]
    fn follow_all_implies_following_root() {
        let opts = TraversalOptions { follow_all_symlinks: true, ..Default::default() };
        assert!(opts.follows_root());
        assert!(!TraversalOptions::default().follows_root());
    }
}
