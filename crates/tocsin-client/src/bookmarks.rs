//! Room bookmark list.
//!
//! Insertion-ordered set of rooms the user has joined before, offered for
//! quick re-join. Survives leaving; only an explicit forget removes an entry.

use tocsin_proto::RoomCode;

/// Maximum number of bookmarks kept.
pub const MAX_BOOKMARKS: usize = 16;

/// Bounded, insertion-ordered, duplicate-free list of room codes.
///
/// # Invariants
///
/// - No code appears twice
/// - At most [`MAX_BOOKMARKS`] entries; adding past the cap evicts the oldest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkList {
    codes: Vec<RoomCode>,
}

impl BookmarkList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored codes, oldest first.
    ///
    /// Duplicates keep their first position. If more than [`MAX_BOOKMARKS`]
    /// remain, the newest are kept.
    pub fn from_codes(codes: impl IntoIterator<Item = RoomCode>) -> Self {
        let mut list = Self::new();
        for code in codes {
            list.add(code);
        }
        list
    }

    /// Add a code on first association.
    ///
    /// Returns `false` (and keeps the existing position) if the code is
    /// already bookmarked.
    pub fn add(&mut self, code: RoomCode) -> bool {
        if self.contains(&code) {
            return false;
        }

        if self.codes.len() >= MAX_BOOKMARKS {
            self.codes.remove(0);
        }
        self.codes.push(code);
        true
    }

    /// Remove a code. Returns `false` if it was not bookmarked.
    pub fn remove(&mut self, code: &RoomCode) -> bool {
        let before = self.codes.len();
        self.codes.retain(|c| c != code);
        self.codes.len() != before
    }

    /// Check if a code is bookmarked.
    pub fn contains(&self, code: &RoomCode) -> bool {
        self.codes.contains(code)
    }

    /// Bookmarks, oldest first.
    pub fn as_slice(&self) -> &[RoomCode] {
        &self.codes
    }

    /// Number of bookmarks.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s).unwrap()
    }

    #[test]
    fn add_keeps_first_position() {
        let mut list = BookmarkList::new();
        assert!(list.add(code("11111")));
        assert!(list.add(code("22222")));
        assert!(!list.add(code("11111")));

        assert_eq!(list.as_slice(), &[code("11111"), code("22222")]);
    }

    #[test]
    fn remove_reports_presence() {
        let mut list = BookmarkList::from_codes([code("11111"), code("22222")]);
        assert!(list.remove(&code("11111")));
        assert!(!list.remove(&code("11111")));
        assert_eq!(list.as_slice(), &[code("22222")]);
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut list = BookmarkList::new();
        for n in 0..MAX_BOOKMARKS as u32 {
            list.add(RoomCode::numeric(10_000 + n));
        }
        list.add(code("99999"));

        assert_eq!(list.len(), MAX_BOOKMARKS);
        assert!(!list.contains(&RoomCode::numeric(10_000)));
        assert!(list.contains(&RoomCode::numeric(10_001)));
        assert_eq!(list.as_slice().last(), Some(&code("99999")));
    }

    proptest! {
        #[test]
        fn never_duplicates_or_exceeds_cap(ns in prop::collection::vec(10_000u32..10_040, 0..80)) {
            let list = BookmarkList::from_codes(ns.into_iter().map(RoomCode::numeric));

            prop_assert!(list.len() <= MAX_BOOKMARKS);
            let mut seen = std::collections::HashSet::new();
            for c in list.as_slice() {
                prop_assert!(seen.insert(c.clone()));
            }
        }
    }
}
