//! Regroup flat line entries into per-hunk runs

/// Anything that remembers which hunk it came from
pub trait HunkTagged {
    fn hunk_index(&self) -> usize;
}

/// A contiguous run of entries from one hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkGroup<'a, T> {
    pub hunk_index: usize,
    pub entries: &'a [T],
}

impl<T> HunkGroup<'_, T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `entries` at every change of hunk index.
///
/// Order is preserved and runs are never merged: two separate runs tagged with
/// the same index stay two groups.
pub fn group_by_hunk<T: HunkTagged>(entries: &[T]) -> Vec<HunkGroup<'_, T>> {
    let mut groups = Vec::new();
    let mut start = 0usize;

    for i in 1..=entries.len() {
        let boundary = i == entries.len()
            || entries[i].hunk_index() != entries[start].hunk_index();
        if boundary {
            groups.push(HunkGroup {
                hunk_index: entries[start].hunk_index(),
                entries: &entries[start..i],
            });
            start = i;
        }
    }

    groups
}
