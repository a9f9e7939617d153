//! # Batch Windows
//!
//! Pagination over an ordered id sequence. A `BatchWindow` is one page:
//! explicit `first`/`end` bounds over a shared sequence, with orphan
//! absorption (a trailing page smaller than `orphan` is merged into its
//! predecessor) and optional overlap between adjacent pages.
//!
//! Windows are cheap: siblings share the underlying sequence. The
//! `start` attribute is 1-based for display ("items 11 to 20"); `first`
//! is the 0-based index, and constructors take a 0-based offset.

use std::rc::Rc;

use crate::session::Session;
use crate::types::WebError;
use crate::wrappers::ItemWrapper;

/// Page size used when none is given.
pub const DEFAULT_SIZE: usize = 7;

/// One fetched element: a bare id, or the wrapped item when the window
/// knows its class.
#[derive(Debug)]
pub enum BatchEntry<'a> {
    /// An element of a plain id sequence.
    Id(String),
    /// An element mapped to its stored item.
    Item(ItemWrapper<'a>),
}

impl BatchEntry<'_> {
    /// The element's id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Item(item) => item.id(),
        }
    }
}

/// One page of an ordered id sequence.
pub struct BatchWindow<'a> {
    session: &'a Session<'a>,
    classname: Option<String>,
    sequence: Rc<Vec<String>>,
    size: usize,
    /// 0-based index of the first element in this page.
    first: usize,
    /// 0-based exclusive end of this page.
    end: usize,
    orphan: usize,
    overlap: usize,
    // propchanged() tracking across sequential get() calls.
    last_index: Option<usize>,
    last_id: Option<String>,
    current_id: Option<String>,
}

impl<'a> BatchWindow<'a> {
    /// A window starting at the 0-based `offset`. A zero `size` falls
    /// back to [`DEFAULT_SIZE`]. The bounds are resolved here, once:
    /// an offset beyond the sequence snaps to the last element, and the
    /// end is clamped to the sequence length when the remainder past
    /// this page would be shorter than `orphan`.
    #[must_use]
    pub fn new(
        session: &'a Session<'a>,
        classname: Option<String>,
        sequence: Rc<Vec<String>>,
        size: usize,
        offset: usize,
        orphan: usize,
        overlap: usize,
    ) -> Self {
        let size = if size == 0 { DEFAULT_SIZE } else { size };
        let len = sequence.len();
        let first = if offset >= len {
            len.saturating_sub(1)
        } else {
            offset
        };
        let mut end = first + size;
        if end + orphan > len {
            end = len;
        }
        if end < first {
            end = first;
        }
        Self {
            session,
            classname,
            sequence,
            size,
            first,
            end,
            orphan,
            overlap,
            last_index: None,
            last_id: None,
            current_id: None,
        }
    }

    /// The 1-based index of the first element, for display.
    #[must_use]
    pub fn start(&self) -> usize {
        self.first + 1
    }

    /// The 0-based index of the first element.
    #[must_use]
    pub fn first(&self) -> usize {
        self.first
    }

    /// The 0-based exclusive end of this page.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of elements in this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.first
    }

    /// True when the page holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the whole, unwindowed sequence.
    #[must_use]
    pub fn sequence_length(&self) -> usize {
        self.sequence.len()
    }

    /// Fetch one element. Non-negative indices address this page;
    /// negative indices count back from the page end into the preceding
    /// part of the sequence, as far as `first`. Anything else is an
    /// `IndexOutOfRange`.
    ///
    /// Sequential forward fetches feed [`Self::propchanged`].
    pub fn get(&mut self, index: isize) -> Result<BatchEntry<'a>, WebError> {
        let pos = if index < 0 {
            let pos = index + self.end as isize;
            if pos < self.first as isize {
                return Err(WebError::IndexOutOfRange(index));
            }
            pos as usize
        } else {
            let offset = index as usize;
            if offset >= self.len() {
                return Err(WebError::IndexOutOfRange(index));
            }
            // Track the previously fetched element, but only when the
            // index moves (templates fetch index 0 twice).
            if self.last_index != Some(offset) {
                self.last_id = self.current_id.take();
                self.last_index = Some(offset);
            }
            offset + self.first
        };
        let id = self.sequence[pos].clone();
        if index >= 0 {
            self.current_id = Some(id.clone());
        }
        match &self.classname {
            Some(classname) => {
                ItemWrapper::new(self.session, classname, &id).map(BatchEntry::Item)
            }
            None => Ok(BatchEntry::Id(id)),
        }
    }

    /// Whether the given property's value changed between the last two
    /// sequentially fetched elements. True on the first fetch. Used to
    /// emit group headings while iterating an index page.
    #[must_use]
    pub fn propchanged(&self, property: &str) -> bool {
        let (Some(last), Some(current)) = (&self.last_id, &self.current_id) else {
            return true;
        };
        let Some(classname) = &self.classname else {
            return last != current;
        };
        match self.session.store.get_class(classname) {
            Ok(class) => class.get(last, property) != class.get(current, property),
            Err(_) => true,
        }
    }

    /// The preceding page, `None` on the first page. Overlap shifts the
    /// step back by `overlap` elements; a step past the beginning snaps
    /// to the start of the sequence.
    #[must_use]
    pub fn previous(&self) -> Option<Self> {
        if self.start() == 1 {
            return None;
        }
        let back = self.first as isize - self.size as isize + self.overlap as isize;
        let offset = if back > 0 { back as usize } else { 0 };
        Some(self.sibling(offset))
    }

    /// The following page, `None` when this page reaches the end of the
    /// sequence (orphan absorption guarantees an absorbed tail never
    /// yields a next page).
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        if self.end >= self.sequence.len() {
            return None;
        }
        Some(self.sibling(self.end - self.overlap))
    }

    fn sibling(&self, offset: usize) -> Self {
        Self::new(
            self.session,
            self.classname.clone(),
            Rc::clone(&self.sequence),
            self.size,
            offset,
            self.orphan,
            self.overlap,
        )
    }
}

impl std::fmt::Debug for BatchWindow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWindow")
            .field("first", &self.first)
            .field("end", &self.end)
            .field("sequence_length", &self.sequence.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture, session};

    fn ids(n: usize) -> Rc<Vec<String>> {
        Rc::new((1..=n).map(|i| i.to_string()).collect())
    }

    fn window<'a>(
        sess: &'a Session<'a>,
        n: usize,
        size: usize,
        offset: usize,
        orphan: usize,
        overlap: usize,
    ) -> BatchWindow<'a> {
        BatchWindow::new(sess, None, ids(n), size, offset, orphan, overlap)
    }

    #[test]
    fn plain_paging() {
        let fix = fixture();
        let sess = session(&fix);
        let w = window(&sess, 23, 10, 0, 0, 0);
        assert_eq!((w.start(), w.end(), w.len()), (1, 10, 10));
        let w = w.next().expect("second page");
        assert_eq!((w.start(), w.end(), w.len()), (11, 20, 10));
        let w = w.next().expect("third page");
        assert_eq!((w.start(), w.end(), w.len()), (21, 23, 3));
        assert!(w.next().is_none());
    }

    #[test]
    fn orphan_absorbs_short_tail() {
        let fix = fixture();
        let sess = session(&fix);
        let w = window(&sess, 23, 10, 10, 5, 0);
        // 3 trailing items < 5 orphan: the second page runs to the end.
        assert_eq!((w.start(), w.end(), w.len()), (11, 23, 13));
        assert!(w.next().is_none());
    }

    #[test]
    fn overlap_steps_by_size_minus_overlap() {
        let fix = fixture();
        let sess = session(&fix);
        let w = window(&sess, 20, 10, 0, 0, 3);
        let n = w.next().expect("next");
        assert_eq!(n.start(), 8);
        let p = n.previous().expect("previous");
        assert_eq!(p.start(), w.start());
    }

    #[test]
    fn first_page_has_no_previous() {
        let fix = fixture();
        let sess = session(&fix);
        let w = window(&sess, 5, 10, 0, 0, 0);
        assert!(w.previous().is_none());
        assert!(w.next().is_none());
        assert_eq!(w.len(), 5);
    }

    #[test]
    fn previous_clamps_to_sequence_start() {
        let fix = fixture();
        let sess = session(&fix);
        let w = window(&sess, 23, 10, 4, 0, 0);
        let p = w.previous().expect("previous");
        assert_eq!(p.start(), 1);
    }

    #[test]
    fn empty_sequence_is_one_empty_page() {
        let fix = fixture();
        let sess = session(&fix);
        let w = window(&sess, 0, 10, 0, 0, 0);
        assert!(w.is_empty());
        assert!(w.previous().is_none());
        assert!(w.next().is_none());
    }

    #[test]
    fn get_checks_bounds_both_ways() {
        let fix = fixture();
        let sess = session(&fix);
        let mut w = window(&sess, 23, 10, 10, 0, 0);
        assert_eq!(w.get(0).expect("get").id(), "11");
        assert_eq!(w.get(9).expect("get").id(), "20");
        assert_eq!(
            w.get(10).expect_err("past end"),
            WebError::IndexOutOfRange(10)
        );
        // Negative indices reach back from the page end, stopping at the
        // page start.
        assert_eq!(w.get(-1).expect("get").id(), "20");
        assert_eq!(w.get(-10).expect("get").id(), "11");
        assert_eq!(
            w.get(-11).expect_err("before start"),
            WebError::IndexOutOfRange(-11)
        );
    }

    #[test]
    fn wraps_items_when_class_is_known() {
        let fix = fixture();
        let sess = session(&fix);
        let seq = Rc::new(vec!["1".to_string(), "2".to_string()]);
        let mut w = BatchWindow::new(&sess, Some("issue".into()), seq, 10, 0, 0, 0);
        let entry = w.get(0).expect("get");
        let BatchEntry::Item(item) = entry else {
            unreachable!("expected wrapped item");
        };
        assert_eq!(item.designator(), "issue1");
    }

    #[test]
    fn propchanged_tracks_sequential_fetches() {
        let fix = fixture();
        let sess = session(&fix);
        // Issues 1 and 3 share status "1"; issue 2 has status "2".
        let seq = Rc::new(vec!["1".to_string(), "3".to_string(), "2".to_string()]);
        let mut w = BatchWindow::new(&sess, Some("issue".into()), seq, 10, 0, 0, 0);
        let _ = w.get(0).expect("get");
        assert!(w.propchanged("status"));
        let _ = w.get(1).expect("get");
        assert!(!w.propchanged("status"));
        let _ = w.get(2).expect("get");
        assert!(w.propchanged("status"));
    }

    #[test]
    fn repeated_index_zero_fetch_keeps_tracking() {
        let fix = fixture();
        let sess = session(&fix);
        let seq = Rc::new(vec!["1".to_string(), "3".to_string()]);
        let mut w = BatchWindow::new(&sess, Some("issue".into()), seq, 10, 0, 0, 0);
        let _ = w.get(0).expect("get");
        let _ = w.get(0).expect("get");
        let _ = w.get(1).expect("get");
        assert!(!w.propchanged("status"));
    }
}
