//! Pagination of a sorted entry list.
//!
//! Pages are contiguous index ranges of `entries_per_page` entries. A trailing
//! remnant of at most a tenth of a page is folded into the page before it, and
//! the same rule applies when a page is extended into its neighbour.

use std::ops::Range;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("entries_per_page must be at least 1")]
    ZeroPageSize,

    #[error("Page {page} does not exist ({count} pages)")]
    NoSuchPage { page: usize, count: usize },

    #[error("Page {page} has no {direction} neighbour")]
    NoAdjacentPage { page: usize, direction: PageDirection },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Next,
    Previous,
}

impl std::fmt::Display for PageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageDirection::Next => write!(f, "next"),
            PageDirection::Previous => write!(f, "previous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    total: usize,
    per_page: usize,
    pages: Vec<Range<usize>>,
}

impl Pagination {
    pub fn new(total: usize, per_page: usize) -> Result<Self, PaginationError> {
        if per_page == 0 {
            return Err(PaginationError::ZeroPageSize);
        }

        let mut pages: Vec<Range<usize>> = (0..total)
            .step_by(per_page)
            .map(|start| start..(start + per_page).min(total))
            .collect();

        if pages.len() > 1 {
            let last = pages[pages.len() - 1].clone();
            if last.len() <= merge_threshold(per_page) {
                pages.pop();
                if let Some(previous) = pages.last_mut() {
                    previous.end = last.end;
                }
            }
        }

        Ok(Self {
            total,
            per_page,
            pages,
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn pages(&self) -> &[Range<usize>] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, page: usize) -> Option<Range<usize>> {
        self.pages.get(page).cloned()
    }

    /// Page holding the entry at absolute `index`
    pub fn page_for_entry(&self, index: usize) -> Option<usize> {
        self.pages.iter().position(|r| r.contains(&index))
    }

    /// Move up to `count` entries from the neighbouring page into `page`.
    ///
    /// When the neighbour would be left with a remnant of at most a tenth of a
    /// page (or nothing), it is absorbed completely and removed. Both page
    /// boundaries are updated together. Returns the absolute index range that
    /// was added to `page`.
    pub fn extend_page(
        &mut self,
        page: usize,
        direction: PageDirection,
        count: usize,
    ) -> Result<Range<usize>, PaginationError> {
        if page >= self.pages.len() {
            return Err(PaginationError::NoSuchPage {
                page,
                count: self.pages.len(),
            });
        }
        let neighbour = match direction {
            PageDirection::Next => page + 1,
            PageDirection::Previous => page.checked_sub(1).ok_or(PaginationError::NoAdjacentPage {
                page,
                direction,
            })?,
        };
        let Some(adjacent) = self.pages.get(neighbour).cloned() else {
            return Err(PaginationError::NoAdjacentPage { page, direction });
        };

        let take = count.min(adjacent.len());
        let absorb_all = adjacent.len() - take <= merge_threshold(self.per_page);

        let added = match (direction, absorb_all) {
            (_, true) => adjacent.clone(),
            (PageDirection::Next, false) => adjacent.start..adjacent.start + take,
            (PageDirection::Previous, false) => adjacent.end - take..adjacent.end,
        };

        match direction {
            PageDirection::Next => {
                self.pages[page].end = added.end;
                self.pages[neighbour].start = added.end;
            }
            PageDirection::Previous => {
                self.pages[page].start = added.start;
                self.pages[neighbour].end = added.start;
            }
        }
        if absorb_all {
            self.pages.remove(neighbour);
        }

        tracing::debug!(
            "Extended page {} by {:?} ({} pages remain)",
            page,
            added,
            self.pages.len()
        );
        Ok(added)
    }

    /// Navigation label for a page: leading characters of its first and last sort keys
    pub fn page_label<S: AsRef<str>>(&self, page: usize, sort_keys: &[S]) -> Option<String> {
        let range = self.pages.get(page)?;
        let first = leading(sort_keys.get(range.start)?.as_ref());
        let last = leading(sort_keys.get(range.end.checked_sub(1)?)?.as_ref());
        if first == last {
            Some(first)
        } else {
            Some(format!("{}-{}", first, last))
        }
    }
}

fn merge_threshold(per_page: usize) -> usize {
    per_page / 10
}

/// First two graphemes of a key, lowercased
fn leading(key: &str) -> String {
    key.trim()
        .graphemes(true)
        .take(2)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let p = Pagination::new(250, 100).unwrap();
        assert_eq!(p.pages(), &[0..100, 100..200, 200..250]);
        assert_eq!(p.page_for_entry(199), Some(1));
        assert_eq!(p.page_for_entry(250), None);
    }

    #[test]
    fn test_small_remnant_merges_into_previous_page() {
        let p = Pagination::new(205, 100).unwrap();
        assert_eq!(p.pages(), &[0..100, 100..205]);

        let p = Pagination::new(210, 100).unwrap();
        assert_eq!(p.pages(), &[0..100, 100..210]);

        let p = Pagination::new(211, 100).unwrap();
        assert_eq!(p.page_count(), 3);
    }

    #[test]
    fn test_single_short_page_and_empty() {
        assert_eq!(Pagination::new(3, 100).unwrap().pages(), &[0..3]);
        assert!(Pagination::new(0, 100).unwrap().pages().is_empty());
        assert_eq!(Pagination::new(5, 0), Err(PaginationError::ZeroPageSize));
    }

    #[test]
    fn test_extend_next_takes_partial_batch() {
        let mut p = Pagination::new(300, 100).unwrap();
        let added = p.extend_page(0, PageDirection::Next, 30).unwrap();
        assert_eq!(added, 100..130);
        assert_eq!(p.pages(), &[0..130, 130..200, 200..300]);
    }

    #[test]
    fn test_extend_absorbs_near_empty_neighbour() {
        let mut p = Pagination::new(300, 100).unwrap();
        let added = p.extend_page(1, PageDirection::Next, 95).unwrap();
        assert_eq!(added, 200..300);
        assert_eq!(p.pages(), &[0..100, 100..300]);
    }

    #[test]
    fn test_extend_previous() {
        let mut p = Pagination::new(300, 100).unwrap();
        let added = p.extend_page(2, PageDirection::Previous, 20).unwrap();
        assert_eq!(added, 180..200);
        assert_eq!(p.pages(), &[0..100, 100..180, 180..300]);
        assert_eq!(p.page_for_entry(185), Some(2));
    }

    #[test]
    fn test_extend_errors() {
        let mut p = Pagination::new(150, 100).unwrap();
        assert_eq!(
            p.extend_page(0, PageDirection::Previous, 10),
            Err(PaginationError::NoAdjacentPage {
                page: 0,
                direction: PageDirection::Previous
            })
        );
        assert_eq!(
            p.extend_page(1, PageDirection::Next, 10),
            Err(PaginationError::NoAdjacentPage {
                page: 1,
                direction: PageDirection::Next
            })
        );
        assert!(matches!(
            p.extend_page(7, PageDirection::Next, 10),
            Err(PaginationError::NoSuchPage { page: 7, .. })
        ));
    }

    #[test]
    fn test_page_labels() {
        let keys = ["abbey", "acorn", "bridge", "brown", "cat"];
        let p = Pagination::new(keys.len(), 2).unwrap();
        assert_eq!(p.page_label(0, &keys).as_deref(), Some("ab-ac"));
        assert_eq!(p.page_label(1, &keys).as_deref(), Some("br"));
        assert_eq!(p.page_label(2, &keys).as_deref(), Some("ca"));
        assert_eq!(p.page_label(3, &keys), None);
    }
}
