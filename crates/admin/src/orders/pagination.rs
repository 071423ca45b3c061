//! Client-side pagination over an ordered list.

use serde::Serialize;

/// One page of a list plus the metadata needed to render page controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number that was requested.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    /// `ceil(total_items / page_size)`, 0 for an empty list.
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Whether page controls are worth showing.
    #[must_use]
    pub const fn show_controls(&self) -> bool {
        self.total_pages > 1
    }

    /// Whether the requested page lies past the last page.
    #[must_use]
    pub const fn is_past_end(&self) -> bool {
        self.page > self.total_pages
    }

    /// Transform the items, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Number of pages needed for `total_items`.
#[must_use]
pub const fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(if page_size == 0 { 1 } else { page_size })
}

/// Slice out page `page` (1-based) of `list`.
///
/// `page == 0` is treated as 1 and `page_size == 0` as 1. A page past the end
/// yields no items rather than an error.
#[must_use]
pub fn paginate<T: Clone>(list: &[T], page_size: usize, page: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let page = page.max(1);
    let start = (page - 1).saturating_mul(page_size);
    let end = start.saturating_add(page_size).min(list.len());

    let items = list.get(start..end).map(<[T]>::to_vec).unwrap_or_default();

    Page {
        items,
        page,
        page_size,
        total_items: list.len(),
        total_pages: total_pages(list.len(), page_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_twenty_five_items_in_pages_of_ten() {
        let items = list(25);

        let first = paginate(&items, 10, 1);
        assert_eq!(first.items, (0..10).collect::<Vec<_>>());
        assert_eq!(first.total_pages, 3);
        assert!(first.show_controls());

        let last = paginate(&items, 10, 3);
        assert_eq!(last.items, (20..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_page_lengths_for_every_valid_page() {
        for len in [1, 9, 10, 11, 37, 100] {
            let items = list(len);
            let pages = total_pages(len, 10);
            assert_eq!(pages, len.div_ceil(10));
            for page in 1..=pages {
                let expected = if page == pages { len - 10 * (pages - 1) } else { 10 };
                assert_eq!(paginate(&items, 10, page).items.len(), expected);
            }
        }
    }

    #[test]
    fn test_empty_list_has_no_pages() {
        let page = paginate::<u8>(&[], 10, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
        assert!(!page.show_controls());
    }

    #[test]
    fn test_single_page_hides_controls() {
        let page = paginate(&list(4), 10, 1);
        assert_eq!(page.total_pages, 1);
        assert!(!page.show_controls());
    }

    #[test]
    fn test_past_the_end_is_empty() {
        let page = paginate(&list(4), 10, 3);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert!(page.is_past_end());
    }

    #[test]
    fn test_zero_page_and_zero_size_are_clamped() {
        let page = paginate(&list(5), 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 1);
        assert_eq!(page.items, vec![0]);
        assert_eq!(page.total_pages, 5);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = paginate(&list(12), 5, 2).map(|n| n * 2);
        assert_eq!(page.items, vec![10, 12, 14, 16, 18]);
        assert_eq!(page.total_items, 12);
        assert_eq!(page.total_pages, 3);
    }
}
