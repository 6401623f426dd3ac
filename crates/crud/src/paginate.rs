//! Page arithmetic.

use serde::Serialize;

/// Resolved page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: u64,
    pub num_pages: u64,
    pub per_page: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
    /// 1-based index of the first row on the page (0 when empty).
    pub start_index: u64,
    /// 1-based index of the last row on the page (0 when empty).
    pub end_index: u64,
}

impl PageInfo {
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    /// At least one page, even when empty.
    pub fn num_pages(&self) -> u64 {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Lenient lookup: non-numeric or < 1 → first page, past the end → last page.
    pub fn page(&self, raw: &str) -> PageInfo {
        let num_pages = self.num_pages();
        let number = match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => 1,
            Ok(n) => n.min(num_pages),
        };

        let (start_index, end_index) = if self.count == 0 {
            (0, 0)
        } else {
            let start = (number - 1) * self.per_page + 1;
            let end = (number * self.per_page).min(self.count);
            (start, end)
        };

        PageInfo {
            number,
            num_pages,
            per_page: self.per_page,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous_page: (number > 1).then(|| number - 1),
            next_page: (number < num_pages).then(|| number + 1),
            start_index,
            end_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_listing_has_one_empty_page() {
        let page = Paginator::new(0, 10).page("1");
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert_eq!((page.start_index, page.end_index), (0, 0));
        assert!(!page.has_next && !page.has_previous);
    }

    #[test]
    fn garbage_goes_to_first_and_overflow_to_last() {
        let p = Paginator::new(25, 10);
        assert_eq!(p.page("abc").number, 1);
        assert_eq!(p.page("0").number, 1);
        assert_eq!(p.page("-2").number, 1);
        assert_eq!(p.page("99").number, 3);
    }

    #[test]
    fn last_page_indices() {
        let page = Paginator::new(25, 10).page("3");
        assert_eq!((page.start_index, page.end_index), (21, 25));
        assert_eq!(page.offset(), 20);
        assert_eq!(page.previous_page, Some(2));
        assert_eq!(page.next_page, None);
    }
}
