/// Page cursor for the paginated tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub page: u32,
    pub pages: u32,
    pub total: u64,
    pub per_page: u32,
}

impl Pager {
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            pages: 0,
            total: 0,
            per_page: per_page.max(1),
        }
    }

    /// Adopts the cursor reported by the backend.
    pub fn update(&mut self, current_page: u32, pages: u32, total: u64) {
        self.page = current_page.max(1);
        self.pages = pages;
        self.total = total;
    }

    pub fn reset(&mut self) {
        self.page = 1;
        self.pages = 0;
        self.total = 0;
    }

    pub fn prev_disabled(&self) -> bool {
        self.page <= 1
    }

    /// Also disabled for an empty result, where `pages` is 0.
    pub fn next_disabled(&self) -> bool {
        self.page >= self.pages
    }

    pub fn prev(&self) -> Option<u32> {
        (!self.prev_disabled()).then(|| self.page - 1)
    }

    pub fn next(&self) -> Option<u32> {
        (!self.next_disabled()).then(|| self.page + 1)
    }

    /// 1-based position of `index` on the current page within the whole result.
    pub fn row_number(&self, index: usize) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page) + index as u64 + 1
    }

    pub fn label(&self) -> String {
        format!(
            "Page {} of {} ({} total)",
            self.page,
            self.pages.max(1),
            self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_disables_prev() {
        let mut pager = Pager::new(10);
        pager.update(1, 3, 25);
        assert!(pager.prev_disabled());
        assert!(!pager.next_disabled());
        assert_eq!(pager.prev(), None);
        assert_eq!(pager.next(), Some(2));
    }

    #[test]
    fn last_page_disables_next() {
        let mut pager = Pager::new(10);
        pager.update(3, 3, 25);
        assert!(!pager.prev_disabled());
        assert!(pager.next_disabled());
        assert_eq!(pager.next(), None);
        assert_eq!(pager.prev(), Some(2));
    }

    #[test]
    fn empty_result_disables_both() {
        let mut pager = Pager::new(50);
        pager.update(1, 0, 0);
        assert!(pager.prev_disabled());
        assert!(pager.next_disabled());
        assert_eq!(pager.label(), "Page 1 of 1 (0 total)");
    }

    #[test]
    fn rows_are_numbered_across_pages() {
        let mut pager = Pager::new(50);
        pager.update(2, 4, 180);
        assert_eq!(pager.row_number(0), 51);
        assert_eq!(pager.row_number(9), 60);
    }
}
