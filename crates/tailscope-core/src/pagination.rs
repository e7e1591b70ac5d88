use tailscope_types::PaginationState;

/// Default page size for search fetches
pub const DEFAULT_PAGE_LIMIT: u64 = 50;

/// Tracks the current page/limit/total and enforces valid transitions.
///
/// Navigation clamps into `[1, total_pages]`; only a successful search
/// fetch overwrites the totals, and it does so atomically. A failed
/// fetch never touches this state.
#[derive(Clone, Debug)]
pub struct PaginationController {
    state: PaginationState,
}

impl PaginationController {
    pub fn new(limit: u64) -> Self {
        Self {
            state: PaginationState::initial(limit),
        }
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    pub fn page(&self) -> u64 {
        self.state.page
    }

    pub fn limit(&self) -> u64 {
        self.state.limit
    }

    /// Back to page 1 (used whenever the filter state changes)
    pub fn reset_to_first_page(&mut self) {
        self.state.page = 1;
    }

    /// Advance one page; no-op on the last page
    pub fn next(&mut self) -> bool {
        if self.state.page >= self.state.total_pages {
            return false;
        }
        self.state.page += 1;
        true
    }

    /// Go back one page; no-op on page 1
    pub fn previous(&mut self) -> bool {
        if self.state.page <= 1 {
            return false;
        }
        self.state.page -= 1;
        true
    }

    /// Jump to page `n`, clamped into `[1, total_pages]`.
    /// Returns whether the page actually changed.
    pub fn set_page(&mut self, n: u64) -> bool {
        let clamped = n.clamp(1, self.state.total_pages);
        if clamped == self.state.page {
            return false;
        }
        self.state.page = clamped;
        true
    }

    /// Overwrite page/total/totalPages atomically from a successful
    /// fetch response
    pub fn apply_response(&mut self, response: PaginationState) {
        let total_pages = response.total_pages.max(1);
        self.state = PaginationState {
            page: response.page.clamp(1, total_pages),
            limit: response.limit.max(1),
            total: response.total,
            total_pages,
        };
    }
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}
