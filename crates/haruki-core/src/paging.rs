//! Fixed-size paging over wizard lists

/// One page of a list, already clamped into range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page index
    pub index: usize,
    /// Total number of pages, at least 1
    pub count: usize,
    pub start: usize,
    pub end: usize,
}

impl Page {
    /// Clamp `index` into the list and compute its bounds.
    ///
    /// An out-of-range index falls back to the first page.
    pub fn new(index: usize, total: usize, size: usize) -> Self {
        let size = size.max(1);
        let count = page_count(total, size);
        let index = if index < count { index } else { 0 };
        let start = (index * size).min(total);
        let end = (start + size).min(total);
        Self {
            index,
            count,
            start,
            end,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.count
    }

    /// `Page X of Y`
    pub fn label(&self) -> String {
        format!("Page {} of {}", self.index + 1, self.count)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.start.min(items.len())..self.end.min(items.len())]
    }
}

/// Number of pages needed for `total` items; an empty list still has one page
pub fn page_count(total: usize, size: usize) -> usize {
    if total == 0 {
        1
    } else {
        total.div_ceil(size.max(1))
    }
}

/// Move one page forward or back, staying inside the list
pub fn step(index: usize, forward: bool, total: usize, size: usize) -> usize {
    let count = page_count(total, size);
    if forward {
        (index + 1).min(count - 1)
    } else {
        index.saturating_sub(1)
    }
}
