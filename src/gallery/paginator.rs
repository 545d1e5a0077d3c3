use super::types::PageInfo;

/// One page of a list. Page indices are 1-based; out-of-range requests land on
/// the nearest existing page.
#[derive(Debug, Clone)]
pub struct Paginator<T> {
    items: Vec<T>,
    items_per_page: usize,
    page_index: usize,
}

impl<T> Paginator<T> {
    pub fn new(items: Vec<T>, items_per_page: usize, page_index: usize) -> Self {
        let items_per_page = items_per_page.max(1);
        let pages_count = items.len().div_ceil(items_per_page).max(1);
        Self {
            items,
            items_per_page,
            page_index: page_index.clamp(1, pages_count),
        }
    }

    pub fn pages_count(&self) -> usize {
        self.items.len().div_ceil(self.items_per_page).max(1)
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    pub fn page_items(&self) -> &[T] {
        let start = (self.page_index - 1) * self.items_per_page;
        let end = (start + self.items_per_page).min(self.items.len());
        self.items.get(start..end).unwrap_or_default()
    }

    pub fn info(&self) -> PageInfo {
        PageInfo {
            page_index: self.page_index,
            pages_count: self.pages_count(),
            items_per_page: self.items_per_page,
            total_items: self.items.len(),
        }
    }
}
