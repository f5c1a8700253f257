use std::cmp::Ordering;
use tracing::{trace, warn};

use crate::domain::ViewConfig;
use crate::record::{Field, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Interaction state of one table view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<F: Field> {
    pub search_text: String,
    pub sort_key: Option<F>,
    pub sort_direction: SortDirection,
    pub page_index: usize,
    pub page_size: usize,
    pub refresh_epoch: u64,
}

/// Result of a derive pass.
#[derive(Debug)]
pub struct Derived<'a, R> {
    pub visible: Vec<&'a R>,
    pub total_filtered: usize,
    /// Page actually shown, after clamping an out of range page index.
    pub page_index: usize,
}

/// Client side table view: search, sort and pagination over a snapshot of
/// records owned by the caller.
///
/// The view model never performs I/O. The caller fetches records whenever
/// [`TableViewModel::refresh_epoch`] changes and hands them to
/// [`TableViewModel::derive`] on every render.
#[derive(Debug, Clone)]
pub struct TableViewModel<F: Field> {
    state: ViewState<F>,
    page_sizes: Vec<usize>,
}

impl<F: Field> TableViewModel<F> {
    /// Zero page sizes are dropped. An empty set falls back to the default
    /// sizes and a default outside the set to its first entry.
    pub fn new(config: &ViewConfig, sort_key: Option<F>) -> Self {
        let mut page_sizes: Vec<usize> =
            config.page_sizes.iter().copied().filter(|&s| s > 0).collect();
        if page_sizes.is_empty() {
            warn!("No usable page sizes in {:?}, using defaults", config.page_sizes);
            page_sizes = ViewConfig::default().page_sizes;
        }
        let page_size = if page_sizes.contains(&config.default_page_size) {
            config.default_page_size
        } else {
            page_sizes[0]
        };

        Self {
            state: ViewState {
                search_text: String::new(),
                sort_key,
                sort_direction: SortDirection::Ascending,
                page_index: 0,
                page_size,
                refresh_epoch: 0,
            },
            page_sizes,
        }
    }

    pub fn for_record<R: Record<Field = F>>(config: &ViewConfig) -> Self {
        Self::new(config, R::DEFAULT_SORT)
    }

    pub fn state(&self) -> &ViewState<F> {
        &self.state
    }

    pub fn search_text(&self) -> &str {
        &self.state.search_text
    }

    pub fn sort_key(&self) -> Option<F> {
        self.state.sort_key
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.state.sort_direction
    }

    pub fn page_index(&self) -> usize {
        self.state.page_index
    }

    pub fn page_size(&self) -> usize {
        self.state.page_size
    }

    pub fn refresh_epoch(&self) -> u64 {
        self.state.refresh_epoch
    }

    // Leaves the page index alone, derive() clamps it.
    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.state.search_text = text.into();
    }

    pub fn set_sort(&mut self, field: F) {
        if self.state.sort_key == Some(field) {
            self.state.sort_direction = self.state.sort_direction.toggled();
        } else {
            self.state.sort_key = Some(field);
            self.state.sort_direction = SortDirection::Ascending;
        }
        trace!("Sort by {:?} {:?}", field, self.state.sort_direction);
    }

    pub fn set_page(&mut self, index: usize) {
        self.state.page_index = index;
    }

    pub fn set_page_size(&mut self, size: usize) {
        if self.page_sizes.contains(&size) {
            self.state.page_size = size;
        } else {
            warn!("Ignoring page size {size}, expected one of {:?}", self.page_sizes);
        }
        self.state.page_index = 0;
    }

    /// Switches to the next configured page size, wrapping around.
    pub fn cycle_page_size(&mut self) {
        let next = self
            .page_sizes
            .iter()
            .position(|&s| s == self.state.page_size)
            .and_then(|pos| self.page_sizes.get((pos + 1) % self.page_sizes.len()))
            .or_else(|| self.page_sizes.first())
            .copied();
        if let Some(next) = next {
            self.set_page_size(next);
        }
    }

    pub fn trigger_refresh(&mut self) -> u64 {
        self.state.refresh_epoch += 1;
        self.state.refresh_epoch
    }

    /// Number of pages for `total` filtered records. An empty table has one
    /// (empty) page.
    pub fn page_count(&self, total: usize) -> usize {
        std::cmp::max(1, total.div_ceil(self.state.page_size))
    }

    pub fn next_page(&mut self, total: usize) {
        if self.state.page_index.saturating_add(1) < self.page_count(total) {
            self.state.page_index += 1;
        }
    }

    pub fn prev_page(&mut self) {
        self.state.page_index = self.state.page_index.saturating_sub(1);
    }

    pub fn last_page(&mut self, total: usize) {
        self.state.page_index = self.page_count(total) - 1;
    }

    /// Filters, sorts and paginates `records`. Pure with respect to the
    /// view state, the records are only borrowed.
    pub fn derive<'a, R: Record<Field = F>>(&self, records: &'a [R]) -> Derived<'a, R> {
        let needle = self.state.search_text.to_lowercase();
        let mut rows: Vec<&R> = if needle.is_empty() {
            records.iter().collect()
        } else {
            records
                .iter()
                .filter(|r| {
                    r.value(R::SEARCH_FIELD)
                        .search_text()
                        .is_some_and(|s| s.contains(&needle))
                })
                .collect()
        };

        if let Some(key) = self.state.sort_key {
            let direction = self.state.sort_direction;
            // sort_by is stable, equal keys keep their filtered order in both directions
            rows.sort_by(|a, b| {
                let ord: Ordering = a.value(key).total_cmp(&b.value(key));
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        let total_filtered = rows.len();
        let size = self.state.page_size;
        let last_page = total_filtered.saturating_sub(1) / size;
        let page_index = std::cmp::min(self.state.page_index, last_page);
        let start = page_index * size;
        let end = std::cmp::min(start + size, total_filtered);

        Derived {
            visible: rows[start..end].to_vec(),
            total_filtered,
            page_index,
        }
    }
}
