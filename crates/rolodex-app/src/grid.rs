// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::model::{Contact, PageRequest};
use crate::provider::ProvidedPage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridSignal {
    ActiveItemChanged(Option<Contact>),
}

/// Headless model of the virtualized list: which pages are loaded, which are
/// in flight or failed, how many rows the scroll range spans, and which row
/// is highlighted.
#[derive(Debug, Clone)]
pub struct PagedGrid {
    page_size: usize,
    generation: u64,
    pages: BTreeMap<usize, Vec<Contact>>,
    in_flight: BTreeSet<usize>,
    failed: BTreeSet<usize>,
    total: Option<usize>,
    exact_end: Option<usize>,
    estimate: usize,
    first_row: usize,
    viewport_rows: usize,
    active_row: Option<usize>,
    pending_active: Option<usize>,
}

impl PagedGrid {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            generation: 0,
            pages: BTreeMap::new(),
            in_flight: BTreeSet::new(),
            failed: BTreeSet::new(),
            total: None,
            exact_end: None,
            estimate: 0,
            first_row: 0,
            viewport_rows: 1,
            active_row: None,
            pending_active: None,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Emitted once by a freshly attached widget, before any user input.
    pub fn attach(&mut self) -> GridSignal {
        self.active_row = None;
        GridSignal::ActiveItemChanged(None)
    }

    /// Row count used for the scroll range. While a new generation has not
    /// delivered anything yet, the previous count stands in.
    pub fn row_count(&self) -> usize {
        self.total.unwrap_or(self.estimate)
    }

    pub fn row(&self, index: usize) -> Option<&Contact> {
        if index >= self.row_count() {
            return None;
        }
        self.pages
            .get(&(index / self.page_size))
            .and_then(|page| page.get(index % self.page_size))
    }

    pub fn first_row(&self) -> usize {
        self.first_row
    }

    pub fn viewport_rows(&self) -> usize {
        self.viewport_rows
    }

    pub fn active_row(&self) -> Option<usize> {
        self.active_row
    }

    /// Highlighted row whose page has not arrived yet.
    pub fn pending_active(&self) -> Option<usize> {
        self.pending_active
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn set_viewport(&mut self, first_row: usize, rows: usize) {
        self.first_row = first_row;
        self.viewport_rows = rows.max(1);
    }

    pub fn resize_viewport(&mut self, rows: usize) {
        self.viewport_rows = rows.max(1);
        if let Some(active) = self.active_row {
            self.scroll_to(active);
        }
    }

    /// Pages covering the viewport that are neither loaded, requested nor
    /// failed in this generation. Returned pages are marked in flight.
    pub fn missing_pages(&mut self) -> Vec<PageRequest> {
        let wanted_end = self.first_row + self.viewport_rows;
        let end = match self.total {
            Some(total) => wanted_end.min(total),
            None => wanted_end,
        };
        if end <= self.first_row {
            return Vec::new();
        }

        let first_page = self.first_row / self.page_size;
        let last_page = (end - 1) / self.page_size;
        let mut requests = Vec::new();
        for index in first_page..=last_page {
            if self.pages.contains_key(&index)
                || self.in_flight.contains(&index)
                || self.failed.contains(&index)
            {
                continue;
            }
            let Ok(request) = PageRequest::new(index, self.page_size) else {
                continue;
            };
            self.in_flight.insert(index);
            requests.push(request);
        }
        requests
    }

    /// Places a delivered page at its requested index. Pages from an older
    /// generation are dropped and `false` is returned.
    pub fn apply(&mut self, page: ProvidedPage) -> bool {
        if page.generation != self.generation {
            debug!(
                page = page.request.index(),
                page_generation = page.generation,
                generation = self.generation,
                "dropping stale page"
            );
            return false;
        }

        let index = page.request.index();
        self.in_flight.remove(&index);
        let loaded = page.request.offset() + page.content.len();

        let total = if page.is_short() {
            let end = self.exact_end.map_or(loaded, |known| known.min(loaded));
            self.exact_end = Some(end);
            end
        } else {
            match self.exact_end {
                Some(known) if known >= loaded => known,
                Some(_) => {
                    self.exact_end = Some(loaded);
                    loaded
                }
                None => self.total.map_or(page.total, |known| known.max(page.total)),
            }
        };
        self.total = Some(total);

        if !page.content.is_empty() {
            self.pages.insert(index, page.content);
        }
        self.pages
            .retain(|page_index, _| page_index * self.page_size < total);

        if self.first_row >= total {
            self.first_row = total.saturating_sub(self.viewport_rows);
        }
        if self.active_row.is_some_and(|row| row >= total) {
            self.active_row = None;
        }
        if self.pending_active.is_some_and(|row| row >= total) {
            self.pending_active = None;
        }
        true
    }

    /// Records a failed fetch. The page is not requested again until the
    /// next invalidation. Returns `false` for an older generation.
    pub fn fail(&mut self, generation: u64, request: PageRequest) -> bool {
        if generation != self.generation {
            return false;
        }
        let index = request.index();
        self.in_flight.remove(&index);
        self.failed.insert(index);
        debug!(page = index, generation, "page marked failed");
        true
    }

    /// Discards every loaded page and starts `generation`. The viewport and
    /// highlight are kept so the same region is requested again.
    pub fn invalidate(&mut self, generation: u64) {
        self.estimate = self.row_count();
        self.generation = generation;
        self.pages.clear();
        self.in_flight.clear();
        self.failed.clear();
        self.total = None;
        self.exact_end = None;
    }

    /// Like [`PagedGrid::invalidate`], but scrolls back to the first row.
    pub fn rewind(&mut self, generation: u64) {
        self.invalidate(generation);
        self.estimate = 0;
        self.first_row = 0;
        self.active_row = None;
        self.pending_active = None;
    }

    /// Moves the highlight and reports the contact now under it.
    pub fn move_active(&mut self, delta: isize) -> Option<GridSignal> {
        let count = self.row_count();
        if count == 0 {
            return None;
        }
        let current = self.active_row.unwrap_or(self.first_row) as isize;
        let start = if self.active_row.is_some() {
            current + delta
        } else {
            current
        };
        let next = start.clamp(0, count as isize - 1) as usize;
        if self.active_row == Some(next) {
            return None;
        }
        self.activate(next)
    }

    /// Highlights `row`. A row that is not loaded yet emits nothing now; its
    /// signal comes from [`PagedGrid::take_pending_signal`] once it loads.
    pub fn activate(&mut self, row: usize) -> Option<GridSignal> {
        self.active_row = Some(row);
        self.scroll_to(row);
        match self.row(row).cloned() {
            Some(contact) => {
                self.pending_active = None;
                Some(GridSignal::ActiveItemChanged(Some(contact)))
            }
            None => {
                self.pending_active = Some(row);
                None
            }
        }
    }

    pub fn take_pending_signal(&mut self) -> Option<GridSignal> {
        let row = self.pending_active?;
        let contact = self.row(row).cloned()?;
        self.pending_active = None;
        Some(GridSignal::ActiveItemChanged(Some(contact)))
    }

    pub fn position_of(&self, contact: &Contact) -> Option<usize> {
        self.pages.iter().find_map(|(page_index, rows)| {
            rows.iter()
                .position(|row| row.same_record(contact))
                .map(|offset| page_index * self.page_size + offset)
        })
    }

    /// Forces the highlight onto `selected`, or clears it when that record
    /// is not loaded. Emits nothing.
    pub fn reconcile(&mut self, selected: Option<&Contact>) {
        self.pending_active = None;
        self.active_row = selected.and_then(|contact| self.position_of(contact));
    }

    fn scroll_to(&mut self, row: usize) {
        if row < self.first_row {
            self.first_row = row;
        } else if row >= self.first_row + self.viewport_rows {
            self.first_row = row + 1 - self.viewport_rows;
        }
    }
}
