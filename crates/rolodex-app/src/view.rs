// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use std::rc::Rc;
use tracing::{debug, info};

use crate::form::{ContactForm, ContactRepository, DataChange};
use crate::grid::{GridSignal, PagedGrid};
use crate::layout::{DEFAULT_NARROW_THRESHOLD, DisplayMode, LayoutController};
use crate::model::{Contact, NavigationParams};
use crate::provider::{DataProvider, PageDelivery, PageFetch, PageSource};
use crate::query::{QueryController, QueryOutcome, QueryState};
use crate::selection::{DirtyFlag, SelectionGuard, SelectionOutcome, SelectionState};
use crate::status::UiStatus;

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    pub page_size: usize,
    pub narrow_threshold: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            narrow_threshold: DEFAULT_NARROW_THRESHOLD,
        }
    }
}

/// The contact list view: query, paged grid, guarded selection, detail
/// form and responsive layout wired together. Everything runs on the UI
/// thread; page fetches are handed out as futures for the host to drive.
#[derive(Debug)]
pub struct ListView {
    query: QueryController,
    provider: DataProvider,
    grid: PagedGrid,
    guard: SelectionGuard,
    layout: LayoutController,
    form: Option<ContactForm>,
    status: UiStatus,
}

impl ListView {
    pub fn new(source: Rc<dyn PageSource>, status: UiStatus, config: ViewConfig) -> Self {
        Self {
            query: QueryController::new(status.clone()),
            provider: DataProvider::new(source, status.clone()),
            grid: PagedGrid::new(config.page_size),
            guard: SelectionGuard::new(),
            layout: LayoutController::new(config.narrow_threshold),
            form: None,
            status,
        }
    }

    /// View entry: applies navigation scope and attaches the grid, whose
    /// attachment signal goes through the selection guard like any other.
    pub fn enter(&mut self, params: &NavigationParams) -> SelectionOutcome {
        if params.company.is_some() || params.status.is_some() {
            let outcome = self
                .query
                .apply_scope(params.company.as_deref(), params.status.as_deref());
            if outcome == QueryOutcome::Changed {
                self.rewind();
            }
        }
        self.guard.attach();
        let signal = self.grid.attach();
        self.handle_signal(signal)
    }

    pub fn query(&self) -> &QueryState {
        self.query.state()
    }

    pub fn grid(&self) -> &PagedGrid {
        &self.grid
    }

    pub fn status(&self) -> &UiStatus {
        &self.status
    }

    pub fn selected(&self) -> Option<&Contact> {
        self.guard.selected()
    }

    pub fn selection_state(&self) -> SelectionState {
        self.guard.state(&self.form)
    }

    pub fn form(&self) -> Option<&ContactForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ContactForm> {
        self.form.as_mut()
    }

    pub fn is_dirty(&self) -> bool {
        self.form.is_dirty()
    }

    /// The detail form shows while a contact is selected.
    pub fn detail_visible(&self) -> bool {
        self.guard.selected().is_some()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.layout.mode()
    }

    pub fn layout(&self) -> &LayoutController {
        &self.layout
    }

    pub fn update_filter(&mut self, text: &str) -> QueryOutcome {
        let outcome = self.query.set_filter_text(text);
        if outcome == QueryOutcome::Changed {
            self.rewind();
        }
        outcome
    }

    pub fn handle_signal(&mut self, signal: GridSignal) -> SelectionOutcome {
        let GridSignal::ActiveItemChanged(candidate) = signal;
        let outcome = self.guard.on_active_item_changed(candidate, &self.form);
        self.apply_selection(&outcome);
        outcome
    }

    pub fn move_highlight(&mut self, delta: isize) -> Option<SelectionOutcome> {
        let signal = self.grid.move_active(delta)?;
        Some(self.handle_signal(signal))
    }

    /// `None` while the row's page is still loading; the selection follows
    /// when it arrives.
    pub fn activate_row(&mut self, row: usize) -> Option<SelectionOutcome> {
        let signal = self.grid.activate(row)?;
        Some(self.handle_signal(signal))
    }

    /// "Add contact". `None` while offline, since creation is disabled then.
    pub fn edit_new(&mut self) -> Option<SelectionOutcome> {
        if self.status.offline() {
            debug!("add contact ignored while offline");
            return None;
        }
        let outcome = self.guard.edit_new(&self.form);
        self.apply_selection(&outcome);
        Some(outcome)
    }

    /// Closes the detail form. A dirty form is reverted first and stays open.
    pub fn cancel_edit(&mut self) -> bool {
        if let Some(form) = self.form.as_mut()
            && form.is_dirty()
        {
            form.revert();
            return false;
        }
        self.guard.replace(None);
        self.form = None;
        self.grid.reconcile(None);
        true
    }

    pub fn save<R: ContactRepository + ?Sized>(&mut self, repository: &mut R) -> Result<()> {
        if self.status.offline() {
            bail!("offline -- contacts cannot be saved until the backend is reachable");
        }
        let Some(form) = self.form.as_mut() else {
            bail!("no contact is being edited -- select a contact first");
        };
        let change = form.save(repository)?;
        self.handle_data_change(change);
        Ok(())
    }

    pub fn delete<R: ContactRepository + ?Sized>(&mut self, repository: &mut R) -> Result<()> {
        if self.status.offline() {
            bail!("offline -- contacts cannot be deleted until the backend is reachable");
        }
        let Some(form) = self.form.as_ref() else {
            bail!("no contact is being edited -- select a contact first");
        };
        let change = form.delete(repository)?;
        self.handle_data_change(change);
        Ok(())
    }

    /// The detail form's data-changed signal: drop cached pages and follow
    /// the saved or deleted record.
    pub fn handle_data_change(&mut self, change: DataChange) {
        let generation = self.provider.invalidate();
        self.grid.invalidate(generation);
        match change {
            DataChange::Created(contact) | DataChange::Updated(contact) => {
                if !self.form.as_ref().is_some_and(|form| form.original() == &contact) {
                    self.form = Some(ContactForm::open(&contact));
                }
                // Pages are gone; the highlight returns once the record reloads.
                self.grid.reconcile(Some(&contact));
                self.guard.replace(Some(contact));
            }
            DataChange::Deleted(contact_id) => {
                info!(contact = contact_id.get(), "selection cleared after delete");
                self.form = None;
                self.guard.replace(None);
                self.grid.reconcile(None);
            }
        }
    }

    /// Drops every cached page while keeping the scroll position.
    pub fn refresh(&mut self) {
        let generation = self.provider.invalidate();
        self.grid.invalidate(generation);
    }

    pub fn set_viewport(&mut self, first_row: usize, rows: usize) {
        self.grid.set_viewport(first_row, rows);
    }

    pub fn resize_viewport(&mut self, rows: usize) {
        self.grid.resize_viewport(rows);
    }

    /// Futures for every page the grid is missing. The host drives them and
    /// hands results back through [`ListView::apply_page`].
    pub fn pending_fetches(&mut self) -> Vec<PageFetch> {
        let criteria = self.query.state().criteria();
        self.grid
            .missing_pages()
            .into_iter()
            .map(|request| self.provider.fetch(criteria.clone(), request))
            .collect()
    }

    pub fn apply_page(&mut self, delivery: PageDelivery) -> bool {
        let page = match delivery {
            Ok(page) => page,
            Err(failed) => {
                self.grid.fail(failed.generation, failed.request);
                return false;
            }
        };
        if !self.grid.apply(page) {
            return false;
        }
        if let Some(signal) = self.grid.take_pending_signal() {
            debug!("highlighted row loaded");
            self.handle_signal(signal);
        } else if self.grid.pending_active().is_none()
            && let Some(selected) = self.guard.selected()
            && let Some(row) = self.grid.position_of(selected)
        {
            self.grid.reconcile(Some(selected));
            debug!(row, "highlight follows selected contact");
        }
        true
    }

    pub fn observe_resize(&mut self, width: u32) -> bool {
        self.layout.observe_resize(width)
    }

    pub fn on_frame(&mut self) -> Option<DisplayMode> {
        self.layout.on_frame()
    }

    fn rewind(&mut self) {
        let generation = self.provider.invalidate();
        self.grid.rewind(generation);
    }

    fn apply_selection(&mut self, outcome: &SelectionOutcome) {
        match outcome {
            SelectionOutcome::SuppressedInitial => {}
            SelectionOutcome::Selected(Some(contact)) => {
                self.form = Some(ContactForm::open(contact));
                if !contact.is_persisted() {
                    self.grid.reconcile(None);
                }
            }
            SelectionOutcome::Selected(None) => {
                self.form = None;
            }
            SelectionOutcome::Rejected { restore } => {
                self.grid.reconcile(restore.as_ref());
                self.status
                    .notify("unsaved changes -- save or cancel before switching contacts");
            }
        }
    }
}
