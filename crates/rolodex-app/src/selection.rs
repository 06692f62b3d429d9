// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, info};

use crate::model::Contact;

/// Read-only view of the edit session's unsaved-changes flag.
pub trait DirtyFlag {
    fn is_dirty(&self) -> bool;
}

impl DirtyFlag for bool {
    fn is_dirty(&self) -> bool {
        *self
    }
}

impl<T: DirtyFlag> DirtyFlag for Option<T> {
    fn is_dirty(&self) -> bool {
        self.as_ref().is_some_and(DirtyFlag::is_dirty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Selected,
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The widget's attachment signal; ignored regardless of payload.
    SuppressedInitial,
    Selected(Option<Contact>),
    /// Unsaved edits block the change. The widget highlight must go back
    /// to `restore`.
    Rejected { restore: Option<Contact> },
}

#[derive(Debug, Clone)]
pub struct SelectionGuard {
    selected: Option<Contact>,
    awaiting_initial: bool,
}

impl Default for SelectionGuard {
    fn default() -> Self {
        Self {
            selected: None,
            awaiting_initial: true,
        }
    }
}

impl SelectionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-arms suppression of the widget's first signal after attachment.
    pub fn attach(&mut self) {
        self.awaiting_initial = true;
    }

    pub fn selected(&self) -> Option<&Contact> {
        self.selected.as_ref()
    }

    pub fn state(&self, dirty: &dyn DirtyFlag) -> SelectionState {
        match &self.selected {
            None => SelectionState::Idle,
            Some(_) if dirty.is_dirty() => SelectionState::Editing,
            Some(_) => SelectionState::Selected,
        }
    }

    pub fn on_active_item_changed(
        &mut self,
        candidate: Option<Contact>,
        dirty: &dyn DirtyFlag,
    ) -> SelectionOutcome {
        if self.awaiting_initial {
            self.awaiting_initial = false;
            debug!("suppressed initial selection signal");
            return SelectionOutcome::SuppressedInitial;
        }
        self.select(candidate, dirty)
    }

    pub fn edit_new(&mut self, dirty: &dyn DirtyFlag) -> SelectionOutcome {
        self.select(Some(Contact::placeholder()), dirty)
    }

    /// Sets the selection without consulting the dirty flag. Used after the
    /// edit session itself saved or deleted the record.
    pub fn replace(&mut self, contact: Option<Contact>) {
        self.selected = contact;
    }

    fn select(&mut self, candidate: Option<Contact>, dirty: &dyn DirtyFlag) -> SelectionOutcome {
        if dirty.is_dirty() {
            info!(
                candidate = ?candidate.as_ref().and_then(|c| c.id),
                "selection change blocked by unsaved edits"
            );
            return SelectionOutcome::Rejected {
                restore: self.selected.clone(),
            };
        }
        self.selected = candidate.clone();
        SelectionOutcome::Selected(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::{SelectionGuard, SelectionOutcome, SelectionState};
    use crate::{Contact, ContactId};

    fn contact(id: i64) -> Contact {
        Contact {
            id: Some(ContactId::new(id)),
            ..Contact::placeholder()
        }
    }

    fn attached_guard() -> SelectionGuard {
        let mut guard = SelectionGuard::new();
        guard.on_active_item_changed(None, &false);
        guard
    }

    #[test]
    fn first_signal_is_suppressed_even_with_payload_and_dirty() {
        for dirty in [false, true] {
            let mut guard = SelectionGuard::new();
            let outcome = guard.on_active_item_changed(Some(contact(1)), &dirty);
            assert_eq!(outcome, SelectionOutcome::SuppressedInitial);
            assert_eq!(guard.selected(), None);
        }
    }

    #[test]
    fn clean_selection_and_deselection() {
        let mut guard = attached_guard();

        let outcome = guard.on_active_item_changed(Some(contact(1)), &false);
        assert_eq!(outcome, SelectionOutcome::Selected(Some(contact(1))));
        assert_eq!(guard.selected(), Some(&contact(1)));

        let outcome = guard.on_active_item_changed(None, &false);
        assert_eq!(outcome, SelectionOutcome::Selected(None));
        assert_eq!(guard.selected(), None);
    }

    #[test]
    fn dirty_selection_is_rejected_with_prior_record() {
        let mut guard = attached_guard();
        guard.on_active_item_changed(Some(contact(1)), &false);

        let outcome = guard.on_active_item_changed(Some(contact(2)), &true);
        assert_eq!(
            outcome,
            SelectionOutcome::Rejected {
                restore: Some(contact(1))
            }
        );
        assert_eq!(guard.selected(), Some(&contact(1)));

        let outcome = guard.on_active_item_changed(None, &true);
        assert!(matches!(outcome, SelectionOutcome::Rejected { .. }));
        assert_eq!(guard.selected(), Some(&contact(1)));
    }

    #[test]
    fn edit_new_follows_dirty_policy() {
        let mut guard = SelectionGuard::new();
        let outcome = guard.edit_new(&true);
        assert_eq!(outcome, SelectionOutcome::Rejected { restore: None });

        let outcome = guard.edit_new(&false);
        assert_eq!(
            outcome,
            SelectionOutcome::Selected(Some(Contact::placeholder()))
        );
        assert!(guard.selected().is_some_and(|c| !c.is_persisted()));
    }

    #[test]
    fn reattach_suppresses_again() {
        let mut guard = attached_guard();
        guard.on_active_item_changed(Some(contact(1)), &false);

        guard.attach();
        let outcome = guard.on_active_item_changed(None, &false);
        assert_eq!(outcome, SelectionOutcome::SuppressedInitial);
        assert_eq!(guard.selected(), Some(&contact(1)));
    }

    #[test]
    fn state_reflects_dirty_flag() {
        let mut guard = attached_guard();
        assert_eq!(guard.state(&false), SelectionState::Idle);
        guard.on_active_item_changed(Some(contact(1)), &false);
        assert_eq!(guard.state(&false), SelectionState::Selected);
        assert_eq!(guard.state(&true), SelectionState::Editing);
    }
}
