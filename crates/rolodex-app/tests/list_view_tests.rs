// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use futures::executor::block_on;
use rolodex_app::{
    Company, Contact, ContactField, ContactId, ContactRepository, DisplayMode, ListView,
    NavigationParams, QueryCriteria, QueryOutcome, SelectionOutcome, SelectionState, Status,
    UiStatus, ViewConfig,
};
use rolodex_testkit::{ContactFaker, FailingPageSource, ScriptedPageSource};
use std::rc::Rc;

fn acme_contact(id: i64, first: &str) -> Contact {
    let mut faker = ContactFaker::new(id as u64);
    let mut contact = faker.contact(id);
    contact.first_name = first.to_owned();
    contact.company = ContactFaker::companies()
        .into_iter()
        .find(|company| company.name == "Acme");
    contact
}

fn other_contact(id: i64) -> Contact {
    let mut faker = ContactFaker::new(id as u64);
    let mut contact = faker.contact(id);
    contact.company = ContactFaker::companies()
        .into_iter()
        .find(|company| company.name == "Summit Works");
    contact
}

fn view_over(source: &Rc<ScriptedPageSource>, page_size: usize) -> ListView {
    ListView::new(
        source.clone(),
        UiStatus::default(),
        ViewConfig {
            page_size,
            ..ViewConfig::default()
        },
    )
}

/// Resolves every outstanding page request until the grid stops asking.
fn drive(view: &mut ListView) {
    loop {
        let fetches = view.pending_fetches();
        if fetches.is_empty() {
            break;
        }
        for fetch in fetches {
            let page = block_on(fetch);
            view.apply_page(page);
        }
    }
}

fn type_into(view: &mut ListView, field: ContactField, value: &str) {
    let form = view.form_mut().expect("form open");
    if let Some(text) = form.text_mut(field) {
        *text = value.to_owned();
    }
}

struct SourceRepository {
    source: Rc<ScriptedPageSource>,
    contacts: Vec<Contact>,
    next_id: i64,
}

impl ContactRepository for SourceRepository {
    fn save_contact(&mut self, contact: &Contact) -> Result<Contact> {
        let mut saved = contact.clone();
        match saved.id {
            Some(id) => {
                if let Some(existing) = self.contacts.iter_mut().find(|c| c.id == Some(id)) {
                    *existing = saved.clone();
                }
            }
            None => {
                self.next_id += 1;
                saved.id = Some(ContactId::new(self.next_id));
                self.contacts.push(saved.clone());
            }
        }
        self.source.set_contacts(self.contacts.clone());
        Ok(saved)
    }

    fn delete_contact(&mut self, contact_id: ContactId) -> Result<()> {
        self.contacts.retain(|c| c.id != Some(contact_id));
        self.source.set_contacts(self.contacts.clone());
        Ok(())
    }

    fn list_companies(&mut self) -> Result<Vec<Company>> {
        Ok(ContactFaker::companies())
    }

    fn list_statuses(&mut self) -> Result<Vec<Status>> {
        Ok(ContactFaker::statuses())
    }
}

#[test]
fn scoped_query_caps_total_at_short_page() {
    let mut contacts = vec![acme_contact(1, "Avery"), acme_contact(2, "Blake")];
    contacts.extend((3..30).map(other_contact));
    let source = Rc::new(ScriptedPageSource::new(contacts));
    let mut view = view_over(&source, 20);
    view.set_viewport(0, 40);

    view.enter(&NavigationParams {
        company: Some("Acme".to_owned()),
        status: None,
    });
    drive(&mut view);

    assert_eq!(view.grid().row_count(), 2);
    let requests = source.requests();
    assert_eq!(requests.len(), 2);
    for recorded in requests {
        assert_eq!(
            recorded.criteria,
            QueryCriteria::Scope {
                company: Some("Acme".to_owned()),
                status: None,
            }
        );
    }
}

#[test]
fn first_signal_after_attach_never_selects() {
    let source = Rc::new(ScriptedPageSource::new((1..5).map(other_contact).collect()));
    let mut view = view_over(&source, 10);

    let outcome = view.enter(&NavigationParams::default());
    assert_eq!(outcome, SelectionOutcome::SuppressedInitial);
    assert_eq!(view.selected(), None);
    assert!(!view.detail_visible());

    drive(&mut view);
    let outcome = view.move_highlight(1);
    assert!(matches!(outcome, Some(SelectionOutcome::Selected(Some(_)))));
    assert!(view.detail_visible());
}

#[test]
fn dirty_form_blocks_row_switch_and_restores_highlight() {
    let source = Rc::new(ScriptedPageSource::new((1..6).map(other_contact).collect()));
    let mut view = view_over(&source, 10);
    view.set_viewport(0, 10);
    view.enter(&NavigationParams::default());
    drive(&mut view);

    view.activate_row(0);
    let row_a = view.selected().cloned().expect("row A selected");
    type_into(&mut view, ContactField::LastName, "Changed");
    assert!(view.is_dirty());
    assert_eq!(view.selection_state(), SelectionState::Editing);

    let outcome = view.activate_row(1);
    assert_eq!(
        outcome,
        Some(SelectionOutcome::Rejected {
            restore: Some(row_a.clone())
        })
    );
    assert_eq!(view.selected(), Some(&row_a));
    assert_eq!(view.grid().active_row(), Some(0));
    assert!(view.status().message().open);

    let outcome = view.edit_new();
    assert!(matches!(outcome, Some(SelectionOutcome::Rejected { .. })));
    assert_eq!(view.selected(), Some(&row_a));
}

#[test]
fn filter_change_supersedes_in_flight_pages() {
    let source = Rc::new(ScriptedPageSource::new((1..40).map(other_contact).collect()));
    let mut view = view_over(&source, 10);
    view.set_viewport(0, 10);
    view.enter(&NavigationParams {
        company: Some("Summit Works".to_owned()),
        status: None,
    });

    let stale = view.pending_fetches();
    assert_eq!(stale.len(), 1);

    assert_eq!(view.update_filter("avery"), QueryOutcome::Changed);
    assert_eq!(view.query().company(), None);
    assert_eq!(view.query().status(), None);

    for fetch in stale {
        assert!(!view.apply_page(block_on(fetch)));
    }
    drive(&mut view);

    let last = source.requests().pop().expect("fresh request");
    assert_eq!(last.criteria, QueryCriteria::Email("avery".to_owned()));
    assert_eq!(last.request.index(), 0);
    for row in 0..view.grid().row_count() {
        let contact = view.grid().row(row).expect("row loaded");
        assert!(contact.email.contains("avery"), "{}", contact.email);
    }
}

#[test]
fn out_of_order_results_are_placed_by_index() {
    let source = Rc::new(ScriptedPageSource::new((1..=30).map(other_contact).collect()));
    let mut view = view_over(&source, 10);
    view.set_viewport(0, 30);
    view.enter(&NavigationParams::default());

    let mut fetches = view.pending_fetches();
    assert_eq!(fetches.len(), 3);
    fetches.reverse();
    for fetch in fetches {
        assert!(view.apply_page(block_on(fetch)));
    }

    for row in 0..30 {
        let id = view.grid().row(row).and_then(|c| c.id);
        assert_eq!(id, Some(ContactId::new(row as i64 + 1)));
    }
}

#[test]
fn saving_invalidates_and_refetch_sees_new_record() -> Result<()> {
    let contacts = (1..4).map(other_contact).collect::<Vec<_>>();
    let source = Rc::new(ScriptedPageSource::new(contacts.clone()));
    let mut repository = SourceRepository {
        source: source.clone(),
        contacts,
        next_id: 100,
    };
    let mut view = view_over(&source, 10);
    view.set_viewport(0, 10);
    view.enter(&NavigationParams::default());
    drive(&mut view);
    assert_eq!(view.grid().row_count(), 3);
    let generation = view.grid().generation();

    assert!(matches!(
        view.edit_new(),
        Some(SelectionOutcome::Selected(Some(_)))
    ));
    type_into(&mut view, ContactField::FirstName, "Zed");
    type_into(&mut view, ContactField::LastName, "Zimmer");
    type_into(&mut view, ContactField::Email, "zed@zimmer.test");
    view.save(&mut repository)?;

    assert!(view.grid().generation() > generation);
    assert!(!view.is_dirty());
    drive(&mut view);
    assert_eq!(view.grid().row_count(), 4);
    assert_eq!(
        view.selected().and_then(|c| c.id),
        Some(ContactId::new(101))
    );
    assert_eq!(view.grid().active_row(), Some(3));

    view.delete(&mut repository)?;
    assert_eq!(view.selected(), None);
    drive(&mut view);
    assert_eq!(view.grid().row_count(), 3);
    Ok(())
}

#[test]
fn failed_page_is_reported_and_not_retried() {
    let source = Rc::new(ScriptedPageSource::new((1..5).map(other_contact).collect()));
    source.fail_page(0, "backend unavailable");
    let mut view = view_over(&source, 10);
    view.enter(&NavigationParams::default());

    drive(&mut view);
    drive(&mut view);
    assert_eq!(source.request_count(), 1);
    assert_eq!(view.grid().row_count(), 0);
    let message = view.status().message();
    assert!(message.error);
    assert!(message.text.contains("backend unavailable"));

    source.clear_overrides();
    view.refresh();
    drive(&mut view);
    assert_eq!(view.grid().row_count(), 4);
}

#[test]
fn offline_mode_makes_filter_and_add_inert() {
    let source = Rc::new(ScriptedPageSource::new((1..5).map(other_contact).collect()));
    let status = UiStatus::new(true);
    let mut view = ListView::new(source.clone(), status.clone(), ViewConfig::default());
    view.enter(&NavigationParams {
        company: Some("Acme".to_owned()),
        status: None,
    });
    drive(&mut view);
    let generation = view.grid().generation();

    assert_eq!(view.update_filter("kai"), QueryOutcome::Offline);
    assert_eq!(view.query().filter_text(), "");
    assert_eq!(view.query().company(), None);
    assert_eq!(view.grid().generation(), generation);
    assert_eq!(view.edit_new(), None);

    status.set_offline(false);
    assert_eq!(view.update_filter("kai"), QueryOutcome::Changed);
    assert!(view.edit_new().is_some());
}

#[test]
fn resize_burst_evaluates_once_per_frame() {
    let source = Rc::new(ScriptedPageSource::new(Vec::new()));
    let mut view = view_over(&source, 10);

    for width in [1400, 1200, 900, 790, 640] {
        view.observe_resize(width);
    }
    assert_eq!(view.on_frame(), Some(DisplayMode::Narrow));
    assert_eq!(view.layout().evaluations(), 1);
    assert_eq!(view.on_frame(), None);
    assert_eq!(view.layout().evaluations(), 1);

    view.observe_resize(800);
    assert_eq!(view.on_frame(), Some(DisplayMode::Wide));
    assert_eq!(source.request_count(), 0);
}

#[test]
fn cancel_reverts_dirty_form_before_closing() {
    let source = Rc::new(ScriptedPageSource::new((1..3).map(other_contact).collect()));
    let mut view = view_over(&source, 10);
    view.enter(&NavigationParams::default());
    drive(&mut view);
    view.activate_row(0);
    type_into(&mut view, ContactField::Email, "changed@example.test");

    assert!(!view.cancel_edit());
    assert!(view.detail_visible());
    assert!(!view.is_dirty());

    assert!(view.cancel_edit());
    assert!(!view.detail_visible());
    assert_eq!(view.grid().active_row(), None);
}

#[test]
fn unreachable_backend_leaves_grid_empty_and_reports_once_per_page() {
    let source = Rc::new(FailingPageSource::new("connection refused"));
    let mut view = ListView::new(
        source.clone(),
        UiStatus::default(),
        ViewConfig {
            page_size: 10,
            ..ViewConfig::default()
        },
    );
    view.set_viewport(0, 25);
    view.enter(&NavigationParams::default());

    drive(&mut view);
    assert_eq!(source.attempts(), 3);
    assert!(!view.grid().is_loading());
    assert!(view.pending_fetches().is_empty());
    assert_eq!(view.grid().row_count(), 0);
    assert!(view.grid().row(0).is_none());
    let message = view.status().message();
    assert!(message.error);
    assert!(message.text.contains("connection refused"), "{}", message.text);
}

#[test]
fn paging_into_unloaded_rows_selects_once_the_page_arrives() {
    let source = Rc::new(ScriptedPageSource::new((1..=30).map(other_contact).collect()));
    let mut view = view_over(&source, 10);
    view.set_viewport(0, 10);
    view.enter(&NavigationParams::default());
    drive(&mut view);

    view.activate_row(0);
    let first = view.selected().cloned().expect("row 0 selected");

    assert_eq!(view.move_highlight(10), None);
    assert_eq!(view.grid().active_row(), Some(10));
    assert_eq!(view.selected(), Some(&first));
    assert!(view.detail_visible());

    drive(&mut view);
    let highlighted = view.grid().row(10).cloned().expect("row 10 loaded");
    assert_eq!(view.grid().active_row(), Some(10));
    assert_eq!(view.selected(), Some(&highlighted));
    assert_eq!(highlighted.id, Some(ContactId::new(11)));
}

#[test]
fn dirty_form_rejects_deferred_row_when_it_loads() {
    let source = Rc::new(ScriptedPageSource::new((1..=30).map(other_contact).collect()));
    let mut view = view_over(&source, 10);
    view.set_viewport(0, 10);
    view.enter(&NavigationParams::default());
    drive(&mut view);

    view.activate_row(0);
    let first = view.selected().cloned().expect("row 0 selected");
    type_into(&mut view, ContactField::LastName, "Edited");

    assert_eq!(view.move_highlight(10), None);
    drive(&mut view);
    assert_eq!(view.selected(), Some(&first));
    assert_eq!(view.grid().active_row(), Some(0));
    assert!(view.is_dirty());
    assert!(view.status().message().open);
}

#[test]
fn reported_total_avoids_fetching_past_the_end() {
    let source = Rc::new(ScriptedPageSource::new((1..=40).map(other_contact).collect()));
    let mut view = view_over(&source, 20);
    view.set_viewport(0, 20);
    view.enter(&NavigationParams::default());
    drive(&mut view);
    assert_eq!(view.grid().row_count(), 40);

    view.set_viewport(25, 20);
    drive(&mut view);
    assert_eq!(source.request_count(), 2);
    assert_eq!(view.grid().row_count(), 40);
    assert!(view.grid().row(39).is_some());
}
