// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use rolodex_app::{Company, Contact, ContactId, ContactRepository, Status};
use rolodex_db::Store;

/// Detail-form persistence backed by the same store that serves pages.
pub struct DbRuntime<'a> {
    store: &'a Store,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl ContactRepository for DbRuntime<'_> {
    fn save_contact(&mut self, contact: &Contact) -> Result<Contact> {
        self.store.save_contact(contact)
    }

    fn delete_contact(&mut self, contact_id: ContactId) -> Result<()> {
        self.store.delete_contact(contact_id)
    }

    fn list_companies(&mut self) -> Result<Vec<Company>> {
        self.store.list_companies()
    }

    fn list_statuses(&mut self) -> Result<Vec<Status>> {
        self.store.list_statuses()
    }
}
