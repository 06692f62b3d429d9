// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use tracing::info;

use crate::ids::ContactId;
use crate::model::{Company, Contact, Status};
use crate::selection::DirtyFlag;

/// Persistence used by the detail form.
pub trait ContactRepository {
    fn save_contact(&mut self, contact: &Contact) -> Result<Contact>;
    fn delete_contact(&mut self, contact_id: ContactId) -> Result<()>;
    fn list_companies(&mut self) -> Result<Vec<Company>>;
    fn list_statuses(&mut self) -> Result<Vec<Status>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    FirstName,
    LastName,
    Email,
    Status,
    Company,
}

impl ContactField {
    pub const ALL: [Self; 5] = [
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Status,
        Self::Company,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::Email => "Email",
            Self::Status => "Status",
            Self::Company => "Company",
        }
    }

    pub const fn is_text(self) -> bool {
        matches!(self, Self::FirstName | Self::LastName | Self::Email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: Option<Status>,
    pub company: Option<Company>,
}

impl ContactDraft {
    fn from_contact(contact: &Contact) -> Self {
        Self {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email.clone(),
            status: contact.status.clone(),
            company: contact.company.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_name.trim().is_empty() {
            bail!("first name is required -- enter a first name and retry");
        }
        if self.last_name.trim().is_empty() {
            bail!("last name is required -- enter a last name and retry");
        }
        let email = self.email.trim();
        if email.is_empty() {
            bail!("email is required -- enter an email address and retry");
        }
        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {}
            _ => bail!("email {email:?} is not a valid address -- use name@domain"),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataChange {
    Created(Contact),
    Updated(Contact),
    Deleted(ContactId),
}

/// Edit session for the selected contact. Dirty while the draft differs
/// from the record it was opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactForm {
    original: Contact,
    draft: ContactDraft,
    focus: ContactField,
}

impl ContactForm {
    pub fn open(contact: &Contact) -> Self {
        Self {
            original: contact.clone(),
            draft: ContactDraft::from_contact(contact),
            focus: ContactField::FirstName,
        }
    }

    pub fn original(&self) -> &Contact {
        &self.original
    }

    pub fn draft(&self) -> &ContactDraft {
        &self.draft
    }

    pub fn is_new(&self) -> bool {
        !self.original.is_persisted()
    }

    pub fn focus(&self) -> ContactField {
        self.focus
    }

    pub fn move_focus(&mut self, delta: isize) {
        let fields = ContactField::ALL;
        let current = fields
            .iter()
            .position(|field| *field == self.focus)
            .unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(fields.len() as isize) as usize;
        self.focus = fields[next];
    }

    pub fn value(&self, field: ContactField) -> String {
        match field {
            ContactField::FirstName => self.draft.first_name.clone(),
            ContactField::LastName => self.draft.last_name.clone(),
            ContactField::Email => self.draft.email.clone(),
            ContactField::Status => self
                .draft
                .status
                .as_ref()
                .map(|status| status.name.clone())
                .unwrap_or_default(),
            ContactField::Company => self
                .draft
                .company
                .as_ref()
                .map(|company| company.name.clone())
                .unwrap_or_default(),
        }
    }

    pub fn text_mut(&mut self, field: ContactField) -> Option<&mut String> {
        match field {
            ContactField::FirstName => Some(&mut self.draft.first_name),
            ContactField::LastName => Some(&mut self.draft.last_name),
            ContactField::Email => Some(&mut self.draft.email),
            ContactField::Status | ContactField::Company => None,
        }
    }

    pub fn set_company(&mut self, company: Option<Company>) {
        self.draft.company = company;
    }

    /// Steps the status through `choices`, with "none" before the first one.
    pub fn cycle_status(&mut self, choices: &[Status], delta: isize) {
        let current = self.draft.status.as_ref().map(|status| status.id);
        let position = current.and_then(|id| choices.iter().position(|choice| choice.id == id));
        self.draft.status = cycle_choice(choices, position, delta).cloned();
    }

    pub fn cycle_company(&mut self, choices: &[Company], delta: isize) {
        let current = self.draft.company.as_ref().map(|company| company.id);
        let position = current.and_then(|id| choices.iter().position(|choice| choice.id == id));
        self.draft.company = cycle_choice(choices, position, delta).cloned();
    }

    pub fn revert(&mut self) {
        self.draft = ContactDraft::from_contact(&self.original);
    }

    pub fn to_contact(&self) -> Contact {
        Contact {
            id: self.original.id,
            first_name: self.draft.first_name.trim().to_owned(),
            last_name: self.draft.last_name.trim().to_owned(),
            email: self.draft.email.trim().to_owned(),
            status: self.draft.status.clone(),
            company: self.draft.company.clone(),
        }
    }

    pub fn save<R: ContactRepository + ?Sized>(&mut self, repository: &mut R) -> Result<DataChange> {
        self.draft.validate()?;
        let saved = repository.save_contact(&self.to_contact())?;
        let change = if self.is_new() {
            DataChange::Created(saved.clone())
        } else {
            DataChange::Updated(saved.clone())
        };
        info!(contact = ?saved.id, "contact saved");
        *self = Self {
            focus: self.focus,
            ..Self::open(&saved)
        };
        Ok(change)
    }

    pub fn delete<R: ContactRepository + ?Sized>(&self, repository: &mut R) -> Result<DataChange> {
        let Some(contact_id) = self.original.id else {
            bail!("contact is not saved yet -- cancel the form to discard it");
        };
        repository.delete_contact(contact_id)?;
        info!(contact = contact_id.get(), "contact deleted");
        Ok(DataChange::Deleted(contact_id))
    }
}

impl DirtyFlag for ContactForm {
    fn is_dirty(&self) -> bool {
        self.draft != ContactDraft::from_contact(&self.original)
    }
}

fn cycle_choice<T>(choices: &[T], position: Option<usize>, delta: isize) -> Option<&T> {
    // Slot 0 is "none", slots 1..=len map to choices.
    let slots = choices.len() as isize + 1;
    let current = position.map_or(0, |index| index as isize + 1);
    let next = (current + delta).rem_euclid(slots);
    if next == 0 {
        None
    } else {
        choices.get(next as usize - 1)
    }
}
