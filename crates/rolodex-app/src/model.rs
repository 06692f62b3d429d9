// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::ids::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub name: String,
}

/// A contact record as held by the view. `id` is `None` for the placeholder
/// created by "add contact" until the backend persists it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    pub id: Option<ContactId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: Option<Status>,
    pub company: Option<Company>,
}

impl Contact {
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Two contacts denote the same backend record. Placeholders never match
    /// anything, including each other.
    pub fn same_record(&self, other: &Contact) -> bool {
        matches!((self.id, other.id), (Some(left), Some(right)) if left == right)
    }

    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        full.trim().to_owned()
    }

    pub fn status_name(&self) -> &str {
        self.status.as_ref().map_or("", |status| status.name.as_str())
    }

    pub fn company_name(&self) -> &str {
        self.company.as_ref().map_or("", |company| company.name.as_str())
    }

    /// Single-column rendering used by the narrow display mode.
    pub fn summary(&self) -> String {
        let mut parts = vec![self.full_name(), self.email.clone()];
        for extra in [self.status_name(), self.company_name()] {
            if !extra.is_empty() {
                parts.push(extra.to_owned());
            }
        }
        parts.retain(|part| !part.is_empty());
        parts.join(" · ")
    }
}

/// One page of records from the page source. `size` is either the total
/// number of matching records or the page size, depending on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub content: Vec<Contact>,
    pub size: usize,
}

impl Page {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRequest {
    index: usize,
    size: usize,
}

impl PageRequest {
    pub fn new(index: usize, size: usize) -> Result<Self> {
        if size == 0 {
            bail!("page size must be positive");
        }
        Ok(Self { index, size })
    }

    pub const fn index(self) -> usize {
        self.index
    }

    pub const fn size(self) -> usize {
        self.size
    }

    pub const fn offset(self) -> usize {
        self.index * self.size
    }
}

/// Scope handed over by navigation when the view is entered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationParams {
    pub company: Option<String>,
    pub status: Option<String>,
}
