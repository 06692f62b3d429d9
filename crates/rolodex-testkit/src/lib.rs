// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rolodex_app::{
    Company, CompanyId, Contact, ContactId, Page, PageRequest, PageSource, QueryCriteria, Status,
    StatusId,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];
const COMPANIES: [&str; 6] = [
    "Acme",
    "Summit Works",
    "Greenleaf Group",
    "Heritage Co",
    "Bright Solutions",
    "Apex Pros",
];
const STATUSES: [&str; 5] = [
    "Imported lead",
    "Not contacted",
    "Contacted",
    "Customer",
    "Closed (lost)",
];
const MAIL_DOMAINS: [&str; 4] = ["example.com", "example.org", "mail.test", "corp.test"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic contact generator for tests and fixtures.
#[derive(Debug, Clone)]
pub struct ContactFaker {
    rng: DeterministicRng,
}

impl ContactFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn companies() -> Vec<Company> {
        COMPANIES
            .iter()
            .enumerate()
            .map(|(index, name)| Company {
                id: CompanyId::new(index as i64 + 1),
                name: (*name).to_owned(),
            })
            .collect()
    }

    pub fn statuses() -> Vec<Status> {
        STATUSES
            .iter()
            .enumerate()
            .map(|(index, name)| Status {
                id: StatusId::new(index as i64 + 1),
                name: (*name).to_owned(),
            })
            .collect()
    }

    pub fn contact(&mut self, id: i64) -> Contact {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let domain = self.pick(&MAIL_DOMAINS);
        let companies = Self::companies();
        let statuses = Self::statuses();
        let company = companies[self.rng.int_n(companies.len())].clone();
        let status = statuses[self.rng.int_n(statuses.len())].clone();
        Contact {
            id: Some(ContactId::new(id)),
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            email: format!(
                "{}.{}{id}@{domain}",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
            status: Some(status),
            company: Some(company),
        }
    }

    pub fn contacts(&mut self, count: usize) -> Vec<Contact> {
        (1..=count as i64).map(|id| self.contact(id)).collect()
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

pub fn matches_criteria(contact: &Contact, criteria: &QueryCriteria) -> bool {
    match criteria {
        QueryCriteria::Email(text) => contact
            .email
            .to_lowercase()
            .contains(&text.to_lowercase()),
        QueryCriteria::Scope { company, status } => {
            company
                .as_deref()
                .is_none_or(|name| contact.company_name() == name)
                && status
                    .as_deref()
                    .is_none_or(|name| contact.status_name() == name)
        }
    }
}

/// What a scripted source reports in `Page::size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedSize {
    TotalMatches,
    PageSize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub criteria: QueryCriteria,
    pub request: PageRequest,
}

/// In-memory page source that filters a contact list, records every
/// request, and can be told to fail or override specific pages.
#[derive(Debug)]
pub struct ScriptedPageSource {
    contacts: RefCell<Vec<Contact>>,
    overrides: RefCell<BTreeMap<usize, std::result::Result<Page, String>>>,
    requests: RefCell<Vec<RecordedRequest>>,
    reported_size: ReportedSize,
}

impl ScriptedPageSource {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: RefCell::new(contacts),
            overrides: RefCell::new(BTreeMap::new()),
            requests: RefCell::new(Vec::new()),
            reported_size: ReportedSize::TotalMatches,
        }
    }

    pub fn with_reported_size(mut self, reported_size: ReportedSize) -> Self {
        self.reported_size = reported_size;
        self
    }

    pub fn set_contacts(&self, contacts: Vec<Contact>) {
        *self.contacts.borrow_mut() = contacts;
    }

    pub fn override_page(&self, index: usize, page: Page) {
        self.overrides.borrow_mut().insert(index, Ok(page));
    }

    pub fn fail_page(&self, index: usize, message: &str) {
        self.overrides
            .borrow_mut()
            .insert(index, Err(message.to_owned()));
    }

    pub fn clear_overrides(&self) {
        self.overrides.borrow_mut().clear();
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    fn page_for(&self, criteria: &QueryCriteria, request: PageRequest) -> Result<Page> {
        if let Some(scripted) = self.overrides.borrow().get(&request.index()) {
            return scripted.clone().map_err(|message| anyhow!(message));
        }

        let contacts = self.contacts.borrow();
        let matching = contacts
            .iter()
            .filter(|contact| matches_criteria(contact, criteria))
            .collect::<Vec<_>>();
        let content = matching
            .iter()
            .skip(request.offset())
            .take(request.size())
            .map(|contact| (*contact).clone())
            .collect::<Vec<_>>();
        let size = match self.reported_size {
            ReportedSize::TotalMatches => matching.len(),
            ReportedSize::PageSize => request.size(),
        };
        Ok(Page { content, size })
    }
}

#[async_trait(?Send)]
impl PageSource for ScriptedPageSource {
    async fn fetch_page(&self, criteria: &QueryCriteria, request: PageRequest) -> Result<Page> {
        self.requests.borrow_mut().push(RecordedRequest {
            criteria: criteria.clone(),
            request,
        });
        self.page_for(criteria, request)
    }
}

/// Page source whose every fetch fails with the same message.
#[derive(Debug)]
pub struct FailingPageSource {
    message: String,
    attempts: RefCell<usize>,
}

impl FailingPageSource {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_owned(),
            attempts: RefCell::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.borrow()
    }
}

#[async_trait(?Send)]
impl PageSource for FailingPageSource {
    async fn fetch_page(&self, _criteria: &QueryCriteria, request: PageRequest) -> Result<Page> {
        *self.attempts.borrow_mut() += 1;
        Err(anyhow!("{} (page {})", self.message, request.index()))
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("rolodex.db");
    Ok((dir, db_path))
}

pub fn status_names() -> &'static [&'static str] {
    &STATUSES
}
