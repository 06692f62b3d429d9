// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::status::UiStatus;

/// Filter and scope applied to every page fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryState {
    filter_text: String,
    company: Option<String>,
    status: Option<String>,
}

/// What actually reaches the page source. A non-empty filter text always
/// wins, so scope and filter never contribute to the same query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCriteria {
    Email(String),
    Scope {
        company: Option<String>,
        status: Option<String>,
    },
}

impl QueryState {
    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn criteria(&self) -> QueryCriteria {
        if self.filter_text.is_empty() {
            QueryCriteria::Scope {
                company: self.company.clone(),
                status: self.status.clone(),
            }
        } else {
            QueryCriteria::Email(self.filter_text.clone())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Changed,
    Offline,
}

#[derive(Debug, Clone)]
pub struct QueryController {
    state: QueryState,
    status: UiStatus,
}

impl QueryController {
    pub fn new(status: UiStatus) -> Self {
        Self {
            state: QueryState::default(),
            status,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn set_filter_text(&mut self, text: &str) -> QueryOutcome {
        if self.status.offline() {
            debug!("filter change ignored while offline");
            return QueryOutcome::Offline;
        }
        self.state.filter_text = text.to_owned();
        self.state.company = None;
        self.state.status = None;
        debug!(filter = text, "filter text updated");
        QueryOutcome::Changed
    }

    pub fn apply_scope(&mut self, company: Option<&str>, status: Option<&str>) -> QueryOutcome {
        if self.status.offline() {
            debug!("scope change ignored while offline");
            return QueryOutcome::Offline;
        }
        if let Some(company) = company {
            self.state.company = Some(company.to_owned());
        }
        if let Some(status) = status {
            self.state.status = Some(status.to_owned());
        }
        debug!(?company, ?status, "query scope applied");
        QueryOutcome::Changed
    }
}
