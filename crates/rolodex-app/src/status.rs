// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusMessage {
    pub text: String,
    pub error: bool,
    pub open: bool,
}

#[derive(Debug, Default)]
struct UiStatusInner {
    offline: bool,
    message: StatusMessage,
    token: u64,
}

/// Shared connectivity flag and notification channel. Cloning yields another
/// handle onto the same state; everything runs on the UI thread.
#[derive(Debug, Clone, Default)]
pub struct UiStatus {
    inner: Rc<RefCell<UiStatusInner>>,
}

impl UiStatus {
    pub fn new(offline: bool) -> Self {
        let status = Self::default();
        status.set_offline(offline);
        status
    }

    pub fn offline(&self) -> bool {
        self.inner.borrow().offline
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.borrow_mut().offline = offline;
    }

    pub fn message(&self) -> StatusMessage {
        self.inner.borrow().message.clone()
    }

    /// Bumped on every new message so delayed dismissals can tell whether
    /// they still refer to the message on screen.
    pub fn message_token(&self) -> u64 {
        self.inner.borrow().token
    }

    pub fn notify(&self, text: impl Into<String>) -> u64 {
        self.publish(text.into(), false)
    }

    pub fn notify_error(&self, text: impl Into<String>) -> u64 {
        self.publish(text.into(), true)
    }

    pub fn dismiss_if_current(&self, token: u64) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.token != token || !inner.message.open {
            return false;
        }
        inner.message.open = false;
        true
    }

    fn publish(&self, text: String, error: bool) -> u64 {
        let mut inner = self.inner.borrow_mut();
        inner.token = inner.token.wrapping_add(1);
        inner.message = StatusMessage {
            text,
            error,
            open: true,
        };
        inner.token
    }
}
