// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded, newest-first notification list.

use std::collections::VecDeque;

use crate::models::NotificationEvent;

/// Maximum number of notifications kept for display.
pub const MAX_NOTIFICATIONS: usize = 5;

/// Most-recent-first ring of the last [`MAX_NOTIFICATIONS`] events.
#[derive(Debug, Default)]
pub struct NotificationList {
    entries: VecDeque<NotificationEvent>,
}

impl NotificationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event at the front, evicting the oldest entry when full.
    pub fn push(&mut self, event: NotificationEvent) {
        self.entries.push_front(event);
        self.entries.truncate(MAX_NOTIFICATIONS);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &NotificationEvent> {
        self.entries.iter()
    }

    /// Clone the current entries, newest first.
    pub fn snapshot(&self) -> Vec<NotificationEvent> {
        self.entries.iter().cloned().collect()
    }
}
