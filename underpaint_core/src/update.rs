// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update scheduling hints and the coalescing request queue.
//!
//! A damage call posts an [`UpdateRequest`] naming the widget to service
//! (the top level for a backing-store sync, or a paint-on-screen widget for
//! its own repaint) and the embedding event loop drains the [`UpdateQueue`].
//! The `_now` damage calls of
//! [`TopLevelSurface`](crate::surface::TopLevelSurface) are the exception:
//! they take an unthrottled [`UpdateTime::Now`] request straight back off the
//! queue and service it before returning.
//!
//! Coalescing rules:
//!
//! - At most one request per widget is ever queued.
//! - [`UpdateTime::Later`] appends unless the widget is already queued.
//! - [`UpdateTime::Now`] moves the widget's request to the front and
//!   upgrades it.

use alloc::collections::VecDeque;

use crate::widget::WidgetId;

/// When damage should be serviced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdateTime {
    /// Coalesce with other damage and service on a later loop iteration.
    #[default]
    Later,
    /// Service before returning when a painter is at hand, otherwise before
    /// anything else that is pending.
    Now,
}

/// Whether pixels already in the backing store may be reused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferState {
    /// Existing pixels are valid; damage goes through the widget's record.
    #[default]
    Valid,
    /// Existing pixels cannot be trusted; damage goes straight into the
    /// surface's aggregate dirty region.
    Invalid,
}

/// A pending request to service a widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateRequest {
    /// The top level (sync) or a paint-on-screen widget (direct repaint).
    pub widget: WidgetId,
    /// How urgently.
    pub time: UpdateTime,
}

/// A coalescing FIFO of [`UpdateRequest`]s.
#[derive(Clone, Debug, Default)]
pub struct UpdateQueue {
    requests: VecDeque<UpdateRequest>,
}

impl UpdateQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requests: VecDeque::new(),
        }
    }

    /// Posts a request, coalescing with any request already queued for the
    /// same widget.
    pub fn post(&mut self, widget: WidgetId, time: UpdateTime) {
        let existing = self.requests.iter().position(|r| r.widget == widget);
        match (time, existing) {
            (UpdateTime::Later, Some(_)) => {}
            (UpdateTime::Later, None) => self.requests.push_back(UpdateRequest { widget, time }),
            (UpdateTime::Now, Some(i)) => {
                self.requests.remove(i);
                self.requests.push_front(UpdateRequest { widget, time });
            }
            (UpdateTime::Now, None) => self.requests.push_front(UpdateRequest { widget, time }),
        }
    }

    /// Removes and returns the next request.
    pub fn pop(&mut self) -> Option<UpdateRequest> {
        self.requests.pop_front()
    }

    /// Returns the next request without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&UpdateRequest> {
        self.requests.front()
    }

    /// Returns `true` if a request for `widget` is queued.
    #[must_use]
    pub fn contains(&self, widget: WidgetId) -> bool {
        self.requests.iter().any(|r| r.widget == widget)
    }

    /// Drops any request for `widget`.
    pub fn remove(&mut self, widget: WidgetId) {
        self.requests.retain(|r| r.widget != widget);
    }

    /// Returns the number of queued requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Drops every request.
    pub fn clear(&mut self) {
        self.requests.clear();
    }
}
