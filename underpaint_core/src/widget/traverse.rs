// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, WidgetId};
use super::store::WidgetStore;

/// An iterator over the direct children of a widget, bottom to top.
///
/// Created by [`WidgetStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a WidgetStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a WidgetStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(WidgetId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}

/// An iterator over a subtree in depth-first pre-order.
///
/// Created by [`WidgetStore::descendants`]. The root itself is yielded
/// first.
#[derive(Debug)]
pub struct Descendants<'a> {
    store: &'a WidgetStore,
    root: u32,
    current: u32,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(store: &'a WidgetStore, root: u32) -> Self {
        Self {
            store,
            root,
            current: root,
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        let s = self.store;

        // Advance: first child, else next sibling of the nearest ancestor
        // that has one, stopping at the root.
        self.current = if s.first_child[idx as usize] != INVALID {
            s.first_child[idx as usize]
        } else {
            let mut n = idx;
            loop {
                if n == self.root {
                    break INVALID;
                }
                if s.next_sibling[n as usize] != INVALID {
                    break s.next_sibling[n as usize];
                }
                n = s.parent[n as usize];
            }
        };

        Some(WidgetId {
            idx,
            generation: s.generation[idx as usize],
        })
    }
}
