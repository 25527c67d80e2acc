// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-to-texture bookkeeping for the composition path.
//!
//! Every sync rebuilds one [`TextureList`] per native-window subtree that
//! contains visible render-to-texture widgets. The lists are handed to
//! [`BackingStore::compose_and_flush`](crate::backend::BackingStore::compose_and_flush).
//!
//! A compositor that keeps using the textures after returning locks the
//! list through
//! [`TopLevelSurface::set_texture_list_locked`](crate::surface::TopLevelSurface::set_texture_list_locked).
//! While any list is locked, syncs are deferred; a [`TextureListWatcher`]
//! remembers the locked lists and reports when all of them are released.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::Rect;

use crate::widget::{TextureId, WidgetId};

/// Stacking options of a texture entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureFlags {
    /// Draw the texture above the rasterized backing store instead of
    /// behind a transparent hole in it.
    pub stacks_on_top: bool,
}

/// One render-to-texture widget in a [`TextureList`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureEntry {
    /// The widget producing the texture.
    pub source: WidgetId,
    /// The GPU texture.
    pub texture: TextureId,
    /// The widget's rect in top-level coordinates.
    pub geometry: Rect,
    /// The visible part of the widget, in its own coordinates.
    pub clip: Rect,
    /// Stacking options.
    pub flags: TextureFlags,
}

/// The render-to-texture widgets of one native-window subtree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureList {
    root: Option<WidgetId>,
    entries: Vec<TextureEntry>,
    locked: bool,
}

impl TextureList {
    /// Creates an empty list with no subtree root.
    ///
    /// Composing through an empty list keeps a window on the composition
    /// path without drawing any texture.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            root: None,
            entries: Vec::new(),
            locked: false,
        }
    }

    /// Creates an empty list for the subtree rooted at `root`.
    #[must_use]
    pub const fn new(root: WidgetId) -> Self {
        Self {
            root: Some(root),
            entries: Vec::new(),
            locked: false,
        }
    }

    /// Returns the native widget whose subtree this list covers.
    #[must_use]
    pub fn root(&self) -> Option<WidgetId> {
        self.root
    }

    /// Returns the entries in stacking order.
    #[must_use]
    pub fn entries(&self) -> &[TextureEntry] {
        &self.entries
    }

    /// Returns `true` if the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the compositor still holds the textures.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns the entry produced by `widget`, if any.
    #[must_use]
    pub fn find(&self, widget: WidgetId) -> Option<&TextureEntry> {
        self.entries.iter().find(|e| e.source == widget)
    }

    pub(crate) fn push(&mut self, entry: TextureEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }
}

/// Tracks the lock state of the texture lists a deferred sync is waiting on.
///
/// Level-triggered: every notification re-evaluates all watched lists, so a
/// spurious extra notification is harmless.
#[derive(Clone, Debug, Default)]
pub struct TextureListWatcher {
    locked: BTreeMap<WidgetId, bool>,
}

impl TextureListWatcher {
    /// Creates a watcher with nothing watched.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts watching `list` with its current lock state.
    pub fn watch(&mut self, list: &TextureList) {
        if let Some(root) = list.root() {
            self.locked.insert(root, list.is_locked());
        }
    }

    /// Returns `true` if `root`'s list is being watched.
    #[must_use]
    pub fn is_watching(&self, root: WidgetId) -> bool {
        self.locked.contains_key(&root)
    }

    /// Records a lock-state change of a watched list.
    ///
    /// Returns `true` if the list was watched.
    pub fn on_lock_status_changed(&mut self, root: WidgetId, locked: bool) -> bool {
        match self.locked.get_mut(&root) {
            Some(state) => {
                *state = locked;
                true
            }
            None => false,
        }
    }

    /// Returns `true` while any watched list is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.values().any(|&v| v)
    }

    /// Returns the number of watched lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locked.len()
    }

    /// Returns `true` if nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{NativeWindowId, WidgetKind, WidgetStore};

    #[test]
    fn watcher_clears_when_all_released() {
        let mut store = WidgetStore::new();
        let a = store.create_widget(WidgetKind::Native(NativeWindowId(1)), Rect::ZERO);
        let b = store.create_widget(WidgetKind::Native(NativeWindowId(2)), Rect::ZERO);

        let mut la = TextureList::new(a);
        la.set_locked(true);
        let mut lb = TextureList::new(b);
        lb.set_locked(true);

        let mut watcher = TextureListWatcher::new();
        watcher.watch(&la);
        watcher.watch(&lb);
        assert!(watcher.is_locked());

        assert!(watcher.on_lock_status_changed(a, false));
        assert!(watcher.is_locked());
        assert!(watcher.on_lock_status_changed(b, false));
        assert!(!watcher.is_locked());
    }

    #[test]
    fn unwatched_list_is_ignored() {
        let mut store = WidgetStore::new();
        let a = store.create_widget(WidgetKind::Native(NativeWindowId(1)), Rect::ZERO);
        let mut watcher = TextureListWatcher::new();
        assert!(!watcher.on_lock_status_changed(a, true));
        assert!(!watcher.is_locked());
        assert!(watcher.is_empty());
    }
}
