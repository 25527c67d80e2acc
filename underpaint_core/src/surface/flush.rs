// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presentation: copy painted pixels to native windows, composing
//! render-to-texture widgets on the way when needed.

use kurbo::{Rect, Vec2};

use super::TopLevelSurface;
use crate::backend::BackingStore;
use crate::region::Region;
use crate::texture::{TextureList, TextureListWatcher};
use crate::trace::FlushEvent;
use crate::update::UpdateTime;
use crate::widget::{WidgetId, WidgetStore};

/// Stand-in list that keeps a window on the composition path.
static EMPTY_TEXTURES: TextureList = TextureList::empty();

/// Which texture list, if any, a presentation composes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum TextureSelection {
    /// Plain raster flush.
    None,
    /// Compose with `texture_lists[i]`.
    List(usize),
    /// Compose with no textures.
    Dummy,
}

impl<S: BackingStore> TopLevelSurface<S> {
    /// Presents everything painted but not yet shown.
    ///
    /// The top-level on-screen region goes to `widget`'s window (the top
    /// level's if `None`); every native child with pending pixels is then
    /// presented through its own window. When the top level has nothing to
    /// show but composes textures, an empty composition still runs so that
    /// changed textures reach the screen.
    pub fn flush(&mut self, widgets: &WidgetStore, widget: Option<WidgetId>) {
        let top = self.top_level;
        let target = widget.unwrap_or(top);
        let has_on_screen_widgets = !self.dirty_on_screen_widgets.is_empty();
        let mut flushed = false;

        if !self.dirty_on_screen.is_empty() {
            let region = core::mem::take(&mut self.dirty_on_screen);
            let textures = self.texture_list_for(top);
            self.present(widgets, target, &region, textures);
            flushed = true;
        }

        // Texture changes never reach the on-screen region.
        if !flushed && !has_on_screen_widgets && !self.texture_lists.is_empty() {
            let textures = self.texture_list_for(top);
            if textures != TextureSelection::None {
                self.present(widgets, target, &Region::new(), textures);
            }
        }

        for w in core::mem::take(&mut self.dirty_on_screen_widgets) {
            let Some(region) = self
                .records
                .get_mut(&w)
                .map(|rec| core::mem::take(&mut rec.needs_flush))
            else {
                continue;
            };
            if !widgets.is_alive(w) {
                continue;
            }
            let textures = if widgets.texture_child_seen(w) {
                self.texture_list_for(w)
            } else {
                TextureSelection::None
            };
            self.present(widgets, w, &region, textures);
        }
    }

    /// Marks the texture list rooted at `root` as held (or released) by the
    /// compositor.
    ///
    /// Once every list a deferred sync waited on is released, a sync is
    /// scheduled.
    pub fn set_texture_list_locked(&mut self, root: WidgetId, locked: bool) {
        if let Some(list) = self.texture_lists.iter_mut().find(|l| l.root() == Some(root)) {
            list.set_locked(locked);
        }
        let released = self
            .watcher
            .as_mut()
            .is_some_and(|w| w.on_lock_status_changed(root, locked) && !w.is_locked());
        if released {
            self.send_update_request(self.top_level, UpdateTime::Later);
        }
    }

    /// Returns `true` while the compositor holds any texture list.
    #[must_use]
    pub fn is_texture_list_locked(&self) -> bool {
        self.texture_lists.iter().any(TextureList::is_locked)
    }

    /// Presents `region` (in `widget`'s coordinates) through `widget`'s
    /// window.
    pub(super) fn present(
        &mut self,
        widgets: &WidgetStore,
        widget: WidgetId,
        region: &Region,
        textures: TextureSelection,
    ) {
        let top = self.top_level;
        if widgets.attributes(top).dont_show_on_screen
            || widgets.attributes(widget).dont_show_on_screen
        {
            return;
        }
        let Some(window) = widgets.kind(widget).window() else {
            return;
        };
        let offset = if widget == top {
            Vec2::ZERO
        } else {
            widgets.map_to_top(widget)
        };

        let record = self.records.entry(widget).or_default();
        let was_active = record.compose_active;
        let textures = match textures {
            TextureSelection::None if was_active => {
                // One last composed flush when leaving the composition path.
                record.compose_active = false;
                TextureSelection::Dummy
            }
            TextureSelection::None => TextureSelection::None,
            other => {
                record.compose_active = true;
                other
            }
        };

        let full;
        let region = if was_active == record.compose_active {
            region
        } else {
            full = Region::from_rect(widgets.rect(widget));
            &full
        };

        let list = match textures {
            TextureSelection::None => None,
            TextureSelection::List(i) => {
                Some(self.texture_lists.get(i).unwrap_or(&EMPTY_TEXTURES))
            }
            TextureSelection::Dummy => Some(&EMPTY_TEXTURES),
        };
        match list {
            None => {
                if region.is_empty() {
                    return;
                }
                self.store.flush(region, window, offset);
            }
            Some(list) => {
                self.compositing = true;
                self.last_compose = self.store.host_time();
                let translucent = widgets.attributes(widget).translucent_background;
                self.store
                    .compose_and_flush(window, region, offset, list, translucent);
            }
        }

        self.tracer.flush(&FlushEvent {
            timestamp: self.store.host_time(),
            window,
            bounds: if region.is_empty() {
                Rect::ZERO
            } else {
                region.bounding_rect()
            },
            composed: list.is_some(),
            textures: list.map_or(0, |l| u32::try_from(l.len()).unwrap_or(u32::MAX)),
        });
    }

    /// Picks the texture list to compose when presenting through `widget`'s
    /// window.
    pub(super) fn texture_list_for(&self, widget: WidgetId) -> TextureSelection {
        if let Some(i) = self
            .texture_lists
            .iter()
            .position(|l| l.root() == Some(widget))
        {
            return TextureSelection::List(i);
        }
        // Without platform support a window never leaves composition.
        if self.texture_child_ever_seen && !self.config.switchable_composition {
            TextureSelection::Dummy
        } else {
            TextureSelection::None
        }
    }

    /// Returns `false` while a locked texture list forbids painting, and
    /// starts watching the locked lists.
    pub(super) fn sync_allowed(&mut self) -> bool {
        if self.watcher.as_ref().is_some_and(|w| !w.is_locked()) {
            self.watcher = None;
            return true;
        }

        let mut skip = false;
        for list in self.texture_lists.iter().filter(|l| l.is_locked()) {
            self.watcher
                .get_or_insert_with(TextureListWatcher::new)
                .watch(list);
            skip = true;
        }
        !skip
    }
}
