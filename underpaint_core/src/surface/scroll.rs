// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blit-accelerated moves and scrolls.
//!
//! A translation is satisfied by copying pixels inside the backing store
//! when the moved content is opaque and nothing covers it; only the
//! residual exposed area is repainted. Everything else falls back to
//! invalidating the whole affected area.

use kurbo::{Rect, Vec2};

use super::TopLevelSurface;
use crate::backend::BackingStore;
use crate::region::{Region, rect_is_empty};
use crate::trace::BlitEvent;
use crate::update::{BufferState, UpdateTime};
use crate::widget::{WidgetId, WidgetStore};

impl<S: BackingStore> TopLevelSurface<S> {
    /// Tries to move the pixels of `rect` (in `widget`'s coordinates) by
    /// `delta` inside the backing store.
    ///
    /// Refused while a full update is pending or when the area overlaps
    /// damage that has not been painted yet, since the source pixels would
    /// be stale. On success the caller marks only what the copy did not
    /// cover.
    pub fn blt_rect(&mut self, widgets: &WidgetStore, widget: WidgetId, rect: Rect, delta: Vec2) -> bool {
        let area = rect + widgets.map_to_top(widget);
        let accepted = !self.full_update_pending
            && !self.dirty.intersects_rect(area)
            && self.store.scroll(area, delta);
        self.tracer.blit(&BlitEvent {
            area,
            delta,
            accepted,
        });
        accepted
    }

    /// Handles a child widget that moved by `delta`.
    ///
    /// Call after the widget's geometry was updated. `rect` is the area the
    /// widget occupied before the move, in its parent's coordinates.
    ///
    /// An opaque widget that is neither covered at its old nor at its new
    /// position is blitted; its newly exposed part and the parent area it
    /// uncovered are marked dirty, and both rects are queued for
    /// presentation. Otherwise the old and new areas are invalidated.
    pub fn move_rect(&mut self, widgets: &mut WidgetStore, widget: WidgetId, rect: Rect, delta: Vec2) {
        self.refresh(widgets);
        self.move_rect_evaluated(widgets, widget, rect, delta);
    }

    /// Scrolls the content of `rect` (in `widget`'s coordinates) by `delta`.
    ///
    /// Pending damage inside the scrolled area moves along with it. With
    /// the fast path the exposed strip is marked dirty and the destination
    /// is queued for presentation; otherwise the whole area is invalidated.
    pub fn scroll_rect(&mut self, widgets: &mut WidgetStore, widget: WidgetId, rect: Rect, delta: Vec2) {
        if self.in_top_level_resize {
            return;
        }
        self.refresh(widgets);
        let widgets = &*widgets;

        let scroll = rect.intersect(widgets.clip_rect(widget));
        let candidate = self.config.fast_scroll && widgets.is_opaque(widget);
        let overlapped = candidate && widgets.is_overlapped(widget, scroll + widgets.pos(widget));

        if !candidate || overlapped {
            if overlapped {
                let mut region = Region::from_rect(scroll);
                widgets.subtract_opaque_siblings(widget, &mut region);
                self.invalidate_buffer(widgets, widget, &region);
            } else {
                self.invalidate_buffer_rect(widgets, widget, scroll);
            }
            return;
        }

        let dest = (scroll + delta).intersect(scroll);
        let source = dest - delta;

        let mut child_expose = Region::from_rect(scroll);
        if !rect_is_empty(source) && self.blt_rect(widgets, widget, source, delta) {
            child_expose.subtract_rect(dest);
        }

        if let Some(rec) = self.records.get_mut(&widget)
            && rec.in_dirty_list
        {
            if rect == widgets.rect(widget) {
                rec.dirty.translate(delta);
            } else {
                let moving = rec.dirty.intersected_rect(scroll);
                if !moving.is_empty() {
                    rec.dirty.subtract(&moving);
                    rec.dirty.union(&moving.translated(delta));
                }
            }
        }

        if !widgets.updates_enabled(widget) {
            return;
        }

        if !child_expose.is_empty() {
            self.mark_dirty(widgets, widget, &child_expose, UpdateTime::Later, BufferState::Valid);
            self.records.entry(widget).or_default().is_scrolled = true;
        }

        let offset = widgets.map_to_top(widget);
        self.mark_dirty_on_screen(widgets, &Region::from_rect(dest), widget, offset);
    }

    /// [`move_rect`](Self::move_rect) on an already evaluated store.
    pub(super) fn move_rect_evaluated(
        &mut self,
        widgets: &WidgetStore,
        widget: WidgetId,
        rect: Rect,
        delta: Vec2,
    ) {
        if !widgets.is_visible(widget) || delta == Vec2::ZERO || self.in_top_level_resize {
            return;
        }
        // Moving a top level moves its window; the buffer is unaffected.
        let Some(parent) = widgets.parent(widget) else {
            return;
        };

        let clip = widgets.clip_rect(parent);
        let new_rect = rect + delta;
        let mut dest = rect.intersect(clip);
        if !rect_is_empty(dest) {
            dest = (dest + delta).intersect(clip);
        }
        let source = dest - delta;
        let parent_rect = rect.intersect(clip);
        let pos = widgets.pos(widget);

        let native_with_texture_child = widgets.is_native(widget) && widgets.texture_child_seen(widget);
        let accelerate = self.config.fast_move
            && widgets.is_opaque(widget)
            && !native_with_texture_child
            && !widgets.is_overlapped(widget, source)
            && !widgets.is_overlapped(widget, dest);

        if !accelerate {
            let mut parent_r = Region::from_rect(widgets.effective_rect_for(widget, parent_rect));
            if widgets.mask(widget).is_some() {
                // Invalidation clips to the mask, so the masked-out part of
                // the new rect shows the parent.
                parent_r.add_rect(new_rect.intersect(clip));
            } else {
                parent_r.subtract_rect(new_rect);
            }
            self.invalidate_buffer(widgets, parent, &parent_r);
            self.invalidate_buffer_rect(widgets, widget, new_rect.intersect(clip) - pos);
            return;
        }

        let mut child_expose = Region::from_rect(new_rect.intersect(clip));
        if !rect_is_empty(source) && self.blt_rect(widgets, parent, source, delta) {
            child_expose.subtract_rect(dest);
        }

        if !widgets.updates_enabled(parent) {
            return;
        }

        let child_updates = widgets.updates_enabled(widget);
        if child_updates && !child_expose.is_empty() {
            child_expose.translate(-pos);
            self.mark_dirty(widgets, widget, &child_expose, UpdateTime::Later, BufferState::Valid);
            self.records.entry(widget).or_default().is_moved = true;
        }

        let mut parent_expose = Region::from_rect(parent_rect);
        parent_expose.subtract_rect(new_rect);
        if let Some(mask) = widgets.mask(widget) {
            let mut uncovered = Region::from_rect(new_rect);
            uncovered.subtract(&mask.translated(pos));
            parent_expose.union(&uncovered);
        }
        if !parent_expose.is_empty() {
            self.mark_dirty(widgets, parent, &parent_expose, UpdateTime::Later, BufferState::Valid);
            self.records.entry(parent).or_default().is_moved = true;
        }

        if child_updates {
            let mut needs_flush = Region::from_rect(source);
            needs_flush.add_rect(dest);
            let offset = widgets.map_to_top(parent);
            self.mark_dirty_on_screen(widgets, &needs_flush, parent, offset);
        }
    }
}
