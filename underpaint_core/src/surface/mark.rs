// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage routing: `mark_dirty`, `mark_dirty_on_screen`, and the buffer
//! invalidation helpers built on them.

use kurbo::{Point, Rect, Size, Vec2};

use super::TopLevelSurface;
use crate::backend::{BackingStore, WidgetPainter};
use crate::region::{Region, rect_contains, rect_is_empty};
use crate::trace::{DamagePath, MarkDirtyEvent};
use crate::update::{BufferState, UpdateTime};
use crate::widget::{WidgetId, WidgetKind, WidgetStore};

/// Incoming damage, either a general region or a single rectangle.
///
/// The rectangle form allows tighter already-dirty checks.
#[derive(Clone, Copy, Debug)]
enum Damage<'a> {
    Area(&'a Region),
    Rect(Rect),
}

impl Damage<'_> {
    fn bounds(self) -> Rect {
        match self {
            Damage::Area(r) => r.bounding_rect(),
            Damage::Rect(r) => r,
        }
    }

    fn is_empty(self) -> bool {
        match self {
            Damage::Area(r) => r.is_empty(),
            Damage::Rect(r) => rect_is_empty(r),
        }
    }

    fn to_region(self) -> Region {
        match self {
            Damage::Area(r) => r.clone(),
            Damage::Rect(r) => Region::from_rect(r),
        }
    }
}

impl<S: BackingStore> TopLevelSurface<S> {
    /// Records that `region` (in `widget`'s coordinates) must be repainted.
    ///
    /// Never paints. Posts at most one update request. Without a painter the
    /// engine cannot service [`UpdateTime::Now`] in place, so such a request
    /// only moves to the front of the queue; use
    /// [`mark_dirty_now`](Self::mark_dirty_now) to repaint before returning.
    ///
    /// # Panics
    ///
    /// Panics if a top-level resize is in progress, if the widget is hidden,
    /// has updates disabled, or belongs to another top level, or if `region`
    /// is empty.
    pub fn mark_dirty(
        &mut self,
        widgets: &WidgetStore,
        widget: WidgetId,
        region: &Region,
        time: UpdateTime,
        state: BufferState,
    ) {
        self.route(widgets, widget, Damage::Area(region), time, state);
    }

    /// Rectangle form of [`mark_dirty`](Self::mark_dirty).
    ///
    /// # Panics
    ///
    /// Same conditions as [`mark_dirty`](Self::mark_dirty).
    pub fn mark_dirty_rect(
        &mut self,
        widgets: &WidgetStore,
        widget: WidgetId,
        rect: Rect,
        time: UpdateTime,
        state: BufferState,
    ) {
        self.route(widgets, widget, Damage::Rect(rect), time, state);
    }

    /// Records damage and services it before returning.
    ///
    /// Routes `region` like [`mark_dirty`](Self::mark_dirty) with
    /// [`UpdateTime::Now`]. If that posts an immediate request, it is taken
    /// off the queue and serviced in this call: a request for the top level
    /// runs [`sync`](Self::sync), and a request for a paint-on-screen widget
    /// hands its damage to [`WidgetPainter::paint_on_screen`].
    ///
    /// Returns `false` when no immediate request was posted, most notably
    /// when it was throttled to [`UpdateTime::Later`] because the window is
    /// composing faster than the display refreshes; it then stays queued.
    ///
    /// The surface and the widget tree are borrowed mutably for the whole
    /// call, so this cannot be reached from inside a paint callback. Painters
    /// that discover new damage while painting must use
    /// [`mark_dirty`](Self::mark_dirty) from outside the sync instead.
    ///
    /// # Panics
    ///
    /// Same conditions as [`mark_dirty`](Self::mark_dirty). The sync adds no
    /// checks of its own; a panic in the painter or the backing store
    /// propagates after the paint scope is closed.
    pub fn mark_dirty_now<P>(
        &mut self,
        widgets: &mut WidgetStore,
        widget: WidgetId,
        region: &Region,
        state: BufferState,
        painter: &mut P,
    ) -> bool
    where
        P: WidgetPainter<S::Device> + ?Sized,
    {
        self.route(widgets, widget, Damage::Area(region), UpdateTime::Now, state);
        self.service_immediate(widgets, painter)
    }

    /// Rectangle form of [`mark_dirty_now`](Self::mark_dirty_now).
    ///
    /// # Panics
    ///
    /// Same conditions as [`mark_dirty`](Self::mark_dirty).
    pub fn mark_dirty_rect_now<P>(
        &mut self,
        widgets: &mut WidgetStore,
        widget: WidgetId,
        rect: Rect,
        state: BufferState,
        painter: &mut P,
    ) -> bool
    where
        P: WidgetPainter<S::Device> + ?Sized,
    {
        self.route(widgets, widget, Damage::Rect(rect), UpdateTime::Now, state);
        self.service_immediate(widgets, painter)
    }

    /// Records that `region` of `widget` is already painted into the
    /// backing store and only needs presenting.
    ///
    /// `top_level_offset` is the widget's offset in top-level coordinates.
    /// Damage of the top level and of aliens presented through it lands in
    /// the top-level on-screen region; anything under another native window
    /// is queued on that window. Paint-on-screen widgets are ignored.
    pub fn mark_dirty_on_screen(
        &mut self,
        widgets: &WidgetStore,
        region: &Region,
        widget: WidgetId,
        top_level_offset: Vec2,
    ) {
        if region.is_empty() || matches!(widgets.kind(widget), WidgetKind::PaintOnScreen(_)) {
            return;
        }
        let top = self.top_level;
        if widget == top {
            self.dirty_on_screen.union(region);
            return;
        }

        if !widgets.is_native(widget) {
            let Some(native_parent) = widgets.native_parent(widget) else {
                return;
            };
            if native_parent == top {
                self.dirty_on_screen
                    .union(&region.translated(top_level_offset));
                return;
            }
            let offset = widgets.map_to(widget, native_parent);
            self.records
                .entry(native_parent)
                .or_default()
                .needs_flush
                .union(&region.translated(offset));
            self.append_dirty_on_screen_widget(native_parent);
            return;
        }

        self.records
            .entry(widget)
            .or_default()
            .needs_flush
            .union(region);
        self.append_dirty_on_screen_widget(widget);
    }

    /// Invalidates `region` of the backing store under `widget`.
    ///
    /// The region is clipped to the widget's clip rect and (without a
    /// graphics effect) its mask, then routed as
    /// [`BufferState::Invalid`] damage. Silently ignored during a top-level
    /// resize or while the widget is hidden or has updates disabled.
    pub fn invalidate_buffer(&mut self, widgets: &WidgetStore, widget: WidgetId, region: &Region) {
        if self.discard_invalidate(widgets, widget) || region.is_empty() {
            return;
        }
        let mut r = region.intersected_rect(widgets.clip_rect(widget));
        if widgets.graphics_effect(widget).is_none()
            && let Some(mask) = widgets.mask(widget)
        {
            r.intersect(mask);
        }
        if r.is_empty() {
            return;
        }
        self.mark_dirty(widgets, widget, &r, UpdateTime::Later, BufferState::Invalid);
    }

    /// Rectangle form of [`invalidate_buffer`](Self::invalidate_buffer).
    pub fn invalidate_buffer_rect(&mut self, widgets: &WidgetStore, widget: WidgetId, rect: Rect) {
        if self.discard_invalidate(widgets, widget) || rect_is_empty(rect) {
            return;
        }
        let r = rect.intersect(widgets.clip_rect(widget));
        if rect_is_empty(r) {
            return;
        }
        match widgets.mask(widget) {
            Some(mask) if widgets.graphics_effect(widget).is_none() => {
                let masked = mask.intersected_rect(r);
                if !masked.is_empty() {
                    self.mark_dirty(widgets, widget, &masked, UpdateTime::Later, BufferState::Invalid);
                }
            }
            _ => self.mark_dirty_rect(widgets, widget, r, UpdateTime::Later, BufferState::Invalid),
        }
    }

    /// Invalidates what a child widget's geometry change exposed.
    ///
    /// Call after [`WidgetStore::set_geometry`] with the geometry the widget
    /// had before. A widget with static contents keeps its pixels: they are
    /// moved with [`move_rect`](Self::move_rect) and only the newly visible
    /// area is repainted. Otherwise the whole new rect is repainted, except
    /// for static children that stayed put. Parent area the widget no longer
    /// covers is repainted in both cases.
    ///
    /// # Panics
    ///
    /// Panics if `widget` is a top level.
    pub fn invalidate_after_resize(
        &mut self,
        widgets: &mut WidgetStore,
        widget: WidgetId,
        old_geometry: Rect,
    ) {
        let Some(parent) = widgets.parent(widget) else {
            panic!("top levels resize through begin_top_level_resize");
        };
        self.refresh(widgets);
        let widgets = &*widgets;

        let new_geometry = widgets.geometry(widget);
        let old_pos = old_geometry.origin().to_vec2();
        let old_size = old_geometry.size();
        let offset = new_geometry.origin() - old_geometry.origin();
        let size_decreased =
            new_geometry.width() < old_size.width || new_geometry.height() < old_size.height;
        let parent_area_exposed = offset != Vec2::ZERO || size_decreased;
        let new_widget_rect = widgets.rect(widget);
        let old_widget_rect = Rect::from_origin_size(Point::ORIGIN, old_size);
        let effect = widgets.graphics_effect(widget);

        if !widgets.attributes(widget).static_contents || effect.is_some() {
            let static_children = if offset == Vec2::ZERO {
                self.static_contents(widgets, Some(widget), Some(old_widget_rect))
            } else {
                Region::new()
            };
            let has_static_children = !static_children.is_empty();

            if has_static_children {
                let mut dirty = Region::from_rect(new_widget_rect);
                dirty.subtract(&static_children);
                self.invalidate_buffer(widgets, widget, &dirty);
            } else {
                self.invalidate_buffer_rect(widgets, widget, new_widget_rect);
            }

            if !parent_area_exposed {
                return;
            }

            match widgets.mask(widget) {
                Some(mask) if effect.is_none() => {
                    let mut expose = mask.translated(old_pos);
                    expose.intersect_rect(old_geometry);
                    if has_static_children {
                        expose.subtract_rect(new_geometry);
                    }
                    self.invalidate_buffer(widgets, parent, &expose);
                }
                _ if has_static_children && effect.is_none() => {
                    let mut expose = Region::from_rect(old_geometry);
                    expose.subtract_rect(new_geometry);
                    self.invalidate_buffer(widgets, parent, &expose);
                }
                _ => {
                    let old = widgets.effective_rect_for(widget, old_geometry);
                    self.invalidate_buffer_rect(widgets, parent, old);
                }
            }
            return;
        }

        // Static contents: relocate the pixels that survive.
        if offset != Vec2::ZERO {
            let moved = if size_decreased {
                Rect::from_origin_size(
                    old_geometry.origin(),
                    Size::new(
                        old_size.width.min(new_geometry.width()),
                        old_size.height.min(new_geometry.height()),
                    ),
                )
            } else {
                old_geometry
            };
            self.move_rect_evaluated(widgets, widget, moved, offset);
        }

        if !size_decreased || !rect_contains(old_widget_rect, new_widget_rect) {
            let mut new_visible = Region::from_rect(new_widget_rect);
            new_visible.subtract_rect(old_widget_rect);
            self.invalidate_buffer(widgets, widget, &new_visible);
        }

        if !parent_area_exposed {
            return;
        }

        let mut expose = Region::from_rect(old_geometry);
        match widgets.mask(widget) {
            Some(mask) => {
                expose.intersect(&mask.translated(old_pos));
                let new_pos = new_geometry.origin().to_vec2();
                expose.subtract(&mask.translated(new_pos).intersected_rect(new_geometry));
            }
            None => expose.subtract_rect(new_geometry),
        }
        self.invalidate_buffer(widgets, parent, &expose);
    }

    /// Takes the pending damage of a paint-on-screen widget, clipped to what
    /// is visible, so the embedder can paint it straight to the window.
    ///
    /// Returns an empty region for other widgets, or while the top level is
    /// hidden or unmapped (the damage is dropped; the next expose repaints).
    pub fn take_paint_on_screen_damage(&mut self, widgets: &WidgetStore, widget: WidgetId) -> Region {
        if !matches!(widgets.kind(widget), WidgetKind::PaintOnScreen(_)) {
            return Region::new();
        }
        self.queue.remove(widget);
        let mut damage = match self.records.get_mut(&widget) {
            Some(rec) => core::mem::take(&mut rec.dirty),
            None => Region::new(),
        };

        let top = self.top_level;
        if widgets.attributes(top).unmapped || !widgets.is_visible(top) {
            return Region::new();
        }
        if widgets.attributes(widget).static_contents {
            self.static_sizes.insert(widget, widgets.size(widget));
        }

        damage.intersect_rect(widgets.clip_rect(widget));
        widgets.clip_to_effective_mask(widget, &mut damage);
        damage
    }

    // -- Internal helpers --

    /// Services the immediate request posted by the last route, if any.
    fn service_immediate<P>(&mut self, widgets: &mut WidgetStore, painter: &mut P) -> bool
    where
        P: WidgetPainter<S::Device> + ?Sized,
    {
        let Some(target) = self.immediate.take() else {
            return false;
        };
        if target == self.top_level {
            self.sync(widgets, painter);
        } else {
            let damage = self.take_paint_on_screen_damage(widgets, target);
            if !damage.is_empty() {
                painter.paint_on_screen(widgets, target, &damage);
            }
        }
        true
    }

    fn discard_invalidate(&self, widgets: &WidgetStore, widget: WidgetId) -> bool {
        self.in_top_level_resize || !widgets.is_visible(widget) || !widgets.updates_enabled(widget)
    }

    /// Brings the widget caches up to date.
    pub(super) fn refresh(&mut self, widgets: &mut WidgetStore) {
        if widgets.needs_evaluate() {
            widgets.evaluate_into(&mut self.changes);
        }
    }

    /// Clips `damage` to what `widget` can show, or `None` if nothing is
    /// left.
    fn clipped(widgets: &WidgetStore, widget: WidgetId, damage: Region) -> Option<Region> {
        let mut r = damage;
        r.intersect_rect(widgets.clip_rect(widget));
        widgets.clip_to_effective_mask(widget, &mut r);
        (!r.is_empty()).then_some(r)
    }

    /// Puts `widget` on the pending-paint list with `damage`.
    ///
    /// Returns `false` if nothing of the damage is visible.
    fn add_dirty_widget(&mut self, widgets: &WidgetStore, widget: WidgetId, damage: Damage<'_>) -> bool {
        let raw = if widgets.graphics_effect(widget).is_some() {
            Region::from_rect(widgets.effective_rect_for(widget, damage.bounds()))
        } else {
            damage.to_region()
        };
        let Some(region) = Self::clipped(widgets, widget, raw) else {
            return false;
        };
        let rec = self.records.entry(widget).or_default();
        rec.dirty = region;
        rec.in_dirty_list = true;
        self.dirty_widgets.push(widget);
        true
    }

    fn route(
        &mut self,
        widgets: &WidgetStore,
        widget: WidgetId,
        damage: Damage<'_>,
        time: UpdateTime,
        state: BufferState,
    ) {
        assert!(
            !self.in_top_level_resize,
            "cannot mark damage during a top-level resize"
        );
        assert!(
            widgets.is_visible(widget) && widgets.updates_enabled(widget),
            "damaged widget must be visible with updates enabled"
        );
        assert!(
            widgets.top_level_of(widget) == self.top_level,
            "{widget:?} does not belong to this surface"
        );
        assert!(!damage.is_empty(), "damage region must not be empty");

        self.immediate = None;
        let path = self.route_inner(widgets, widget, damage, time, state);
        self.tracer.mark_dirty(&MarkDirtyEvent {
            widget,
            bounds: damage.bounds(),
            path,
            time,
        });
    }

    fn route_inner(
        &mut self,
        widgets: &WidgetStore,
        widget: WidgetId,
        damage: Damage<'_>,
        time: UpdateTime,
        state: BufferState,
    ) -> DamagePath {
        let top = self.top_level;
        let kind = widgets.kind(widget);

        if let WidgetKind::PaintOnScreen(_) = kind {
            let extent = match damage {
                Damage::Area(_) => widgets.rect(widget),
                Damage::Rect(r) => r,
            };
            let rec = self.records.entry(widget).or_default();
            let send = if rec.dirty.is_empty() {
                rec.dirty = damage.to_region();
                true
            } else {
                if !rec.dirty.strictly_contains(extent) {
                    rec.dirty.union(&damage.to_region());
                }
                time == UpdateTime::Now
            };
            if send {
                self.send_update_request(widget, time);
            }
            return DamagePath::PaintOnScreen;
        }

        if self.full_update_pending {
            if time == UpdateTime::Now {
                self.send_update_request(top, time);
            }
            return DamagePath::FullUpdatePending;
        }

        if kind.texture().is_some() {
            let rec = self.records.entry(widget).or_default();
            if !rec.in_dirty_list {
                rec.in_dirty_list = true;
                self.dirty_render_to_texture.push(widget);
            }
            if !self.update_request_sent || time == UpdateTime::Now {
                self.send_update_request(top, time);
            }
            return DamagePath::RenderToTexture;
        }

        let offset = widgets.map_to_top(widget);
        let widget_rect = widgets.effective_rect_for(
            widget,
            match damage {
                Damage::Area(_) => widgets.rect(widget),
                Damage::Rect(r) => r,
            },
        );
        let extent = match damage {
            Damage::Area(_) => widget_rect + offset,
            Damage::Rect(_) => (widget_rect + offset)
                .intersect(Rect::from_origin_size(Point::ORIGIN, widgets.size(top))),
        };
        if self.dirty.strictly_contains(extent) {
            if time == UpdateTime::Now {
                self.send_update_request(top, time);
            }
            return DamagePath::AlreadyDirty;
        }

        if state == BufferState::Invalid {
            let already_posted = !self.dirty.is_empty() || self.update_request_sent;
            match damage {
                Damage::Area(r) if widgets.graphics_effect(widget).is_some() => {
                    let bleed = widgets.effective_rect_for(widget, r.bounding_rect());
                    self.dirty.add_rect(bleed + offset);
                }
                Damage::Area(r) => self.dirty.union(&r.translated(offset)),
                Damage::Rect(_) => self.dirty.add_rect(extent),
            }
            if !already_posted || time == UpdateTime::Now {
                self.send_update_request(top, time);
            }
            return DamagePath::BufferInvalid;
        }

        if self.dirty_widgets.is_empty() {
            if self.add_dirty_widget(widgets, widget, damage) {
                self.send_update_request(top, time);
            }
            return DamagePath::Widget;
        }

        let in_dirty_list = self
            .records
            .get(&widget)
            .is_some_and(|rec| rec.in_dirty_list);
        if in_dirty_list {
            let extension = match damage {
                Damage::Area(r) if widgets.graphics_effect(widget).is_some() => {
                    Region::from_rect(widgets.effective_rect_for(widget, r.bounding_rect()))
                }
                Damage::Area(r) => r.clone(),
                Damage::Rect(_) => Region::from_rect(widget_rect),
            };
            if let Some(rec) = self.records.get_mut(&widget)
                && !rec.dirty.strictly_contains(widget_rect)
                && let Some(extension) = Self::clipped(widgets, widget, extension)
            {
                rec.dirty.union(&extension);
            }
        } else {
            self.add_dirty_widget(widgets, widget, damage);
        }

        if time == UpdateTime::Now {
            self.send_update_request(top, time);
        }
        DamagePath::Widget
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Insets, Rect, Vec2};

    use super::super::tests::{LogPainter, child, opaque, window};
    use crate::region::Region;
    use crate::time::HostTime;
    use crate::update::{BufferState, UpdateTime};
    use crate::widget::{NativeWindowId, TextureId, WidgetAttributes, WidgetKind};

    #[test]
    fn first_damage_queues_one_request() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(10.0, 10.0, 110.0, 110.0),
            opaque(),
        );
        for _ in 0..3 {
            surface.mark_dirty_rect(
                &widgets,
                w,
                Rect::new(0.0, 0.0, 10.0, 10.0),
                UpdateTime::Later,
                BufferState::Valid,
            );
        }
        assert_eq!(surface.pending_paint_len(), 1);
        assert_eq!(surface.next_update_request().map(|r| r.widget), Some(top));
        assert!(surface.next_update_request().is_none());
    }

    #[test]
    fn widget_damage_is_clipped_on_entry() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(150.0, 150.0, 250.0, 250.0),
            WidgetAttributes::default(),
        );
        surface.mark_dirty_rect(
            &widgets,
            w,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            UpdateTime::Later,
            BufferState::Valid,
        );
        assert_eq!(
            surface.dirty_region(&widgets, None),
            Region::from_rect(Rect::new(150.0, 150.0, 200.0, 200.0))
        );
    }

    #[test]
    fn invalid_buffer_goes_to_aggregate() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(20.0, 30.0, 60.0, 70.0),
            WidgetAttributes::default(),
        );
        surface.invalidate_buffer_rect(&widgets, w, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(surface.pending_paint_len(), 0);
        assert_eq!(
            surface.dirty,
            Region::from_rect(Rect::new(20.0, 30.0, 60.0, 70.0))
        );
    }

    #[test]
    fn full_update_absorbs_damage() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(0.0, 0.0, 50.0, 50.0),
            WidgetAttributes::default(),
        );
        surface.mark_full_update(UpdateTime::Later);
        surface.mark_dirty_rect(
            &widgets,
            w,
            Rect::new(0.0, 0.0, 5.0, 5.0),
            UpdateTime::Later,
            BufferState::Valid,
        );
        assert_eq!(surface.pending_paint_len(), 0);
        assert!(surface.dirty.is_empty());
    }

    #[test]
    fn covered_damage_is_dropped() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(10.0, 10.0, 20.0, 20.0),
            WidgetAttributes::default(),
        );
        surface.invalidate_buffer_rect(&widgets, top, Rect::new(0.0, 0.0, 100.0, 100.0));
        surface.mark_dirty_rect(
            &widgets,
            w,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            UpdateTime::Later,
            BufferState::Valid,
        );
        assert_eq!(surface.pending_paint_len(), 0);
    }

    #[test]
    fn effect_damage_covers_bleed() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(50.0, 50.0, 100.0, 100.0),
            WidgetAttributes::default(),
        );
        widgets.set_graphics_effect(w, Some(Insets::uniform(5.0)));
        widgets.evaluate();
        surface.mark_dirty_rect(
            &widgets,
            w,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            UpdateTime::Later,
            BufferState::Valid,
        );
        assert_eq!(
            surface.dirty_region(&widgets, None),
            Region::from_rect(Rect::new(45.0, 45.0, 65.0, 65.0))
        );
    }

    #[test]
    fn paint_on_screen_damage_is_serviced_separately() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::PaintOnScreen(NativeWindowId(9)),
            Rect::new(0.0, 0.0, 40.0, 40.0),
            WidgetAttributes::default(),
        );
        surface.mark_dirty_rect(
            &widgets,
            w,
            Rect::new(30.0, 30.0, 60.0, 60.0),
            UpdateTime::Later,
            BufferState::Valid,
        );
        assert!(!surface.is_dirty());
        assert_eq!(surface.next_update_request().map(|r| r.widget), Some(w));

        let damage = surface.take_paint_on_screen_damage(&widgets, w);
        assert_eq!(damage, Region::from_rect(Rect::new(30.0, 30.0, 40.0, 40.0)));
        assert!(surface.take_paint_on_screen_damage(&widgets, w).is_empty());
    }

    #[test]
    fn on_screen_damage_routes_by_native_parent() {
        let (mut widgets, top, mut surface) = window();
        let native = child(
            &mut widgets,
            top,
            WidgetKind::Native(NativeWindowId(5)),
            Rect::new(100.0, 100.0, 200.0, 200.0),
            WidgetAttributes::default(),
        );
        let alien = child(
            &mut widgets,
            native,
            WidgetKind::Alien,
            Rect::new(10.0, 10.0, 50.0, 50.0),
            WidgetAttributes::default(),
        );
        let r = Region::from_rect(Rect::new(0.0, 0.0, 5.0, 5.0));

        surface.mark_dirty_on_screen(&widgets, &r, alien, widgets.map_to_top(alien));
        assert!(surface.dirty_on_screen.is_empty());
        assert_eq!(surface.dirty_on_screen_widgets, [native]);
        assert_eq!(
            surface.records[&native].needs_flush,
            Region::from_rect(Rect::new(10.0, 10.0, 15.0, 15.0))
        );

        surface.mark_dirty_on_screen(&widgets, &r, top, Vec2::ZERO);
        assert_eq!(surface.dirty_on_screen, r);
    }

    #[test]
    fn resize_of_plain_child_exposes_parent() {
        let (mut widgets, top, mut surface) = window();
        let old = Rect::new(0.0, 0.0, 100.0, 100.0);
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            old,
            WidgetAttributes::default(),
        );
        widgets.set_geometry(w, Rect::new(0.0, 0.0, 50.0, 100.0));
        surface.invalidate_after_resize(&mut widgets, w, old);
        assert_eq!(
            surface.dirty,
            Region::from_rect(Rect::new(0.0, 0.0, 100.0, 100.0))
        );
    }

    #[test]
    fn growing_static_child_only_repaints_new_area() {
        let (mut widgets, top, mut surface) = window();
        let old = Rect::new(0.0, 0.0, 50.0, 50.0);
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            old,
            WidgetAttributes {
                static_contents: true,
                opaque: true,
                ..WidgetAttributes::default()
            },
        );
        widgets.set_geometry(w, Rect::new(0.0, 0.0, 80.0, 50.0));
        surface.invalidate_after_resize(&mut widgets, w, old);
        assert_eq!(
            surface.dirty,
            Region::from_rect(Rect::new(50.0, 0.0, 80.0, 50.0))
        );
    }

    #[test]
    fn now_damage_is_painted_before_returning() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(10.0, 10.0, 110.0, 110.0),
            opaque(),
        );
        let mut painter = LogPainter::default();
        let serviced = surface.mark_dirty_rect_now(
            &mut widgets,
            w,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            BufferState::Valid,
            &mut painter,
        );

        assert!(serviced);
        assert_eq!(
            painter.region_for(w),
            Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0))
        );
        assert_eq!(
            surface.backing_store().flushed,
            [(
                Region::from_rect(Rect::new(10.0, 10.0, 20.0, 20.0)),
                NativeWindowId(1),
                Vec2::ZERO
            )]
        );
        assert!(!surface.is_dirty());
        assert!(!surface.has_update_request());
    }

    #[test]
    fn now_during_full_update_repaints_everything() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(0.0, 0.0, 50.0, 50.0),
            WidgetAttributes::default(),
        );
        surface.mark_full_update(UpdateTime::Later);

        let mut painter = LogPainter::default();
        let serviced = surface.mark_dirty_rect_now(
            &mut widgets,
            w,
            Rect::new(0.0, 0.0, 5.0, 5.0),
            BufferState::Valid,
            &mut painter,
        );

        assert!(serviced);
        let begun = &surface.backing_store().begun;
        assert_eq!(begun.len(), 1);
        assert!(begun[0].contains_rect(Rect::new(0.0, 0.0, 200.0, 200.0)));
        assert!(!surface.full_update_pending);
        assert!(!surface.has_update_request());
    }

    #[test]
    fn now_on_paint_on_screen_widget_paints_accumulated_damage() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::PaintOnScreen(NativeWindowId(9)),
            Rect::new(0.0, 0.0, 40.0, 40.0),
            WidgetAttributes::default(),
        );
        surface.mark_dirty_rect(
            &widgets,
            w,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            UpdateTime::Later,
            BufferState::Valid,
        );

        let mut painter = LogPainter::default();
        let serviced = surface.mark_dirty_rect_now(
            &mut widgets,
            w,
            Rect::new(20.0, 20.0, 60.0, 60.0),
            BufferState::Valid,
            &mut painter,
        );

        assert!(serviced);
        let expected = Region::from_rects([
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(20.0, 20.0, 40.0, 40.0),
        ]);
        assert_eq!(painter.on_screen, [(w, expected)]);
        assert!(painter.painted.is_empty());
        assert!(surface.backing_store().begun.is_empty());
        assert!(!surface.has_update_request());
    }

    #[test]
    fn now_on_texture_widget_renders_despite_queued_request() {
        let (mut widgets, top, mut surface) = window();
        let gl = child(
            &mut widgets,
            top,
            WidgetKind::RenderToTexture(TextureId(7)),
            Rect::new(10.0, 10.0, 60.0, 60.0),
            WidgetAttributes::default(),
        );
        surface.mark_dirty_rect(
            &widgets,
            top,
            Rect::new(0.0, 0.0, 200.0, 200.0),
            UpdateTime::Later,
            BufferState::Valid,
        );
        surface.sync(&mut widgets, &mut LogPainter::default());
        let begun = surface.backing_store().begun.len();

        surface.mark_dirty_rect(
            &widgets,
            gl,
            Rect::new(0.0, 0.0, 5.0, 5.0),
            UpdateTime::Later,
            BufferState::Valid,
        );
        assert!(surface.update_request_sent);

        let mut painter = LogPainter::default();
        let serviced = surface.mark_dirty_rect_now(
            &mut widgets,
            gl,
            Rect::new(5.0, 5.0, 10.0, 10.0),
            BufferState::Valid,
            &mut painter,
        );

        assert!(serviced);
        assert_eq!(painter.rendered, [gl]);
        assert_eq!(surface.backing_store().begun.len(), begun);
        assert!(!surface.has_update_request());
    }

    #[test]
    fn throttled_now_stays_queued() {
        let (mut widgets, top, mut surface) = window();
        surface.store.clock = Some(1_000_000);
        surface.compositing = true;
        surface.last_compose = Some(HostTime(0));

        let mut painter = LogPainter::default();
        let serviced = surface.mark_dirty_rect_now(
            &mut widgets,
            top,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            BufferState::Valid,
            &mut painter,
        );

        assert!(!serviced);
        assert!(painter.painted.is_empty());
        assert!(surface.is_dirty());
        assert_eq!(
            surface.next_update_request().map(|r| (r.widget, r.time)),
            Some((top, UpdateTime::Later))
        );
    }

    #[test]
    fn queued_now_upgrades_pending_requests() {
        let (mut widgets, top, mut surface) = window();
        let pos = child(
            &mut widgets,
            top,
            WidgetKind::PaintOnScreen(NativeWindowId(9)),
            Rect::new(0.0, 0.0, 40.0, 40.0),
            WidgetAttributes::default(),
        );
        let gl = child(
            &mut widgets,
            top,
            WidgetKind::RenderToTexture(TextureId(7)),
            Rect::new(100.0, 100.0, 150.0, 150.0),
            WidgetAttributes::default(),
        );
        let rect = Rect::new(0.0, 0.0, 5.0, 5.0);

        // Already-dirty paint-on-screen widget: only `Now` re-posts.
        surface.mark_dirty_rect(&widgets, pos, rect, UpdateTime::Later, BufferState::Valid);
        assert!(surface.next_update_request().is_some());
        surface.mark_dirty_rect(&widgets, pos, rect, UpdateTime::Later, BufferState::Valid);
        assert!(!surface.has_update_request());
        surface.mark_dirty_rect(&widgets, pos, rect, UpdateTime::Now, BufferState::Valid);
        assert_eq!(
            surface.next_update_request().map(|r| (r.widget, r.time)),
            Some((pos, UpdateTime::Now))
        );

        // Texture damage behind a queued sync.
        surface.mark_dirty_rect(&widgets, gl, rect, UpdateTime::Later, BufferState::Valid);
        surface.mark_dirty_rect(&widgets, gl, rect, UpdateTime::Now, BufferState::Valid);
        assert_eq!(
            surface.next_update_request().map(|r| (r.widget, r.time)),
            Some((top, UpdateTime::Now))
        );
        assert!(!surface.has_update_request());

        // Damage absorbed by a pending full update.
        surface.mark_full_update(UpdateTime::Later);
        surface.mark_dirty_rect(&widgets, gl, rect, UpdateTime::Now, BufferState::Valid);
        assert_eq!(
            surface.next_update_request().map(|r| (r.widget, r.time)),
            Some((top, UpdateTime::Now))
        );
        assert!(!surface.has_update_request());
    }

    #[test]
    #[should_panic(expected = "damage region must not be empty")]
    fn empty_damage_panics() {
        let (widgets, top, mut surface) = window();
        surface.mark_dirty(
            &widgets,
            top,
            &Region::new(),
            UpdateTime::Later,
            BufferState::Valid,
        );
    }

    #[test]
    #[should_panic(expected = "damaged widget must be visible with updates enabled")]
    fn hidden_widget_damage_panics() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            WidgetAttributes {
                hidden: true,
                ..WidgetAttributes::default()
            },
        );
        surface.mark_dirty_rect(
            &widgets,
            w,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            UpdateTime::Later,
            BufferState::Valid,
        );
    }
}
