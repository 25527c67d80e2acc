// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The sync pipeline: resolve pending damage into one paint pass, then
//! hand the result to the flush stage.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use super::flush::TextureSelection;
use super::{DamageRecord, TopLevelSurface};
use crate::backend::{BackingStore, PaintGuard, WidgetPainter};
use crate::region::{Region, rect_is_empty, rects_overlap};
use crate::texture::{TextureEntry, TextureFlags, TextureList};
use crate::trace::{SyncBeginEvent, SyncDiscard, SyncDiscardEvent, SyncEndEvent, SyncOutcome};
use crate::widget::{WidgetId, WidgetKind, WidgetStore};

/// Options for one recursive draw.
#[derive(Clone, Copy, Debug, Default)]
struct DrawFlags {
    /// Also draw the widget's descendants.
    recursive: bool,
    /// Clip to the widget's clip rect first.
    as_root: bool,
    /// Leave opaque descendants alone; they repaint themselves.
    skip_opaque_children: bool,
}

/// What a paint pass produced.
struct PaintReport {
    /// Damage painted under a native child window, for presentation there.
    on_screen: Vec<(Region, WidgetId, Vec2)>,
    /// The top level was drawn recursively.
    composited: bool,
}

impl<S: BackingStore> TopLevelSurface<S> {
    /// Repaints all pending damage and presents it.
    ///
    /// This is the handler for an [`UpdateRequest`](crate::update::UpdateRequest)
    /// naming the top level. On an unmapped top level the damage is kept
    /// for later; on a hidden one it is dropped, since showing it again
    /// repaints everything. While a compositor holds the textures of the
    /// last presentation the sync is deferred until
    /// [`set_texture_list_locked`](Self::set_texture_list_locked) reports
    /// them released.
    pub fn sync<P>(&mut self, widgets: &mut WidgetStore, painter: &mut P)
    where
        P: WidgetPainter<S::Device> + ?Sized,
    {
        self.update_request_sent = false;
        let top = self.top_level;
        self.queue.remove(top);

        let hidden = !widgets.is_visible(top);
        if hidden || widgets.attributes(top).unmapped {
            if hidden {
                self.dirty.clear();
                for w in core::mem::take(&mut self.dirty_widgets) {
                    self.reset_widget(w);
                }
                self.full_update_pending = false;
            }
            self.discard(if hidden {
                SyncDiscard::Hidden
            } else {
                SyncDiscard::Unmapped
            });
            return;
        }

        if self.sync_allowed() {
            self.do_sync(widgets, painter);
        } else {
            self.discard(SyncDiscard::TexturesLocked);
        }
    }

    /// Handles the platform exposing `region` of a native widget's window.
    ///
    /// With nothing pending, the region is presented straight from the
    /// buffer. Otherwise it is queued for presentation and a full sync
    /// runs.
    pub fn sync_exposed<P>(
        &mut self,
        widgets: &mut WidgetStore,
        exposed: WidgetId,
        region: &Region,
        painter: &mut P,
    ) where
        P: WidgetPainter<S::Device> + ?Sized,
    {
        let top = self.top_level;
        if !widgets.is_visible(top) || self.in_top_level_resize {
            self.discard(if self.in_top_level_resize {
                SyncDiscard::Resizing
            } else {
                SyncDiscard::Hidden
            });
            return;
        }
        if !widgets.is_native(exposed)
            || !widgets.is_visible(exposed)
            || widgets.attributes(exposed).unmapped
            || !widgets.updates_enabled(exposed)
            || region.is_empty()
        {
            return;
        }

        if !self.is_dirty() && !self.store.size().is_zero_area() {
            let textures = self.texture_list_for(exposed);
            let region = match textures {
                TextureSelection::None => region.clone(),
                _ => Region::new(),
            };
            self.present(widgets, exposed, &region, textures);
            return;
        }

        let offset = if exposed == top {
            Vec2::ZERO
        } else {
            widgets.map_to_top(exposed)
        };
        self.mark_dirty_on_screen(widgets, region, exposed, offset);

        if self.sync_allowed() {
            self.do_sync(widgets, painter);
        } else {
            self.discard(SyncDiscard::TexturesLocked);
        }
    }

    /// Returns the area whose pixels survive a resize.
    ///
    /// Without `parent`, this covers the whole surface (a static top
    /// level) or every static widget of it, in top-level coordinates.
    /// With `parent`, only static descendants of `parent` count, in
    /// `parent`'s coordinates. Only opaque, visible widgets that have been
    /// painted at least once contribute, minus whatever is stacked above
    /// them. The result is clipped to `within` if given.
    #[must_use]
    pub fn static_contents(
        &self,
        widgets: &WidgetStore,
        parent: Option<WidgetId>,
        within: Option<Rect>,
    ) -> Region {
        let top = self.top_level;
        let within = within.filter(|r| !rect_is_empty(*r));

        if parent.is_none() && widgets.attributes(top).static_contents {
            let surface = Rect::from_origin_size(Point::ORIGIN, self.store.size());
            return Region::from_rect(match within {
                Some(clip) => surface.intersect(clip),
                None => surface,
            });
        }

        let mut region = Region::new();
        if let Some(p) = parent
            && !widgets.has_children(p)
        {
            return region;
        }

        for (&w, &size) in &self.static_sizes {
            if !widgets.is_alive(w)
                || size.is_zero_area()
                || !widgets.attributes(w).static_contents
                || !widgets.is_opaque(w)
                || !widgets.is_visible(w)
            {
                continue;
            }
            let origin = match parent {
                Some(p) if !widgets.is_ancestor_of(p, w) => continue,
                Some(p) => p,
                None if widgets.top_level_of(w) != top => continue,
                None => top,
            };

            let offset = widgets.map_to(w, origin);
            let mut rect = Rect::from_origin_size(Point::ORIGIN, size);
            if let Some(clip) = within {
                rect = rect.intersect(clip - offset);
            }
            rect = rect.intersect(widgets.clip_rect(w));
            if rect_is_empty(rect) {
                continue;
            }

            let mut visible = Region::from_rect(rect);
            widgets.clip_to_effective_mask(w, &mut visible);
            if visible.is_empty() {
                continue;
            }
            widgets.subtract_siblings_above(w, &mut visible, true);
            visible.translate(offset);
            region.union(&visible);
        }
        region
    }

    // -- Internal helpers --

    fn discard(&mut self, reason: SyncDiscard) {
        self.tracer.sync_discard(&SyncDiscardEvent {
            timestamp: self.store.host_time(),
            reason,
        });
    }

    fn has_static_contents(&self, widgets: &WidgetStore) -> bool {
        self.store.supports_static_contents()
            && widgets
                .descendants(self.top_level)
                .any(|w| widgets.attributes(w).static_contents)
    }

    fn do_sync<P>(&mut self, widgets: &mut WidgetStore, painter: &mut P)
    where
        P: WidgetPainter<S::Device> + ?Sized,
    {
        self.refresh(widgets);
        let widgets = &*widgets;
        let top = self.top_level;

        self.tracer.sync_begin(&SyncBeginEvent {
            timestamp: self.store.host_time(),
            dirty_widgets: u32::try_from(self.dirty_widgets.len()).unwrap_or(u32::MAX),
            dirty_textures: u32::try_from(self.dirty_render_to_texture.len()).unwrap_or(u32::MAX),
            full_update: self.full_update_pending,
        });

        let updates_disabled = !widgets.updates_enabled(top);
        let top_size = widgets.size(top);
        let top_rect = Rect::from_origin_size(Point::ORIGIN, top_size);
        let store_size = self.store.size();
        let size_changed = self.in_top_level_resize || store_size != top_size;
        let mut repaint_all = false;

        if (self.full_update_pending || size_changed) && !updates_disabled {
            if !self.full_update_pending
                && !store_size.is_zero_area()
                && self.has_static_contents(widgets)
            {
                // Repaint pending damage plus whatever is newly visible.
                let surface = Rect::from_origin_size(Point::ORIGIN, store_size);
                let preserved = self.static_contents(widgets, None, Some(surface));
                let mut new_visible = Region::from_rect(top_rect);
                new_visible.subtract(&preserved);
                self.dirty.union(&new_visible);
                self.store.set_static_contents(&preserved);
            } else {
                self.dirty = Region::from_rect(top_rect);
                for w in core::mem::take(&mut self.dirty_widgets) {
                    self.reset_widget(w);
                }
                repaint_all = true;
            }
        }

        if size_changed {
            self.store.resize(top_size);
        }

        if updates_disabled {
            self.end(0, false, Rect::ZERO, SyncOutcome::UpdatesDisabled);
            return;
        }

        let mut to_clean = self.dirty.clone();
        let mut direct: Vec<WidgetId> = Vec::new();
        let subtract_siblings = self.config.subtract_opaque_siblings;

        for w in core::mem::take(&mut self.dirty_widgets) {
            if !widgets.is_alive(w) {
                self.records.remove(&w);
                continue;
            }
            let Some(rec) = self.records.get_mut(&w) else {
                continue;
            };

            rec.dirty.intersect_rect(widgets.clip_rect(w));
            widgets.clip_to_effective_mask(w, &mut rec.dirty);

            // A moved widget is known not to be covered.
            let mut has_dirty_siblings_above = !subtract_siblings;
            if subtract_siblings && !rec.is_moved {
                has_dirty_siblings_above = widgets.subtract_opaque_siblings(w, &mut rec.dirty);
            }

            let before_children = rec.dirty.clone();
            if !rec.is_scrolled && !rec.is_moved {
                widgets.subtract_opaque_children(w, &mut rec.dirty, widgets.rect(w));
            }
            // A texture child needs its parent drawn behind it.
            if rec.dirty.is_empty() && widgets.texture_child_seen(w) {
                rec.dirty = before_children;
            }
            if rec.dirty.is_empty() {
                rec.reset();
                continue;
            }

            let widget_dirty = rec.dirty.translated(widgets.map_to_top(w));
            to_clean.union(&widget_dirty);

            if !has_dirty_siblings_above
                && widgets.is_opaque(w)
                && !self.dirty.intersects_rect(widget_dirty.bounding_rect())
            {
                direct.push(w);
            } else {
                rec.reset();
                self.dirty.union(&widget_dirty);
            }
        }

        self.rebuild_texture_lists(widgets);
        self.compositing = false;
        self.full_update_pending = false;

        if to_clean.is_empty() {
            // Texture content may still have changed.
            let pending = core::mem::take(&mut self.dirty_render_to_texture);
            for &w in &pending {
                self.reset_widget(w);
            }
            for w in pending {
                if !widgets.is_alive(w) || !widgets.is_visible(w) {
                    continue;
                }
                painter.render_texture(widgets, w);
                if let Some(np) = widgets.native_parent(w)
                    && np != top
                {
                    self.records.entry(np).or_default();
                    self.append_dirty_on_screen_widget(np);
                }
            }
            self.flush(widgets, None);
            self.end(0, false, Rect::ZERO, SyncOutcome::NoRepaint);
            return;
        }

        for list in &self.texture_lists {
            for entry in list.entries() {
                if self.dirty_render_to_texture.contains(&entry.source) {
                    let rect = entry.geometry.intersect(top_rect);
                    self.records.entry(entry.source).or_default().texture_really_dirty = true;
                    self.dirty.add_rect(rect);
                    to_clean.add_rect(rect);
                }
            }
        }
        for w in core::mem::take(&mut self.dirty_render_to_texture) {
            self.reset_widget(w);
        }

        let Some(report) = self.paint(widgets, painter, &to_clean, &direct, repaint_all) else {
            for &w in &direct {
                self.reset_widget(w);
            }
            self.dirty.clear();
            self.dirty_on_screen.clear();
            self.update_request_sent = false;
            self.end(0, false, to_clean.bounding_rect(), SyncOutcome::NothingToPaint);
            return;
        };

        self.dirty_on_screen.union(&to_clean);
        for (region, w, offset) in report.on_screen {
            self.mark_dirty_on_screen(widgets, &region, w, offset);
        }
        self.flush(widgets, None);

        #[cfg(feature = "trace-rich")]
        {
            let rects: Vec<crate::trace::DamageRect> =
                to_clean.rects().iter().map(|&r| r.into()).collect();
            self.tracer.damage_rects(&rects);
        }
        self.end(
            u32::try_from(direct.len()).unwrap_or(u32::MAX),
            report.composited,
            to_clean.bounding_rect(),
            SyncOutcome::Painted,
        );
    }

    /// Paints the direct widgets one by one, then the remaining aggregate
    /// damage through the top level.
    ///
    /// Returns `None` if the store has nothing to paint into.
    fn paint<P>(
        &mut self,
        widgets: &WidgetStore,
        painter: &mut P,
        to_clean: &Region,
        direct: &[WidgetId],
        repaint_all: bool,
    ) -> Option<PaintReport>
    where
        P: WidgetPainter<S::Device> + ?Sized,
    {
        let top = self.top_level;
        let mut guard = PaintGuard::begin(&mut self.store, to_clean)?;

        // Before painting: a painter may resize widgets.
        record_static_sizes(widgets, top, &mut self.static_sizes);

        let dirty_copy = core::mem::take(&mut self.dirty);
        self.update_request_sent = false;

        let mut pass = DrawPass {
            widgets,
            painter,
            device: guard.device(),
            records: &mut self.records,
            on_screen: Vec::new(),
            top_level: top,
        };

        for &w in direct {
            let Some(rec) = pass.records.get_mut(&w) else {
                continue;
            };
            let flags = DrawFlags {
                recursive: true,
                as_root: w == top,
                skip_opaque_children: !rec.is_scrolled && !rec.is_moved,
            };
            let to_be_painted = core::mem::take(&mut rec.dirty);
            rec.reset();
            pass.draw_widget(w, &to_be_painted, widgets.map_to_top(w), flags);
        }

        let composited = repaint_all || !dirty_copy.is_empty();
        if composited {
            let flags = DrawFlags {
                recursive: true,
                as_root: true,
                skip_opaque_children: false,
            };
            pass.draw_widget(top, &dirty_copy, Vec2::ZERO, flags);
        }

        let on_screen = pass.on_screen;
        drop(guard);
        Some(PaintReport {
            on_screen,
            composited,
        })
    }

    fn end(&mut self, direct_painted: u32, composited: bool, to_clean: Rect, outcome: SyncOutcome) {
        self.tracer.sync_end(&SyncEndEvent {
            timestamp: self.store.host_time(),
            direct_painted,
            composited,
            to_clean,
            outcome,
        });
    }

    /// Collects one texture list per native subtree that shows
    /// render-to-texture widgets.
    fn rebuild_texture_lists(&mut self, widgets: &WidgetStore) {
        let top = self.top_level;
        self.texture_lists.clear();
        collect_all_textures(widgets, top, &mut self.texture_lists);
        if widgets.texture_child_seen(top) {
            self.texture_child_ever_seen = true;
        }
    }
}

/// Records the current size of every static widget under `top`.
fn record_static_sizes(widgets: &WidgetStore, top: WidgetId, sizes: &mut BTreeMap<WidgetId, Size>) {
    sizes.retain(|&w, _| widgets.is_alive(w) && widgets.attributes(w).static_contents);
    for w in widgets.descendants(top) {
        if widgets.attributes(w).static_contents {
            sizes.insert(w, widgets.size(w));
        }
    }
}

fn collect_all_textures(widgets: &WidgetStore, root: WidgetId, out: &mut Vec<TextureList>) {
    if !widgets.texture_child_seen(root) {
        return;
    }
    let mut list = TextureList::new(root);
    let mut native_children = Vec::new();
    collect_textures(widgets, root, &mut list, &mut native_children);
    if !list.is_empty() {
        out.push(list);
    }
    // Each native child gets its own list.
    for child in native_children {
        collect_all_textures(widgets, child, out);
    }
}

fn collect_textures(
    widgets: &WidgetStore,
    widget: WidgetId,
    list: &mut TextureList,
    native_children: &mut Vec<WidgetId>,
) {
    if let Some(texture) = widgets.kind(widget).texture() {
        list.push(TextureEntry {
            source: widget,
            texture,
            geometry: Rect::from_origin_size(widgets.map_to_top(widget).to_point(), widgets.size(widget)),
            clip: widgets.clip_rect(widget),
            flags: TextureFlags {
                stacks_on_top: widgets.attributes(widget).stays_on_top,
            },
        });
    }
    for child in widgets.children(widget) {
        if widgets.attributes(child).hidden {
            continue;
        }
        if widgets.is_native(child) {
            native_children.push(child);
        } else if widgets.kind(child).texture().is_some() || widgets.texture_child_seen(child) {
            collect_textures(widgets, child, list, native_children);
        }
    }
}

/// One paint pass into the open backing store.
struct DrawPass<'a, P: ?Sized, D: ?Sized> {
    widgets: &'a WidgetStore,
    painter: &'a mut P,
    device: &'a mut D,
    records: &'a mut BTreeMap<WidgetId, DamageRecord>,
    on_screen: Vec<(Region, WidgetId, Vec2)>,
    top_level: WidgetId,
}

impl<P, D> DrawPass<'_, P, D>
where
    P: WidgetPainter<D> + ?Sized,
    D: ?Sized,
{
    /// Draws `rgn` (in `id`'s coordinates) of `id` with its origin at
    /// `offset`, then its children if `flags.recursive`.
    fn draw_widget(&mut self, id: WidgetId, rgn: &Region, offset: Vec2, flags: DrawFlags) {
        if rgn.is_empty() {
            return;
        }
        let widgets = self.widgets;
        let kind = widgets.kind(id);

        let mut to_be_painted = rgn.clone();
        if flags.as_root {
            to_be_painted.intersect_rect(widgets.clip_rect(id));
        }
        widgets.subtract_opaque_children(id, &mut to_be_painted, widgets.rect(id));

        // Paint-on-screen widgets paint themselves.
        if !to_be_painted.is_empty() && !matches!(kind, WidgetKind::PaintOnScreen(_)) {
            self.painter
                .paint_widget(widgets, id, &to_be_painted, offset, &mut *self.device);

            if kind.texture().is_some()
                && let Some(rec) = self.records.get_mut(&id)
                && rec.texture_really_dirty
            {
                rec.texture_really_dirty = false;
                self.painter.render_texture(widgets, id);
            }

            let under_native_child = widgets.is_native(id)
                || widgets
                    .native_parent(id)
                    .is_some_and(|np| np != self.top_level);
            if !flags.as_root && under_native_child {
                self.on_screen.push((to_be_painted, id, offset));
            }
        }

        if flags.recursive && widgets.has_children(id) {
            let children: Vec<WidgetId> = widgets.children(id).collect();
            let flags = DrawFlags {
                as_root: false,
                ..flags
            };
            self.paint_siblings(&children, rgn, offset, flags);
        }
    }

    /// Draws the siblings overlapping `rgn` (in their parent's coordinates)
    /// bottom to top. Area under an opaque sibling is withheld from the
    /// siblings below it.
    fn paint_siblings(&mut self, siblings: &[WidgetId], rgn: &Region, offset: Vec2, flags: DrawFlags) {
        let widgets = self.widgets;
        let mut plan: Vec<(WidgetId, Region)> = Vec::new();
        let mut remaining = rgn.clone();

        for &w in siblings.iter().rev() {
            if remaining.is_empty() {
                break;
            }
            let opaque = widgets.is_opaque(w);
            if (flags.skip_opaque_children && opaque) || widgets.attributes(w).hidden {
                continue;
            }
            let geometry = widgets.geometry(w);
            if !rects_overlap(remaining.bounding_rect(), widgets.effective_rect_for(w, geometry)) {
                continue;
            }
            plan.push((w, remaining.clone()));
            if opaque {
                match widgets.mask(w).filter(|_| widgets.graphics_effect(w).is_none()) {
                    Some(mask) => remaining.subtract(&mask.translated(geometry.origin().to_vec2())),
                    None => remaining.subtract_rect(geometry),
                }
            }
        }

        for (w, region) in plan.into_iter().rev() {
            if !widgets.updates_enabled(w) {
                continue;
            }
            let geometry = widgets.geometry(w);
            let pos = geometry.origin().to_vec2();
            let mut wr = region.intersected_rect(widgets.effective_rect_for(w, geometry));
            wr.translate(-pos);
            if let Some(mask) = widgets.mask(w).filter(|_| widgets.graphics_effect(w).is_none()) {
                wr.intersect(mask);
            }
            self.draw_widget(w, &wr, offset + pos, flags);
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size, Vec2};

    use super::super::TopLevelSurface;
    use super::super::tests::{LogPainter, LogStore, child, opaque, window};
    use crate::region::Region;
    use crate::update::{BufferState, UpdateTime};
    use crate::widget::{
        NativeWindowId, TextureId, WidgetAttributes, WidgetId, WidgetKind, WidgetStore,
    };

    fn mark(surface: &mut TopLevelSurface<LogStore>, widgets: &WidgetStore, w: WidgetId, r: Rect) {
        surface.mark_dirty_rect(widgets, w, r, UpdateTime::Later, BufferState::Valid);
    }

    #[test]
    fn simple_damage_is_painted_and_flushed() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(50.0, 50.0, 150.0, 150.0),
            opaque(),
        );
        mark(&mut surface, &widgets, w, Rect::new(10.0, 10.0, 20.0, 20.0));

        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);

        let expected = Region::from_rect(Rect::new(60.0, 60.0, 70.0, 70.0));
        assert_eq!(surface.backing_store().begun, [expected.clone()]);
        assert_eq!(
            painter.painted,
            [(w, Region::from_rect(Rect::new(10.0, 10.0, 20.0, 20.0)), Vec2::new(50.0, 50.0))]
        );
        assert_eq!(
            surface.backing_store().flushed,
            [(expected, NativeWindowId(1), Vec2::ZERO)]
        );
        assert!(!surface.is_dirty());
        assert!(surface.dirty_region(&widgets, None).is_empty());
    }

    #[test]
    fn second_sync_paints_nothing() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            opaque(),
        );
        mark(&mut surface, &widgets, w, Rect::new(0.0, 0.0, 50.0, 50.0));
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);
        let painted = painter.painted.len();
        surface.sync(&mut widgets, &mut painter);
        assert_eq!(painter.painted.len(), painted);
        assert_eq!(surface.backing_store().begun.len(), 1);
    }

    #[test]
    fn opaque_sibling_above_is_excluded() {
        let (mut widgets, top, mut surface) = window();
        let a = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            opaque(),
        );
        child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(80.0, 80.0, 150.0, 150.0),
            opaque(),
        );
        mark(&mut surface, &widgets, a, Rect::new(0.0, 0.0, 100.0, 100.0));

        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);

        let mut expected = Region::from_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
        expected.subtract_rect(Rect::new(80.0, 80.0, 100.0, 100.0));
        assert_eq!(painter.region_for(a), expected);
    }

    #[test]
    fn translucent_widget_goes_through_top_level() {
        let (mut widgets, top, mut surface) = window();
        let a = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            WidgetAttributes::default(),
        );
        mark(&mut surface, &widgets, a, Rect::new(0.0, 0.0, 10.0, 10.0));

        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);

        let damage = Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(
            painter.painted,
            [(top, damage.clone(), Vec2::ZERO), (a, damage, Vec2::ZERO)]
        );
    }

    #[test]
    fn size_mismatch_repaints_everything() {
        let (mut widgets, top, mut surface) = window();
        surface.backing_store_mut().size = Size::new(100.0, 100.0);
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);

        assert_eq!(surface.backing_store().resized, [Size::new(200.0, 200.0)]);
        assert_eq!(
            painter.region_for(top),
            Region::from_rect(Rect::new(0.0, 0.0, 200.0, 200.0))
        );
    }

    #[test]
    fn static_child_survives_top_level_growth() {
        let (mut widgets, top, mut surface) = window();
        widgets.set_geometry(top, Rect::new(0.0, 0.0, 100.0, 100.0));
        surface.backing_store_mut().size = Size::new(100.0, 100.0);
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            WidgetAttributes {
                static_contents: true,
                opaque: true,
                ..WidgetAttributes::default()
            },
        );
        mark(&mut surface, &widgets, w, Rect::new(0.0, 0.0, 1.0, 1.0));
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);

        widgets.set_geometry(top, Rect::new(0.0, 0.0, 150.0, 150.0));
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);

        let preserved = Region::from_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(surface.backing_store().static_contents, [preserved.clone()]);
        let mut l_shape = Region::from_rect(Rect::new(0.0, 0.0, 150.0, 150.0));
        l_shape.subtract(&preserved);
        assert_eq!(surface.backing_store().begun.last(), Some(&l_shape));
        assert!(painter.region_for(w).is_empty());
    }

    #[test]
    fn hidden_top_level_drops_damage() {
        let (mut widgets, top, mut surface) = window();
        mark(&mut surface, &widgets, top, Rect::new(0.0, 0.0, 10.0, 10.0));
        widgets.set_attributes(
            top,
            WidgetAttributes {
                hidden: true,
                ..opaque()
            },
        );
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);
        assert!(painter.painted.is_empty());
        assert!(!surface.is_dirty());
    }

    #[test]
    fn unmapped_top_level_keeps_damage() {
        let (mut widgets, top, mut surface) = window();
        mark(&mut surface, &widgets, top, Rect::new(0.0, 0.0, 10.0, 10.0));
        widgets.set_attributes(
            top,
            WidgetAttributes {
                unmapped: true,
                ..opaque()
            },
        );
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);
        assert!(painter.painted.is_empty());
        assert!(surface.is_dirty());
    }

    #[test]
    fn refused_paint_scope_aborts_cleanly() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(0.0, 0.0, 50.0, 50.0),
            opaque(),
        );
        mark(&mut surface, &widgets, w, Rect::new(0.0, 0.0, 10.0, 10.0));
        surface.invalidate_buffer_rect(&widgets, top, Rect::new(100.0, 100.0, 120.0, 120.0));
        surface.backing_store_mut().refuse_paint = true;

        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);
        assert!(painter.painted.is_empty());
        assert!(!surface.is_dirty());
        assert!(!surface.backing_store().painting);
        assert!(!surface.records[&w].in_dirty_list);
    }

    #[test]
    fn aborted_damage_is_not_presented_later() {
        let (mut widgets, top, mut surface) = window();
        let w = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(0.0, 0.0, 50.0, 50.0),
            opaque(),
        );
        mark(&mut surface, &widgets, w, Rect::new(0.0, 0.0, 10.0, 10.0));
        surface.invalidate_buffer_rect(&widgets, top, Rect::new(100.0, 100.0, 120.0, 120.0));
        surface.backing_store_mut().refuse_paint = true;
        surface.sync(&mut widgets, &mut LogPainter::default());
        assert!(surface.dirty_on_screen.is_empty());

        surface.backing_store_mut().refuse_paint = false;
        mark(&mut surface, &widgets, w, Rect::new(20.0, 20.0, 30.0, 30.0));
        surface.sync(&mut widgets, &mut LogPainter::default());
        assert_eq!(
            surface.backing_store().flushed,
            [(
                Region::from_rect(Rect::new(20.0, 20.0, 30.0, 30.0)),
                NativeWindowId(1),
                Vec2::ZERO
            )]
        );
    }

    #[test]
    fn texture_change_composes_without_raster() {
        let (mut widgets, top, mut surface) = window();
        let gl = child(
            &mut widgets,
            top,
            WidgetKind::RenderToTexture(TextureId(7)),
            Rect::new(10.0, 10.0, 60.0, 60.0),
            WidgetAttributes::default(),
        );
        // First sync paints the hole behind the texture.
        mark(&mut surface, &widgets, top, Rect::new(0.0, 0.0, 200.0, 200.0));
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);
        let begun = surface.backing_store().begun.len();

        mark(&mut surface, &widgets, gl, Rect::new(0.0, 0.0, 5.0, 5.0));
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);

        assert_eq!(surface.backing_store().begun.len(), begun);
        assert_eq!(painter.rendered, [gl]);
        assert_eq!(surface.texture_lists().len(), 1);
        assert_eq!(surface.texture_lists()[0].entries()[0].source, gl);
        let last = surface.backing_store().composed.last().cloned();
        assert_eq!(last, Some((Region::new(), NativeWindowId(1), 1)));
    }

    #[test]
    fn locked_textures_defer_sync() {
        let (mut widgets, top, mut surface) = window();
        child(
            &mut widgets,
            top,
            WidgetKind::RenderToTexture(TextureId(7)),
            Rect::new(10.0, 10.0, 60.0, 60.0),
            WidgetAttributes::default(),
        );
        mark(&mut surface, &widgets, top, Rect::new(0.0, 0.0, 200.0, 200.0));
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);
        while surface.next_update_request().is_some() {}

        surface.set_texture_list_locked(top, true);
        mark(&mut surface, &widgets, top, Rect::new(0.0, 0.0, 10.0, 10.0));
        surface.sync(&mut widgets, &mut painter);
        assert!(surface.is_dirty());
        assert!(!surface.has_update_request());

        surface.set_texture_list_locked(top, false);
        assert_eq!(surface.next_update_request().map(|r| r.widget), Some(top));
        surface.sync(&mut widgets, &mut painter);
        assert!(!surface.is_dirty());
    }

    #[test]
    fn native_child_damage_is_flushed_to_its_window() {
        let (mut widgets, top, mut surface) = window();
        let native = child(
            &mut widgets,
            top,
            WidgetKind::Native(NativeWindowId(4)),
            Rect::new(100.0, 100.0, 200.0, 200.0),
            opaque(),
        );
        mark(&mut surface, &widgets, native, Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);

        let flushed = &surface.backing_store().flushed;
        assert!(flushed.contains(&(
            Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0)),
            NativeWindowId(4),
            Vec2::new(100.0, 100.0)
        )));
    }

    #[test]
    fn exposed_clean_window_is_presented_directly() {
        let (mut widgets, top, mut surface) = window();
        let r = Region::from_rect(Rect::new(0.0, 0.0, 30.0, 30.0));
        let mut painter = LogPainter::default();
        surface.sync_exposed(&mut widgets, top, &r, &mut painter);
        assert!(painter.painted.is_empty());
        assert_eq!(
            surface.backing_store().flushed,
            [(r, NativeWindowId(1), Vec2::ZERO)]
        );
    }

    #[test]
    fn static_contents_of_parent_is_local() {
        let (mut widgets, top, mut surface) = window();
        let p = child(
            &mut widgets,
            top,
            WidgetKind::Alien,
            Rect::new(50.0, 50.0, 150.0, 150.0),
            WidgetAttributes::default(),
        );
        let s = child(
            &mut widgets,
            p,
            WidgetKind::Alien,
            Rect::new(10.0, 10.0, 40.0, 40.0),
            WidgetAttributes {
                static_contents: true,
                opaque: true,
                ..WidgetAttributes::default()
            },
        );
        mark(&mut surface, &widgets, s, Rect::new(0.0, 0.0, 1.0, 1.0));
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);

        assert_eq!(
            surface.static_contents(&widgets, Some(p), None),
            Region::from_rect(Rect::new(10.0, 10.0, 40.0, 40.0))
        );
        assert_eq!(
            surface.static_contents(&widgets, None, Some(Rect::new(0.0, 0.0, 70.0, 70.0))),
            Region::from_rect(Rect::new(60.0, 60.0, 70.0, 70.0))
        );
    }

    #[cfg(feature = "trace")]
    #[test]
    fn sync_reports_outcome() {
        use alloc::boxed::Box;
        use alloc::rc::Rc;
        use alloc::vec::Vec;
        use core::cell::RefCell;

        use crate::trace::{SyncEndEvent, SyncOutcome, TraceSink};

        #[derive(Default)]
        struct Ends(Vec<SyncEndEvent>);
        impl TraceSink for Ends {
            fn on_sync_end(&mut self, e: &SyncEndEvent) {
                self.0.push(*e);
            }
        }

        let (mut widgets, top, mut surface) = window();
        let sink = Rc::new(RefCell::new(Ends::default()));
        surface.set_trace_sink(Box::new(sink.clone()));
        let mut painter = LogPainter::default();
        surface.sync(&mut widgets, &mut painter);
        mark(&mut surface, &widgets, top, Rect::new(0.0, 0.0, 10.0, 10.0));
        surface.sync(&mut widgets, &mut painter);

        let outcomes: Vec<SyncOutcome> = sink.borrow().0.iter().map(|e| e.outcome).collect();
        assert_eq!(outcomes, [SyncOutcome::NoRepaint, SyncOutcome::Painted]);
    }
}
