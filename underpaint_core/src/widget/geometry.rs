// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate mapping, clipping, and occlusion queries.
//!
//! Every query here is read-only. The occlusion helpers
//! ([`opaque_children`](WidgetStore::opaque_children),
//! [`subtract_opaque_children`](WidgetStore::subtract_opaque_children), and
//! the non-opaque branch of
//! [`subtract_opaque_siblings`](WidgetStore::subtract_opaque_siblings)) read
//! caches that are only current after [`evaluate`](WidgetStore::evaluate).

use kurbo::{Point, Rect, Vec2};

use super::id::{INVALID, NativeWindowId, WidgetId};
use super::kind::WidgetKind;
use super::store::WidgetStore;
use crate::region::{Region, rect_is_empty, rects_overlap};

impl WidgetStore {
    /// Returns the offset of `id`'s origin in its top level's coordinates.
    #[must_use]
    pub fn map_to_top(&self, id: WidgetId) -> Vec2 {
        self.validate(id);
        let mut offset = Vec2::ZERO;
        let mut idx = id.idx;
        while self.parent[idx as usize] != INVALID {
            offset += self.geometry[idx as usize].origin().to_vec2();
            idx = self.parent[idx as usize];
        }
        offset
    }

    /// Returns the offset of `id`'s origin in `ancestor`'s coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `ancestor` is neither `id` nor one of its ancestors.
    #[must_use]
    pub fn map_to(&self, id: WidgetId, ancestor: WidgetId) -> Vec2 {
        self.validate(id);
        self.validate(ancestor);
        let mut offset = Vec2::ZERO;
        let mut idx = id.idx;
        while idx != ancestor.idx {
            assert!(
                self.parent[idx as usize] != INVALID,
                "{ancestor:?} is not an ancestor of {id:?}"
            );
            offset += self.geometry[idx as usize].origin().to_vec2();
            idx = self.parent[idx as usize];
        }
        offset
    }

    /// Returns `true` if neither the widget nor any ancestor is hidden.
    #[must_use]
    pub fn is_visible(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.all_up(id.idx, |s, i| !s.attributes[i as usize].hidden)
    }

    /// Returns `true` if neither the widget nor any ancestor has updates
    /// disabled.
    #[must_use]
    pub fn updates_enabled(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.all_up(id.idx, |s, i| !s.attributes[i as usize].updates_disabled)
    }

    /// Returns `true` if the widget fills its whole rect with opaque pixels.
    ///
    /// Paint-on-screen widgets count as opaque. A graphics effect or a
    /// translucent background makes any widget non-opaque.
    #[must_use]
    pub fn is_opaque(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.is_opaque_idx(id.idx)
    }

    /// Expands `rect` by the widget's graphics-effect bleed, if any.
    #[must_use]
    pub fn effective_rect_for(&self, id: WidgetId, rect: Rect) -> Rect {
        self.validate(id);
        match self.effect[id.idx as usize] {
            Some(insets) => rect + insets,
            None => rect,
        }
    }

    /// Returns the part of the widget (in its own coordinates) not clipped
    /// away by its ancestors.
    ///
    /// Hidden widgets have an empty clip rect.
    #[must_use]
    pub fn clip_rect(&self, id: WidgetId) -> Rect {
        if !self.is_visible(id) {
            return Rect::ZERO;
        }
        let mut r = self.effective_rect_for(id, self.rect(id));
        let mut origin = Point::ORIGIN;
        let mut idx = id.idx;
        while self.parent[idx as usize] != INVALID {
            origin -= self.geometry[idx as usize].origin().to_vec2();
            idx = self.parent[idx as usize];
            let parent_size = self.geometry[idx as usize].size();
            r = r.intersect(Rect::from_origin_size(origin, parent_size));
        }
        if rect_is_empty(r) { Rect::ZERO } else { r }
    }

    /// Intersects `region` (in `id`'s coordinates) with the masks of the
    /// widget and all of its ancestors.
    ///
    /// A widget with a graphics effect ignores its own mask; the effect's
    /// bleed is allowed to cover it.
    pub fn clip_to_effective_mask(&self, id: WidgetId, region: &mut Region) {
        self.validate(id);
        let mut offset = Vec2::ZERO;
        let mut idx = id.idx;
        if self.effect[idx as usize].is_some() {
            if self.parent[idx as usize] == INVALID {
                return;
            }
            offset -= self.geometry[idx as usize].origin().to_vec2();
            idx = self.parent[idx as usize];
        }
        loop {
            if let Some(mask) = &self.mask[idx as usize] {
                if idx == id.idx {
                    region.intersect(mask);
                } else {
                    region.intersect(&mask.translated(offset));
                }
            }
            if self.parent[idx as usize] == INVALID {
                return;
            }
            offset -= self.geometry[idx as usize].origin().to_vec2();
            idx = self.parent[idx as usize];
        }
    }

    /// Returns `true` if the widget owns a platform window.
    ///
    /// Top levels always do, whatever their kind.
    #[must_use]
    pub fn is_native(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.parent[id.idx as usize] == INVALID || self.kind[id.idx as usize].window().is_some()
    }

    /// Returns the nearest strict ancestor that owns a platform window.
    ///
    /// Returns `None` for top levels.
    #[must_use]
    pub fn native_parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.validate(id);
        let mut idx = self.parent[id.idx as usize];
        while idx != INVALID {
            if self.parent[idx as usize] == INVALID || self.kind[idx as usize].window().is_some() {
                return self.handle_at(idx);
            }
            idx = self.parent[idx as usize];
        }
        None
    }

    /// Returns the platform window that presents `id`: its own if it has
    /// one, otherwise its native parent's.
    #[must_use]
    pub fn native_window(&self, id: WidgetId) -> Option<NativeWindowId> {
        self.validate(id);
        let mut idx = id.idx;
        loop {
            if let Some(w) = self.kind[idx as usize].window() {
                return Some(w);
            }
            idx = self.parent[idx as usize];
            if idx == INVALID {
                return None;
            }
        }
    }

    /// Returns `true` if a visible sibling stacked above `id`, or above any
    /// of its ancestors, intersects `rect` (given in `id`'s parent's
    /// coordinates).
    #[must_use]
    pub fn is_overlapped(&self, id: WidgetId, rect: Rect) -> bool {
        self.validate(id);
        let mut r = rect;
        let mut idx = id.idx;
        while self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            let mut sibling = self.next_sibling[idx as usize];
            while sibling != INVALID {
                let s = sibling as usize;
                sibling = self.next_sibling[s];
                if self.attributes[s].hidden {
                    continue;
                }
                let sibling_rect = self.effective_rect_idx(s as u32, self.geometry[s]);
                if !rects_overlap(sibling_rect, r) {
                    continue;
                }
                if let Some(mask) = &self.mask[s]
                    && self.effect[s].is_none()
                    && !mask
                        .translated(self.geometry[s].origin().to_vec2())
                        .intersects_rect(r)
                {
                    continue;
                }
                return true;
            }
            r = r + self.geometry[p as usize].origin().to_vec2();
            idx = p;
        }
        false
    }

    /// Removes from `region` (in `id`'s coordinates) everything covered by
    /// visible siblings stacked above `id` or above any of its ancestors.
    ///
    /// Opaque siblings remove their whole (masked) geometry. Non-opaque
    /// siblings only remove their opaque children, and report themselves
    /// through the returned flag: `true` means at least one non-opaque
    /// sibling above overlaps the damage, so `id` cannot be painted in
    /// isolation.
    pub fn subtract_opaque_siblings(&self, id: WidgetId, region: &mut Region) -> bool {
        self.subtract_siblings_above(id, region, false)
    }

    /// Like [`subtract_opaque_siblings`](Self::subtract_opaque_siblings), but
    /// with `also_non_opaque` every overlapping sibling above removes its
    /// whole geometry.
    pub(crate) fn subtract_siblings_above(
        &self,
        id: WidgetId,
        region: &mut Region,
        also_non_opaque: bool,
    ) -> bool {
        self.validate(id);
        let mut has_dirty_siblings_above = false;
        let mut parent_offset = self.geometry[id.idx as usize].origin().to_vec2();
        let mut idx = id.idx;

        while self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            let widget_geometry = self.effective_rect_idx(idx, self.geometry[idx as usize]);

            let mut sibling = self.next_sibling[idx as usize];
            while sibling != INVALID {
                let s = sibling;
                sibling = self.next_sibling[s as usize];
                if self.attributes[s as usize].hidden {
                    continue;
                }
                let sibling_geometry = self.effective_rect_idx(s, self.geometry[s as usize]);
                if !rects_overlap(sibling_geometry, widget_geometry) {
                    continue;
                }
                if !rects_overlap(sibling_geometry, region.bounding_rect() + parent_offset) {
                    continue;
                }

                let sibling_pos = self.geometry[s as usize].origin().to_vec2();
                let sibling_handle = WidgetId {
                    idx: s,
                    generation: self.generation[s as usize],
                };
                let mut sibling_dirty = region.translated(parent_offset);
                sibling_dirty.intersect_rect(self.clip_rect(sibling_handle) + sibling_pos);
                let sibling_mask = self.mask[s as usize]
                    .as_ref()
                    .filter(|_| self.effect[s as usize].is_none());
                if let Some(mask) = sibling_mask {
                    sibling_dirty.intersect(&mask.translated(sibling_pos));
                }
                if sibling_dirty.is_empty() {
                    continue;
                }

                if also_non_opaque || self.is_opaque_idx(s) {
                    if sibling_mask.is_some() {
                        sibling_dirty.translate(-parent_offset);
                        region.subtract(&sibling_dirty);
                    } else {
                        region.subtract_rect(sibling_geometry - parent_offset);
                    }
                } else {
                    has_dirty_siblings_above = true;
                    if self.first_child[s as usize] == INVALID {
                        continue;
                    }
                    let covered = self.opaque_children[s as usize]
                        .translated(sibling_pos - parent_offset);
                    region.subtract(&covered);
                }
                if region.is_empty() {
                    return has_dirty_siblings_above;
                }
            }

            parent_offset += self.geometry[p as usize].origin().to_vec2();
            idx = p;
        }
        has_dirty_siblings_above
    }

    /// Removes from `region` the opaque children of `id` that fall inside
    /// `clip` (both in `id`'s coordinates).
    pub fn subtract_opaque_children(&self, id: WidgetId, region: &mut Region, clip: Rect) {
        self.validate(id);
        if self.first_child[id.idx as usize] == INVALID || rect_is_empty(clip) {
            return;
        }
        let covered = &self.opaque_children[id.idx as usize];
        if !covered.is_empty() {
            region.subtract(&covered.intersected_rect(clip));
        }
    }

    /// Returns the area of `id` (in its own coordinates) fully covered by
    /// opaque descendants.
    #[must_use]
    pub fn opaque_children(&self, id: WidgetId) -> &Region {
        self.validate(id);
        &self.opaque_children[id.idx as usize]
    }

    /// Returns `true` if a render-to-texture widget exists anywhere below
    /// `id`.
    #[must_use]
    pub fn texture_child_seen(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.texture_child_seen[id.idx as usize]
    }

    // -- Internal helpers --

    pub(crate) fn is_opaque_idx(&self, idx: u32) -> bool {
        let i = idx as usize;
        let attrs = self.attributes[i];
        self.effect[i].is_none()
            && !attrs.translucent_background
            && (attrs.opaque || matches!(self.kind[i], WidgetKind::PaintOnScreen(_)))
    }

    fn effective_rect_idx(&self, idx: u32, rect: Rect) -> Rect {
        match self.effect[idx as usize] {
            Some(insets) => rect + insets,
            None => rect,
        }
    }

    /// Returns `true` if `pred` holds for `idx` and every ancestor.
    fn all_up(&self, mut idx: u32, pred: impl Fn(&Self, u32) -> bool) -> bool {
        loop {
            if !pred(self, idx) {
                return false;
            }
            idx = self.parent[idx as usize];
            if idx == INVALID {
                return true;
            }
        }
    }
}
