// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays widget storage with allocation, topology, and property management.

use alloc::vec::Vec;

use kurbo::{Insets, Rect, Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{INVALID, WidgetId};
use super::kind::{WidgetAttributes, WidgetKind};
use super::traverse::{Children, Descendants};
use crate::dirty;
use crate::region::Region;

/// Struct-of-arrays storage for all widgets.
///
/// Widgets are addressed by [`WidgetId`] handles. Internally, each widget
/// occupies a slot in parallel arrays. Destroyed widgets are recycled via a
/// free list, and generation counters prevent stale handle access.
///
/// Children are kept in stacking order: a later sibling is drawn above an
/// earlier one.
#[derive(Debug)]
pub struct WidgetStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Properties (set by callers) --
    pub(crate) geometry: Vec<Rect>,
    pub(crate) kind: Vec<WidgetKind>,
    pub(crate) attributes: Vec<WidgetAttributes>,
    pub(crate) mask: Vec<Option<Region>>,
    pub(crate) effect: Vec<Option<Insets>>,

    // -- Derived state (written by evaluate) --
    pub(crate) opaque_children: Vec<Region>,
    pub(crate) texture_child_seen: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) needs_evaluate: bool,
}

impl Default for WidgetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetStore {
    /// Creates an empty widget store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            geometry: Vec::new(),
            kind: Vec::new(),
            attributes: Vec::new(),
            mask: Vec::new(),
            effect: Vec::new(),
            opaque_children: Vec::new(),
            texture_child_seen: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            needs_evaluate: false,
        }
    }

    // -- Allocation API --

    /// Creates a new widget and returns its handle.
    ///
    /// `geometry` is in the parent's coordinate system once the widget is
    /// attached; for a top level its origin is the window position. The
    /// widget starts shown, updatable, transparent, unmasked, and without a
    /// parent.
    pub fn create_widget(&mut self, kind: WidgetKind, geometry: Rect) -> WidgetId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.geometry[i] = geometry;
            self.kind[i] = kind;
            self.attributes[i] = WidgetAttributes::default();
            self.mask[i] = None;
            self.effect[i] = None;
            self.opaque_children[i] = Region::new();
            self.texture_child_seen[i] = false;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.geometry.push(geometry);
            self.kind.push(kind);
            self.attributes.push(WidgetAttributes::default());
            self.mask.push(None);
            self.effect.push(None);
            self.opaque_children.push(Region::new());
            self.texture_child_seen.push(false);
            self.generation.push(0);
            idx
        };

        self.dirty.mark(idx, dirty::TOPOLOGY);
        self.dirty.mark(idx, dirty::TEXTURE_CHILDREN);
        self.dirty.mark(idx, dirty::OPAQUE_CHILDREN);
        self.needs_evaluate = true;

        WidgetId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a widget, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the widget has children (remove them first) or if the
    /// handle is stale.
    pub fn destroy_widget(&mut self, id: WidgetId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy widget with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.detach(idx);
        }

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
        self.needs_evaluate = true;
    }

    /// Returns whether the given handle refers to a live widget.
    #[must_use]
    pub fn is_alive(&self, id: WidgetId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Adds `child` on top of the existing children of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent, or
    /// if `parent` is `child` or one of its descendants.
    pub fn add_child(&mut self, parent: WidgetId, child: WidgetId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(
            p != c && !self.is_ancestor_idx(c, p),
            "adding {child:?} under {parent:?} would create a cycle"
        );

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        self.attach(p, c);
    }

    /// Inserts `child` directly below `sibling` in the stacking order.
    ///
    /// `child` must not already have a parent. `sibling` must have a parent.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, `sibling`
    /// has no parent, or the insertion would create a cycle.
    pub fn insert_before(&mut self, child: WidgetId, sibling: WidgetId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");
        assert!(
            p != c && !self.is_ancestor_idx(c, p),
            "inserting {child:?} next to {sibling:?} would create a cycle"
        );

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.attach(p, c);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the widget has no parent.
    pub fn remove_from_parent(&mut self, child: WidgetId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "widget has no parent");
        self.detach(c);
    }

    /// Returns the parent of a widget, if any.
    #[must_use]
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.validate(id);
        self.handle_at(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a widget, bottom to
    /// top.
    #[must_use]
    pub fn children(&self, id: WidgetId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns an iterator over `id` and all of its descendants in
    /// depth-first pre-order.
    #[must_use]
    pub fn descendants(&self, id: WidgetId) -> Descendants<'_> {
        self.validate(id);
        Descendants::new(self, id.idx)
    }

    /// Returns `true` if the widget has at least one child.
    #[must_use]
    pub fn has_children(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.first_child[id.idx as usize] != INVALID
    }

    /// Returns `true` if the widget has no parent.
    #[must_use]
    pub fn is_window(&self, id: WidgetId) -> bool {
        self.validate(id);
        self.parent[id.idx as usize] == INVALID
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `id`.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: WidgetId, id: WidgetId) -> bool {
        self.validate(ancestor);
        self.validate(id);
        self.is_ancestor_idx(ancestor.idx, id.idx)
    }

    /// Returns the root of the tree containing `id`.
    #[must_use]
    pub fn top_level_of(&self, id: WidgetId) -> WidgetId {
        self.validate(id);
        let mut idx = id.idx;
        while self.parent[idx as usize] != INVALID {
            idx = self.parent[idx as usize];
        }
        WidgetId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the geometry of a widget in its parent's coordinates.
    #[must_use]
    pub fn geometry(&self, id: WidgetId) -> Rect {
        self.validate(id);
        self.geometry[id.idx as usize]
    }

    /// Returns the widget's position in its parent's coordinates.
    #[must_use]
    pub fn pos(&self, id: WidgetId) -> Vec2 {
        self.geometry(id).origin().to_vec2()
    }

    /// Returns the widget's size.
    #[must_use]
    pub fn size(&self, id: WidgetId) -> Size {
        self.geometry(id).size()
    }

    /// Returns the widget's rect in its own coordinates (origin at zero).
    #[must_use]
    pub fn rect(&self, id: WidgetId) -> Rect {
        Rect::from_origin_size(kurbo::Point::ORIGIN, self.size(id))
    }

    /// Returns the kind of a widget.
    #[must_use]
    pub fn kind(&self, id: WidgetId) -> WidgetKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns the attributes of a widget.
    #[must_use]
    pub fn attributes(&self, id: WidgetId) -> WidgetAttributes {
        self.validate(id);
        self.attributes[id.idx as usize]
    }

    /// Returns the mask of a widget in its own coordinates, if any.
    #[must_use]
    pub fn mask(&self, id: WidgetId) -> Option<&Region> {
        self.validate(id);
        self.mask[id.idx as usize].as_ref()
    }

    /// Returns the bleed of the widget's graphics effect, if it has one.
    #[must_use]
    pub fn graphics_effect(&self, id: WidgetId) -> Option<Insets> {
        self.validate(id);
        self.effect[id.idx as usize]
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the geometry of a widget.
    ///
    /// This only updates the tree. Damage for the move or resize is declared
    /// separately through the surface (see
    /// [`move_rect`](crate::surface::TopLevelSurface::move_rect) and
    /// [`invalidate_after_resize`](crate::surface::TopLevelSurface::invalidate_after_resize)).
    pub fn set_geometry(&mut self, id: WidgetId, geometry: Rect) {
        self.validate(id);
        self.geometry[id.idx as usize] = geometry;
        self.mark_opaque_changed(id.idx);
    }

    /// Sets the kind of a widget.
    pub fn set_kind(&mut self, id: WidgetId, kind: WidgetKind) {
        self.validate(id);
        self.kind[id.idx as usize] = kind;
        self.dirty
            .mark_with(id.idx, dirty::TEXTURE_CHILDREN, &EagerPolicy);
        self.mark_opaque_changed(id.idx);
    }

    /// Sets the attributes of a widget.
    pub fn set_attributes(&mut self, id: WidgetId, attributes: WidgetAttributes) {
        self.validate(id);
        self.attributes[id.idx as usize] = attributes;
        self.mark_opaque_changed(id.idx);
    }

    /// Sets the mask of a widget (in its own coordinates).
    pub fn set_mask(&mut self, id: WidgetId, mask: Option<Region>) {
        self.validate(id);
        self.mask[id.idx as usize] = mask;
        self.mark_opaque_changed(id.idx);
    }

    /// Installs or removes a graphics effect bleeding `insets` past the
    /// widget's rect.
    pub fn set_graphics_effect(&mut self, id: WidgetId, insets: Option<Insets>) {
        self.validate(id);
        self.effect[id.idx as usize] = insets;
        self.mark_opaque_changed(id.idx);
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: WidgetId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale WidgetId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Builds a handle for a raw slot, or `None` for [`INVALID`].
    pub(crate) fn handle_at(&self, idx: u32) -> Option<WidgetId> {
        if idx == INVALID {
            None
        } else {
            Some(WidgetId {
                idx,
                generation: self.generation[idx as usize],
            })
        }
    }

    fn is_ancestor_idx(&self, ancestor: u32, mut idx: u32) -> bool {
        loop {
            idx = self.parent[idx as usize];
            if idx == INVALID {
                return false;
            }
            if idx == ancestor {
                return true;
            }
        }
    }

    /// Records the dependency edges for a freshly linked child.
    fn attach(&mut self, p: u32, c: u32) {
        // The parent's cached state is derived from the child's.
        let _ = self.dirty.add_dependency(p, c, dirty::OPAQUE_CHILDREN);
        let _ = self.dirty.add_dependency(p, c, dirty::TEXTURE_CHILDREN);

        self.dirty.mark_with(p, dirty::OPAQUE_CHILDREN, &EagerPolicy);
        self.dirty.mark_with(p, dirty::TEXTURE_CHILDREN, &EagerPolicy);
        self.dirty.mark(p, dirty::TOPOLOGY);
        self.needs_evaluate = true;
    }

    /// Unlinks `idx` from its parent and drops the dependency edges.
    fn detach(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;

        self.dirty.remove_dependency(p, idx, dirty::OPAQUE_CHILDREN);
        self.dirty.remove_dependency(p, idx, dirty::TEXTURE_CHILDREN);

        self.dirty.mark_with(p, dirty::OPAQUE_CHILDREN, &EagerPolicy);
        self.dirty.mark_with(p, dirty::TEXTURE_CHILDREN, &EagerPolicy);
        self.dirty.mark(p, dirty::TOPOLOGY);
        self.needs_evaluate = true;
    }

    /// Invalidates the opaque coverage of `idx` and every ancestor.
    fn mark_opaque_changed(&mut self, idx: u32) {
        self.dirty
            .mark_with(idx, dirty::OPAQUE_CHILDREN, &EagerPolicy);
        self.needs_evaluate = true;
    }
}
