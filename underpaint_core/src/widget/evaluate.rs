// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recomputation of derived widget state.
//!
//! Evaluation follows a drain-recompute pattern for each dirty channel:
//!
//! 1. **OPAQUE_CHILDREN**: drain dirty indices children-first and rebuild
//!    each widget's opaque-children region from its direct children (an
//!    opaque child contributes its rect, any other child its own cached
//!    opaque children), clipped to masks and to the widget's rect.
//! 2. **TEXTURE_CHILDREN**: drain children-first and recompute whether any
//!    render-to-texture widget lives below each widget.
//! 3. **TOPOLOGY**: drain and report whether the tree changed.
//!
//! Because the tracker orders the drain so that dependencies come first,
//! every child's cache is current by the time its parent reads it.

use alloc::vec::Vec;

use super::id::INVALID;
use super::kind::WidgetKind;
use super::store::WidgetStore;
use crate::dirty;
use crate::region::Region;

/// The widgets touched by a single [`WidgetStore::evaluate`] call, as raw
/// slot indices.
#[derive(Clone, Debug, Default)]
pub struct WidgetChanges {
    /// Widgets whose opaque-children region was recomputed.
    pub opaque_children: Vec<u32>,
    /// Widgets whose render-to-texture flag was recomputed.
    pub texture_children: Vec<u32>,
    /// Whether widgets were created, destroyed, or re-linked.
    pub topology_changed: bool,
}

impl WidgetChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.opaque_children.clear();
        self.texture_children.clear();
        self.topology_changed = false;
    }
}

impl WidgetStore {
    /// Brings the derived caches up to date and returns what changed.
    pub fn evaluate(&mut self) -> WidgetChanges {
        let mut changes = WidgetChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer
    /// to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut WidgetChanges) {
        changes.clear();
        if !self.needs_evaluate {
            return;
        }

        changes.opaque_children = self
            .dirty
            .drain(dirty::OPAQUE_CHILDREN)
            .affected()
            .deterministic()
            .run()
            .filter(|&idx| !self.free_list.contains(&idx))
            .collect();
        for &idx in &changes.opaque_children {
            self.opaque_children[idx as usize] = self.compute_opaque_children(idx);
        }

        changes.texture_children = self
            .dirty
            .drain(dirty::TEXTURE_CHILDREN)
            .affected()
            .deterministic()
            .run()
            .filter(|&idx| !self.free_list.contains(&idx))
            .collect();
        for &idx in &changes.texture_children {
            self.texture_child_seen[idx as usize] = self.compute_texture_child_seen(idx);
        }

        let topology: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
        changes.topology_changed = !topology.is_empty();

        self.needs_evaluate = false;
    }

    /// Returns `true` if a mutation happened since the last evaluate.
    #[must_use]
    pub fn needs_evaluate(&self) -> bool {
        self.needs_evaluate
    }

    fn compute_opaque_children(&self, idx: u32) -> Region {
        let mut out = Region::new();
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            let c = child as usize;
            child = self.next_sibling[c];
            if self.attributes[c].hidden {
                continue;
            }
            let mut r = if self.is_opaque_idx(c as u32) {
                Region::from_rect(self.geometry[c].with_origin(kurbo::Point::ORIGIN))
            } else {
                self.opaque_children[c].clone()
            };
            if let Some(mask) = &self.mask[c] {
                r.intersect(mask);
            }
            if r.is_empty() {
                continue;
            }
            r.translate(self.geometry[c].origin().to_vec2());
            out.union(&r);
        }
        out.intersect_rect(self.geometry[idx as usize].with_origin(kurbo::Point::ORIGIN));
        out
    }

    fn compute_texture_child_seen(&self, idx: u32) -> bool {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            let c = child as usize;
            if matches!(self.kind[c], WidgetKind::RenderToTexture(_)) || self.texture_child_seen[c]
            {
                return true;
            }
            child = self.next_sibling[c];
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::widget::{NativeWindowId, TextureId, WidgetAttributes};

    fn opaque() -> WidgetAttributes {
        WidgetAttributes {
            opaque: true,
            ..WidgetAttributes::default()
        }
    }

    #[test]
    fn opaque_grandchild_reaches_top_level() {
        let mut store = WidgetStore::new();
        let top = store.create_widget(
            WidgetKind::Native(NativeWindowId(1)),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let mid = store.create_widget(WidgetKind::Alien, Rect::new(10.0, 10.0, 60.0, 60.0));
        let leaf = store.create_widget(WidgetKind::Alien, Rect::new(5.0, 5.0, 15.0, 15.0));
        store.add_child(top, mid);
        store.add_child(mid, leaf);
        store.set_attributes(leaf, opaque());

        let changes = store.evaluate();
        assert!(changes.topology_changed);
        assert!(changes.opaque_children.contains(&top.idx));

        assert_eq!(
            *store.opaque_children(mid),
            Region::from_rect(Rect::new(5.0, 5.0, 15.0, 15.0))
        );
        assert_eq!(
            *store.opaque_children(top),
            Region::from_rect(Rect::new(15.0, 15.0, 25.0, 25.0))
        );
    }

    #[test]
    fn opaque_children_clipped_to_parent() {
        let mut store = WidgetStore::new();
        let parent = store.create_widget(WidgetKind::Alien, Rect::new(0.0, 0.0, 20.0, 20.0));
        let kid = store.create_widget(WidgetKind::Alien, Rect::new(10.0, 10.0, 40.0, 40.0));
        store.add_child(parent, kid);
        store.set_attributes(kid, opaque());
        store.evaluate();

        assert_eq!(
            *store.opaque_children(parent),
            Region::from_rect(Rect::new(10.0, 10.0, 20.0, 20.0))
        );
    }

    #[test]
    fn hiding_child_clears_coverage() {
        let mut store = WidgetStore::new();
        let parent = store.create_widget(WidgetKind::Alien, Rect::new(0.0, 0.0, 20.0, 20.0));
        let kid = store.create_widget(WidgetKind::Alien, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(parent, kid);
        store.set_attributes(kid, opaque());
        store.evaluate();
        assert!(!store.opaque_children(parent).is_empty());

        store.set_attributes(
            kid,
            WidgetAttributes {
                hidden: true,
                ..opaque()
            },
        );
        store.evaluate();
        assert!(store.opaque_children(parent).is_empty());
    }

    #[test]
    fn texture_flag_follows_topology() {
        let mut store = WidgetStore::new();
        let top = store.create_widget(
            WidgetKind::Native(NativeWindowId(1)),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let mid = store.create_widget(WidgetKind::Alien, Rect::new(0.0, 0.0, 50.0, 50.0));
        let gl = store.create_widget(
            WidgetKind::RenderToTexture(TextureId(3)),
            Rect::new(0.0, 0.0, 10.0, 10.0),
        );
        store.add_child(top, mid);
        store.add_child(mid, gl);
        store.evaluate();
        assert!(store.texture_child_seen(top));
        assert!(store.texture_child_seen(mid));
        assert!(!store.texture_child_seen(gl));

        store.remove_from_parent(gl);
        store.evaluate();
        assert!(!store.texture_child_seen(top));
    }

    #[test]
    fn no_change_evaluate_is_empty() {
        let mut store = WidgetStore::new();
        let _ = store.create_widget(WidgetKind::Alien, Rect::new(0.0, 0.0, 1.0, 1.0));
        let _ = store.evaluate();
        assert!(!store.needs_evaluate());

        let changes = store.evaluate();
        assert!(changes.opaque_children.is_empty());
        assert!(changes.texture_children.is_empty());
        assert!(!changes.topology_changed);
    }

    #[test]
    fn destroyed_widget_is_skipped() {
        let mut store = WidgetStore::new();
        let parent = store.create_widget(WidgetKind::Alien, Rect::new(0.0, 0.0, 20.0, 20.0));
        let kid = store.create_widget(WidgetKind::Alien, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(parent, kid);
        store.set_attributes(kid, opaque());
        store.evaluate();

        store.destroy_widget(kid);
        let changes = store.evaluate();
        assert!(!changes.opaque_children.contains(&kid.idx));
        assert!(store.opaque_children(parent).is_empty());
    }
}
