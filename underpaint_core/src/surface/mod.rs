// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-window damage engine.
//!
//! A [`TopLevelSurface`] owns the backing store of one top-level window and
//! every piece of damage bookkeeping for the widgets inside it:
//!
//! ```text
//!   mark_dirty / scroll_rect / move_rect / invalidate_buffer
//!       │
//!       ▼
//!   damage records + aggregate dirty ──► UpdateQueue
//!                                            │  (event loop)
//!                                            ▼
//!   sync ──► WidgetPainter ──► BackingStore ──► flush / compose_and_flush
//! ```
//!
//! `mark_dirty_now` skips the queue: it routes the damage and runs the sync
//! (or the paint-on-screen repaint) in the same call, unless composition
//! throttling downgrades the request.
//!
//! The widget tree is not owned by the surface. Every call borrows the
//! [`WidgetStore`]; calls that read derived occlusion state borrow it
//! mutably and evaluate it first.
//!
//! Coordinates: per-widget damage is kept in the widget's own coordinates;
//! the aggregate dirty region and the on-screen region are in top-level
//! coordinates, where the top level's origin is `(0, 0)` regardless of its
//! window position.

mod flush;
mod mark;
mod scroll;
mod sync;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Point, Rect, Size};

use crate::backend::BackingStore;
use crate::config::SurfaceConfig;
use crate::region::Region;
use crate::texture::{TextureList, TextureListWatcher};
use crate::time::{Duration, HostTime};
use crate::trace::{TraceSink, Tracer, UpdateRequestEvent};
use crate::update::{UpdateQueue, UpdateRequest, UpdateTime};
use crate::widget::{WidgetChanges, WidgetId, WidgetStore};

/// Pending damage of one widget.
#[derive(Clone, Debug, Default)]
struct DamageRecord {
    /// Pixels not yet repainted, in the widget's coordinates.
    dirty: Region,
    /// Pixels painted but not yet presented through this (native) widget's
    /// window, in the widget's coordinates.
    needs_flush: Region,
    /// On the pending-paint list (or the render-to-texture list).
    in_dirty_list: bool,
    /// Relocated by a blit; siblings are known not to cover it and its
    /// children must all be redrawn.
    is_moved: bool,
    /// Content scrolled by a blit; its children must all be redrawn.
    is_scrolled: bool,
    /// The texture content changed and must be re-rendered this sync.
    texture_really_dirty: bool,
    /// The last presentation through this widget's window was composed.
    compose_active: bool,
}

impl DamageRecord {
    fn reset(&mut self) {
        self.in_dirty_list = false;
        self.is_moved = false;
        self.is_scrolled = false;
        self.dirty.clear();
    }
}

/// The damage-tracking and flush-scheduling engine of one top-level window.
///
/// See the [module documentation](self) for the overall flow.
#[derive(Debug)]
pub struct TopLevelSurface<S: BackingStore> {
    store: S,
    top_level: WidgetId,
    config: SurfaceConfig,

    // -- Damage model --
    records: BTreeMap<WidgetId, DamageRecord>,
    dirty_widgets: Vec<WidgetId>,
    dirty_render_to_texture: Vec<WidgetId>,
    dirty_on_screen_widgets: Vec<WidgetId>,
    dirty: Region,
    dirty_on_screen: Region,
    full_update_pending: bool,
    update_request_sent: bool,
    in_top_level_resize: bool,
    static_sizes: BTreeMap<WidgetId, Size>,

    // -- Composition --
    texture_lists: Vec<TextureList>,
    texture_child_ever_seen: bool,
    watcher: Option<TextureListWatcher>,
    compositing: bool,
    last_compose: Option<HostTime>,

    // -- Scheduling and diagnostics --
    queue: UpdateQueue,
    /// Target of an unthrottled `Now` request posted by the current route.
    immediate: Option<WidgetId>,
    changes: WidgetChanges,
    tracer: Tracer,
}

impl<S: BackingStore> TopLevelSurface<S> {
    /// Binds a surface to `top_level` and its backing store.
    ///
    /// The first sync repaints everything unless the store already has the
    /// top level's size.
    ///
    /// # Panics
    ///
    /// Panics if `top_level` has a parent or owns no native window.
    #[must_use]
    pub fn new(widgets: &WidgetStore, top_level: WidgetId, store: S, config: SurfaceConfig) -> Self {
        assert!(
            widgets.parent(top_level).is_none(),
            "surface must be bound to a top-level widget"
        );
        assert!(
            widgets.kind(top_level).window().is_some(),
            "top level must own a native window"
        );
        Self {
            store,
            top_level,
            config,
            records: BTreeMap::new(),
            dirty_widgets: Vec::new(),
            dirty_render_to_texture: Vec::new(),
            dirty_on_screen_widgets: Vec::new(),
            dirty: Region::new(),
            dirty_on_screen: Region::new(),
            full_update_pending: false,
            update_request_sent: false,
            in_top_level_resize: false,
            static_sizes: BTreeMap::new(),
            texture_lists: Vec::new(),
            texture_child_ever_seen: false,
            watcher: None,
            compositing: false,
            last_compose: None,
            queue: UpdateQueue::new(),
            immediate: None,
            changes: WidgetChanges::default(),
            tracer: Tracer::none(),
        }
    }

    /// Installs a trace sink, replacing any previous one.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.tracer = Tracer::new(sink);
    }

    /// Removes and returns the installed trace sink.
    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.tracer.take()
    }

    /// Returns the top-level widget this surface belongs to.
    #[must_use]
    pub fn top_level(&self) -> WidgetId {
        self.top_level
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Returns the backing store.
    #[must_use]
    pub fn backing_store(&self) -> &S {
        &self.store
    }

    /// Returns the backing store mutably.
    pub fn backing_store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Returns the texture lists built by the last sync.
    #[must_use]
    pub fn texture_lists(&self) -> &[TextureList] {
        &self.texture_lists
    }

    /// Returns `true` while the whole surface is pending repaint.
    #[must_use]
    pub fn is_full_update_pending(&self) -> bool {
        self.full_update_pending
    }

    /// Returns `true` if anything awaits a sync.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty_widgets.is_empty()
            || !self.dirty.is_empty()
            || self.full_update_pending
            || !self.dirty_render_to_texture.is_empty()
    }

    /// Returns the number of widgets on the pending-paint list.
    #[must_use]
    pub fn pending_paint_len(&self) -> usize {
        self.dirty_widgets.len()
    }

    /// Returns the region that still needs repainting or presenting.
    ///
    /// With `widget`, only damage of that widget's subtree is reported, in
    /// the widget's coordinates and clipped to its rect. Without it, the
    /// result is in top-level coordinates. While a full update is pending or
    /// the buffer has the wrong size, the whole area is reported.
    #[must_use]
    pub fn dirty_region(&self, widgets: &WidgetStore, widget: Option<WidgetId>) -> Region {
        let top = self.top_level;
        let subtree = widget.filter(|&w| w != top);
        let top_rect = Rect::from_origin_size(Point::ORIGIN, widgets.size(top));

        if self.full_update_pending || self.store.size() != top_rect.size() {
            return match subtree {
                Some(w) => {
                    let offset = widgets.map_to_top(w);
                    Region::from_rect(top_rect.intersect(widgets.rect(w) + offset) - offset)
                }
                None => Region::from_rect(top_rect),
            };
        }

        let in_subtree = |w: WidgetId| match subtree {
            Some(root) => w == root || widgets.is_ancestor_of(root, w),
            None => true,
        };

        let mut r = self.dirty.clone();
        for &w in &self.dirty_widgets {
            if !widgets.is_alive(w) || !in_subtree(w) {
                continue;
            }
            if let Some(rec) = self.records.get(&w) {
                r.union(&rec.dirty.translated(widgets.map_to_top(w)));
            }
        }
        r.union(&self.dirty_on_screen);
        for &w in &self.dirty_on_screen_widgets {
            if !widgets.is_alive(w) || !in_subtree(w) {
                continue;
            }
            if let Some(rec) = self.records.get(&w) {
                r.union(&rec.needs_flush.translated(widgets.map_to_top(w)));
            }
        }

        if let Some(w) = subtree {
            let offset = widgets.map_to_top(w);
            r.intersect_rect(widgets.rect(w) + offset);
            r.translate(-offset);
        }
        r
    }

    /// Schedules a repaint of the whole surface.
    ///
    /// Until the next sync, further damage is absorbed without bookkeeping.
    pub fn mark_full_update(&mut self, time: UpdateTime) {
        self.full_update_pending = true;
        self.send_update_request(self.top_level, time);
    }

    /// Drops `widget` and its whole subtree from every pending list.
    ///
    /// Call before hiding, re-parenting away, or destroying a widget.
    pub fn remove_dirty_widget(&mut self, widgets: &WidgetStore, widget: WidgetId) {
        let subtree: Vec<WidgetId> = widgets.descendants(widget).collect();
        for w in subtree {
            self.dirty_widgets.retain(|&x| x != w);
            self.dirty_on_screen_widgets.retain(|&x| x != w);
            self.dirty_render_to_texture.retain(|&x| x != w);
            self.records.remove(&w);
            self.static_sizes.remove(&w);
            if w != self.top_level {
                self.queue.remove(w);
            }
        }
    }

    /// Starts an interactive resize of the top level.
    ///
    /// Damage must not be marked and syncs are skipped until
    /// [`end_top_level_resize`](Self::end_top_level_resize).
    pub fn begin_top_level_resize(&mut self) {
        self.in_top_level_resize = true;
    }

    /// Ends a top-level resize and schedules the sync that picks up the new
    /// size.
    pub fn end_top_level_resize(&mut self) {
        self.in_top_level_resize = false;
        self.send_update_request(self.top_level, UpdateTime::Later);
    }

    /// Returns `true` between the two resize calls.
    #[must_use]
    pub fn is_in_top_level_resize(&self) -> bool {
        self.in_top_level_resize
    }

    /// Shrinks the backing store to nothing, e.g. while the window is
    /// minimized. The next sync reallocates and repaints it.
    pub fn release_buffer(&mut self) {
        self.store.resize(Size::ZERO);
    }

    /// Pops the next update request for the embedding event loop.
    ///
    /// A request naming [`top_level`](Self::top_level) is serviced with
    /// [`sync`](Self::sync); one naming a paint-on-screen widget with
    /// [`take_paint_on_screen_damage`](Self::take_paint_on_screen_damage).
    pub fn next_update_request(&mut self) -> Option<UpdateRequest> {
        self.queue.pop()
    }

    /// Returns `true` if any update request is queued.
    #[must_use]
    pub fn has_update_request(&self) -> bool {
        !self.queue.is_empty()
    }

    // -- Internal helpers --

    fn reset_widget(&mut self, widget: WidgetId) {
        if let Some(rec) = self.records.get_mut(&widget) {
            rec.reset();
        }
    }

    fn append_dirty_on_screen_widget(&mut self, widget: WidgetId) {
        if !self.dirty_on_screen_widgets.contains(&widget) {
            self.dirty_on_screen_widgets.push(widget);
        }
    }

    /// Posts an update request, downgrading `Now` to `Later` while the
    /// window composes faster than the display refreshes.
    fn send_update_request(&mut self, widget: WidgetId, time: UpdateTime) {
        let mut time = time;
        let mut throttled = false;
        if time == UpdateTime::Now && self.compositing && self.config.refresh_rate_hz > 0 {
            if let (Some(last), Some(now)) = (self.last_compose, self.store.host_time()) {
                let interval =
                    Duration::refresh_interval(self.config.refresh_rate_hz, self.store.timebase());
                if now.saturating_duration_since(last) <= interval {
                    time = UpdateTime::Later;
                    throttled = true;
                }
            }
        }

        // Only a queued sync of the top level covers buffer damage.
        match time {
            UpdateTime::Later if widget == self.top_level => self.update_request_sent = true,
            UpdateTime::Later => {}
            UpdateTime::Now => self.immediate = Some(widget),
        }
        self.queue.post(widget, time);
        self.tracer.update_request(&UpdateRequestEvent {
            widget,
            time,
            throttled,
        });
    }
}
