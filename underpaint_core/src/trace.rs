// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for damage routing, syncs, and presentation.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! engine calls as it routes damage, syncs, and flushes. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional boxed sink owned by a
//! [`TopLevelSurface`](crate::surface::TopLevelSurface). When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing. When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! To inspect a sink while the surface still owns it, install it as an
//! `Rc<RefCell<_>>` and keep a clone.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates [`DamageRect`] events and the
//!   corresponding `TraceSink` method.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use kurbo::{Rect, Vec2};

use crate::time::HostTime;
use crate::update::UpdateTime;
use crate::widget::{NativeWindowId, WidgetId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which branch of damage routing handled a `mark_dirty` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamagePath {
    /// Merged into a paint-on-screen widget's own record.
    PaintOnScreen,
    /// Dropped because the whole surface is already pending repaint.
    FullUpdatePending,
    /// Queued on the render-to-texture list.
    RenderToTexture,
    /// Dropped because the surface's dirty region already covers it.
    AlreadyDirty,
    /// Merged straight into the surface's aggregate dirty region.
    BufferInvalid,
    /// Merged into the widget's record on the pending-paint list.
    Widget,
}

/// How a sync pass ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
    /// The backing store was repainted and flushed.
    Painted,
    /// Nothing needed repainting; only a flush (and texture work) ran.
    NoRepaint,
    /// The backing store had nothing to paint into; state was dropped.
    NothingToPaint,
    /// Updates are disabled on the top level; damage was kept.
    UpdatesDisabled,
}

/// Why a sync request was skipped without running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncDiscard {
    /// The top level is hidden; all damage was dropped.
    Hidden,
    /// The top level is unmapped; damage was kept.
    Unmapped,
    /// A top-level resize is in progress.
    Resizing,
    /// The compositor still holds textures; the sync will be retried.
    TexturesLocked,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted for every `mark_dirty` call that passed its preconditions.
#[derive(Clone, Copy, Debug)]
pub struct MarkDirtyEvent {
    /// The damaged widget.
    pub widget: WidgetId,
    /// Bounding rect of the damage in the widget's coordinates.
    pub bounds: Rect,
    /// Which routing branch handled it.
    pub path: DamagePath,
    /// The requested update time.
    pub time: UpdateTime,
}

/// Emitted when an update request is posted.
#[derive(Clone, Copy, Debug)]
pub struct UpdateRequestEvent {
    /// The widget to service.
    pub widget: WidgetId,
    /// The effective update time after throttling.
    pub time: UpdateTime,
    /// Whether an immediate request was downgraded because the window
    /// composed less than one refresh interval ago.
    pub throttled: bool,
}

/// Emitted at the start of a sync pass.
#[derive(Clone, Copy, Debug)]
pub struct SyncBeginEvent {
    /// Host time, if the backing store has a clock.
    pub timestamp: Option<HostTime>,
    /// Widgets on the pending-paint list.
    pub dirty_widgets: u32,
    /// Render-to-texture widgets awaiting paint.
    pub dirty_textures: u32,
    /// Whether the whole surface was pending repaint.
    pub full_update: bool,
}

/// Emitted at the end of a sync pass.
#[derive(Clone, Copy, Debug)]
pub struct SyncEndEvent {
    /// Host time, if the backing store has a clock.
    pub timestamp: Option<HostTime>,
    /// Widgets painted individually on the direct path.
    pub direct_painted: u32,
    /// Whether a composited repaint from the top level ran.
    pub composited: bool,
    /// Bounding rect of everything made current, in top-level coordinates.
    pub to_clean: Rect,
    /// How the pass ended.
    pub outcome: SyncOutcome,
}

/// Emitted when a sync request is skipped.
#[derive(Clone, Copy, Debug)]
pub struct SyncDiscardEvent {
    /// Host time, if the backing store has a clock.
    pub timestamp: Option<HostTime>,
    /// Why.
    pub reason: SyncDiscard,
}

/// Emitted for every blit attempt.
#[derive(Clone, Copy, Debug)]
pub struct BlitEvent {
    /// Source rect in top-level coordinates.
    pub area: Rect,
    /// Translation.
    pub delta: Vec2,
    /// Whether the backing store performed the copy.
    pub accepted: bool,
}

/// Emitted for every presentation to a native window.
#[derive(Clone, Copy, Debug)]
pub struct FlushEvent {
    /// Host time, if the backing store has a clock.
    pub timestamp: Option<HostTime>,
    /// The target window.
    pub window: NativeWindowId,
    /// Bounding rect of the presented region, in the window's coordinates.
    pub bounds: Rect,
    /// Whether the presentation went through GPU composition.
    pub composed: bool,
    /// Number of textures composed.
    pub textures: u32,
}

/// An axis-aligned damage rectangle in whole pixels.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

#[cfg(feature = "trace-rich")]
impl From<Rect> for DamageRect {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "region coordinates are integer-valued pixels well inside i32"
    )]
    fn from(r: Rect) -> Self {
        Self {
            x: r.x0 as i32,
            y: r.y0 as i32,
            width: r.width().max(0.0) as u32,
            height: r.height().max(0.0) as u32,
        }
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when damage is routed.
    fn on_mark_dirty(&mut self, e: &MarkDirtyEvent) {
        _ = e;
    }

    /// Called when an update request is posted.
    fn on_update_request(&mut self, e: &UpdateRequestEvent) {
        _ = e;
    }

    /// Called when a sync pass starts.
    fn on_sync_begin(&mut self, e: &SyncBeginEvent) {
        _ = e;
    }

    /// Called when a sync pass ends.
    fn on_sync_end(&mut self, e: &SyncEndEvent) {
        _ = e;
    }

    /// Called when a sync request is skipped.
    fn on_sync_discard(&mut self, e: &SyncDiscardEvent) {
        _ = e;
    }

    /// Called for every blit attempt.
    fn on_blit(&mut self, e: &BlitEvent) {
        _ = e;
    }

    /// Called for every presentation.
    fn on_flush(&mut self, e: &FlushEvent) {
        _ = e;
    }

    /// Called with the rectangles a sync pass made current (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, rects: &[DamageRect]) {
        _ = rects;
    }
}

impl<T: TraceSink + ?Sized> TraceSink for Rc<RefCell<T>> {
    fn on_mark_dirty(&mut self, e: &MarkDirtyEvent) {
        self.borrow_mut().on_mark_dirty(e);
    }

    fn on_update_request(&mut self, e: &UpdateRequestEvent) {
        self.borrow_mut().on_update_request(e);
    }

    fn on_sync_begin(&mut self, e: &SyncBeginEvent) {
        self.borrow_mut().on_sync_begin(e);
    }

    fn on_sync_end(&mut self, e: &SyncEndEvent) {
        self.borrow_mut().on_sync_end(e);
    }

    fn on_sync_discard(&mut self, e: &SyncDiscardEvent) {
        self.borrow_mut().on_sync_discard(e);
    }

    fn on_blit(&mut self, e: &BlitEvent) {
        self.borrow_mut().on_blit(e);
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        self.borrow_mut().on_flush(e);
    }

    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, rects: &[DamageRect]) {
        self.borrow_mut().on_damage_rects(rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional boxed [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing and
/// installed sinks are dropped immediately.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Removes and returns the installed sink.
    pub fn take(&mut self) -> Option<Box<dyn TraceSink>> {
        #[cfg(feature = "trace")]
        {
            self.sink.take()
        }
        #[cfg(not(feature = "trace"))]
        {
            None
        }
    }

    /// Emits a [`MarkDirtyEvent`].
    #[inline]
    pub fn mark_dirty(&mut self, e: &MarkDirtyEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_mark_dirty(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`UpdateRequestEvent`].
    #[inline]
    pub fn update_request(&mut self, e: &UpdateRequestEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update_request(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SyncBeginEvent`].
    #[inline]
    pub fn sync_begin(&mut self, e: &SyncBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sync_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SyncEndEvent`].
    #[inline]
    pub fn sync_end(&mut self, e: &SyncEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sync_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SyncDiscardEvent`].
    #[inline]
    pub fn sync_discard(&mut self, e: &SyncDiscardEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sync_discard(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BlitEvent`].
    #[inline]
    pub fn blit(&mut self, e: &BlitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_blit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FlushEvent`].
    #[inline]
    pub fn flush(&mut self, e: &FlushEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_flush(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits damage rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, rects: &[DamageRect]) {
        if let Some(s) = &mut self.sink {
            s.on_damage_rects(rects);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        sink.on_blit(&BlitEvent {
            area: Rect::new(0.0, 0.0, 10.0, 10.0),
            delta: Vec2::new(0.0, 5.0),
            accepted: true,
        });
        sink.on_sync_discard(&SyncDiscardEvent {
            timestamp: None,
            reason: SyncDiscard::Unmapped,
        });
    }

    #[test]
    fn tracer_without_sink_is_silent() {
        let mut tracer = Tracer::none();
        tracer.blit(&BlitEvent {
            area: Rect::ZERO,
            delta: Vec2::ZERO,
            accepted: false,
        });
        assert!(tracer.take().is_none());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_shared_sink() {
        use alloc::vec::Vec;

        #[derive(Default)]
        struct RecordingSink {
            accepted: Vec<bool>,
        }
        impl TraceSink for RecordingSink {
            fn on_blit(&mut self, e: &BlitEvent) {
                self.accepted.push(e.accepted);
            }
        }

        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        let mut tracer = Tracer::new(Box::new(sink.clone()));
        tracer.blit(&BlitEvent {
            area: Rect::new(0.0, 0.0, 4.0, 4.0),
            delta: Vec2::new(1.0, 0.0),
            accepted: true,
        });
        drop(tracer);
        assert_eq!(sink.borrow().accepted, &[true]);
    }

    #[cfg(feature = "trace-rich")]
    #[test]
    fn damage_rect_from_rect() {
        let d = DamageRect::from(Rect::new(-3.0, 4.0, 7.0, 10.0));
        assert_eq!(
            d,
            DamageRect {
                x: -3,
                y: 4,
                width: 10,
                height: 6
            }
        );
    }
}
