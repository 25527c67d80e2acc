// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract between the engine and its platform collaborators.
//!
//! The engine decides *what* to repaint and *when* to present. Two traits
//! carry out the work:
//!
//! - **[`BackingStore`]**: the off-screen pixel buffer of one top-level
//!   window plus the platform calls that move its content to the screen
//!   (plain flush, blit, GPU composition).
//!
//! - **[`WidgetPainter`]**: the painting subsystem. The engine hands it one
//!   widget at a time with the region to repaint, already clipped and with
//!   opaque children removed.
//!
//! # Paint scope
//!
//! Writing into the buffer is bracketed by
//! [`begin_paint`](BackingStore::begin_paint) and
//! [`end_paint`](BackingStore::end_paint). The engine holds the scope
//! through a [`PaintGuard`], so `end_paint` runs on every exit path.
//!
//! # Event loop pseudocode
//!
//! ```rust,ignore
//! // Damage arrives from widget code.
//! surface.mark_dirty_rect(&widgets, button, rect, UpdateTime::Later, BufferState::Valid);
//!
//! // Damage that must be on screen before the caller continues.
//! surface.mark_dirty_rect_now(&mut widgets, cursor, rect, BufferState::Valid, &mut painter);
//!
//! // Later, on the UI thread:
//! while let Some(req) = surface.next_update_request() {
//!     if req.widget == surface.top_level() {
//!         surface.sync(&mut widgets, &mut painter);
//!     } else {
//!         let damage = surface.take_paint_on_screen_damage(&widgets, req.widget);
//!         paint_directly(req.widget, &damage);
//!     }
//! }
//! ```

use kurbo::{Rect, Size, Vec2};

use crate::region::Region;
use crate::texture::TextureList;
use crate::time::{HostTime, Timebase};
use crate::widget::{NativeWindowId, WidgetId, WidgetStore};

/// The off-screen buffer of one top-level window and its presentation calls.
///
/// Coordinates passed to the store are in top-level coordinates unless
/// stated otherwise.
pub trait BackingStore {
    /// The surface painters draw into while a paint scope is open.
    type Device: ?Sized;

    /// Returns the paint device.
    fn paint_device(&mut self) -> &mut Self::Device;

    /// Returns the current buffer size.
    fn size(&self) -> Size;

    /// Resizes the buffer. Pixels inside the last
    /// [`set_static_contents`](Self::set_static_contents) region survive.
    fn resize(&mut self, size: Size);

    /// Opens a paint scope covering `region`.
    ///
    /// Returns `false` when there is nothing to paint into (for example a
    /// zero-size buffer); the engine then aborts the pass without calling
    /// [`end_paint`](Self::end_paint).
    fn begin_paint(&mut self, region: &Region) -> bool;

    /// Closes the paint scope opened by [`begin_paint`](Self::begin_paint).
    fn end_paint(&mut self);

    /// Copies `region` of the buffer to `window`.
    ///
    /// `region` is in the window's coordinates; `offset` is the window's
    /// origin within the buffer.
    fn flush(&mut self, region: &Region, window: NativeWindowId, offset: Vec2);

    /// Moves the pixels of `area` by `delta` inside the buffer.
    ///
    /// Returns `false` if the platform cannot scroll; the caller then falls
    /// back to repainting.
    fn scroll(&mut self, area: Rect, delta: Vec2) -> bool;

    /// Declares which pixels must be preserved across the next
    /// [`resize`](Self::resize).
    fn set_static_contents(&mut self, region: &Region) {
        _ = region;
    }

    /// Returns `true` if the buffer can keep pixels across a resize.
    fn supports_static_contents(&self) -> bool {
        true
    }

    /// Presents `region` of the buffer merged with the GPU textures of
    /// `textures`.
    ///
    /// `translucent` reports whether the window relies on translucency, so
    /// the compositor knows whether to clear to transparent. The region may
    /// be empty when only texture content changed. Platforms without a
    /// compositor fall back to a plain [`flush`](Self::flush).
    fn compose_and_flush(
        &mut self,
        window: NativeWindowId,
        region: &Region,
        offset: Vec2,
        textures: &TextureList,
        translucent: bool,
    ) {
        _ = (textures, translucent);
        if !region.is_empty() {
            self.flush(region, window, offset);
        }
    }

    /// Returns the current monotonic time, if the platform has a clock.
    ///
    /// Used for throttling immediate updates while composing and for trace
    /// timestamps. Without a clock no throttling happens.
    fn host_time(&self) -> Option<HostTime> {
        None
    }

    /// Returns the tick-to-nanosecond ratio of [`host_time`](Self::host_time).
    fn timebase(&self) -> Timebase {
        Timebase::NANOS
    }
}

/// The painting subsystem.
pub trait WidgetPainter<D: ?Sized> {
    /// Paints `region` (in `id`'s coordinates) of one widget into `device`,
    /// with the widget's origin at `offset` in the device.
    ///
    /// The region is already clipped to the widget and its masks. Children
    /// are painted by separate calls. For a render-to-texture widget this
    /// paints what the buffer holds underneath the texture: a transparent
    /// hole, unless the widget stays on top.
    fn paint_widget(
        &mut self,
        widgets: &WidgetStore,
        id: WidgetId,
        region: &Region,
        offset: Vec2,
        device: &mut D,
    );

    /// Re-renders the GPU texture of a render-to-texture widget whose content
    /// changed.
    fn render_texture(&mut self, widgets: &WidgetStore, id: WidgetId) {
        _ = (widgets, id);
    }

    /// Paints `region` (in `id`'s coordinates) of a paint-on-screen widget
    /// straight to its native window.
    ///
    /// Called when such a widget is damaged with an immediate update. The
    /// region is already clipped like [`paint_widget`](Self::paint_widget)'s.
    fn paint_on_screen(&mut self, widgets: &WidgetStore, id: WidgetId, region: &Region) {
        _ = (widgets, id, region);
    }
}

/// An open paint scope on a [`BackingStore`].
///
/// Dropping the guard closes the scope.
#[derive(Debug)]
pub struct PaintGuard<'a, S: BackingStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: BackingStore + ?Sized> PaintGuard<'a, S> {
    /// Opens a paint scope over `region`, or returns `None` if the store has
    /// nothing to paint into.
    pub fn begin(store: &'a mut S, region: &Region) -> Option<Self> {
        if store.begin_paint(region) {
            Some(Self { store })
        } else {
            None
        }
    }

    /// Returns the paint device of the open scope.
    pub fn device(&mut self) -> &mut S::Device {
        self.store.paint_device()
    }
}

impl<S: BackingStore + ?Sized> Drop for PaintGuard<'_, S> {
    fn drop(&mut self) {
        self.store.end_paint();
    }
}
