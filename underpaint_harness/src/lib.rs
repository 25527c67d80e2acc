// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory platform doubles for exercising an underpaint surface.
//!
//! - [`SoftwareBackingStore`]: a real `u32` pixel buffer that scrolls,
//!   resizes (keeping its static contents), and logs every presentation.
//! - [`FillPainter`]: paints each widget as a flat color, and
//!   render-to-texture widgets as a transparent hole.
//! - [`Driver`]: owns a widget tree, its surface, and a painter, and drains
//!   the update queue the way an event loop would.
//!
//! Pixels the engine never painted keep the [`GARBAGE`] value, so a test
//! can compare a buffer against [`Driver::render_from_scratch`] and catch
//! both missed and misplaced repaints.

#![no_std]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};
use underpaint_core::backend::{BackingStore, WidgetPainter};
use underpaint_core::config::SurfaceConfig;
use underpaint_core::region::{Region, rect_is_empty};
use underpaint_core::surface::TopLevelSurface;
use underpaint_core::texture::TextureList;
use underpaint_core::time::HostTime;
use underpaint_core::widget::{NativeWindowId, TextureId, WidgetId, WidgetKind, WidgetStore};

/// Value of pixels that were never painted.
pub const GARBAGE: u32 = 0xDEAD_BEEF;

/// Color painted behind render-to-texture widgets.
pub const HOLE: u32 = 0;

// ---------------------------------------------------------------------------
// PixelBuffer
// ---------------------------------------------------------------------------

/// A row-major `u32` image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Creates a buffer of `size` filled with `fill`.
    #[must_use]
    pub fn new(size: Size, fill: u32) -> Self {
        let width = extent(size.width);
        let height = extent(size.height);
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    /// Returns the width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns all pixels, row by row.
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Returns the pixel at `(x, y)`, if inside the buffer.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Fills `rect`, clipped to the buffer.
    pub fn fill_rect(&mut self, rect: Rect, color: u32) {
        let (x0, x1) = span(rect.x0, rect.x1, self.width);
        let (y0, y1) = span(rect.y0, rect.y1, self.height);
        for y in y0..y1 {
            self.pixels[y * self.width + x0..y * self.width + x1].fill(color);
        }
    }

    /// Returns the number of pixels in `rect` not equal to `color`.
    #[must_use]
    pub fn count_other_than(&self, rect: Rect, color: u32) -> usize {
        let (x0, x1) = span(rect.x0, rect.x1, self.width);
        let (y0, y1) = span(rect.y0, rect.y1, self.height);
        (y0..y1)
            .map(|y| {
                self.pixels[y * self.width + x0..y * self.width + x1]
                    .iter()
                    .filter(|&&p| p != color)
                    .count()
            })
            .sum()
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, as_coord(self.width), as_coord(self.height))
    }

    /// Copies `src` to `src + delta`, both clipped to the buffer.
    fn copy_within(&mut self, src: Rect, delta: Vec2) {
        let bounds = self.bounds();
        let dst = (src.intersect(bounds) + delta).intersect(bounds);
        if rect_is_empty(dst) {
            return;
        }
        let src = dst - delta;
        let (sx0, sx1) = span(src.x0, src.x1, self.width);
        let (sy0, sy1) = span(src.y0, src.y1, self.height);
        let (dx0, _) = span(dst.x0, dst.x1, self.width);
        let (dy0, _) = span(dst.y0, dst.y1, self.height);

        let rows: Vec<Vec<u32>> = (sy0..sy1)
            .map(|y| self.pixels[y * self.width + sx0..y * self.width + sx1].to_vec())
            .collect();
        for (i, row) in rows.iter().enumerate() {
            let y = dy0 + i;
            self.pixels[y * self.width + dx0..y * self.width + dx0 + row.len()]
                .copy_from_slice(row);
        }
    }

    /// Returns a buffer of `size` keeping the pixels of `keep`.
    fn resized(&self, size: Size, keep: &Region) -> Self {
        let mut out = Self::new(size, GARBAGE);
        let shared = self.bounds().intersect(out.bounds());
        for &r in keep.rects() {
            let r = r.intersect(shared);
            let (x0, x1) = span(r.x0, r.x1, out.width);
            let (y0, y1) = span(r.y0, r.y1, out.height);
            for y in y0..y1 {
                out.pixels[y * out.width + x0..y * out.width + x1]
                    .copy_from_slice(&self.pixels[y * self.width + x0..y * self.width + x1]);
            }
        }
        out
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "pixel sizes are small non-negative integers"
)]
fn extent(v: f64) -> usize {
    v.max(0.0) as usize
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "coordinates are clamped to the buffer before conversion"
)]
fn span(lo: f64, hi: f64, limit: usize) -> (usize, usize) {
    let limit = as_coord(limit);
    let lo = lo.clamp(0.0, limit);
    let hi = hi.clamp(lo, limit);
    (lo as usize, hi as usize)
}

fn as_coord(v: usize) -> f64 {
    u32::try_from(v).map_or(f64::MAX, f64::from)
}

// ---------------------------------------------------------------------------
// SoftwareBackingStore
// ---------------------------------------------------------------------------

/// One call to [`flush`](BackingStore::flush) or
/// [`compose_and_flush`](BackingStore::compose_and_flush).
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Target window.
    pub window: NativeWindowId,
    /// Presented region in the window's coordinates.
    pub region: Region,
    /// The window's origin within the buffer.
    pub offset: Vec2,
    /// Composed textures, or `None` for a raster flush.
    pub textures: Option<Vec<TextureId>>,
}

/// A [`BackingStore`] over a [`PixelBuffer`].
#[derive(Debug)]
pub struct SoftwareBackingStore {
    buffer: PixelBuffer,
    painting: bool,
    static_contents: Region,
    paint_passes: usize,
    scrolls: usize,
    presentations: Vec<Presentation>,
    clock: Option<u64>,
}

impl SoftwareBackingStore {
    /// Creates a store of `size` whose pixels are all [`GARBAGE`].
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            buffer: PixelBuffer::new(size, GARBAGE),
            painting: false,
            static_contents: Region::new(),
            paint_passes: 0,
            scrolls: 0,
            presentations: Vec::new(),
            clock: None,
        }
    }

    /// Returns the pixel buffer.
    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Returns the number of paint scopes opened so far.
    #[must_use]
    pub fn paint_passes(&self) -> usize {
        self.paint_passes
    }

    /// Returns `true` while a paint scope is open.
    #[must_use]
    pub fn is_painting(&self) -> bool {
        self.painting
    }

    /// Returns the number of blits performed so far.
    #[must_use]
    pub fn scrolls(&self) -> usize {
        self.scrolls
    }

    /// Returns every presentation so far.
    #[must_use]
    pub fn presentations(&self) -> &[Presentation] {
        &self.presentations
    }

    /// Forgets logged presentations.
    pub fn clear_presentations(&mut self) {
        self.presentations.clear();
    }

    /// Starts a manual clock at `ticks` nanoseconds.
    pub fn set_clock(&mut self, ticks: u64) {
        self.clock = Some(ticks);
    }

    /// Advances the manual clock, if set.
    pub fn advance_clock(&mut self, ticks: u64) {
        if let Some(now) = &mut self.clock {
            *now += ticks;
        }
    }
}

impl BackingStore for SoftwareBackingStore {
    type Device = PixelBuffer;

    fn paint_device(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    fn size(&self) -> Size {
        Size::new(as_coord(self.buffer.width), as_coord(self.buffer.height))
    }

    fn resize(&mut self, size: Size) {
        self.buffer = self.buffer.resized(size, &self.static_contents);
        self.static_contents.clear();
    }

    fn begin_paint(&mut self, _region: &Region) -> bool {
        if self.buffer.pixels.is_empty() {
            return false;
        }
        self.painting = true;
        self.paint_passes += 1;
        true
    }

    fn end_paint(&mut self) {
        self.painting = false;
    }

    fn flush(&mut self, region: &Region, window: NativeWindowId, offset: Vec2) {
        self.presentations.push(Presentation {
            window,
            region: region.clone(),
            offset,
            textures: None,
        });
    }

    fn scroll(&mut self, area: Rect, delta: Vec2) -> bool {
        self.buffer.copy_within(area, delta);
        self.scrolls += 1;
        true
    }

    fn set_static_contents(&mut self, region: &Region) {
        self.static_contents = region.clone();
    }

    fn compose_and_flush(
        &mut self,
        window: NativeWindowId,
        region: &Region,
        offset: Vec2,
        textures: &TextureList,
        _translucent: bool,
    ) {
        self.presentations.push(Presentation {
            window,
            region: region.clone(),
            offset,
            textures: Some(textures.entries().iter().map(|e| e.texture).collect()),
        });
    }

    fn host_time(&self) -> Option<HostTime> {
        self.clock.map(HostTime)
    }
}

// ---------------------------------------------------------------------------
// FillPainter
// ---------------------------------------------------------------------------

/// Paints every widget as a flat color.
///
/// Colors default to a hash of the widget's slot index. Render-to-texture
/// widgets paint [`HOLE`] unless they stay on top.
#[derive(Clone, Debug, Default)]
pub struct FillPainter {
    colors: BTreeMap<WidgetId, u32>,
    painted: Vec<(WidgetId, Region)>,
    rendered: Vec<WidgetId>,
    on_screen: Vec<(WidgetId, Region)>,
}

impl FillPainter {
    /// Creates a painter with default colors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the color of `widget`.
    pub fn set_color(&mut self, widget: WidgetId, color: u32) {
        self.colors.insert(widget, color);
    }

    /// Returns the color `widget` paints with.
    #[must_use]
    pub fn color_of(&self, widgets: &WidgetStore, widget: WidgetId) -> u32 {
        if widgets.kind(widget).texture().is_some() && !widgets.attributes(widget).stays_on_top {
            return HOLE;
        }
        self.colors.get(&widget).copied().unwrap_or_else(|| {
            0xFF00_0000 | (widget.index().wrapping_add(1).wrapping_mul(0x9E37_79B9) >> 8)
        })
    }

    /// Returns every `paint_widget` call since the last
    /// [`clear_log`](Self::clear_log), in order.
    #[must_use]
    pub fn painted(&self) -> &[(WidgetId, Region)] {
        &self.painted
    }

    /// Returns the union of the regions painted for `widget`.
    #[must_use]
    pub fn painted_region(&self, widget: WidgetId) -> Region {
        let mut r = Region::new();
        for (w, region) in &self.painted {
            if *w == widget {
                r.union(region);
            }
        }
        r
    }

    /// Returns the widgets whose textures were re-rendered.
    #[must_use]
    pub fn rendered(&self) -> &[WidgetId] {
        &self.rendered
    }

    /// Returns the damage handed to paint-on-screen widgets, in order.
    #[must_use]
    pub fn on_screen(&self) -> &[(WidgetId, Region)] {
        &self.on_screen
    }

    /// Forgets logged calls.
    pub fn clear_log(&mut self) {
        self.painted.clear();
        self.rendered.clear();
        self.on_screen.clear();
    }
}

impl WidgetPainter<PixelBuffer> for FillPainter {
    fn paint_widget(
        &mut self,
        widgets: &WidgetStore,
        id: WidgetId,
        region: &Region,
        offset: Vec2,
        device: &mut PixelBuffer,
    ) {
        let color = self.color_of(widgets, id);
        for &r in region.rects() {
            device.fill_rect(r + offset, color);
        }
        self.painted.push((id, region.clone()));
    }

    fn render_texture(&mut self, _widgets: &WidgetStore, id: WidgetId) {
        self.rendered.push(id);
    }

    fn paint_on_screen(&mut self, _widgets: &WidgetStore, id: WidgetId, region: &Region) {
        self.on_screen.push((id, region.clone()));
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// A widget tree, its surface, and a painter, driven like an event loop.
#[derive(Debug)]
pub struct Driver {
    /// The widget tree.
    pub widgets: WidgetStore,
    /// The surface of the tree's top level.
    pub surface: TopLevelSurface<SoftwareBackingStore>,
    /// The painter used by every sync and paint-on-screen repaint.
    pub painter: FillPainter,
}

impl Driver {
    /// Binds a surface to `top`, with a store already sized to it.
    ///
    /// # Panics
    ///
    /// Panics if `top` is not a native top-level widget.
    #[must_use]
    pub fn new(mut widgets: WidgetStore, top: WidgetId, config: SurfaceConfig) -> Self {
        widgets.evaluate();
        let store = SoftwareBackingStore::new(widgets.size(top));
        let surface = TopLevelSurface::new(&widgets, top, store, config);
        Self {
            widgets,
            surface,
            painter: FillPainter::new(),
        }
    }

    /// Returns the top-level widget.
    #[must_use]
    pub fn top(&self) -> WidgetId {
        self.surface.top_level()
    }

    /// Returns the store's pixel buffer.
    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        self.surface.backing_store().buffer()
    }

    /// Services queued update requests until the queue is empty.
    ///
    /// Returns the number of requests serviced.
    pub fn run(&mut self) -> usize {
        let mut serviced = 0;
        while let Some(req) = self.surface.next_update_request() {
            serviced += 1;
            if req.widget == self.surface.top_level() {
                self.surface.sync(&mut self.widgets, &mut self.painter);
            } else if matches!(self.widgets.kind(req.widget), WidgetKind::PaintOnScreen(_)) {
                let damage = self
                    .surface
                    .take_paint_on_screen_damage(&self.widgets, req.widget);
                if !damage.is_empty() {
                    self.painter
                        .paint_on_screen(&self.widgets, req.widget, &damage);
                }
            }
        }
        serviced
    }

    /// Delivers a platform expose of `region` (in `widget`'s coordinates).
    pub fn expose(&mut self, widget: WidgetId, region: &Region) {
        self.surface
            .sync_exposed(&mut self.widgets, widget, region, &mut self.painter);
    }

    /// Renders the current tree into a fresh buffer with a fresh surface.
    ///
    /// The painter's colors are reused, so the result is what the live
    /// buffer should hold once all damage is serviced.
    #[must_use]
    pub fn render_from_scratch(&mut self) -> PixelBuffer {
        let top = self.surface.top_level();
        let size = self.widgets.size(top);
        let mut surface = TopLevelSurface::new(
            &self.widgets,
            top,
            SoftwareBackingStore::new(size),
            SurfaceConfig::conservative(),
        );
        let mut painter = self.painter.clone();
        surface.invalidate_buffer_rect(
            &self.widgets,
            top,
            Rect::from_origin_size(Point::ORIGIN, size),
        );
        surface.sync(&mut self.widgets, &mut painter);
        surface.backing_store().buffer().clone()
    }
}
