// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using a [`Timebase`].

use std::io::Write;

use kurbo::Rect;
use underpaint_core::time::{HostTime, Timebase};
use underpaint_core::trace::{
    BlitEvent, DamageRect, FlushEvent, MarkDirtyEvent, SyncBeginEvent, SyncDiscardEvent,
    SyncEndEvent, TraceSink, UpdateRequestEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns its destination.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn at(&self, t: Option<HostTime>) -> String {
        match t {
            Some(t) => format!("{:.1}µs", self.timebase.ticks_to_nanos(t.ticks()) as f64 / 1000.0),
            None => "-".to_owned(),
        }
    }
}

fn rect(r: Rect) -> String {
    format!("({},{} {}x{})", r.x0, r.y0, r.width(), r.height())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_mark_dirty(&mut self, e: &MarkDirtyEvent) {
        let _ = writeln!(
            self.writer,
            "[mark] widget={:?} bounds={} path={:?} time={:?}",
            e.widget,
            rect(e.bounds),
            e.path,
            e.time,
        );
    }

    fn on_update_request(&mut self, e: &UpdateRequestEvent) {
        let throttled = if e.throttled { " throttled" } else { "" };
        let _ = writeln!(
            self.writer,
            "[request] widget={:?} time={:?}{throttled}",
            e.widget, e.time,
        );
    }

    fn on_sync_begin(&mut self, e: &SyncBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[sync:begin] at {} widgets={} textures={} full={}",
            self.at(e.timestamp),
            e.dirty_widgets,
            e.dirty_textures,
            e.full_update,
        );
    }

    fn on_sync_end(&mut self, e: &SyncEndEvent) {
        let _ = writeln!(
            self.writer,
            "[sync:end] at {} outcome={:?} direct={} composited={} clean={}",
            self.at(e.timestamp),
            e.outcome,
            e.direct_painted,
            e.composited,
            rect(e.to_clean),
        );
    }

    fn on_sync_discard(&mut self, e: &SyncDiscardEvent) {
        let _ = writeln!(
            self.writer,
            "[sync:skip] at {} reason={:?}",
            self.at(e.timestamp),
            e.reason,
        );
    }

    fn on_blit(&mut self, e: &BlitEvent) {
        let result = if e.accepted { "ok" } else { "REFUSED" };
        let _ = writeln!(
            self.writer,
            "[blit] area={} delta=({},{}) {result}",
            rect(e.area),
            e.delta.x,
            e.delta.y,
        );
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        let path = if e.composed { "compose" } else { "raster" };
        let _ = writeln!(
            self.writer,
            "[flush] at {} window={} bounds={} {path} textures={}",
            self.at(e.timestamp),
            e.window.0,
            rect(e.bounds),
            e.textures,
        );
    }

    fn on_damage_rects(&mut self, rects: &[DamageRect]) {
        let _ = writeln!(self.writer, "[damage] rects={}", rects.len());
    }
}
