// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Widget handles are recorded as their index and generation
//! ([`WidgetRef`]); [`on_damage_rects`](TraceSink::on_damage_rects) stores
//! only the count.

use kurbo::{Rect, Vec2};
use underpaint_core::time::HostTime;
use underpaint_core::trace::{
    BlitEvent, DamagePath, DamageRect, FlushEvent, MarkDirtyEvent, SyncBeginEvent, SyncDiscard,
    SyncDiscardEvent, SyncEndEvent, SyncOutcome, TraceSink, UpdateRequestEvent,
};
use underpaint_core::update::UpdateTime;
use underpaint_core::widget::{NativeWindowId, WidgetId};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_MARK_DIRTY: u8 = 1;
const TAG_UPDATE_REQUEST: u8 = 2;
const TAG_SYNC_BEGIN: u8 = 3;
const TAG_SYNC_END: u8 = 4;
const TAG_SYNC_DISCARD: u8 = 5;
const TAG_BLIT: u8 = 6;
const TAG_FLUSH: u8 = 7;
const TAG_DAMAGE_RECTS_COUNT: u8 = 8;

/// A widget handle as recorded: slot index and generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WidgetRef {
    /// Slot index.
    pub index: u32,
    /// Generation counter.
    pub generation: u32,
}

impl From<WidgetId> for WidgetRef {
    fn from(id: WidgetId) -> Self {
        Self {
            index: id.index(),
            generation: id.generation(),
        }
    }
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_option_time(&mut self, v: Option<HostTime>) {
        match v {
            Some(t) => {
                self.write_u8(1);
                self.write_u64(t.ticks());
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_rect(&mut self, r: Rect) {
        self.write_f64(r.x0);
        self.write_f64(r.y0);
        self.write_f64(r.x1);
        self.write_f64(r.y1);
    }

    fn write_widget(&mut self, id: WidgetId) {
        self.write_u32(id.index());
        self.write_u32(id.generation());
    }

    fn write_time(&mut self, t: UpdateTime) {
        self.write_u8(match t {
            UpdateTime::Later => 0,
            UpdateTime::Now => 1,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_mark_dirty(&mut self, e: &MarkDirtyEvent) {
        self.write_u8(TAG_MARK_DIRTY);
        self.write_widget(e.widget);
        self.write_rect(e.bounds);
        self.write_u8(match e.path {
            DamagePath::PaintOnScreen => 0,
            DamagePath::FullUpdatePending => 1,
            DamagePath::RenderToTexture => 2,
            DamagePath::AlreadyDirty => 3,
            DamagePath::BufferInvalid => 4,
            DamagePath::Widget => 5,
        });
        self.write_time(e.time);
    }

    fn on_update_request(&mut self, e: &UpdateRequestEvent) {
        self.write_u8(TAG_UPDATE_REQUEST);
        self.write_widget(e.widget);
        self.write_time(e.time);
        self.write_bool(e.throttled);
    }

    fn on_sync_begin(&mut self, e: &SyncBeginEvent) {
        self.write_u8(TAG_SYNC_BEGIN);
        self.write_option_time(e.timestamp);
        self.write_u32(e.dirty_widgets);
        self.write_u32(e.dirty_textures);
        self.write_bool(e.full_update);
    }

    fn on_sync_end(&mut self, e: &SyncEndEvent) {
        self.write_u8(TAG_SYNC_END);
        self.write_option_time(e.timestamp);
        self.write_u32(e.direct_painted);
        self.write_bool(e.composited);
        self.write_rect(e.to_clean);
        self.write_u8(match e.outcome {
            SyncOutcome::Painted => 0,
            SyncOutcome::NoRepaint => 1,
            SyncOutcome::NothingToPaint => 2,
            SyncOutcome::UpdatesDisabled => 3,
        });
    }

    fn on_sync_discard(&mut self, e: &SyncDiscardEvent) {
        self.write_u8(TAG_SYNC_DISCARD);
        self.write_option_time(e.timestamp);
        self.write_u8(match e.reason {
            SyncDiscard::Hidden => 0,
            SyncDiscard::Unmapped => 1,
            SyncDiscard::Resizing => 2,
            SyncDiscard::TexturesLocked => 3,
        });
    }

    fn on_blit(&mut self, e: &BlitEvent) {
        self.write_u8(TAG_BLIT);
        self.write_rect(e.area);
        self.write_f64(e.delta.x);
        self.write_f64(e.delta.y);
        self.write_bool(e.accepted);
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        self.write_u8(TAG_FLUSH);
        self.write_option_time(e.timestamp);
        self.write_u64(e.window.0);
        self.write_rect(e.bounds);
        self.write_bool(e.composed);
        self.write_u32(e.textures);
    }

    fn on_damage_rects(&mut self, rects: &[DamageRect]) {
        self.write_u8(TAG_DAMAGE_RECTS_COUNT);
        self.write_u32(u32::try_from(rects.len()).unwrap_or(u32::MAX));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`MarkDirtyEvent`].
    MarkDirty {
        /// The damaged widget.
        widget: WidgetRef,
        /// Bounding rect of the damage in the widget's coordinates.
        bounds: Rect,
        /// Which routing branch handled it.
        path: DamagePath,
        /// The requested update time.
        time: UpdateTime,
    },
    /// An [`UpdateRequestEvent`].
    UpdateRequest {
        /// The widget to service.
        widget: WidgetRef,
        /// The effective update time.
        time: UpdateTime,
        /// Whether the request was downgraded.
        throttled: bool,
    },
    /// A [`SyncBeginEvent`].
    SyncBegin(SyncBeginEvent),
    /// A [`SyncEndEvent`].
    SyncEnd(SyncEndEvent),
    /// A [`SyncDiscardEvent`].
    SyncDiscard(SyncDiscardEvent),
    /// A [`BlitEvent`].
    Blit(BlitEvent),
    /// A [`FlushEvent`].
    Flush(FlushEvent),
    /// Number of damage rects a sync made current.
    DamageRectsCount {
        /// Number of damage rects.
        count: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.take().map(f64::from_le_bytes)
    }

    fn read_option_time(&mut self) -> Option<Option<HostTime>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some((present != 0).then_some(HostTime(val)))
    }

    fn read_rect(&mut self) -> Option<Rect> {
        Some(Rect::new(
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
        ))
    }

    fn read_widget(&mut self) -> Option<WidgetRef> {
        Some(WidgetRef {
            index: self.read_u32()?,
            generation: self.read_u32()?,
        })
    }

    fn read_time(&mut self) -> Option<UpdateTime> {
        Some(match self.read_u8()? {
            0 => UpdateTime::Later,
            _ => UpdateTime::Now,
        })
    }

    fn decode_mark_dirty(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::MarkDirty {
            widget: self.read_widget()?,
            bounds: self.read_rect()?,
            path: match self.read_u8()? {
                0 => DamagePath::PaintOnScreen,
                1 => DamagePath::FullUpdatePending,
                2 => DamagePath::RenderToTexture,
                3 => DamagePath::AlreadyDirty,
                4 => DamagePath::BufferInvalid,
                _ => DamagePath::Widget,
            },
            time: self.read_time()?,
        })
    }

    fn decode_update_request(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::UpdateRequest {
            widget: self.read_widget()?,
            time: self.read_time()?,
            throttled: self.read_bool()?,
        })
    }

    fn decode_sync_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SyncBegin(SyncBeginEvent {
            timestamp: self.read_option_time()?,
            dirty_widgets: self.read_u32()?,
            dirty_textures: self.read_u32()?,
            full_update: self.read_bool()?,
        }))
    }

    fn decode_sync_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SyncEnd(SyncEndEvent {
            timestamp: self.read_option_time()?,
            direct_painted: self.read_u32()?,
            composited: self.read_bool()?,
            to_clean: self.read_rect()?,
            outcome: match self.read_u8()? {
                0 => SyncOutcome::Painted,
                1 => SyncOutcome::NoRepaint,
                2 => SyncOutcome::NothingToPaint,
                _ => SyncOutcome::UpdatesDisabled,
            },
        }))
    }

    fn decode_sync_discard(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SyncDiscard(SyncDiscardEvent {
            timestamp: self.read_option_time()?,
            reason: match self.read_u8()? {
                0 => SyncDiscard::Hidden,
                1 => SyncDiscard::Unmapped,
                2 => SyncDiscard::Resizing,
                _ => SyncDiscard::TexturesLocked,
            },
        }))
    }

    fn decode_blit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Blit(BlitEvent {
            area: self.read_rect()?,
            delta: Vec2::new(self.read_f64()?, self.read_f64()?),
            accepted: self.read_bool()?,
        }))
    }

    fn decode_flush(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Flush(FlushEvent {
            timestamp: self.read_option_time()?,
            window: NativeWindowId(self.read_u64()?),
            bounds: self.read_rect()?,
            composed: self.read_bool()?,
            textures: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_MARK_DIRTY => self.decode_mark_dirty(),
            TAG_UPDATE_REQUEST => self.decode_update_request(),
            TAG_SYNC_BEGIN => self.decode_sync_begin(),
            TAG_SYNC_END => self.decode_sync_end(),
            TAG_SYNC_DISCARD => self.decode_sync_discard(),
            TAG_BLIT => self.decode_blit(),
            TAG_FLUSH => self.decode_flush(),
            TAG_DAMAGE_RECTS_COUNT => Some(RecordedEvent::DamageRectsCount {
                count: self.read_u32()?,
            }),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use underpaint_core::widget::{WidgetKind, WidgetStore};

    fn sample_sync_end() -> SyncEndEvent {
        SyncEndEvent {
            timestamp: Some(HostTime(16_000)),
            direct_painted: 3,
            composited: true,
            to_clean: Rect::new(0.0, 0.0, 64.0, 32.0),
            outcome: SyncOutcome::Painted,
        }
    }

    #[test]
    fn mark_dirty_keeps_widget_identity() {
        let mut store = WidgetStore::new();
        let id = store.create_widget(WidgetKind::Alien, Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut rec = RecorderSink::new();
        rec.on_mark_dirty(&MarkDirtyEvent {
            widget: id,
            bounds: Rect::new(1.0, 2.0, 3.0, 4.0),
            path: DamagePath::AlreadyDirty,
            time: UpdateTime::Now,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::MarkDirty {
                widget,
                bounds,
                path,
                time,
            } => {
                assert_eq!(*widget, WidgetRef::from(id));
                assert_eq!(*bounds, Rect::new(1.0, 2.0, 3.0, 4.0));
                assert_eq!(*path, DamagePath::AlreadyDirty);
                assert_eq!(*time, UpdateTime::Now);
            }
            other => panic!("expected MarkDirty, got {other:?}"),
        }
    }

    #[test]
    fn sync_pass_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_sync_begin(&SyncBeginEvent {
            timestamp: None,
            dirty_widgets: 2,
            dirty_textures: 0,
            full_update: false,
        });
        rec.on_flush(&FlushEvent {
            timestamp: Some(HostTime(15_000)),
            window: NativeWindowId(5),
            bounds: Rect::new(0.0, 0.0, 8.0, 8.0),
            composed: false,
            textures: 0,
        });
        rec.on_sync_end(&sample_sync_end());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 3);
        match &events[0] {
            RecordedEvent::SyncBegin(e) => {
                assert_eq!(e.timestamp, None);
                assert_eq!(e.dirty_widgets, 2);
            }
            other => panic!("expected SyncBegin, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::Flush(e) => {
                assert_eq!(e.window, NativeWindowId(5));
                assert_eq!(e.timestamp, Some(HostTime(15_000)));
            }
            other => panic!("expected Flush, got {other:?}"),
        }
        match &events[2] {
            RecordedEvent::SyncEnd(e) => {
                assert_eq!(e.outcome, SyncOutcome::Painted);
                assert_eq!(e.direct_painted, 3);
                assert_eq!(e.to_clean, Rect::new(0.0, 0.0, 64.0, 32.0));
            }
            other => panic!("expected SyncEnd, got {other:?}"),
        }
    }

    #[test]
    fn discard_and_blit() {
        let mut rec = RecorderSink::new();
        rec.on_sync_discard(&SyncDiscardEvent {
            timestamp: None,
            reason: SyncDiscard::TexturesLocked,
        });
        rec.on_blit(&BlitEvent {
            area: Rect::new(0.0, 10.0, 50.0, 60.0),
            delta: Vec2::new(0.0, -10.0),
            accepted: true,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert!(matches!(
            events[0],
            RecordedEvent::SyncDiscard(SyncDiscardEvent {
                reason: SyncDiscard::TexturesLocked,
                ..
            })
        ));
        match &events[1] {
            RecordedEvent::Blit(e) => {
                assert_eq!(e.delta, Vec2::new(0.0, -10.0));
                assert!(e.accepted);
            }
            other => panic!("expected Blit, got {other:?}"),
        }
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_sync_end(&sample_sync_end());
        rec.on_sync_end(&sample_sync_end());
        let bytes = rec.into_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 1]).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn damage_rects_count() {
        let mut rec = RecorderSink::new();
        let rects = [
            DamageRect::from(Rect::new(0.0, 0.0, 4.0, 4.0)),
            DamageRect::from(Rect::new(8.0, 8.0, 12.0, 12.0)),
        ];
        rec.on_damage_rects(&rects);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert!(matches!(events[..], [RecordedEvent::DamageRectsCount { count: 2 }]));
    }
}
