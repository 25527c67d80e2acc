// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Damage and request events carry no timestamp of their own; they are
//! placed at the most recent timestamp seen before them (zero at the start
//! of a recording).
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use kurbo::Rect;
use serde_json::{Value, json};

use underpaint_core::time::{HostTime, Timebase};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Syncs become duration slices; everything else is an instant event.
/// Flushes are placed on one track per native window.
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut clock = Clock { last: 0.0, timebase };

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::MarkDirty {
                widget,
                bounds,
                path,
                time,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "MarkDirty",
                    "cat": "Damage",
                    "ts": clock.last,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "widget": widget.index,
                        "generation": widget.generation,
                        "bounds": rect(bounds),
                        "path": format!("{path:?}"),
                        "time": format!("{time:?}"),
                    }
                }));
            }
            RecordedEvent::UpdateRequest {
                widget,
                time,
                throttled,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "UpdateRequest",
                    "cat": "Scheduler",
                    "ts": clock.last,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "widget": widget.index,
                        "time": format!("{time:?}"),
                        "throttled": throttled,
                    }
                }));
            }
            RecordedEvent::SyncBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": "Sync",
                    "cat": "Sync",
                    "ts": clock.at(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "dirty_widgets": e.dirty_widgets,
                        "dirty_textures": e.dirty_textures,
                        "full_update": e.full_update,
                    }
                }));
            }
            RecordedEvent::SyncEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": "Sync",
                    "cat": "Sync",
                    "ts": clock.at(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "outcome": format!("{:?}", e.outcome),
                        "direct_painted": e.direct_painted,
                        "composited": e.composited,
                        "to_clean": rect(e.to_clean),
                    }
                }));
            }
            RecordedEvent::SyncDiscard(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "SyncDiscard",
                    "cat": "Sync",
                    "ts": clock.at(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
            RecordedEvent::Blit(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Blit",
                    "cat": "Damage",
                    "ts": clock.last,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "area": rect(e.area),
                        "dx": e.delta.x,
                        "dy": e.delta.y,
                        "accepted": e.accepted,
                    }
                }));
            }
            RecordedEvent::Flush(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": if e.composed { "Compose" } else { "Flush" },
                    "cat": "Present",
                    "ts": clock.at(e.timestamp),
                    "pid": 0,
                    "tid": e.window.0,
                    "s": "t",
                    "args": {
                        "bounds": rect(e.bounds),
                        "textures": e.textures,
                    }
                }));
            }
            RecordedEvent::DamageRectsCount { count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "DamageRects",
                    "cat": "Rich",
                    "ts": clock.last,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "count": count,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

/// Converts timestamps and remembers the latest one.
struct Clock {
    last: f64,
    timebase: Timebase,
}

impl Clock {
    fn at(&mut self, t: Option<HostTime>) -> f64 {
        if let Some(t) = t {
            self.last = self.timebase.ticks_to_nanos(t.ticks()) as f64 / 1000.0;
        }
        self.last
    }
}

fn rect(r: Rect) -> [f64; 4] {
    [r.x0, r.y0, r.width(), r.height()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use underpaint_core::trace::{
        FlushEvent, SyncBeginEvent, SyncEndEvent, SyncOutcome, TraceSink, UpdateRequestEvent,
    };
    use underpaint_core::update::UpdateTime;
    use underpaint_core::widget::{NativeWindowId, WidgetKind, WidgetStore};

    #[test]
    fn export_produces_valid_json() {
        let mut store = WidgetStore::new();
        let top = store.create_widget(
            WidgetKind::Native(NativeWindowId(2)),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let mut rec = RecorderSink::new();
        rec.on_sync_begin(&SyncBeginEvent {
            timestamp: Some(HostTime(1_000_000)),
            dirty_widgets: 1,
            dirty_textures: 0,
            full_update: false,
        });
        rec.on_flush(&FlushEvent {
            timestamp: None,
            window: NativeWindowId(2),
            bounds: Rect::new(0.0, 0.0, 10.0, 10.0),
            composed: false,
            textures: 0,
        });
        rec.on_sync_end(&SyncEndEvent {
            timestamp: Some(HostTime(1_000_500)),
            direct_painted: 1,
            composited: false,
            to_clean: Rect::new(0.0, 0.0, 10.0, 10.0),
            outcome: SyncOutcome::Painted,
        });
        rec.on_update_request(&UpdateRequestEvent {
            widget: top,
            time: UpdateTime::Later,
            throttled: false,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["ts"], 1000.0);

        // Untimed flush inherits the sync's start.
        assert_eq!(parsed[1]["name"], "Flush");
        assert_eq!(parsed[1]["tid"], 2);
        assert_eq!(parsed[1]["ts"], 1000.0);

        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["args"]["outcome"], "Painted");
        assert_eq!(parsed[2]["ts"], 1000.5);

        assert_eq!(parsed[3]["name"], "UpdateRequest");
        assert_eq!(parsed[3]["ts"], 1000.5);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
