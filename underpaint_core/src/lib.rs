// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage tracking and flush scheduling for widget trees that share one
//! off-screen backing store.
//!
//! `underpaint_core` decides, for a tree of widgets painted into the buffer
//! of their top-level window, what must be repainted, in what order, and
//! when the result is copied (or composited) to the display. It is `no_std`
//! compatible (with `alloc`) and keeps the widget tree in struct-of-arrays
//! storage with generational handles.
//!
//! # Architecture
//!
//! ```text
//!   widget code / windowing layer
//!       │  mark_dirty, move_rect, scroll_rect, invalidate_buffer
//!       ▼
//!   TopLevelSurface ──► UpdateQueue ──► (event loop) ──► sync()
//!                                                          │
//!                 ┌────────────────────────────────────────┘
//!                 ▼
//!   WidgetPainter::paint_widget ──► BackingStore ──► flush / compose_and_flush
//! ```
//!
//! **[`widget`]**: Struct-of-arrays widget tree. Geometry, kind, and
//! attributes are set by the caller; opaque-children regions and the
//! render-to-texture flag are derived by evaluation.
//!
//! **[`dirty`]**: Dirty channels (via `understory_dirty`) that keep the
//! derived widget state current.
//!
//! **[`region`]**: Sets of non-overlapping rectangles, the unit of damage.
//!
//! **[`surface`]**: [`TopLevelSurface`](surface::TopLevelSurface), the
//! per-window engine: damage propagation, blit fast paths, the sync
//! pipeline, and presentation.
//!
//! **[`update`]**: Coalesced update requests handed to the embedding event
//! loop.
//!
//! **[`texture`]**: Render-to-texture lists and the lock watcher that
//! defers syncs while a compositor holds them.
//!
//! **[`backend`]**: The [`BackingStore`](backend::BackingStore) and
//! [`WidgetPainter`](backend::WidgetPainter) traits that platforms and
//! painting code implement.
//!
//! **[`config`]**: Fast-path switches.
//!
//! **[`time`]**: Host timestamps used for composition throttling.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! engine instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies and
//!   [`SurfaceConfig::from_env`](config::SurfaceConfig::from_env).
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-sync
//!   damage-rect events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod backend;
pub mod config;
pub mod dirty;
pub mod region;
pub mod surface;
pub mod texture;
pub mod time;
pub mod trace;
pub mod update;
pub mod widget;
