// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget tree data model.
//!
//! A *widget* is a rectangular node in a window's tree. Each widget has:
//!
//! - An identity ([`WidgetId`]), a generational handle that becomes stale
//!   when the widget is destroyed, preventing use-after-free bugs at the API
//!   level.
//! - Topology: parent, first-child, and sibling links forming an ordered
//!   tree. Sibling order is stacking order.
//! - **Properties** set by the caller:
//!   [`geometry`](WidgetStore::set_geometry), [`kind`](WidgetStore::set_kind),
//!   [`attributes`](WidgetStore::set_attributes), [`mask`](WidgetStore::set_mask),
//!   and [`graphics effect`](WidgetStore::set_graphics_effect).
//! - **Derived state** produced by [`evaluate`](WidgetStore::evaluate): the
//!   region covered by opaque descendants and whether a render-to-texture
//!   widget lives below.
//!
//! Widgets are stored in struct-of-arrays layout with index-based handles.
//!
//! # Coordinates
//!
//! A widget's geometry is in its parent's coordinates. A top level's
//! geometry origin is its window position on screen; everything below it is
//! expressed relative to the top level's own origin (see
//! [`map_to_top`](WidgetStore::map_to_top)).
//!
//! # Dirty tracking
//!
//! Property mutations mark the channels in [`dirty`](crate::dirty) with an
//! eager policy so every ancestor's cache is invalidated. Topology changes
//! add or remove the parent-to-child dependency edges.

mod evaluate;
mod geometry;
mod id;
mod kind;
mod store;
mod traverse;

pub use evaluate::WidgetChanges;
pub use id::{INVALID, NativeWindowId, TextureId, WidgetId};
pub use kind::{WidgetAttributes, WidgetKind};
pub use store::WidgetStore;
pub use traverse::{Children, Descendants};
