// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants for derived widget state.
//!
//! The [`WidgetStore`](crate::widget::WidgetStore) caches state that depends
//! on a widget's descendants. Invalidation of those caches uses
//! multi-channel dirty tracking (via [`understory_dirty`]).
//!
//! # Propagation semantics
//!
//! Dependency edges run from parent to child: a parent *depends on* each of
//! its children. Marking a widget with
//! [`EagerPolicy`](understory_dirty::EagerPolicy) therefore marks the widget
//! and every ancestor, which is exactly the set of widgets whose cached
//! state can observe the change.
//!
//! - [`OPAQUE_CHILDREN`]: visibility, geometry, opacity, mask, or graphics
//!   effect of a widget changed. Ancestors recompute the region covered by
//!   their opaque descendants.
//! - [`TEXTURE_CHILDREN`]: a widget became (or stopped being) a
//!   render-to-texture widget, or the subtree was re-parented. Ancestors
//!   recompute whether a render-to-texture descendant exists.
//! - [`TOPOLOGY`]: structural change (add/remove child, create/destroy).
//!   Local only; drained and discarded by evaluation.
//!
//! # Consumption
//!
//! [`WidgetStore::evaluate`](crate::widget::WidgetStore::evaluate) drains
//! the channels children-first and rebuilds the caches. The sync pipeline
//! evaluates before it reads derived state.

use understory_dirty::Channel;

/// Opaque coverage of a widget's subtree changed.
pub const OPAQUE_CHILDREN: Channel = Channel::new(0);

/// Presence of render-to-texture widgets in a subtree changed.
pub const TEXTURE_CHILDREN: Channel = Channel::new(1);

/// Tree topology changed.
pub const TOPOLOGY: Channel = Channel::new(2);
