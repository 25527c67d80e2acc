// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget kinds and per-widget attributes.

use super::id::{NativeWindowId, TextureId};

/// How a widget's pixels reach the screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// Rendered into its top level's shared backing store, with no window
    /// handle of its own.
    #[default]
    Alien,
    /// Rendered into the shared backing store but presented through its own
    /// platform window. Every top level is native.
    Native(NativeWindowId),
    /// Content is produced by a GPU pipeline into a texture and composited
    /// with the rasterized backing store at flush time.
    RenderToTexture(TextureId),
    /// Bypasses the backing store and paints straight to its own window.
    PaintOnScreen(NativeWindowId),
}

impl WidgetKind {
    /// Returns the widget's own window handle, if it has one.
    #[must_use]
    pub const fn window(self) -> Option<NativeWindowId> {
        match self {
            Self::Native(w) | Self::PaintOnScreen(w) => Some(w),
            Self::Alien | Self::RenderToTexture(_) => None,
        }
    }

    /// Returns the texture handle of a render-to-texture widget.
    #[must_use]
    pub const fn texture(self) -> Option<TextureId> {
        match self {
            Self::RenderToTexture(t) => Some(t),
            _ => None,
        }
    }
}

/// Per-widget boolean attributes.
///
/// Every flag defaults to `false`, which describes a plain, shown,
/// updatable widget with transparent regions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WidgetAttributes {
    /// The widget (and its subtree) is hidden.
    pub hidden: bool,
    /// Repainting is suspended for the widget and its subtree.
    pub updates_disabled: bool,
    /// The widget paints every pixel of its rect with opaque content.
    pub opaque: bool,
    /// Previously painted content stays valid across resizes.
    pub static_contents: bool,
    /// Render-to-texture content stacks above the rasterized backing store.
    pub stays_on_top: bool,
    /// The window intends to rely on translucency when composited.
    pub translucent_background: bool,
    /// The top level is not mapped on screen (e.g. minimized).
    pub unmapped: bool,
    /// Nothing is ever presented for this widget.
    pub dont_show_on_screen: bool,
}
