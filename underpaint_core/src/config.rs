// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-surface behavior switches.

/// Configuration for a [`TopLevelSurface`](crate::surface::TopLevelSurface).
///
/// The fast-path switches exist so that a platform with broken scrolling or
/// a debugging session can force the conservative repaint-everything path
/// without touching call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceConfig {
    /// Let [`move_rect`](crate::surface::TopLevelSurface::move_rect) blit
    /// unobscured opaque widgets instead of repainting them.
    pub fast_move: bool,
    /// Let [`scroll_rect`](crate::surface::TopLevelSurface::scroll_rect)
    /// blit unobscured opaque content instead of repainting it.
    pub fast_scroll: bool,
    /// Remove damage hidden under opaque siblings during sync.
    pub subtract_opaque_siblings: bool,
    /// The platform can switch a window between the raster flush path and
    /// the composition path at will.
    ///
    /// When `false`, a window that has ever had a render-to-texture
    /// descendant keeps composing through an empty texture list.
    pub switchable_composition: bool,
    /// Display refresh rate used to throttle immediate updates while a
    /// window is composing. Zero disables throttling.
    pub refresh_rate_hz: u32,
}

impl SurfaceConfig {
    /// All fast paths on, composition switchable, 60 Hz throttling.
    pub const DEFAULT: Self = Self {
        fast_move: true,
        fast_scroll: true,
        subtract_opaque_siblings: true,
        switchable_composition: true,
        refresh_rate_hz: 60,
    };

    /// Returns [`SurfaceConfig::DEFAULT`].
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    /// Every optimization off: no blits, no sibling occlusion, no
    /// throttling.
    #[must_use]
    pub const fn conservative() -> Self {
        Self {
            fast_move: false,
            fast_scroll: false,
            subtract_opaque_siblings: false,
            switchable_composition: true,
            refresh_rate_hz: 0,
        }
    }

    /// Starts from [`SurfaceConfig::DEFAULT`] and applies the
    /// `UNDERPAINT_NO_FAST_MOVE`, `UNDERPAINT_NO_FAST_SCROLL`, and
    /// `UNDERPAINT_NO_SUBTRACT_OPAQUE_SIBLINGS` environment variables.
    ///
    /// A variable disables its optimization when it parses as a non-zero
    /// integer.
    #[cfg(feature = "std")]
    #[must_use]
    pub fn from_env() -> Self {
        Self::DEFAULT.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies environment-style overrides looked up through `var`.
    #[must_use]
    pub fn with_overrides<F, S>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<S>,
        S: AsRef<str>,
    {
        let set = |name: &str| {
            var(name)
                .and_then(|v| v.as_ref().trim().parse::<i64>().ok())
                .is_some_and(|n| n != 0)
        };
        if set("UNDERPAINT_NO_FAST_MOVE") {
            self.fast_move = false;
        }
        if set("UNDERPAINT_NO_FAST_SCROLL") {
            self.fast_scroll = false;
        }
        if set("UNDERPAINT_NO_SUBTRACT_OPAQUE_SIBLINGS") {
            self.subtract_opaque_siblings = false;
        }
        self
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
