// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Set algebra over axis-aligned rectangles.
//!
//! A [`Region`] is a set of pixels represented as a list of pairwise
//! disjoint, non-empty [`Rect`]s. Coordinates are integer-valued `f64`s:
//! intersection, subtraction and translation by integer offsets never
//! introduce fractional edges, so every operation is exact.
//!
//! The decomposition into rectangles is an implementation detail. Two
//! regions compare equal when they cover the same pixels, regardless of how
//! those pixels are split up.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Rect, Vec2};

/// A set of pixels built from disjoint rectangles.
#[derive(Clone, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Creates an empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// Creates a region covering `rect`.
    ///
    /// Empty or inverted rectangles produce an empty region.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let mut rects = Vec::new();
        if !rect_is_empty(rect) {
            rects.push(rect);
        }
        Self { rects }
    }

    /// Creates a region covering the union of `rects`.
    #[must_use]
    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        let mut region = Self::new();
        for rect in rects {
            region.add_rect(rect);
        }
        region
    }

    /// Returns `true` if the region covers no pixels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Returns the disjoint rectangles making up the region.
    #[inline]
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Returns the smallest rectangle containing the whole region, or
    /// [`Rect::ZERO`] if the region is empty.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        let mut it = self.rects.iter().copied();
        let Some(first) = it.next() else {
            return Rect::ZERO;
        };
        it.fold(first, |acc, r| acc.union(r))
    }

    /// Returns the number of pixels covered.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// Removes every pixel from the region.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Adds `rect` to the region.
    pub fn add_rect(&mut self, rect: Rect) {
        if rect_is_empty(rect) {
            return;
        }
        let mut pieces = Vec::new();
        pieces.push(rect);
        for &existing in &self.rects {
            let mut next = Vec::with_capacity(pieces.len());
            for piece in pieces {
                split_into(piece, existing, &mut next);
            }
            pieces = next;
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces);
        self.coalesce();
    }

    /// Adds every pixel of `other` to the region.
    pub fn union(&mut self, other: &Self) {
        if self.rects.is_empty() {
            self.rects.clone_from(&other.rects);
            return;
        }
        for &rect in &other.rects {
            self.add_rect(rect);
        }
    }

    /// Removes `rect` from the region.
    pub fn subtract_rect(&mut self, rect: Rect) {
        if rect_is_empty(rect) || !self.intersects_rect(rect) {
            return;
        }
        let mut out = Vec::with_capacity(self.rects.len() + 3);
        for &r in &self.rects {
            split_into(r, rect, &mut out);
        }
        self.rects = out;
        self.coalesce();
    }

    /// Removes every pixel of `other` from the region.
    pub fn subtract(&mut self, other: &Self) {
        for &rect in &other.rects {
            if self.rects.is_empty() {
                return;
            }
            self.subtract_rect(rect);
        }
    }

    /// Keeps only the pixels inside `rect`.
    pub fn intersect_rect(&mut self, rect: Rect) {
        if rect_is_empty(rect) {
            self.rects.clear();
            return;
        }
        self.rects.retain_mut(|r| {
            *r = r.intersect(rect);
            !rect_is_empty(*r)
        });
    }

    /// Keeps only the pixels also covered by `other`.
    pub fn intersect(&mut self, other: &Self) {
        let mut out = Vec::new();
        for &a in &self.rects {
            for &b in &other.rects {
                let r = a.intersect(b);
                if !rect_is_empty(r) {
                    out.push(r);
                }
            }
        }
        self.rects = out;
        self.coalesce();
    }

    /// Moves the region by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        for r in &mut self.rects {
            *r = *r + delta;
        }
    }

    /// Returns a copy of the region moved by `delta`.
    #[must_use]
    pub fn translated(&self, delta: Vec2) -> Self {
        let mut out = self.clone();
        out.translate(delta);
        out
    }

    /// Returns the pixels of the region inside `rect`.
    #[must_use]
    pub fn intersected_rect(&self, rect: Rect) -> Self {
        let mut out = self.clone();
        out.intersect_rect(rect);
        out
    }

    /// Returns the pixels covered by both regions.
    #[must_use]
    pub fn intersected(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.intersect(other);
        out
    }

    /// Returns `true` if any pixel of `rect` is in the region.
    #[must_use]
    pub fn intersects_rect(&self, rect: Rect) -> bool {
        self.rects.iter().any(|&r| rects_overlap(r, rect))
    }

    /// Returns `true` if the two regions share any pixel.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.rects
            .iter()
            .any(|&a| other.rects.iter().any(|&b| rects_overlap(a, b)))
    }

    /// Returns `true` if every pixel of `rect` is in the region.
    #[must_use]
    pub fn contains_rect(&self, rect: Rect) -> bool {
        if rect_is_empty(rect) {
            return false;
        }
        let mut rest = Self::from_rect(rect);
        rest.subtract(self);
        rest.is_empty()
    }

    /// Cheap, conservative containment test: `true` only if a single
    /// rectangle of the region contains all of `rect`.
    ///
    /// A `false` answer does not mean `rect` is uncovered; it is used to
    /// short-circuit redundant damage, never to decide correctness.
    #[must_use]
    pub fn strictly_contains(&self, rect: Rect) -> bool {
        !rect_is_empty(rect) && self.rects.iter().any(|&r| rect_contains(r, rect))
    }

    /// Merges neighbouring rectangles that share a full edge.
    fn coalesce(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..self.rects.len() {
                for j in (i + 1)..self.rects.len() {
                    if let Some(joined) = join(self.rects[i], self.rects[j]) {
                        self.rects[i] = joined;
                        self.rects.swap_remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        if self.area() != other.area() {
            return false;
        }
        let mut rest = self.clone();
        rest.subtract(other);
        rest.is_empty()
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Region")?;
        f.debug_list()
            .entries(
                self.rects
                    .iter()
                    .map(|r| [r.x0, r.y0, r.width(), r.height()]),
            )
            .finish()
    }
}

/// Returns `true` if `rect` covers no pixels (including inverted or NaN
/// rectangles).
#[inline]
#[must_use]
pub fn rect_is_empty(rect: Rect) -> bool {
    !(rect.x1 > rect.x0 && rect.y1 > rect.y0)
}

/// Returns `true` if the two rectangles share at least one pixel.
///
/// Unlike [`Rect::overlaps`], rectangles that merely touch along an edge do
/// not overlap.
#[inline]
#[must_use]
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Returns `true` if `outer` contains every pixel of `inner`.
#[inline]
#[must_use]
pub fn rect_contains(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// Pushes the parts of `rect` outside `cut` onto `out` (at most four).
fn split_into(rect: Rect, cut: Rect, out: &mut Vec<Rect>) {
    if !rects_overlap(rect, cut) {
        out.push(rect);
        return;
    }
    if cut.y0 > rect.y0 {
        out.push(Rect::new(rect.x0, rect.y0, rect.x1, cut.y0));
    }
    if cut.y1 < rect.y1 {
        out.push(Rect::new(rect.x0, cut.y1, rect.x1, rect.y1));
    }
    let band_y0 = rect.y0.max(cut.y0);
    let band_y1 = rect.y1.min(cut.y1);
    if cut.x0 > rect.x0 {
        out.push(Rect::new(rect.x0, band_y0, cut.x0, band_y1));
    }
    if cut.x1 < rect.x1 {
        out.push(Rect::new(cut.x1, band_y0, rect.x1, band_y1));
    }
}

/// Joins two disjoint rectangles sharing a full edge into one.
fn join(a: Rect, b: Rect) -> Option<Rect> {
    if a.x0 == b.x0 && a.x1 == b.x1 && (a.y1 == b.y0 || b.y1 == a.y0) {
        return Some(Rect::new(a.x0, a.y0.min(b.y0), a.x1, a.y1.max(b.y1)));
    }
    if a.y0 == b.y0 && a.y1 == b.y1 && (a.x1 == b.x0 || b.x1 == a.x0) {
        return Some(Rect::new(a.x0.min(b.x0), a.y0, a.x1.max(b.x1), a.y1));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, x + w, y + h)
    }

    #[test]
    fn empty_rect_yields_empty_region() {
        assert!(Region::from_rect(Rect::ZERO).is_empty());
        assert!(Region::from_rect(Rect::new(10.0, 10.0, 5.0, 20.0)).is_empty());
    }

    #[test]
    fn union_of_overlapping_rects_counts_pixels_once() {
        let mut region = Region::from_rect(r(0.0, 0.0, 10.0, 10.0));
        region.add_rect(r(5.0, 5.0, 10.0, 10.0));
        assert_eq!(region.area(), 175.0);
        assert_eq!(region.bounding_rect(), r(0.0, 0.0, 15.0, 15.0));
    }

    #[test]
    fn union_with_covered_rect_is_noop() {
        let mut region = Region::from_rect(r(0.0, 0.0, 100.0, 100.0));
        region.add_rect(r(10.0, 10.0, 10.0, 10.0));
        assert_eq!(region.rects().len(), 1);
    }

    #[test]
    fn subtract_hole_leaves_ring() {
        let mut region = Region::from_rect(r(0.0, 0.0, 30.0, 30.0));
        region.subtract_rect(r(10.0, 10.0, 10.0, 10.0));
        assert_eq!(region.area(), 800.0);
        assert!(!region.intersects_rect(r(10.0, 10.0, 10.0, 10.0)));
        assert!(region.contains_rect(r(0.0, 0.0, 30.0, 10.0)));
    }

    #[test]
    fn subtract_everything_is_empty() {
        let mut region = Region::from_rects([r(0.0, 0.0, 10.0, 10.0), r(20.0, 0.0, 5.0, 5.0)]);
        region.subtract(&Region::from_rect(r(-5.0, -5.0, 50.0, 50.0)));
        assert!(region.is_empty());
    }

    #[test]
    fn intersect_keeps_shared_pixels() {
        let mut a = Region::from_rects([r(0.0, 0.0, 10.0, 10.0), r(20.0, 0.0, 10.0, 10.0)]);
        let b = Region::from_rect(r(5.0, 0.0, 20.0, 5.0));
        a.intersect(&b);
        assert_eq!(
            a,
            Region::from_rects([r(5.0, 0.0, 5.0, 5.0), r(20.0, 0.0, 5.0, 5.0)])
        );
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let region = Region::from_rect(r(0.0, 0.0, 10.0, 10.0));
        assert!(!region.intersects_rect(r(10.0, 0.0, 10.0, 10.0)));
        assert!(region.intersects_rect(r(9.0, 9.0, 10.0, 10.0)));
    }

    #[test]
    fn adjacent_rects_coalesce() {
        let region = Region::from_rects([r(0.0, 0.0, 10.0, 10.0), r(0.0, 10.0, 10.0, 10.0)]);
        assert_eq!(region.rects(), &[r(0.0, 0.0, 10.0, 20.0)]);
    }

    #[test]
    fn equality_ignores_decomposition() {
        let a = Region::from_rects([r(0.0, 0.0, 5.0, 10.0), r(5.0, 0.0, 5.0, 5.0)]);
        let b = Region::from_rects([r(0.0, 0.0, 10.0, 5.0), r(0.0, 5.0, 5.0, 5.0)]);
        assert_eq!(a, b);
        assert_ne!(a, Region::from_rect(r(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn translate_moves_every_rect() {
        let region = Region::from_rect(r(0.0, 0.0, 10.0, 10.0)).translated(Vec2::new(5.0, -5.0));
        assert_eq!(region.bounding_rect(), r(5.0, -5.0, 10.0, 10.0));
    }

    #[test]
    fn strict_containment_is_conservative() {
        let split = Region::from_rects([r(0.0, 0.0, 10.0, 10.0), r(10.0, 0.0, 10.0, 5.0)]);
        // Covered, but not by a single rectangle.
        assert!(split.contains_rect(r(8.0, 0.0, 4.0, 4.0)));
        assert!(!split.strictly_contains(r(8.0, 0.0, 4.0, 4.0)));
        assert!(split.strictly_contains(r(1.0, 1.0, 4.0, 4.0)));
        assert!(!split.strictly_contains(Rect::ZERO));
    }

    #[test]
    fn l_shape_after_growth() {
        let mut grown = Region::from_rect(r(0.0, 0.0, 150.0, 150.0));
        grown.subtract_rect(r(0.0, 0.0, 100.0, 100.0));
        assert_eq!(grown.area(), 150.0 * 150.0 - 100.0 * 100.0);
        assert!(grown.contains_rect(r(100.0, 0.0, 50.0, 150.0)));
        assert!(grown.contains_rect(r(0.0, 100.0, 150.0, 50.0)));
    }
}
