//! Geometry.
//!
//! Rect math for the visibility triggers. The DOM is headless, so rects
//! are supplied by the embedder rather than computed by layout.

/// A rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DomRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DomRect {
    /// Create with dimensions.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Area (zero for degenerate rects).
    #[inline]
    pub fn area(&self) -> f64 {
        (self.width.max(0.0)) * (self.height.max(0.0))
    }

    /// Check if rects intersect.
    pub fn intersects(&self, other: &DomRect) -> bool {
        !(self.right() < other.x
            || self.x > other.right()
            || self.bottom() < other.y
            || self.y > other.bottom())
    }

    /// Intersection rect, if any.
    pub fn intersection(&self, other: &DomRect) -> Option<DomRect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(DomRect::from_xywh(x, y, right - x, bottom - y))
    }

    /// Fraction of this rect visible inside `viewport`, in `0.0..=1.0`.
    ///
    /// Zero-area rects count as fully visible when their origin lies
    /// inside the viewport, matching IntersectionObserver semantics for
    /// empty elements.
    pub fn intersection_ratio(&self, viewport: &DomRect) -> f64 {
        if self.area() == 0.0 {
            let inside = self.x >= viewport.x
                && self.x <= viewport.right()
                && self.y >= viewport.y
                && self.y <= viewport.bottom();
            return if inside { 1.0 } else { 0.0 };
        }
        match self.intersection(viewport) {
            Some(overlap) => (overlap.area() / self.area()).clamp(0.0, 1.0),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_ratio_partial() {
        let rect = DomRect::from_xywh(0.0, 80.0, 100.0, 40.0);
        let viewport = DomRect::from_xywh(0.0, 0.0, 100.0, 100.0);
        let ratio = rect.intersection_ratio(&viewport);
        assert!((ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn intersection_ratio_outside() {
        let rect = DomRect::from_xywh(0.0, 200.0, 100.0, 40.0);
        let viewport = DomRect::from_xywh(0.0, 0.0, 100.0, 100.0);
        assert_eq!(rect.intersection_ratio(&viewport), 0.0);
    }

    #[test]
    fn zero_area_rect_inside_is_visible() {
        let rect = DomRect::from_xywh(10.0, 10.0, 0.0, 0.0);
        let viewport = DomRect::from_xywh(0.0, 0.0, 100.0, 100.0);
        assert_eq!(rect.intersection_ratio(&viewport), 1.0);
    }
}
