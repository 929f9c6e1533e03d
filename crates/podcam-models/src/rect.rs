use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A normalized rectangle (0.0 to 1.0) representing a relative region of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedRect {
    /// X coordinate of the top-left corner (0.0 = left, 1.0 = right)
    pub x: f64,
    /// Y coordinate of the top-left corner (0.0 = top, 1.0 = bottom)
    pub y: f64,
    /// Width of the rectangle (0.0 to 1.0)
    pub width: f64,
    /// Height of the rectangle (0.0 to 1.0)
    pub height: f64,
}

impl NormalizedRect {
    /// Create a new normalized rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the rectangle is valid (within 0.0-1.0 range).
    pub fn is_valid(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.001 // Allow small epsilon for float precision
            && self.y + self.height <= 1.001
    }

    /// Area of the rectangle.
    pub fn area(&self) -> f64 {
        if self.width > 0.0 && self.height > 0.0 {
            self.width * self.height
        } else {
            0.0
        }
    }

    /// Intersection-over-Union with another rectangle.
    ///
    /// Returns 0.0 for disjoint rectangles and for degenerate (zero-area)
    /// operands rather than dividing by zero.
    pub fn iou(&self, other: &NormalizedRect) -> f64 {
        let self_area = self.area();
        let other_area = other.area();
        if self_area == 0.0 || other_area == 0.0 {
            return 0.0;
        }

        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self_area + other_area - intersection;
        if union <= 0.0 {
            return 0.0;
        }

        intersection / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical() {
        let a = NormalizedRect::new(0.1, 0.1, 0.4, 0.4);
        assert!((a.iou(&a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = NormalizedRect::new(0.0, 0.0, 0.2, 0.2);
        let b = NormalizedRect::new(0.5, 0.5, 0.2, 0.2);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // Two 0.2x0.2 boxes offset by half their width: intersection is
        // 0.1x0.2 = 0.02, union is 0.04 + 0.04 - 0.02 = 0.06.
        let a = NormalizedRect::new(0.0, 0.0, 0.2, 0.2);
        let b = NormalizedRect::new(0.1, 0.0, 0.2, 0.2);
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_iou_degenerate_is_zero() {
        let a = NormalizedRect::new(0.1, 0.1, 0.0, 0.4);
        let b = NormalizedRect::new(0.1, 0.1, 0.4, 0.4);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(b.iou(&a), 0.0);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_is_valid() {
        assert!(NormalizedRect::new(0.1, 0.1, 0.5, 0.5).is_valid());
        assert!(!NormalizedRect::new(0.8, 0.1, 0.5, 0.5).is_valid());
        assert!(!NormalizedRect::new(0.1, 0.1, 0.0, 0.5).is_valid());
    }
}
