//! 2-D points in pixel space.

use serde::{Deserialize, Serialize};

/// A point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotate this point around `center` by `theta` radians.
    ///
    /// Uses the standard rotation matrix, so positive angles turn
    /// counter-clockwise in a y-up frame:
    /// ```text
    /// x' = cx + (x - cx) * cos(θ) - (y - cy) * sin(θ)
    /// y' = cy + (x - cx) * sin(θ) + (y - cy) * cos(θ)
    /// ```
    pub fn rotate(self, center: Point, theta: f64) -> Point {
        let (sin, cos) = theta.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point::new(
            center.x + dx * cos - dy * sin,
            center.y + dx * sin + dy * cos,
        )
    }

    /// Move this point toward `center`, dividing its offset by `factor`.
    ///
    /// A factor of 1.0 leaves the point unchanged.
    pub fn scale_toward(self, center: Point, factor: f64) -> Point {
        Point::new(
            center.x + (self.x - center.x) / factor,
            center.y + (self.y - center.y) / factor,
        )
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
