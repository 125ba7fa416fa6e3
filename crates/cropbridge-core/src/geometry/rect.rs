//! Crop rectangle with straighten angle, and its conversion to a
//! normalized camera-raw crop box.
//!
//! # Algorithm
//!
//! The destination rotates the whole image and then crops to an
//! axis-aligned box, shrinking the box so it never exposes canvas outside
//! the rotated image. To frame the same pixels as the source edit:
//!
//! 1. Rotate the rectangle's top-left and bottom-right corners about the
//!    rectangle center by `θ = -rotation`.
//! 2. Find the uniform shrink factor that pulls all four rotated corners
//!    back inside `[0, W] × [0, H]`.
//! 3. Scale both representative corners toward the center by that factor.
//! 4. Normalize to unit-square fractions, flipping y (the source is
//!    bottom-left origin, the destination top-left).

use tracing::debug;

use super::point::Point;
use super::types::{CropError, CrsCrop, ImageSize};

/// Tolerance for the post-scaling unit-square check.
const RANGE_TOLERANCE: f64 = 1e-9;

/// An axis-aligned crop rectangle plus straighten angle, in source pixels.
///
/// Built once from a fully decoded edit and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    origin: Point,
    width: f64,
    height: f64,
    rotation_degrees: f64,
    orig_width: f64,
    orig_height: f64,
}

impl CropRect {
    /// Build a crop rectangle from a decoded source edit.
    ///
    /// # Arguments
    ///
    /// * `origin` - Lower-left corner, bottom-left-origin pixels
    /// * `size` - `(width, height)` in pixels; `(0, 0)` with a `(0, 0)`
    ///   origin means "rotation only" and resolves to the full image
    /// * `rotation_degrees` - Source straighten angle
    /// * `image` - Full original image dimensions
    ///
    /// # Errors
    ///
    /// `CropError::MalformedInput` for non-finite values, non-positive
    /// sizes, or a rectangle whose center is not strictly inside the image.
    /// `CropError::DegenerateGeometry` for a zero-size rectangle away from
    /// the origin.
    pub fn new(
        origin: Point,
        size: (f64, f64),
        rotation_degrees: f64,
        image: ImageSize,
    ) -> Result<Self, CropError> {
        if image.is_empty() {
            return Err(CropError::MalformedInput(format!(
                "image dimensions must be positive, got {image}"
            )));
        }
        let values = [origin.x, origin.y, size.0, size.1, rotation_degrees];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CropError::MalformedInput(format!(
                "non-finite value in origin {:?}, size {:?} or rotation {}",
                origin, size, rotation_degrees
            )));
        }

        let (width, height) = match size {
            (w, h) if w == 0.0 && h == 0.0 => {
                if origin.x != 0.0 || origin.y != 0.0 {
                    return Err(CropError::DegenerateGeometry(format!(
                        "zero-size rectangle at ({}, {})",
                        origin.x, origin.y
                    )));
                }
                (image.width as f64, image.height as f64)
            }
            other => other,
        };
        if width <= 0.0 || height <= 0.0 {
            return Err(CropError::MalformedInput(format!(
                "crop size must be positive, got {width}x{height}"
            )));
        }

        let rect = Self {
            origin,
            width,
            height,
            rotation_degrees,
            orig_width: image.width as f64,
            orig_height: image.height as f64,
        };

        // The scale solver divides by the center's distance to each edge.
        let center = rect.center();
        if center.x <= 0.0
            || center.y <= 0.0
            || center.x >= rect.orig_width
            || center.y >= rect.orig_height
        {
            return Err(CropError::MalformedInput(format!(
                "crop center ({}, {}) lies outside the {image} image",
                center.x, center.y
            )));
        }

        Ok(rect)
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Resolved `(width, height)`, after sentinel substitution.
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.rotation_degrees
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + 0.5 * self.width,
            self.origin.y + 0.5 * self.height,
        )
    }

    /// Internal rotation in radians; the source turns the opposite way.
    fn theta(&self) -> f64 {
        (-self.rotation_degrees).to_radians()
    }

    fn corners(&self) -> [Point; 4] {
        let Point { x, y } = self.origin;
        [
            Point::new(x, y),
            Point::new(x, y + self.height),
            Point::new(x + self.width, y),
            Point::new(x + self.width, y + self.height),
        ]
    }

    /// Top-left and bottom-right corners rotated about the rectangle center.
    ///
    /// In the bottom-left-origin frame, top-left is `(x, y + h)` and
    /// bottom-right is `(x + w, y)`.
    pub fn rotated_corners(&self) -> (Point, Point) {
        let center = self.center();
        let theta = self.theta();
        let top_left = Point::new(self.origin.x, self.origin.y + self.height);
        let bottom_right = Point::new(self.origin.x + self.width, self.origin.y);
        (
            top_left.rotate(center, theta),
            bottom_right.rotate(center, theta),
        )
    }

    /// Smallest shrink factor (never below 1.0) that keeps every rotated
    /// corner inside the original image.
    ///
    /// Each corner and axis is checked on its own and the worst case wins.
    /// This overestimates slightly compared to a tight enclosing fit, which
    /// matches how the destination format was observed to behave.
    pub fn scale_factor(&self) -> f64 {
        let center = self.center();
        let theta = self.theta();

        self.corners()
            .iter()
            .map(|corner| corner.rotate(center, theta))
            .fold(1.0f64, |scale, p| {
                let x_ratio = if p.x < 0.0 {
                    (p.x - center.x).abs() / center.x
                } else if p.x > self.orig_width {
                    (p.x - center.x).abs() / (self.orig_width - center.x)
                } else {
                    1.0
                };
                let y_ratio = if p.y < 0.0 {
                    (p.y - center.y).abs() / center.y
                } else if p.y > self.orig_height {
                    (p.y - center.y).abs() / (self.orig_height - center.y)
                } else {
                    1.0
                };
                scale.max(x_ratio).max(y_ratio)
            })
    }

    /// Compute the normalized crop box for the destination sidecar.
    ///
    /// The returned box is in the sensor frame; see
    /// [`CrsCrop::oriented`] for orientation relabeling.
    pub fn crop_factors(&self) -> CrsCrop {
        let center = self.center();
        let (top_left, bottom_right) = self.rotated_corners();
        let scale = self.scale_factor();

        let top_left = top_left.scale_toward(center, scale);
        let bottom_right = bottom_right.scale_toward(center, scale);

        let crop = CrsCrop::new(
            top_left.x / self.orig_width,
            1.0 - top_left.y / self.orig_height,
            bottom_right.x / self.orig_width,
            1.0 - bottom_right.y / self.orig_height,
            self.rotation_degrees,
        );

        debug!(
            rotation = self.rotation_degrees,
            scale,
            left = crop.left,
            top = crop.top,
            right = crop.right,
            bottom = crop.bottom,
            "computed crop factors"
        );
        debug_assert!(
            crop.edges()
                .iter()
                .all(|v| (-RANGE_TOLERANCE..=1.0 + RANGE_TOLERANCE).contains(v)),
            "crop box left the unit square: {crop:?}"
        );

        crop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-10;

    fn rect(origin: (f64, f64), size: (f64, f64), rotation: f64, image: (u32, u32)) -> CropRect {
        CropRect::new(
            Point::new(origin.0, origin.1),
            size,
            rotation,
            ImageSize::new(image.0, image.1),
        )
        .unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_center() {
        let r = rect((50.0, 50.0), (100.0, 80.0), 0.0, (200, 160));
        assert_eq!(r.center(), Point::new(100.0, 90.0));
    }

    #[test]
    fn test_centered_crop_no_rotation() {
        let crop = rect((25.0, 25.0), (50.0, 50.0), 0.0, (100, 100)).crop_factors();

        assert_close(crop.left, 0.25);
        assert_close(crop.top, 0.25);
        assert_close(crop.right, 0.75);
        assert_close(crop.bottom, 0.75);
        assert_eq!(crop.angle, 0.0);
        assert!(crop.has_crop);
        assert_eq!(crop.constrain_to_warp, 0);
        assert_eq!(crop.constrain_to_unit_square, 1);
    }

    #[test]
    fn test_zero_rotation_round_trip_with_y_flip() {
        let r = rect((50.0, 50.0), (100.0, 80.0), 0.0, (200, 160));
        assert_eq!(r.scale_factor(), 1.0);

        let crop = r.crop_factors();
        assert_close(crop.left, 50.0 / 200.0);
        assert_close(crop.right, 150.0 / 200.0);
        // top edge sits at y = 130 in the bottom-left frame
        assert_close(crop.top, 1.0 - 130.0 / 160.0);
        assert_close(crop.bottom, 1.0 - 50.0 / 160.0);
        assert!(crop.left < crop.right);
        assert!(crop.top < crop.bottom);
    }

    #[test]
    fn test_rotated_corners_no_rotation() {
        let r = rect((50.0, 50.0), (100.0, 80.0), 0.0, (200, 160));
        let (tl, br) = r.rotated_corners();
        assert_close(tl.x, 50.0);
        assert_close(tl.y, 130.0);
        assert_close(br.x, 150.0);
        assert_close(br.y, 50.0);
    }

    #[test]
    fn test_quarter_turn_literal_corners() {
        // -90 in the source convention is +90 internally
        let r = rect((0.0, 0.0), (10.0, 10.0), -90.0, (10, 10));
        assert_eq!(r.center(), Point::new(5.0, 5.0));

        // (0, 10): offset (-5, 5) -> (-5*0 - 5*1, -5*1 + 5*0) = (-5, -5)
        // (10, 0): offset (5, -5) -> (5*0 + 5*1, 5*1 - 5*0) = (5, 5)
        let (tl, br) = r.rotated_corners();
        assert_close(tl.x, 0.0);
        assert_close(tl.y, 0.0);
        assert_close(br.x, 10.0);
        assert_close(br.y, 10.0);

        // all corners touch the edges, so nothing shrinks
        assert_close(r.scale_factor(), 1.0);

        let crop = r.crop_factors();
        assert_close(crop.left, 0.0);
        assert_close(crop.top, 1.0);
        assert_close(crop.right, 1.0);
        assert_close(crop.bottom, 0.0);
        assert_eq!(crop.angle, -90.0);
    }

    #[test]
    fn test_sentinel_resolves_to_full_frame() {
        let sentinel = rect((0.0, 0.0), (0.0, 0.0), -0.895569, (6960, 4640));
        let explicit = rect((0.0, 0.0), (6960.0, 4640.0), -0.895569, (6960, 4640));

        assert_eq!(sentinel.size(), (6960.0, 4640.0));
        assert_eq!(sentinel, explicit);
        assert_eq!(sentinel.crop_factors(), explicit.crop_factors());
    }

    #[test]
    fn test_full_frame_straighten_shrinks_inside_image() {
        let r = rect((0.0, 0.0), (0.0, 0.0), 3.0, (6960, 4640));
        assert!(r.scale_factor() > 1.0);

        let crop = r.crop_factors();
        for edge in crop.edges() {
            assert!((-1e-9..=1.0 + 1e-9).contains(&edge), "edge {edge} out of range");
        }
        assert!(crop.left < crop.right);
        assert!(crop.top < crop.bottom);
        assert_eq!(crop.angle, 3.0);
    }

    #[test]
    fn test_overflow_by_ten_percent_scales_to_edge() {
        // right edge at x = 110 on a 100 px wide image
        let r = rect((10.0, 25.0), (100.0, 50.0), 0.0, (100, 100));
        let scale = r.scale_factor();
        assert!(scale >= 1.1, "scale {scale}");
        assert_close(scale, 50.0 / 40.0);

        let crop = r.crop_factors();
        assert!(crop.right <= 1.0 + 1e-9);
        assert!((crop.right - 1.0).abs() < 1e-9);
        assert_close(crop.left, 0.2);
    }

    #[test]
    fn test_exact_edge_touch_does_not_shrink() {
        let r = rect((0.0, 0.0), (100.0, 100.0), 0.0, (100, 100));
        assert_eq!(r.scale_factor(), 1.0);
        assert_eq!(r.crop_factors().edges(), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rotation_sign_is_negated() {
        let r = rect((50.0, 50.0), (100.0, 80.0), 10.0, (200, 160));
        let (tl, _) = r.rotated_corners();
        let center = r.center();
        // a positive source angle turns clockwise in the y-up frame,
        // lifting the top-left corner's x toward the center
        let expected = Point::new(50.0, 130.0).rotate(center, (-10.0f64).to_radians());
        assert_close(tl.x, expected.x);
        assert_close(tl.y, expected.y);
        assert!(tl.x > 50.0);
    }

    #[test]
    fn test_crop_factors_idempotent() {
        let r = rect((50.0, 50.0), (100.0, 80.0), 45.0, (200, 160));
        assert_eq!(r.crop_factors(), r.crop_factors());
    }

    #[test]
    fn test_various_rotations_stay_in_unit_square() {
        let r0 = rect((50.0, 50.0), (100.0, 80.0), 0.0, (200, 160));
        for rotation in [0.0, 15.0, 30.0, 45.0, 60.0, 90.0, 180.0, 270.0, -30.0] {
            let r = CropRect::new(r0.origin(), r0.size(), rotation, ImageSize::new(200, 160))
                .unwrap();
            let crop = r.crop_factors();
            for edge in crop.edges() {
                assert!(
                    (-1e-9..=1.0 + 1e-9).contains(&edge),
                    "rotation {rotation}: edge {edge} out of range"
                );
            }
            assert!((crop.right - crop.left).abs() > 0.0);
            assert!((crop.bottom - crop.top).abs() > 0.0);
            assert_eq!(crop.angle, rotation);
        }
    }

    // ===================== Validation =====================

    #[test]
    fn test_rejects_empty_image() {
        let err = CropRect::new(Point::default(), (10.0, 10.0), 0.0, ImageSize::new(0, 100))
            .unwrap_err();
        assert!(matches!(err, CropError::MalformedInput(_)));
    }

    #[test]
    fn test_rejects_non_positive_size() {
        for size in [(0.0, 10.0), (10.0, 0.0), (-5.0, 10.0), (10.0, -1.0)] {
            let err = CropRect::new(Point::new(1.0, 1.0), size, 0.0, ImageSize::new(100, 100))
                .unwrap_err();
            assert!(
                matches!(err, CropError::MalformedInput(_)),
                "size {size:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_rejects_zero_size_away_from_origin() {
        let err = CropRect::new(Point::new(10.0, 20.0), (0.0, 0.0), 0.0, ImageSize::new(100, 100))
            .unwrap_err();
        assert!(matches!(err, CropError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let image = ImageSize::new(100, 100);
        assert!(CropRect::new(Point::new(f64::NAN, 0.0), (10.0, 10.0), 0.0, image).is_err());
        assert!(CropRect::new(Point::default(), (f64::INFINITY, 10.0), 0.0, image).is_err());
        assert!(CropRect::new(Point::new(10.0, 10.0), (10.0, 10.0), f64::NAN, image).is_err());
    }

    #[test]
    fn test_rejects_center_on_image_edge() {
        // center at x = 0 would divide by zero in the scale solver
        let err = CropRect::new(Point::new(-5.0, 10.0), (10.0, 10.0), 5.0, ImageSize::new(100, 100))
            .unwrap_err();
        assert!(matches!(err, CropError::MalformedInput(_)));

        let err = CropRect::new(Point::new(10.0, 95.0), (10.0, 10.0), 5.0, ImageSize::new(100, 100))
            .unwrap_err();
        assert!(matches!(err, CropError::MalformedInput(_)));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
