//! Pixel <-> meter conversion.
//!
//! Every quantity crossing the scene/kernel boundary passes through exactly
//! one of these four functions. The scene is y-down, the kernel y-up; the
//! inverted variants are used for positions, anchors and gravity.

use hinge_core::Vec2;

/// Scene pixels per kernel meter.
pub const PIXELS_PER_METER: f32 = 20.0;

/// Pixels to meters.
#[inline]
#[must_use]
pub fn to_kernel(px: f32) -> f32 {
    px * (1.0 / PIXELS_PER_METER)
}

/// Meters to pixels.
#[inline]
#[must_use]
pub fn to_scene(m: f32) -> f32 {
    m * PIXELS_PER_METER
}

/// Pixels to meters, sign-inverted.
#[inline]
#[must_use]
pub fn to_kernel_inverted(px: f32) -> f32 {
    -to_kernel(px)
}

/// Meters to pixels, sign-inverted.
#[inline]
#[must_use]
pub fn to_scene_inverted(m: f32) -> f32 {
    -to_scene(m)
}

/// A scene point as a kernel position.
#[inline]
#[must_use]
pub fn point_to_kernel(x: f32, y: f32) -> Vec2 {
    Vec2::new(to_kernel_inverted(x), to_kernel_inverted(y))
}

/// A kernel position as a scene point.
#[inline]
#[must_use]
pub fn point_to_scene(p: Vec2) -> (f32, f32) {
    (to_scene_inverted(p.x), to_scene_inverted(p.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert!((to_kernel(20.0) - 1.0).abs() < f32::EPSILON);
        assert!((to_scene(1.5) - 30.0).abs() < f32::EPSILON);
        assert!((to_kernel_inverted(40.0) + 2.0).abs() < f32::EPSILON);
        assert!((to_scene_inverted(-2.0) - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_round_trip() {
        for &p in &[0.0_f32, 1.0, -1.0, 0.25, 123.456, -9876.5, 1.0e6] {
            let tol = p.abs().max(1.0) * 1e-6;
            assert!((to_scene(to_kernel(p)) - p).abs() <= tol, "linear {p}");
            assert!((to_scene_inverted(to_kernel_inverted(p)) - p).abs() <= tol, "inverted {p}");
        }
    }

    #[test]
    fn test_points_flip_both_axes() {
        let k = point_to_kernel(400.0, 300.0);
        assert_eq!(k, Vec2::new(-20.0, -15.0));
        let (x, y) = point_to_scene(k);
        assert!((x - 400.0).abs() < 1e-3 && (y - 300.0).abs() < 1e-3);
    }
}
