//! Small numeric helpers used throughout the shaping pipeline.

/// Linearly remap `value` from `[a1, b1]` onto `[a2, b2]`.
///
/// The result is not clamped; callers clamp when the input may leave the
/// source range.
pub fn map_range(value: f32, a1: f32, b1: f32, a2: f32, b2: f32) -> f32 {
    if (b1 - a1).abs() < f32::EPSILON {
        return a2;
    }
    a2 + (value - a1) * (b2 - a2) / (b1 - a1)
}

/// Sign of `value` as `-1.0`, `0.0` or `1.0`.
pub fn sgn(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Returns true when `value` is within `tolerance` of `target`.
pub fn near(value: f32, target: f32, tolerance: f32) -> bool {
    (value - target).abs() <= tolerance
}

pub fn deg2rad(deg: f32) -> f32 {
    deg * std::f32::consts::PI / 180.0
}

pub fn rad2deg(rad: f32) -> f32 {
    rad * 180.0 / std::f32::consts::PI
}

/// A 3-component vector in host entity space (x right, y forward, z up).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn distance(self, other: Vec3) -> f32 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z).length()
    }

    /// Signed angle between two vectors in the ground plane, radians.
    pub fn angle_between(self, other: Vec3) -> f32 {
        let denom = self.length() * other.length();
        if denom < f32::EPSILON {
            return 0.0;
        }
        let angle = (self.dot(other) / denom).clamp(-1.0, 1.0).acos();
        // Cross product z gives the turning direction.
        let cross_z = self.x * other.y - self.y * other.x;
        if cross_z < 0.0 { -angle } else { angle }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn map_range_endpoints() {
        assert_eq!(map_range(0.0, 0.0, 1.0, 1.0, 0.6), 1.0);
        assert_eq!(map_range(1.0, 0.0, 1.0, 1.0, 0.6), 0.6);
        assert_eq!(map_range(0.5, 0.0, 1.0, 0.0, 2.0), 1.0);
    }

    #[test]
    fn map_range_degenerate_source_is_constant() {
        assert_eq!(map_range(0.7, 0.5, 0.5, 0.0, 1.0), 0.0);
    }

    #[test]
    fn sgn_basic() {
        assert_eq!(sgn(3.2), 1.0);
        assert_eq!(sgn(-0.01), -1.0);
        assert_eq!(sgn(0.0), 0.0);
    }

    #[test]
    fn angle_between_perpendicular() {
        let fwd = Vec3::new(0.0, 1.0, 0.0);
        let right = Vec3::new(1.0, 0.0, 0.0);
        let angle = fwd.angle_between(right);
        assert!((angle.abs() - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_map_range_is_monotonic(
            a in -100.0f32..100.0,
            b in -100.0f32..100.0,
        ) {
            prop_assume!((b - 0.0).abs() > 1e-3);
            let lo = map_range(a.min(b), 0.0, b.abs().max(1.0), 0.0, 1.0);
            let hi = map_range(a.max(b), 0.0, b.abs().max(1.0), 0.0, 1.0);
            prop_assert!(lo <= hi + 1e-5);
        }

        #[test]
        fn prop_near_symmetric(v in -10.0f32..10.0, t in -10.0f32..10.0, tol in 0.0f32..5.0) {
            prop_assert_eq!(near(v, t, tol), near(t, v, tol));
        }
    }
}
