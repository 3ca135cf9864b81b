use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A three component vector. For cells and chunks `z` is the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vector3<T> {
    /// East/west component.
    pub x: T,
    /// North/south component.
    pub y: T,
    /// Vertical component.
    pub z: T,
}

impl<T> Vector3<T> {
    /// Creates a new vector.
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }
}

impl Vector3<i32> {
    /// Converts every component to `f64`.
    #[must_use]
    pub fn as_f64(self) -> Vector3<f64> {
        Vector3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }
}

impl Vector3<f64> {
    /// Squared euclidean length.
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length_squared().sqrt()
    }

    /// Length of the horizontal (`x`, `y`) part only.
    #[must_use]
    pub fn horizontal_length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Whether every component is a finite number.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl<T: Add<Output = T>> Add for Vector3<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl<T: Sub<Output = T>> Sub for Vector3<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl<T: Mul<Output = T> + Copy> Mul<T> for Vector3<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Vector3::new(1.0, 2.0, 2.0);
        assert!((a.distance(Vector3::default()) - 3.0).abs() < 1e-12);
        assert!((Vector3::new(3.0, 4.0, 100.0).horizontal_length() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_ops() {
        let a = Vector3::new(1, 2, 3);
        let b = Vector3::new(4, 5, 6);
        assert_eq!(a + b, Vector3::new(5, 7, 9));
        assert_eq!(b - a, Vector3::new(3, 3, 3));
        assert_eq!(a * 2, Vector3::new(2, 4, 6));
    }
}
