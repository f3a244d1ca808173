//! Vector Helper
//!
//! Pure 3D vector and angle math used by the shape services. Works on the
//! plain `[f64; 3]` shapes that cross the facade boundary and never touches
//! kernel resources.

use glam::DVec3;

use crate::inputs::{Point3, Vector3};

/// Stateless vector/angle helper
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VectorHelper;

impl VectorHelper {
    /// Create a new helper
    pub fn new() -> Self {
        Self
    }

    /// Convert degrees to radians
    pub fn deg_to_rad(&self, degrees: f64) -> f64 {
        degrees.to_radians()
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(&self, radians: f64) -> f64 {
        radians.to_degrees()
    }

    /// Normalize a vector, or `None` when it has no usable length
    pub fn normalized(&self, v: Vector3) -> Option<Vector3> {
        DVec3::from_array(v)
            .try_normalize()
            .map(|n| n.to_array())
    }

    /// Length of a vector
    pub fn length(&self, v: Vector3) -> f64 {
        DVec3::from_array(v).length()
    }

    /// Distance between two points
    pub fn distance(&self, a: Point3, b: Point3) -> f64 {
        DVec3::from_array(a).distance(DVec3::from_array(b))
    }

    pub fn add(&self, a: Vector3, b: Vector3) -> Vector3 {
        (DVec3::from_array(a) + DVec3::from_array(b)).to_array()
    }

    pub fn sub(&self, a: Vector3, b: Vector3) -> Vector3 {
        (DVec3::from_array(a) - DVec3::from_array(b)).to_array()
    }

    pub fn scale(&self, v: Vector3, factor: f64) -> Vector3 {
        (DVec3::from_array(v) * factor).to_array()
    }

    pub fn dot(&self, a: Vector3, b: Vector3) -> f64 {
        DVec3::from_array(a).dot(DVec3::from_array(b))
    }

    pub fn cross(&self, a: Vector3, b: Vector3) -> Vector3 {
        DVec3::from_array(a).cross(DVec3::from_array(b)).to_array()
    }

    /// Angle between two vectors in degrees
    pub fn angle_between_deg(&self, a: Vector3, b: Vector3) -> f64 {
        self.rad_to_deg(DVec3::from_array(a).angle_between(DVec3::from_array(b)))
    }

    /// Whether every coordinate is a finite number
    pub fn is_finite(&self, v: Vector3) -> bool {
        v.iter().all(|c| c.is_finite())
    }

    /// Whether two points coincide within a tolerance
    pub fn points_equal(&self, a: Point3, b: Point3, tolerance: f64) -> bool {
        self.distance(a, b) <= tolerance
    }

    /// Remove consecutive duplicates from a point list
    pub fn remove_consecutive_duplicates(&self, points: &[Point3], tolerance: f64) -> Vec<Point3> {
        let mut result: Vec<Point3> = Vec::with_capacity(points.len());
        for p in points {
            if result
                .last()
                .is_none_or(|last| !self.points_equal(*last, *p, tolerance))
            {
                result.push(*p);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_angle_conversion() {
        let vh = VectorHelper::new();
        assert_relative_eq!(vh.deg_to_rad(180.0), std::f64::consts::PI);
        assert_relative_eq!(vh.rad_to_deg(std::f64::consts::FRAC_PI_2), 90.0);
    }

    #[test]
    fn test_normalized_rejects_zero_vector() {
        let vh = VectorHelper::new();
        assert!(vh.normalized([0.0, 0.0, 0.0]).is_none());

        let n = vh.normalized([0.0, 3.0, 4.0]).unwrap();
        assert_relative_eq!(n[1], 0.6);
        assert_relative_eq!(n[2], 0.8);
    }

    #[test]
    fn test_angle_between_in_degrees() {
        let vh = VectorHelper::new();
        assert_relative_eq!(vh.angle_between_deg([0.0, 0.0, 1.0], [1.0, 0.0, 0.0]), 90.0);
    }

    #[test]
    fn test_is_finite() {
        let vh = VectorHelper::new();
        assert!(vh.is_finite([1.0, -2.0, 0.0]));
        assert!(!vh.is_finite([f64::NAN, 0.0, 0.0]));
        assert!(!vh.is_finite([0.0, f64::INFINITY, 0.0]));
    }

    #[test]
    fn test_remove_consecutive_duplicates() {
        let vh = VectorHelper::new();
        let points = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1e-9]];
        let cleaned = vh.remove_consecutive_duplicates(&points, 1e-7);
        assert_eq!(cleaned.len(), 2);
    }
}
