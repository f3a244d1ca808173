//! Analytic geometry of the reference kernel
//!
//! Frames, bounded curves (lines, circles, ellipses), planes and ruled
//! surfaces, plus the arc constructions behind the arc-of-circle makers.

use std::f64::consts::{PI, TAU};
use std::ops::{Add, Mul};

use glam::{DAffine3, DVec2, DVec3};

use crate::kernel::traits::{KernelError, KernelResult};

/// Composite Simpson rule over `[a, b]` with `n` intervals (rounded up to even)
pub(crate) fn simpson<T>(a: f64, b: f64, n: usize, f: impl Fn(f64) -> T) -> T
where
    T: Copy + Default + Add<Output = T> + Mul<f64, Output = T>,
{
    let n = (n.max(2) + 1) & !1;
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum = sum + f(a + h * i as f64) * weight;
    }
    sum * (h / 3.0)
}

/// Right-handed orthonormal frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Frame {
    pub origin: DVec3,
    pub x: DVec3,
    pub y: DVec3,
    pub z: DVec3,
}

impl Frame {
    /// Frame around a main direction. The X direction is picked from the
    /// smallest component of `z`, so `+Z` yields `X = +X`.
    pub fn from_normal(origin: DVec3, z: DVec3) -> Self {
        let z = z.normalize();
        let (a, b, c) = (z.x, z.y, z.z);
        let (aa, ba, ca) = (a.abs(), b.abs(), c.abs());
        let seed = if ba <= aa && ba <= ca {
            if aa > ca {
                DVec3::new(-c, 0.0, a)
            } else {
                DVec3::new(c, 0.0, -a)
            }
        } else if aa <= ba && aa <= ca {
            if ba > ca {
                DVec3::new(0.0, -c, b)
            } else {
                DVec3::new(0.0, c, -b)
            }
        } else if aa > ba {
            DVec3::new(-b, a, 0.0)
        } else {
            DVec3::new(b, -a, 0.0)
        };
        let x = seed.normalize();
        Self {
            origin,
            x,
            y: z.cross(x),
            z,
        }
    }

    /// Frame with a given X direction (projected perpendicular to `z`)
    pub fn from_normal_and_x(origin: DVec3, z: DVec3, x: DVec3) -> Option<Self> {
        let z = z.try_normalize()?;
        let x = (x - z * x.dot(z)).try_normalize()?;
        Some(Self {
            origin,
            x,
            y: z.cross(x),
            z,
        })
    }

    /// Same origin and X, opposite Y and Z
    pub fn flipped(&self) -> Self {
        Self {
            origin: self.origin,
            x: self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    pub fn to_local(&self, p: DVec3) -> DVec3 {
        let d = p - self.origin;
        DVec3::new(d.dot(self.x), d.dot(self.y), d.dot(self.z))
    }

    pub fn from_local(&self, u: f64, v: f64) -> DVec3 {
        self.origin + self.x * u + self.y * v
    }

    /// Polar angle of a point's projection, in `[0, 2π)`
    pub fn angle_of(&self, p: DVec3) -> f64 {
        let local = self.to_local(p);
        local.y.atan2(local.x).rem_euclid(TAU)
    }

    /// Transformed frame and the length scale applied to it
    pub fn transformed(&self, t: &DAffine3) -> (Self, f64) {
        let x = t.transform_vector3(self.x);
        let y = t.transform_vector3(self.y);
        let scale = x.length();
        let x = x / scale;
        let y = y.normalize();
        (
            Self {
                origin: t.transform_point3(self.origin),
                x,
                y,
                z: x.cross(y),
            },
            scale,
        )
    }
}

/// Unbounded analytic curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Curve {
    /// Parameter is the distance from `origin`
    Line { origin: DVec3, dir: DVec3 },
    /// Parameter is the angle from the frame's X axis
    Circle { frame: Frame, radius: f64 },
    /// Major radius along X
    Ellipse { frame: Frame, major: f64, minor: f64 },
}

impl Curve {
    pub fn value(&self, u: f64) -> DVec3 {
        match self {
            Curve::Line { origin, dir } => *origin + *dir * u,
            Curve::Circle { frame, radius } => {
                frame.origin + (frame.x * u.cos() + frame.y * u.sin()) * *radius
            }
            Curve::Ellipse {
                frame,
                major,
                minor,
            } => frame.origin + frame.x * (major * u.cos()) + frame.y * (minor * u.sin()),
        }
    }

    pub fn d1(&self, u: f64) -> DVec3 {
        match self {
            Curve::Line { dir, .. } => *dir,
            Curve::Circle { frame, radius } => {
                (frame.y * u.cos() - frame.x * u.sin()) * *radius
            }
            Curve::Ellipse {
                frame,
                major,
                minor,
            } => frame.y * (minor * u.cos()) - frame.x * (major * u.sin()),
        }
    }
}

/// Curve restricted to a parameter range, `first < last`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BoundedCurve {
    pub curve: Curve,
    pub first: f64,
    pub last: f64,
}

impl BoundedCurve {
    pub fn segment(start: DVec3, end: DVec3, tolerance: f64) -> KernelResult<Self> {
        let delta = end - start;
        let length = delta.length();
        if length <= tolerance {
            return Err(KernelError::Degenerate(
                "segment end points coincide".into(),
            ));
        }
        Ok(Self {
            curve: Curve::Line {
                origin: start,
                dir: delta / length,
            },
            first: 0.0,
            last: length,
        })
    }

    pub fn full_circle(frame: Frame, radius: f64) -> Self {
        Self {
            curve: Curve::Circle { frame, radius },
            first: 0.0,
            last: TAU,
        }
    }

    pub fn full_ellipse(frame: Frame, major: f64, minor: f64) -> Self {
        Self {
            curve: Curve::Ellipse {
                frame,
                major,
                minor,
            },
            first: 0.0,
            last: TAU,
        }
    }

    pub fn value(&self, u: f64) -> DVec3 {
        self.curve.value(u)
    }

    pub fn d1(&self, u: f64) -> DVec3 {
        self.curve.d1(u)
    }

    pub fn start(&self) -> DVec3 {
        self.value(self.first)
    }

    pub fn end(&self) -> DVec3 {
        self.value(self.last)
    }

    /// Point at a normalized position `s` in `[0, 1]`
    pub fn at(&self, s: f64) -> DVec3 {
        self.value(self.first + s * (self.last - self.first))
    }

    /// Derivative with respect to the normalized position
    pub fn d1_at(&self, s: f64) -> DVec3 {
        self.d1(self.first + s * (self.last - self.first)) * (self.last - self.first)
    }

    pub fn is_line(&self) -> bool {
        matches!(self.curve, Curve::Line { .. })
    }

    /// Signed arc length between two parameters
    pub fn length_between(&self, u1: f64, u2: f64, intervals: usize) -> f64 {
        match self.curve {
            Curve::Line { .. } => u2 - u1,
            Curve::Circle { radius, .. } => radius * (u2 - u1),
            Curve::Ellipse { .. } => simpson(u1, u2, intervals, |u| self.d1(u).length()),
        }
    }

    pub fn length(&self, intervals: usize) -> f64 {
        self.length_between(self.first, self.last, intervals)
    }

    /// Parameter reached after a signed arc length from `from`
    pub fn parameter_at_length(&self, from: f64, length: f64, intervals: usize) -> f64 {
        match self.curve {
            Curve::Line { .. } => from + length,
            Curve::Circle { radius, .. } => from + length / radius,
            Curve::Ellipse { minor, .. } => {
                // speed never drops below the minor radius
                let (mut lo, mut hi) = if length >= 0.0 {
                    (from, from + length / minor)
                } else {
                    (from + length / minor, from)
                };
                for _ in 0..80 {
                    let mid = 0.5 * (lo + hi);
                    if self.length_between(from, mid, intervals) < length {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                0.5 * (lo + hi)
            }
        }
    }

    /// Center of mass of the curve treated as a uniform wire
    pub fn centroid(&self, intervals: usize) -> DVec3 {
        match self.curve {
            Curve::Line { .. } => self.at(0.5),
            _ => {
                let length = self.length(intervals);
                simpson(self.first, self.last, intervals, |u| {
                    self.value(u) * self.d1(u).length()
                }) / length
            }
        }
    }

    /// Same point set traversed the other way, still with `first < last`
    pub fn reversed(&self) -> Self {
        match self.curve {
            Curve::Line { origin, dir } => Self {
                curve: Curve::Line {
                    origin: origin + dir * (self.first + self.last),
                    dir: -dir,
                },
                first: self.first,
                last: self.last,
            },
            Curve::Circle { frame, radius } => Self {
                curve: Curve::Circle {
                    frame: frame.flipped(),
                    radius,
                },
                first: -self.last,
                last: -self.first,
            },
            Curve::Ellipse {
                frame,
                major,
                minor,
            } => Self {
                curve: Curve::Ellipse {
                    frame: frame.flipped(),
                    major,
                    minor,
                },
                first: -self.last,
                last: -self.first,
            },
        }
    }

    pub fn transformed(&self, t: &DAffine3) -> Self {
        match self.curve {
            Curve::Line { origin, dir } => {
                let mapped = t.transform_vector3(dir);
                let scale = mapped.length();
                Self {
                    curve: Curve::Line {
                        origin: t.transform_point3(origin),
                        dir: mapped / scale,
                    },
                    first: self.first * scale,
                    last: self.last * scale,
                }
            }
            Curve::Circle { frame, radius } => {
                let (frame, scale) = frame.transformed(t);
                Self {
                    curve: Curve::Circle {
                        frame,
                        radius: radius * scale,
                    },
                    ..*self
                }
            }
            Curve::Ellipse {
                frame,
                major,
                minor,
            } => {
                let (frame, scale) = frame.transformed(t);
                Self {
                    curve: Curve::Ellipse {
                        frame,
                        major: major * scale,
                        minor: minor * scale,
                    },
                    ..*self
                }
            }
        }
    }

    pub fn translated(&self, v: DVec3) -> Self {
        self.transformed(&DAffine3::from_translation(v))
    }

    /// Sample points including both ends
    pub fn samples(&self, count: usize) -> Vec<DVec3> {
        let count = count.max(1);
        (0..=count)
            .map(|i| self.at(i as f64 / count as f64))
            .collect()
    }
}

/// Bounded curve in the `(u, v)` parameter plane of a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Curve2d {
    /// Parameter is the distance from `origin` along the unit `dir`
    Segment {
        origin: DVec2,
        dir: DVec2,
        length: f64,
    },
    /// Full circle, parameter is the angle from the `u` axis
    Circle { center: DVec2, radius: f64 },
}

impl Curve2d {
    pub fn segment(start: DVec2, end: DVec2, tolerance: f64) -> KernelResult<Self> {
        let delta = end - start;
        let length = delta.length();
        if !(length > tolerance) {
            return Err(KernelError::Degenerate(
                "2D segment end points coincide".into(),
            ));
        }
        Ok(Curve2d::Segment {
            origin: start,
            dir: delta / length,
            length,
        })
    }

    pub fn circle(center: DVec2, radius: f64) -> KernelResult<Self> {
        if !(radius > 0.0) {
            return Err(KernelError::Degenerate(
                "2D circle radius must be positive".into(),
            ));
        }
        Ok(Curve2d::Circle { center, radius })
    }

    /// Curve traced on a surface. Planes map `u` and `v` onto their X and Y
    /// axes; ruled surfaces have no analytic image.
    pub fn on_surface(&self, surface: &Surface) -> KernelResult<BoundedCurve> {
        let Surface::Plane(plane) = surface else {
            return Err(KernelError::NotSupported(
                "2D curves on ruled surfaces".into(),
            ));
        };
        Ok(match *self {
            Curve2d::Segment {
                origin,
                dir,
                length,
            } => BoundedCurve {
                curve: Curve::Line {
                    origin: plane.from_local(origin.x, origin.y),
                    dir: plane.x * dir.x + plane.y * dir.y,
                },
                first: 0.0,
                last: length,
            },
            Curve2d::Circle { center, radius } => BoundedCurve::full_circle(
                Frame {
                    origin: plane.from_local(center.x, center.y),
                    ..*plane
                },
                radius,
            ),
        })
    }
}

/// Circle used by the arc constructions
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Circle {
    pub frame: Frame,
    pub radius: f64,
}

impl Circle {
    /// Arc between two absolute parameters. With `sense == false` the arc
    /// runs clockwise around the circle normal.
    pub fn arc_between(&self, alpha1: f64, alpha2: f64, sense: bool) -> KernelResult<BoundedCurve> {
        let (frame, a1, a2) = if sense {
            (self.frame, alpha1, alpha2)
        } else {
            (self.frame.flipped(), -alpha1, -alpha2)
        };
        let first = a1;
        let mut span = (a2 - a1).rem_euclid(TAU);
        if span < 1e-12 {
            if (a2 - a1).abs() < 1e-12 {
                return Err(KernelError::Degenerate("arc has zero length".into()));
            }
            span = TAU;
        }
        Ok(BoundedCurve {
            curve: Curve::Circle {
                frame,
                radius: self.radius,
            },
            first,
            last: first + span,
        })
    }
}

/// Arc from `p1` through `p2` to `p3`
pub(crate) fn arc_through_three_points(
    p1: DVec3,
    p2: DVec3,
    p3: DVec3,
    tolerance: f64,
) -> KernelResult<BoundedCurve> {
    let a = p2 - p1;
    let b = p3 - p1;
    let n = a.cross(b);
    if n.length() <= tolerance * (a.length() + b.length()) {
        return Err(KernelError::Degenerate("arc points are collinear".into()));
    }
    let center = p1 + (b * a.length_squared() - a * b.length_squared()).cross(n) / (2.0 * n.length_squared());
    let radius = (p1 - center).length();
    let frame = Frame::from_normal_and_x(center, n, p1 - center)
        .ok_or_else(|| KernelError::Degenerate("arc points are collinear".into()))?;
    Ok(BoundedCurve {
        curve: Curve::Circle { frame, radius },
        first: 0.0,
        last: frame.angle_of(p3),
    })
}

/// Arc from `p1` to `p2`, tangent to `tangent` at `p1`
pub(crate) fn arc_through_two_points_and_tangent(
    p1: DVec3,
    tangent: DVec3,
    p2: DVec3,
    tolerance: f64,
) -> KernelResult<BoundedCurve> {
    let d = p2 - p1;
    let n = tangent.cross(d);
    if d.length() <= tolerance || n.length() <= tolerance * d.length() * tangent.length() {
        return Err(KernelError::Degenerate(
            "tangent points straight at the end point".into(),
        ));
    }
    let w = n.cross(tangent).normalize();
    let radius = d.length_squared() / (2.0 * d.dot(w));
    let center = p1 + w * radius;
    let frame = Frame::from_normal_and_x(center, n, -w)
        .ok_or_else(|| KernelError::Degenerate("tangent arc has no plane".into()))?;
    let last = frame.angle_of(p2);
    Ok(BoundedCurve {
        curve: Curve::Circle { frame, radius },
        first: 0.0,
        last: if last <= 0.0 { TAU } else { last },
    })
}

/// Planar corner rounding between two line directions meeting at `corner`.
/// Returns the two tangent points and the arc joining them.
pub(crate) fn corner_fillet(
    corner: DVec3,
    towards_prev: DVec3,
    towards_next: DVec3,
    radius: f64,
) -> Option<(f64, BoundedCurve)> {
    let d1 = towards_prev.normalize();
    let d2 = towards_next.normalize();
    let theta = d1.angle_between(d2);
    if theta < 1e-9 || (PI - theta) < 1e-9 {
        return None;
    }
    let trim = radius / (theta / 2.0).tan();
    let t1 = corner + d1 * trim;
    let t2 = corner + d2 * trim;
    let center = corner + (d1 + d2).normalize() * (radius / (theta / 2.0).sin());
    let frame = Frame::from_normal_and_x(center, (t1 - center).cross(t2 - center), t1 - center)?;
    Some((
        trim,
        BoundedCurve {
            curve: Curve::Circle { frame, radius },
            first: 0.0,
            last: PI - theta,
        },
    ))
}

/// Surface of a face
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Surface {
    Plane(Frame),
    /// Straight rulings joining `a` and `b` at equal normalized positions
    Ruled { a: BoundedCurve, b: BoundedCurve },
}

impl Surface {
    pub fn transformed(&self, t: &DAffine3) -> Self {
        match self {
            Surface::Plane(frame) => Surface::Plane(frame.transformed(t).0),
            Surface::Ruled { a, b } => Surface::Ruled {
                a: a.transformed(t),
                b: b.transformed(t),
            },
        }
    }
}

/// Point and partial derivatives of a ruled surface at `(s, t)`
pub(crate) fn ruled_eval(a: &BoundedCurve, b: &BoundedCurve, s: f64, t: f64) -> (DVec3, DVec3, DVec3) {
    let pa = a.at(s);
    let pb = b.at(s);
    let point = pa * (1.0 - t) + pb * t;
    let ds = a.d1_at(s) * (1.0 - t) + b.d1_at(s) * t;
    let dt = pb - pa;
    (point, ds, dt)
}

/// Double Simpson integral over the unit square of a ruled surface
pub(crate) fn ruled_integral<T>(
    a: &BoundedCurve,
    b: &BoundedCurve,
    intervals: usize,
    f: impl Fn(DVec3, DVec3) -> T,
) -> T
where
    T: Copy + Default + Add<Output = T> + Mul<f64, Output = T>,
{
    simpson(0.0, 1.0, intervals, |s| {
        simpson(0.0, 1.0, intervals.min(16), |t| {
            let (p, ds, dt) = ruled_eval(a, b, s, t);
            f(p, ds.cross(dt))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frame_from_z_uses_x_axis() {
        let frame = Frame::from_normal(DVec3::ZERO, DVec3::Z);
        assert_relative_eq!(frame.x.x, 1.0);
        assert_relative_eq!(frame.y.y, 1.0);
    }

    #[test]
    fn test_frame_from_y_is_right_handed() {
        let frame = Frame::from_normal(DVec3::ZERO, DVec3::Y);
        assert_relative_eq!(frame.x.cross(frame.y).dot(frame.z), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_three_point_arc_passes_through_middle() {
        let arc = arc_through_three_points(
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.6, 0.8, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
            1e-7,
        )
        .unwrap();
        let Curve::Circle { frame, radius } = arc.curve else {
            panic!("expected a circle");
        };
        assert_relative_eq!(radius, 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.origin.length(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(arc.last, PI, epsilon = 1e-12);
        let mid_param = frame.angle_of(DVec3::new(0.6, 0.8, 0.0));
        assert!(mid_param > arc.first && mid_param < arc.last);
    }

    #[test]
    fn test_collinear_points_are_degenerate() {
        let err = arc_through_three_points(DVec3::ZERO, DVec3::X, DVec3::X * 2.0, 1e-7).unwrap_err();
        assert!(matches!(err, KernelError::Degenerate(_)));
    }

    #[test]
    fn test_tangent_arc_starts_along_tangent() {
        let arc = arc_through_two_points_and_tangent(
            DVec3::ZERO,
            DVec3::Y,
            DVec3::new(2.0, 0.0, 0.0),
            1e-7,
        )
        .unwrap();
        assert_relative_eq!(arc.start().distance(DVec3::ZERO), 0.0, epsilon = 1e-12);
        assert_relative_eq!(arc.end().distance(DVec3::new(2.0, 0.0, 0.0)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(arc.d1(arc.first).normalize().dot(DVec3::Y), 1.0, epsilon = 1e-12);
        assert_relative_eq!(arc.length(64), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_clockwise_arc_keeps_end_points() {
        let circle = Circle {
            frame: Frame::from_normal(DVec3::ZERO, DVec3::Z),
            radius: 2.0,
        };
        let arc = circle.arc_between(0.0, PI / 2.0, false).unwrap();
        assert_relative_eq!(arc.start().distance(DVec3::new(2.0, 0.0, 0.0)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(arc.end().distance(DVec3::new(0.0, 2.0, 0.0)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(arc.length(64), 3.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_reversed_curve_swaps_ends() {
        let arc = Circle {
            frame: Frame::from_normal(DVec3::ZERO, DVec3::Z),
            radius: 1.0,
        }
        .arc_between(0.0, 1.0, true)
        .unwrap();
        let reversed = arc.reversed();
        assert_relative_eq!(reversed.start().distance(arc.end()), 0.0, epsilon = 1e-12);
        assert_relative_eq!(reversed.end().distance(arc.start()), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ellipse_length_and_inverse() {
        let ellipse = BoundedCurve::full_ellipse(Frame::from_normal(DVec3::ZERO, DVec3::Z), 2.0, 2.0);
        assert_relative_eq!(ellipse.length(64), 4.0 * PI, epsilon = 1e-9);
        let u = ellipse.parameter_at_length(0.0, PI, 64);
        assert_relative_eq!(u, PI / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_curve2d_on_plane() {
        let plane = Surface::Plane(Frame::from_normal(DVec3::new(0.0, 0.0, 2.0), DVec3::Z));
        let segment = Curve2d::segment(DVec2::ZERO, DVec2::new(3.0, 4.0), 1e-7)
            .unwrap()
            .on_surface(&plane)
            .unwrap();
        assert_relative_eq!(segment.length(64), 5.0, epsilon = 1e-12);
        assert_relative_eq!(segment.end().distance(DVec3::new(3.0, 4.0, 2.0)), 0.0, epsilon = 1e-12);

        let circle = Curve2d::circle(DVec2::new(1.0, 0.0), 0.5)
            .unwrap()
            .on_surface(&plane)
            .unwrap();
        assert_relative_eq!(circle.start().distance(DVec3::new(1.5, 0.0, 2.0)), 0.0, epsilon = 1e-12);
        assert!(Curve2d::circle(DVec2::ZERO, 0.0).is_err());
    }

    #[test]
    fn test_corner_fillet_right_angle() {
        let (trim, arc) = corner_fillet(DVec3::ZERO, DVec3::X, DVec3::Y, 1.0).unwrap();
        assert_relative_eq!(trim, 1.0, epsilon = 1e-12);
        assert_relative_eq!(arc.start().distance(DVec3::X), 0.0, epsilon = 1e-12);
        assert_relative_eq!(arc.end().distance(DVec3::Y), 0.0, epsilon = 1e-12);
    }
}
