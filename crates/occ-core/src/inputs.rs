//! Construction and query DTOs
//!
//! Plain descriptions of what a caller wants built or measured. A DTO lives for
//! exactly one call. DTOs that refer to existing shapes are generic over the
//! shape parameter so the facade can take them by borrow (`&Edge`, `&Shape`)
//! without ever taking ownership of the caller's handles.

use serde::{Deserialize, Serialize};

/// A point in 3D space
pub type Point3 = [f64; 3];

/// A vector in 3D space
pub type Vector3 = [f64; 3];

/// A point in the `(u, v)` parameter plane of a surface
pub type Point2 = [f64; 2];

fn default_direction() -> Vector3 {
    [0.0, 1.0, 0.0]
}

fn default_true() -> bool {
    true
}

// ============== Shape references ==============

/// A list of shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapesDto<S> {
    pub shapes: Vec<S>,
}

/// A shape and the zero-based index of one of its sub-shapes.
///
/// A missing index means index 0, which cannot be told apart from an explicit
/// request for the first element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeIndexDto<S> {
    #[serde(default)]
    pub shape: Option<S>,
    #[serde(default)]
    pub index: Option<usize>,
}

impl<S> ShapeIndexDto<S> {
    pub fn new(shape: S, index: usize) -> Self {
        Self {
            shape: Some(shape),
            index: Some(index),
        }
    }

    /// Requested index, defaulting to 0
    pub fn index_or_default(&self) -> usize {
        self.index.unwrap_or(0)
    }
}

/// Data at a normalized parameter in `[0, 1]` along a curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataOnGeometryAtParamDto<S> {
    pub shape: S,
    pub param: f64,
}

/// Data at an absolute arc length from the start of a curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataOnGeometryAtLengthDto<S> {
    pub shape: S,
    pub length: f64,
}

/// Split a curve into a number of points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DivideDto<S> {
    pub shape: S,
    /// Number of points to produce (before start/end removal), at least 2
    pub nr_of_divisions: usize,
    #[serde(default)]
    pub remove_start_point: bool,
    #[serde(default)]
    pub remove_end_point: bool,
}

// ============== Edges ==============

/// Straight line between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineDto {
    pub start: Point3,
    pub end: Point3,
}

/// Arc through three points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcEdgeThreePointsDto {
    pub start: Point3,
    pub middle: Point3,
    pub end: Point3,
}

/// Arc from start to end, tangent to a vector at the start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcEdgeTwoPointsTangentDto {
    pub start: Point3,
    pub tangent_vec: Vector3,
    pub end: Point3,
}

/// Arc cut from an existing circular edge between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcEdgeCircleTwoPointsDto<S> {
    pub circle: S,
    pub start: Point3,
    pub end: Point3,
    #[serde(default = "default_true")]
    pub sense: bool,
}

/// Arc cut from an existing circular edge between two angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcEdgeCircleTwoAnglesDto<S> {
    pub circle: S,
    pub alpha_angle1: f64,
    pub alpha_angle2: f64,
    #[serde(default = "default_true")]
    pub sense: bool,
}

/// Arc cut from an existing circular edge, from a point to an angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcEdgeCirclePointAngleDto<S> {
    pub circle: S,
    pub point: Point3,
    pub alpha_angle: f64,
    #[serde(default = "default_true")]
    pub sense: bool,
}

/// Edge traced by a parameter-space curve on a surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveAndSurfaceDto<C, S> {
    pub curve: C,
    pub surface: S,
}

/// Straight segment in surface parameter space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment2dDto {
    pub start: Point2,
    pub end: Point2,
}

/// Full circle in surface parameter space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle2dDto {
    pub radius: f64,
    #[serde(default)]
    pub center: Point2,
}

/// Circle by center, plane normal and radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleDto {
    pub radius: f64,
    #[serde(default)]
    pub center: Point3,
    #[serde(default = "default_direction")]
    pub direction: Vector3,
}

impl Default for CircleDto {
    fn default() -> Self {
        Self {
            radius: 1.0,
            center: [0.0; 3],
            direction: default_direction(),
        }
    }
}

/// Ellipse by center, plane normal and radii
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseDto {
    pub radius_minor: f64,
    pub radius_major: f64,
    #[serde(default)]
    pub center: Point3,
    #[serde(default = "default_direction")]
    pub direction: Vector3,
}

impl Default for EllipseDto {
    fn default() -> Self {
        Self {
            radius_minor: 1.0,
            radius_major: 2.0,
            center: [0.0; 3],
            direction: default_direction(),
        }
    }
}

// ============== Wires and faces ==============

/// Open chain of straight segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineDto {
    pub points: Vec<Point3>,
}

/// Closed chain of straight segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonDto {
    pub points: Vec<Point3>,
}

/// Square lying in the plane through `center` with normal `direction`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquareDto {
    pub size: f64,
    #[serde(default)]
    pub center: Point3,
    #[serde(default = "default_direction")]
    pub direction: Vector3,
}

/// Rectangle lying in the plane through `center` with normal `direction`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangleDto {
    pub width: f64,
    pub length: f64,
    #[serde(default)]
    pub center: Point3,
    #[serde(default = "default_direction")]
    pub direction: Vector3,
}

/// Face bounded by a closed wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceFromWireDto<S> {
    pub shape: S,
    #[serde(default = "default_true")]
    pub planar_only: bool,
}

/// Face bounded by a closed wire on an explicit plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceFromWireOnPlaneDto<S> {
    pub shape: S,
    pub plane_origin: Point3,
    pub plane_normal: Vector3,
}

// ============== Shells and solids ==============

/// Faces to sew into a shell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SewDto<S> {
    pub shapes: Vec<S>,
    /// Sewing tolerance; the configured default applies when absent
    #[serde(default)]
    pub tolerance: Option<f64>,
}

/// Axis-aligned box centered on a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxDto {
    pub width: f64,
    pub length: f64,
    pub height: f64,
    #[serde(default)]
    pub center: Point3,
}

/// Axis-aligned cube centered on a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubeDto {
    pub size: f64,
    #[serde(default)]
    pub center: Point3,
}

// ============== Transforms ==============

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TranslateDto<S> {
    pub shape: S,
    pub translation: Vector3,
}

/// Rotation about an axis through the origin, angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotateDto<S> {
    pub shape: S,
    pub axis: Vector3,
    pub angle: f64,
}

/// Rotation about an axis through `center`, angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotateAroundCenterDto<S> {
    pub shape: S,
    pub axis: Vector3,
    pub angle: f64,
    pub center: Point3,
}

/// Uniform scale about the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleDto<S> {
    pub shape: S,
    pub factor: f64,
}

/// Uniform scale about `center`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleAroundCenterDto<S> {
    pub shape: S,
    pub factor: f64,
    pub center: Point3,
}

/// Mirror through the plane at `origin` with normal `direction`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MirrorDto<S> {
    pub shape: S,
    pub origin: Point3,
    pub direction: Vector3,
}

// ============== Booleans ==============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionDto<S> {
    pub shapes: Vec<S>,
    #[serde(default)]
    pub keep_edges: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferenceDto<S> {
    pub shape: S,
    pub shapes: Vec<S>,
    #[serde(default)]
    pub keep_edges: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionDto<S> {
    pub shapes: Vec<S>,
    #[serde(default)]
    pub keep_edges: bool,
}

// ============== Operations ==============

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrudeDto<S> {
    pub shape: S,
    pub direction: Vector3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrudeShapesDto<S> {
    pub shapes: Vec<S>,
    pub direction: Vector3,
}

/// Ruled loft through a list of wires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoftDto<S> {
    pub shapes: Vec<S>,
    #[serde(default)]
    pub make_solid: bool,
}

/// Extrude `profile` along `direction` and subtract the result from `shape`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutExtrusionDto<S> {
    pub shape: S,
    pub profile: S,
    pub direction: Vector3,
}

// ============== Fillets ==============

/// Round the corners of a planar wire or face.
///
/// `indexes` selects corners by vertex index along the outer wire; all corners
/// are rounded when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilletDto<S> {
    pub shape: S,
    pub radius: f64,
    #[serde(default)]
    pub indexes: Option<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilletShapesDto<S> {
    pub shapes: Vec<S>,
    pub radius: f64,
}

/// Round the corners of a planar profile and extrude it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundedPrismDto<S> {
    pub shape: S,
    pub radius: f64,
    pub direction: Vector3,
}
