//! Kernel trait definitions
//!
//! The typed foreign interface the facade talks to. Every constructor hands
//! back a [`NativeId`] naming a freshly allocated native object; the caller
//! owns it and must pass it to [`Kernel::release`] exactly once. The facade
//! never holds raw ids for long: they are wrapped into scoped owners in
//! `kernel::native` immediately after allocation.

use thiserror::Error;

/// Identifier of a kernel-native object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeId(pub u64);

/// Broad class of a native object, used for allocation accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeClass {
    /// Points, vectors, directions, axes, conics, transformations
    Primitive,
    /// Curves, 2D curves and surfaces
    Geometry,
    /// Algorithm objects (makers, builders, fusers)
    Algorithm,
    /// Curve adaptors, shape maps, property accumulators
    Query,
    /// Topological shape handles
    Shape,
}

/// Error type for kernel operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("Unknown native object: {0:?}")]
    UnknownObject(NativeId),

    #[error("Native object {id:?} is not a {expected}")]
    WrongClass { id: NativeId, expected: &'static str },

    #[error("Algorithm did not complete: {0}")]
    NotDone(String),

    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Topological shape type as reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopAbsShapeEnum {
    Compound,
    CompSolid,
    Solid,
    Shell,
    Face,
    Wire,
    Edge,
    Vertex,
    Shape,
}

/// Orientation of a shape handle as reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopAbsOrientation {
    Forward,
    Reversed,
    Internal,
    External,
}

/// Curve type behind a curve adaptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeomAbsCurveType {
    Line,
    Circle,
    Ellipse,
    OtherCurve,
}

/// Global property accumulated over a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GPropKind {
    /// Length of edges
    Linear,
    /// Area of faces
    Surface,
    /// Volume of solids
    Volume,
}

/// Transformation definition for [`Kernel::new_trsf`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrsfRequest {
    /// Translation by a vector primitive
    Translation { vector: NativeId },
    /// Rotation about an axis primitive (ax1), angle in radians
    Rotation { axis: NativeId, angle: f64 },
    /// Uniform scale about a point primitive
    Scale { center: NativeId, factor: f64 },
    /// Mirror through the plane of an axis system primitive (ax2)
    Mirror { plane: NativeId },
}

/// Arc-of-circle construction modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcOfCircleRequest {
    /// Arc from `start` through `middle` to `end` (point primitives)
    ThreePoints {
        start: NativeId,
        middle: NativeId,
        end: NativeId,
    },
    /// Arc from `start` to `end`, tangent to a vector primitive at `start`
    TwoPointsTangent {
        start: NativeId,
        tangent: NativeId,
        end: NativeId,
    },
    /// Portion of a circle primitive between two points
    CircleTwoPoints {
        circle: NativeId,
        start: NativeId,
        end: NativeId,
        sense: bool,
    },
    /// Portion of a circle primitive between two parameters (radians)
    CircleTwoAngles {
        circle: NativeId,
        alpha1: f64,
        alpha2: f64,
        sense: bool,
    },
    /// Portion of a circle primitive from a point to a parameter (radians)
    CirclePointAngle {
        circle: NativeId,
        point: NativeId,
        alpha: f64,
        sense: bool,
    },
}

/// Boolean operation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOperation {
    Fuse,
    Cut,
    Common,
}

/// Algorithm object definition for [`Kernel::new_algorithm`]
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmRequest {
    /// Arc of circle curve maker
    ArcOfCircle(ArcOfCircleRequest),
    /// Bounded line curve maker between two point primitives
    Segment { start: NativeId, end: NativeId },
    /// Vertex maker from a point primitive
    MakeVertex { point: NativeId },
    /// Edge maker from a bounded curve
    MakeEdge { curve: NativeId },
    /// Edge maker from a 2D curve in the parameter space of a surface
    MakeEdgeOnSurface { curve: NativeId, surface: NativeId },
    /// Wire maker from edges and wires, in connection order
    MakeWire { shapes: Vec<NativeId> },
    /// Polygon wire maker from point primitives
    MakePolygon { points: Vec<NativeId>, closed: bool },
    /// Face maker from a closed wire, optionally on an explicit plane surface
    MakeFace {
        wire: NativeId,
        surface: Option<NativeId>,
        planar_only: bool,
    },
    /// Sewing of faces into a shell
    Sewing { shapes: Vec<NativeId>, tolerance: f64 },
    /// Solid maker from a closed shell
    MakeSolid { shell: NativeId },
    /// Axis-aligned box from a corner point primitive
    MakeBox {
        corner: NativeId,
        dx: f64,
        dy: f64,
        dz: f64,
    },
    /// Linear sweep of a shape along a vector primitive
    Prism { shape: NativeId, vector: NativeId },
    /// Ruled loft through wires
    ThruSections { wires: Vec<NativeId>, make_solid: bool },
    /// Boolean operation; `Cut` subtracts every tool from the first argument
    Boolean {
        operation: BooleanOperation,
        arguments: Vec<NativeId>,
        tools: Vec<NativeId>,
    },
    /// Copying transform of a shape by a transformation primitive
    Transform { shape: NativeId, trsf: NativeId },
    /// Same-domain unification
    UnifySameDomain {
        shape: NativeId,
        unify_edges: bool,
        unify_faces: bool,
        concat_bsplines: bool,
    },
    /// Planar corner rounding of a face's outer wire
    Fillet2d {
        face: NativeId,
        radius: f64,
        corners: Option<Vec<usize>>,
    },
    /// Equal arc-length sampling of a curve adaptor
    UniformAbscissa { adaptor: NativeId, nb_points: usize },
    /// Compound of shapes
    MakeCompound { shapes: Vec<NativeId> },
}

/// The native kernel interface
///
/// Implementations must be shareable between threads; the facade itself adds
/// no locking.
pub trait Kernel: Send + Sync {
    /// Name of this kernel
    fn name(&self) -> &str;

    /// Release a native object. Must be called exactly once per object.
    fn release(&self, id: NativeId);

    /// Duplicate a shape handle (same entity, independent lifetime)
    fn duplicate(&self, shape: NativeId) -> KernelResult<NativeId>;

    // ========== Primitives ==========

    fn new_pnt(&self, xyz: [f64; 3]) -> KernelResult<NativeId>;

    fn new_vec(&self, xyz: [f64; 3]) -> KernelResult<NativeId>;

    /// Unit direction; fails on a null vector
    fn new_dir(&self, xyz: [f64; 3]) -> KernelResult<NativeId>;

    /// Axis from a point and a direction
    fn new_ax1(&self, origin: NativeId, direction: NativeId) -> KernelResult<NativeId>;

    /// Right-handed coordinate system from a point and a main direction
    fn new_ax2(&self, origin: NativeId, direction: NativeId) -> KernelResult<NativeId>;

    fn new_circ(&self, axis: NativeId, radius: f64) -> KernelResult<NativeId>;

    fn new_elips(&self, axis: NativeId, major_radius: f64, minor_radius: f64)
    -> KernelResult<NativeId>;

    fn new_trsf(&self, request: TrsfRequest) -> KernelResult<NativeId>;

    /// Coordinates of a point, vector or direction primitive
    fn coords(&self, primitive: NativeId) -> KernelResult<[f64; 3]>;

    /// Center, radius and plane normal of a circle primitive
    fn circ_properties(&self, circ: NativeId) -> KernelResult<([f64; 3], f64, [f64; 3])>;

    // ========== Geometry ==========

    /// Full circle curve from a circle primitive
    fn new_geom_circle(&self, circ: NativeId) -> KernelResult<NativeId>;

    /// Full ellipse curve from an ellipse primitive
    fn new_geom_ellipse(&self, elips: NativeId) -> KernelResult<NativeId>;

    /// Plane surface through a point with a normal direction
    fn new_geom_plane(&self, origin: NativeId, normal: NativeId) -> KernelResult<NativeId>;

    /// Bounded 2D line in surface parameter space; fails on coincident ends
    fn new_geom2d_segment(&self, start: [f64; 2], end: [f64; 2]) -> KernelResult<NativeId>;

    /// Full 2D circle in surface parameter space
    fn new_geom2d_circle(&self, center: [f64; 2], radius: f64) -> KernelResult<NativeId>;

    // ========== Algorithms ==========

    fn new_algorithm(&self, request: &AlgorithmRequest) -> KernelResult<NativeId>;

    /// Run the algorithm; fails when it cannot produce a result
    fn build(&self, algorithm: NativeId) -> KernelResult<()>;

    /// Resulting curve of a built curve maker
    fn algorithm_curve(&self, algorithm: NativeId) -> KernelResult<NativeId>;

    /// Resulting shape of a built shape algorithm
    fn algorithm_shape(&self, algorithm: NativeId) -> KernelResult<NativeId>;

    /// Resulting parameters of a built sampling algorithm
    fn algorithm_parameters(&self, algorithm: NativeId) -> KernelResult<Vec<f64>>;

    // ========== Topology ==========

    /// Empty shape handle referring to no entity
    fn new_null_shape(&self) -> KernelResult<NativeId>;

    fn is_null(&self, shape: NativeId) -> KernelResult<bool>;

    fn shape_type(&self, shape: NativeId) -> KernelResult<TopAbsShapeEnum>;

    fn orientation(&self, shape: NativeId) -> KernelResult<TopAbsOrientation>;

    /// New handle on the same entity with flipped orientation
    fn reversed(&self, shape: NativeId) -> KernelResult<NativeId>;

    /// New handle typed as `target`; fails when the entity is of another type
    fn cast(&self, shape: NativeId, target: TopAbsShapeEnum) -> KernelResult<NativeId>;

    /// Whether a wire, edge or shell closes on itself
    fn is_closed(&self, shape: NativeId) -> KernelResult<bool>;

    fn vertex_point(&self, vertex: NativeId) -> KernelResult<[f64; 3]>;

    /// Surface underlying a face, independent of the face's orientation
    fn face_surface(&self, face: NativeId) -> KernelResult<NativeId>;

    /// Edges of a wire in connection order, oriented as traversed
    fn wire_edges(&self, wire: NativeId) -> KernelResult<Vec<NativeId>>;

    /// Indexed map of the distinct sub-shapes of a type
    fn new_shape_map(&self, shape: NativeId, kind: TopAbsShapeEnum) -> KernelResult<NativeId>;

    fn shape_map_extent(&self, map: NativeId) -> KernelResult<usize>;

    /// New handle on the map entry at a zero-based index
    fn shape_map_item(&self, map: NativeId, index: usize) -> KernelResult<NativeId>;

    // ========== Curve evaluation ==========

    /// Curve adaptor over an edge's geometry
    fn new_curve_adaptor(&self, edge: NativeId) -> KernelResult<NativeId>;

    fn curve_type(&self, adaptor: NativeId) -> KernelResult<GeomAbsCurveType>;

    fn curve_bounds(&self, adaptor: NativeId) -> KernelResult<(f64, f64)>;

    fn curve_d0(&self, adaptor: NativeId, u: f64) -> KernelResult<[f64; 3]>;

    /// Point and first derivative
    fn curve_d1(&self, adaptor: NativeId, u: f64) -> KernelResult<([f64; 3], [f64; 3])>;

    /// Parameter reached after a signed arc length from `from`
    fn curve_parameter_at_length(
        &self,
        adaptor: NativeId,
        from: f64,
        length: f64,
    ) -> KernelResult<f64>;

    /// Circle primitive of a circular curve adaptor
    fn curve_circle(&self, adaptor: NativeId) -> KernelResult<NativeId>;

    // ========== Global properties ==========

    fn new_properties(&self, shape: NativeId, kind: GPropKind) -> KernelResult<NativeId>;

    fn properties_mass(&self, properties: NativeId) -> KernelResult<f64>;

    fn properties_center(&self, properties: NativeId) -> KernelResult<[f64; 3]>;
}
