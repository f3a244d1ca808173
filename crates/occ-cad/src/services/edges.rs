//! Edge construction and queries
//!
//! Constructors all run the same template: build primitives, run a curve
//! maker, turn the curve into an edge, normalize the edge handle, release
//! every intermediate object.
//!
//! Queries never release or modify their input. Parameters are normalized to
//! `[0, 1]` and lengths are measured from the start of the edge as it is
//! oriented, so a reversed edge is walked from its other end.

use std::sync::Arc;

use occ_core::inputs::{
    ArcEdgeCircleTwoAnglesDto, ArcEdgeCirclePointAngleDto, ArcEdgeCircleTwoPointsDto,
    ArcEdgeThreePointsDto, ArcEdgeTwoPointsTangentDto, CircleDto, CurveAndSurfaceDto,
    DataOnGeometryAtLengthDto, DataOnGeometryAtParamDto, DivideDto, EllipseDto, LineDto,
    ShapeIndexDto,
};
use occ_core::{Point3, ShapeKind, TypeSpecificity, Vector3};

use super::{ArcMode, VerticesService};
use crate::error::{KernelResultExt, OccError, OccResult};
use crate::helper::OccBase;
use crate::kernel::{
    Algorithm, AlgorithmRequest, CurveAdaptor, Edge, GPropKind, Geom2dCurve, GeomSurface, Kernel,
    Shape, TopAbsOrientation, Wire,
};

/// Curve adaptor over an edge, parametrized in the edge's traversal direction
struct OrientedCurve<'k> {
    kernel: &'k Arc<dyn Kernel>,
    adaptor: CurveAdaptor,
    first: f64,
    last: f64,
    reversed: bool,
}

impl<'k> OrientedCurve<'k> {
    fn new(kernel: &'k Arc<dyn Kernel>, edge: &Edge) -> OccResult<Self> {
        let reversed = kernel.orientation(edge.id()).during("edge orientation")?
            == TopAbsOrientation::Reversed;
        let adaptor = CurveAdaptor::from_result(kernel, kernel.new_curve_adaptor(edge.id()))
            .during("curve adaptor")?;
        let (first, last) = kernel.curve_bounds(adaptor.id()).during("curve bounds")?;
        Ok(Self {
            kernel,
            adaptor,
            first,
            last,
            reversed,
        })
    }

    /// Curve parameter of a normalized parameter along the edge
    fn parameter(&self, param: f64) -> f64 {
        let span = self.last - self.first;
        if self.reversed {
            self.last - param * span
        } else {
            self.first + param * span
        }
    }

    /// Curve parameter at an arc length from the oriented start
    fn parameter_at_length(&self, length: f64) -> OccResult<f64> {
        let (from, signed) = if self.reversed {
            (self.last, -length)
        } else {
            (self.first, length)
        };
        self.kernel
            .curve_parameter_at_length(self.adaptor.id(), from, signed)
            .during("parameter at length")
    }

    fn point(&self, u: f64) -> OccResult<Point3> {
        self.kernel.curve_d0(self.adaptor.id(), u).during("point on curve")
    }

    /// First derivative, flipped for reversed edges
    fn tangent(&self, u: f64) -> OccResult<Vector3> {
        let (_, d1) = self.kernel.curve_d1(self.adaptor.id(), u).during("tangent on curve")?;
        Ok(if self.reversed {
            [-d1[0], -d1[1], -d1[2]]
        } else {
            d1
        })
    }
}

pub struct EdgesService {
    base: Arc<OccBase>,
    vertices: Arc<VerticesService>,
}

impl EdgesService {
    /// Create an edge service on top of the vertex level
    pub fn new(base: Arc<OccBase>, vertices: Arc<VerticesService>) -> Self {
        Self { base, vertices }
    }

    // ========== Construction ==========

    /// Straight edge between two distinct points
    pub fn line(&self, dto: &LineDto) -> OccResult<Edge> {
        let curve = self.base.geom().segment(dto.start, dto.end)?;
        self.base.edge_from_curve(&curve)
    }

    fn arc(&self, mode: ArcMode<'_>) -> OccResult<Edge> {
        let curve = self.base.geom().arc_of_circle(mode)?;
        self.base.edge_from_curve(&curve)
    }

    /// Circular arc from `start` through `middle` to `end`
    pub fn arc_through_three_points(&self, dto: &ArcEdgeThreePointsDto) -> OccResult<Edge> {
        self.arc(ArcMode::ThreePoints {
            start: dto.start,
            middle: dto.middle,
            end: dto.end,
        })
    }

    /// Circular arc leaving `start` along `tangent_vec`, ending at `end`
    pub fn arc_through_two_points_and_tangent(
        &self,
        dto: &ArcEdgeTwoPointsTangentDto,
    ) -> OccResult<Edge> {
        self.arc(ArcMode::TwoPointsTangent {
            start: dto.start,
            tangent: dto.tangent_vec,
            end: dto.end,
        })
    }

    /// Arc of an existing circular edge between the angles of two points
    pub fn arc_from_circle_and_two_points(
        &self,
        dto: &ArcEdgeCircleTwoPointsDto<&Edge>,
    ) -> OccResult<Edge> {
        self.arc(ArcMode::CircleTwoPoints {
            circle: dto.circle,
            start: dto.start,
            end: dto.end,
            sense: dto.sense,
        })
    }

    /// Angles in degrees
    pub fn arc_from_circle_and_two_angles(
        &self,
        dto: &ArcEdgeCircleTwoAnglesDto<&Edge>,
    ) -> OccResult<Edge> {
        self.arc(ArcMode::CircleTwoAngles {
            circle: dto.circle,
            alpha1: dto.alpha_angle1,
            alpha2: dto.alpha_angle2,
            sense: dto.sense,
        })
    }

    /// The angle is an absolute circle parameter in degrees, not an offset
    /// from the point
    pub fn arc_from_circle_point_and_angle(
        &self,
        dto: &ArcEdgeCirclePointAngleDto<&Edge>,
    ) -> OccResult<Edge> {
        self.arc(ArcMode::CirclePointAngle {
            circle: dto.circle,
            point: dto.point,
            alpha: dto.alpha_angle,
            sense: dto.sense,
        })
    }

    /// Closed circular edge
    pub fn create_circle_edge(&self, dto: &CircleDto) -> OccResult<Edge> {
        Edge::try_from(self.base.create_circle(dto, TypeSpecificity::Edge)?)
    }

    /// Closed elliptical edge
    pub fn create_ellipse_edge(&self, dto: &EllipseDto) -> OccResult<Edge> {
        Edge::try_from(self.base.create_ellipse(dto, TypeSpecificity::Edge)?)
    }

    /// Edge traced by a parameter-space curve on a surface. Both inputs stay
    /// owned by the caller.
    pub fn make_edge_from_geom2d_curve_and_surface(
        &self,
        dto: &CurveAndSurfaceDto<&Geom2dCurve, &GeomSurface>,
    ) -> OccResult<Edge> {
        let request = AlgorithmRequest::MakeEdgeOnSurface {
            curve: dto.curve.id(),
            surface: dto.surface.id(),
        };
        let raw = self.base.build_shape(&request, "edge on surface")?;
        Edge::try_from(self.base.normalized(&raw)?)
    }

    /// Merge coplanar faces and colinear edges into single entities
    pub fn remove_internal_edges(&self, shape: &Shape) -> OccResult<Shape> {
        self.base.unify_same_domain(shape, true, true, false)
    }

    /// Copy of an edge with flipped orientation
    pub fn reversed_edge(&self, edge: &Edge) -> OccResult<Edge> {
        self.base.reversed(edge.shape(), "reverse edge")
    }

    // ========== Lookup ==========

    /// Edge at an index in traversal order.
    ///
    /// Only vertices, edges and wires are searched; anything more composite
    /// is rejected as invalid input.
    pub fn get_edge(&self, dto: &ShapeIndexDto<&Shape>) -> OccResult<Edge> {
        self.base
            .indexed_sub_shape(dto.shape, dto.index, ShapeKind::Edge, |kind| {
                kind <= ShapeKind::Wire
            })
    }

    /// Distinct edges of a shape in traversal order
    pub fn get_edges(&self, shape: &Shape) -> OccResult<Vec<Edge>> {
        self.base.shape_getters().get_edges(shape)
    }

    /// Edges of a wire in connection order
    pub fn get_edges_along_wire(&self, wire: &Wire) -> OccResult<Vec<Edge>> {
        self.base.shape_getters().get_edges_along_wire(wire)
    }

    // ========== Points and tangents ==========

    /// Point at a normalized parameter in `[0, 1]`
    pub fn point_on_edge_at_param(&self, dto: &DataOnGeometryAtParamDto<&Edge>) -> OccResult<Point3> {
        let curve = OrientedCurve::new(self.base.kernel(), dto.shape)?;
        curve.point(curve.parameter(dto.param))
    }

    /// Tangent at a normalized parameter, pointing along the edge
    pub fn tangent_on_edge_at_param(
        &self,
        dto: &DataOnGeometryAtParamDto<&Edge>,
    ) -> OccResult<Vector3> {
        let curve = OrientedCurve::new(self.base.kernel(), dto.shape)?;
        curve.tangent(curve.parameter(dto.param))
    }

    /// Point at an arc length from the start of the edge
    pub fn point_on_edge_at_length(
        &self,
        dto: &DataOnGeometryAtLengthDto<&Edge>,
    ) -> OccResult<Point3> {
        let curve = OrientedCurve::new(self.base.kernel(), dto.shape)?;
        curve.point(curve.parameter_at_length(dto.length)?)
    }

    /// Tangent at an arc length from the start of the edge
    pub fn tangent_on_edge_at_length(
        &self,
        dto: &DataOnGeometryAtLengthDto<&Edge>,
    ) -> OccResult<Vector3> {
        let curve = OrientedCurve::new(self.base.kernel(), dto.shape)?;
        curve.tangent(curve.parameter_at_length(dto.length)?)
    }

    /// First point of the edge as it is oriented
    pub fn start_point_on_edge(&self, edge: &Edge) -> OccResult<Point3> {
        self.point_on_edge_at_param(&DataOnGeometryAtParamDto {
            shape: edge,
            param: 0.0,
        })
    }

    /// Last point of the edge as it is oriented
    pub fn end_point_on_edge(&self, edge: &Edge) -> OccResult<Point3> {
        self.point_on_edge_at_param(&DataOnGeometryAtParamDto {
            shape: edge,
            param: 1.0,
        })
    }

    /// Points at equal parameter steps along the edge
    pub fn divide_edge_by_params_to_points(&self, dto: &DivideDto<&Edge>) -> OccResult<Vec<Point3>> {
        let n = Self::division_count(dto)?;
        let curve = OrientedCurve::new(self.base.kernel(), dto.shape)?;
        let points = (0..n)
            .map(|i| curve.point(curve.parameter(i as f64 / (n - 1) as f64)))
            .collect::<OccResult<Vec<_>>>()?;
        Ok(Self::trim_ends(points, dto))
    }

    /// Points at equal arc-length steps along the edge
    pub fn divide_edge_by_equal_distance_to_points(
        &self,
        dto: &DivideDto<&Edge>,
    ) -> OccResult<Vec<Point3>> {
        let n = Self::division_count(dto)?;
        let curve = OrientedCurve::new(self.base.kernel(), dto.shape)?;
        let request = AlgorithmRequest::UniformAbscissa {
            adaptor: curve.adaptor.id(),
            nb_points: n,
        };
        let sampler = Algorithm::build(self.base.kernel(), &request, "uniform abscissa")?;
        let mut parameters = sampler.parameters("uniform abscissa")?;
        drop(sampler);
        // equal spacing reads the same from either end
        if curve.reversed {
            parameters.reverse();
        }
        let points = parameters
            .into_iter()
            .map(|u| curve.point(u))
            .collect::<OccResult<Vec<_>>>()?;
        Ok(Self::trim_ends(points, dto))
    }

    fn division_count(dto: &DivideDto<&Edge>) -> OccResult<usize> {
        if dto.nr_of_divisions < 2 {
            return Err(OccError::InvalidInput(format!(
                "an edge divides into at least 2 points, got {}",
                dto.nr_of_divisions
            )));
        }
        Ok(dto.nr_of_divisions)
    }

    fn trim_ends(mut points: Vec<Point3>, dto: &DivideDto<&Edge>) -> Vec<Point3> {
        if dto.remove_end_point {
            points.pop();
        }
        if dto.remove_start_point && !points.is_empty() {
            points.remove(0);
        }
        points
    }

    // ========== Measures ==========

    /// Arc length of an edge
    pub fn get_edge_length(&self, edge: &Edge) -> OccResult<f64> {
        self.base.mass(edge.shape(), GPropKind::Linear)
    }

    pub fn get_edges_lengths(&self, edges: &[&Edge]) -> OccResult<Vec<f64>> {
        edges.iter().map(|e| self.get_edge_length(e)).collect()
    }

    /// Center of mass of an edge, treated as a wire of uniform density
    pub fn get_edge_center_of_mass(&self, edge: &Edge) -> OccResult<Point3> {
        self.base.center_of_mass(edge.shape(), GPropKind::Linear)
    }

    pub fn get_edges_centers_of_mass(&self, edges: &[&Edge]) -> OccResult<Vec<Point3>> {
        edges.iter().map(|e| self.get_edge_center_of_mass(e)).collect()
    }

    // ========== Circular edges ==========

    fn circle_properties(&self, edge: &Edge) -> OccResult<(Point3, f64, Vector3)> {
        let circ = self.base.geom().gp_circ_from_edge(edge)?;
        self.base
            .kernel()
            .circ_properties(circ.id())
            .during("circle properties")
    }

    /// Center of the circle under a circular edge
    pub fn get_circular_edge_center_point(&self, edge: &Edge) -> OccResult<Point3> {
        Ok(self.circle_properties(edge)?.0)
    }

    /// Radius of the circle under a circular edge
    pub fn get_circular_edge_radius(&self, edge: &Edge) -> OccResult<f64> {
        Ok(self.circle_properties(edge)?.1)
    }

    /// Normal of the plane holding a circular edge
    pub fn get_circular_edge_plane_direction(&self, edge: &Edge) -> OccResult<Vector3> {
        Ok(self.circle_properties(edge)?.2)
    }

    /// Distinct end points of every edge of a shape, in traversal order
    pub fn get_corner_points_of_edges_for_shape(&self, shape: &Shape) -> OccResult<Vec<Point3>> {
        let tolerance = self.base.config().kernel.linear_tolerance;
        let vh = *self.base.vector();
        let mut corners: Vec<Point3> = Vec::new();
        self.base.for_each_edge(shape, |_, edge| {
            for vertex in self.vertices.get_vertices(edge.shape())? {
                let point = self.vertices.vertex_to_point(&vertex)?;
                if !corners.iter().any(|c| vh.points_equal(*c, point, tolerance)) {
                    corners.push(point);
                }
            }
            Ok(())
        })?;
        Ok(corners)
    }
}
