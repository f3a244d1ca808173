//! Geometric constructors: conics, curves, surfaces and arcs
//!
//! Arc construction is one template over a closed set of modes. Each mode
//! allocates its primitives into a bundle that outlives
//! the curve maker, so the maker never refers to a released object.

use std::sync::Arc;

use occ_core::inputs::{Circle2dDto, CircleDto, EllipseDto, Segment2dDto};
use occ_core::{Point3, Vector3, VectorHelper};

use super::EntitiesService;
use crate::error::{KernelResultExt, OccError, OccResult};
use crate::kernel::{
    Algorithm, AlgorithmRequest, ArcOfCircleRequest, CurveAdaptor, Edge, GeomAbsCurveType,
    Geom2dCurve, GeomCurve, GeomSurface, GpCirc, GpElips, GpPnt, GpVec, Kernel, NativeId,
};

/// How an arc of circle is defined. Angles are in degrees; on an existing
/// circle they are absolute circle parameters.
#[derive(Debug, Clone, Copy)]
pub enum ArcMode<'a> {
    ThreePoints {
        start: Point3,
        middle: Point3,
        end: Point3,
    },
    TwoPointsTangent {
        start: Point3,
        tangent: Vector3,
        end: Point3,
    },
    CircleTwoPoints {
        circle: &'a Edge,
        start: Point3,
        end: Point3,
        sense: bool,
    },
    CircleTwoAngles {
        circle: &'a Edge,
        alpha1: f64,
        alpha2: f64,
        sense: bool,
    },
    CirclePointAngle {
        circle: &'a Edge,
        point: Point3,
        alpha: f64,
        sense: bool,
    },
}

/// Primitives an arc request refers to, kept alive until the arc is built
#[derive(Default)]
struct ArcPrimitives {
    points: Vec<GpPnt>,
    tangent: Option<GpVec>,
    circle: Option<GpCirc>,
}

pub struct GeomService {
    kernel: Arc<dyn Kernel>,
    entities: Arc<EntitiesService>,
    vector: VectorHelper,
}

impl GeomService {
    /// Create a geometry service using `entities` for its primitives
    pub fn new(kernel: Arc<dyn Kernel>, entities: Arc<EntitiesService>, vector: VectorHelper) -> Self {
        Self {
            kernel,
            entities,
            vector,
        }
    }

    // ========== Conics ==========

    /// Circle primitive; the radius must be positive and finite
    pub fn gp_circ(&self, dto: &CircleDto) -> OccResult<GpCirc> {
        if !(dto.radius > 0.0) || !dto.radius.is_finite() {
            return Err(OccError::InvalidInput(format!(
                "circle radius must be positive and finite, got {}",
                dto.radius
            )));
        }
        let axis = self.entities.ax2(dto.center, dto.direction)?;
        GpCirc::from_result(&self.kernel, self.kernel.new_circ(axis.id(), dto.radius)).during("circle")
    }

    /// Ellipse primitive; needs `0 < minor <= major`
    pub fn gp_elips(&self, dto: &EllipseDto) -> OccResult<GpElips> {
        if !(dto.radius_minor > 0.0)
            || !(dto.radius_major >= dto.radius_minor)
            || !dto.radius_major.is_finite()
        {
            return Err(OccError::InvalidInput(format!(
                "ellipse needs 0 < minor radius <= major radius, got {} and {}",
                dto.radius_minor, dto.radius_major
            )));
        }
        let axis = self.entities.ax2(dto.center, dto.direction)?;
        GpElips::from_result(
            &self.kernel,
            self.kernel
                .new_elips(axis.id(), dto.radius_major, dto.radius_minor),
        )
        .during("ellipse")
    }

    // ========== Curves and surfaces ==========

    /// Full circle as a curve
    pub fn circle_curve(&self, dto: &CircleDto) -> OccResult<GeomCurve> {
        let circ = self.gp_circ(dto)?;
        GeomCurve::from_result(&self.kernel, self.kernel.new_geom_circle(circ.id()))
            .during("circle curve")
    }

    /// Full ellipse as a curve
    pub fn ellipse_curve(&self, dto: &EllipseDto) -> OccResult<GeomCurve> {
        let elips = self.gp_elips(dto)?;
        GeomCurve::from_result(&self.kernel, self.kernel.new_geom_ellipse(elips.id()))
            .during("ellipse curve")
    }

    /// Unbounded plane through `origin` with normal `normal`
    pub fn plane_surface(&self, origin: Point3, normal: Vector3) -> OccResult<GeomSurface> {
        let normal = self.entities.dir(normal)?;
        let origin = self.entities.pnt(origin)?;
        GeomSurface::from_result(&self.kernel, self.kernel.new_geom_plane(origin.id(), normal.id()))
            .during("plane surface")
    }

    /// Bounded straight line; coincident end points are rejected
    pub fn segment(&self, start: Point3, end: Point3) -> OccResult<GeomCurve> {
        if self.vector.points_equal(start, end, 0.0) {
            return Err(OccError::InvalidInput(format!(
                "line end points coincide at {start:?}"
            )));
        }
        let start = self.entities.pnt(start)?;
        let end = self.entities.pnt(end)?;
        let request = AlgorithmRequest::Segment {
            start: start.id(),
            end: end.id(),
        };
        Algorithm::build(&self.kernel, &request, "segment")?.curve("segment")
    }

    // ========== Parameter-space curves ==========

    /// Straight segment in the `(u, v)` plane of a surface
    pub fn segment_2d(&self, dto: &Segment2dDto) -> OccResult<Geom2dCurve> {
        let finite = dto.start.iter().chain(&dto.end).all(|c| c.is_finite());
        if !finite || dto.start == dto.end {
            return Err(OccError::InvalidInput(format!(
                "2D segment needs distinct finite end points, got {:?} and {:?}",
                dto.start, dto.end
            )));
        }
        Geom2dCurve::from_result(&self.kernel, self.kernel.new_geom2d_segment(dto.start, dto.end))
            .during("2D segment")
    }

    /// Full circle in the `(u, v)` plane of a surface
    pub fn circle_2d(&self, dto: &Circle2dDto) -> OccResult<Geom2dCurve> {
        if !(dto.radius > 0.0) || !dto.radius.is_finite() || !dto.center.iter().all(|c| c.is_finite()) {
            return Err(OccError::InvalidInput(format!(
                "2D circle needs a finite center and a positive radius, got {:?} and {}",
                dto.center, dto.radius
            )));
        }
        Geom2dCurve::from_result(&self.kernel, self.kernel.new_geom2d_circle(dto.center, dto.radius))
            .during("2D circle")
    }

    // ========== Arcs ==========

    /// Arc of circle curve in any of the supported modes. Every primitive
    /// built on the way is released before returning.
    pub fn arc_of_circle(&self, mode: ArcMode<'_>) -> OccResult<GeomCurve> {
        let angles = match mode {
            ArcMode::CircleTwoAngles { alpha1, alpha2, .. } => vec![alpha1, alpha2],
            ArcMode::CirclePointAngle { alpha, .. } => vec![alpha],
            _ => Vec::new(),
        };
        if let Some(angle) = angles.iter().find(|a| !a.is_finite()) {
            return Err(OccError::InvalidInput(format!("invalid arc angle {angle}")));
        }
        let mut primitives = ArcPrimitives::default();
        let request = match mode {
            ArcMode::ThreePoints { start, middle, end } => {
                let [start, middle, end] = self.points(&mut primitives, [start, middle, end])?;
                ArcOfCircleRequest::ThreePoints { start, middle, end }
            }
            ArcMode::TwoPointsTangent {
                start,
                tangent,
                end,
            } => {
                let [start, end] = self.points(&mut primitives, [start, end])?;
                let tangent = primitives.tangent.insert(self.entities.vec(tangent)?).id();
                ArcOfCircleRequest::TwoPointsTangent {
                    start,
                    tangent,
                    end,
                }
            }
            ArcMode::CircleTwoPoints {
                circle,
                start,
                end,
                sense,
            } => {
                let circle = primitives.circle.insert(self.gp_circ_from_edge(circle)?).id();
                let [start, end] = self.points(&mut primitives, [start, end])?;
                ArcOfCircleRequest::CircleTwoPoints {
                    circle,
                    start,
                    end,
                    sense,
                }
            }
            ArcMode::CircleTwoAngles {
                circle,
                alpha1,
                alpha2,
                sense,
            } => ArcOfCircleRequest::CircleTwoAngles {
                circle: primitives.circle.insert(self.gp_circ_from_edge(circle)?).id(),
                alpha1: self.vector.deg_to_rad(alpha1),
                alpha2: self.vector.deg_to_rad(alpha2),
                sense,
            },
            ArcMode::CirclePointAngle {
                circle,
                point,
                alpha,
                sense,
            } => {
                let circle = primitives.circle.insert(self.gp_circ_from_edge(circle)?).id();
                let [point] = self.points(&mut primitives, [point])?;
                ArcOfCircleRequest::CirclePointAngle {
                    circle,
                    point,
                    alpha: self.vector.deg_to_rad(alpha),
                    sense,
                }
            }
        };
        let maker = Algorithm::build(
            &self.kernel,
            &AlgorithmRequest::ArcOfCircle(request),
            "arc of circle",
        )?;
        let curve = maker.curve("arc of circle")?;
        drop(primitives);
        Ok(curve)
    }

    fn points<const N: usize>(
        &self,
        primitives: &mut ArcPrimitives,
        points: [Point3; N],
    ) -> OccResult<[NativeId; N]> {
        let mut ids = [NativeId(0); N];
        for (slot, point) in ids.iter_mut().zip(points) {
            let pnt = self.entities.pnt(point)?;
            *slot = pnt.id();
            primitives.points.push(pnt);
        }
        Ok(ids)
    }

    /// Circle primitive underlying a circular edge
    pub fn gp_circ_from_edge(&self, edge: &Edge) -> OccResult<GpCirc> {
        let adaptor = CurveAdaptor::from_result(&self.kernel, self.kernel.new_curve_adaptor(edge.id()))
            .during("curve adaptor")?;
        let curve_type = self.kernel.curve_type(adaptor.id()).during("curve type")?;
        if curve_type != GeomAbsCurveType::Circle {
            return Err(OccError::InvalidInput(format!(
                "edge is not circular, its curve is a {curve_type:?}"
            )));
        }
        GpCirc::from_result(&self.kernel, self.kernel.curve_circle(adaptor.id()))
            .during("circle of edge")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::NativeClass;
    use crate::testing::fixture;
    use approx::assert_relative_eq;

    #[test]
    fn test_arc_primitives_are_released() {
        let (memory, occ) = fixture();
        let geom = occ.base().geom();
        let curve = geom
            .arc_of_circle(ArcMode::ThreePoints {
                start: [1.0, 0.0, 0.0],
                middle: [0.0, 1.0, 0.0],
                end: [-1.0, 0.0, 0.0],
            })
            .unwrap();
        assert_eq!(memory.live(NativeClass::Primitive), 0);
        assert_eq!(memory.live(NativeClass::Algorithm), 0);
        assert_eq!(memory.live(NativeClass::Geometry), 1);
        drop(curve);
        assert_eq!(memory.live_total(), 0);
    }

    #[test]
    fn test_collinear_arc_fails_without_leaks() {
        let (memory, occ) = fixture();
        let err = occ
            .base()
            .geom()
            .arc_of_circle(ArcMode::ThreePoints {
                start: [0.0, 0.0, 0.0],
                middle: [1.0, 0.0, 0.0],
                end: [2.0, 0.0, 0.0],
            })
            .unwrap_err();
        assert!(matches!(err, OccError::ConstructionFailure(_)));
        assert_eq!(memory.live_total(), 0);
        assert_eq!(memory.invalid_releases(), 0);
    }

    #[test]
    fn test_circle_from_line_edge_is_invalid() {
        let (memory, occ) = fixture();
        let edge = occ
            .edges()
            .line(&occ_core::inputs::LineDto {
                start: [0.0; 3],
                end: [1.0, 0.0, 0.0],
            })
            .unwrap();
        let before = memory.live_total();
        let err = occ.base().geom().gp_circ_from_edge(&edge).unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.live_total(), before);
    }

    #[test]
    fn test_invalid_conics_are_rejected_before_allocation() {
        let (memory, occ) = fixture();
        let geom = occ.base().geom();
        let circle = CircleDto {
            radius: 0.0,
            ..CircleDto::default()
        };
        let ellipse = EllipseDto {
            radius_minor: 3.0,
            radius_major: 1.0,
            ..EllipseDto::default()
        };
        assert!(matches!(geom.gp_circ(&circle), Err(OccError::InvalidInput(_))));
        assert!(matches!(geom.gp_elips(&ellipse), Err(OccError::InvalidInput(_))));
        assert!(matches!(
            geom.segment([1.0; 3], [1.0; 3]),
            Err(OccError::InvalidInput(_))
        ));
        assert_eq!(memory.allocated_total(), 0);
    }

    #[test]
    fn test_non_finite_geometry_is_rejected_before_allocation() {
        let (memory, occ) = fixture();
        let geom = occ.base().geom();
        let ellipse = EllipseDto {
            radius_minor: 1.0,
            radius_major: f64::NAN,
            ..EllipseDto::default()
        };
        let huge = EllipseDto {
            radius_minor: 1.0,
            radius_major: f64::INFINITY,
            ..EllipseDto::default()
        };
        let circle = CircleDto {
            radius: f64::INFINITY,
            ..CircleDto::default()
        };
        assert!(matches!(geom.gp_elips(&ellipse), Err(OccError::InvalidInput(_))));
        assert!(matches!(geom.gp_elips(&huge), Err(OccError::InvalidInput(_))));
        assert!(matches!(geom.gp_circ(&circle), Err(OccError::InvalidInput(_))));
        assert!(matches!(
            geom.segment([f64::NAN, 0.0, 0.0], [1.0, 0.0, 0.0]),
            Err(OccError::InvalidInput(_))
        ));
        assert_eq!(memory.allocated_total(), 0);

        let circle = occ
            .edges()
            .create_circle_edge(&CircleDto::default())
            .unwrap();
        let allocated = memory.allocated_total();
        let err = geom
            .arc_of_circle(ArcMode::CircleTwoAngles {
                circle: &circle,
                alpha1: 0.0,
                alpha2: f64::NAN,
                sense: true,
            })
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.allocated_total(), allocated);
    }

    #[test]
    fn test_degenerate_2d_curves_are_rejected() {
        let (memory, occ) = fixture();
        let geom = occ.base().geom();
        let point = Segment2dDto {
            start: [1.0, 1.0],
            end: [1.0, 1.0],
        };
        let nan = Segment2dDto {
            start: [0.0, f64::NAN],
            end: [1.0, 1.0],
        };
        let flat = Circle2dDto {
            radius: 0.0,
            center: [0.0, 0.0],
        };
        assert!(matches!(geom.segment_2d(&point), Err(OccError::InvalidInput(_))));
        assert!(matches!(geom.segment_2d(&nan), Err(OccError::InvalidInput(_))));
        assert!(matches!(geom.circle_2d(&flat), Err(OccError::InvalidInput(_))));
        assert_eq!(memory.allocated_total(), 0);

        let curve = geom
            .circle_2d(&Circle2dDto {
                radius: 1.0,
                center: [2.0, 2.0],
            })
            .unwrap();
        assert_eq!(memory.live(NativeClass::Geometry), 1);
        drop(curve);
        assert_eq!(memory.live_total(), 0);
    }

    #[test]
    fn test_circle_from_edge_properties() {
        let (_memory, occ) = fixture();
        let circle = occ
            .edges()
            .create_circle_edge(&CircleDto {
                radius: 2.0,
                center: [1.0, 1.0, 0.0],
                direction: [0.0, 0.0, 1.0],
            })
            .unwrap();
        let circ = occ.base().geom().gp_circ_from_edge(&circle).unwrap();
        let (center, radius, normal) = occ.base().kernel().circ_properties(circ.id()).unwrap();
        assert_eq!(center, [1.0, 1.0, 0.0]);
        assert_relative_eq!(radius, 2.0);
        assert_eq!(normal, [0.0, 0.0, 1.0]);
    }
}
