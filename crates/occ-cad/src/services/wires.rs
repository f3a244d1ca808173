//! Wire construction and queries

use std::sync::Arc;

use occ_core::inputs::{
    CircleDto, EllipseDto, LineDto, PolygonDto, PolylineDto, RectangleDto, ShapeIndexDto,
    ShapesDto, SquareDto,
};
use occ_core::{Point3, ShapeKind, TypeSpecificity, Vector3};

use super::{EdgesService, TransformsService};
use crate::error::{KernelResultExt, OccError, OccResult};
use crate::helper::OccBase;
use crate::kernel::{AlgorithmRequest, GPropKind, Shape, Wire};

pub struct WiresService {
    base: Arc<OccBase>,
    edges: Arc<EdgesService>,
    transforms: Arc<TransformsService>,
}

impl WiresService {
    /// Create a wire service on top of the edge level
    pub fn new(
        base: Arc<OccBase>,
        edges: Arc<EdgesService>,
        transforms: Arc<TransformsService>,
    ) -> Self {
        Self {
            base,
            edges,
            transforms,
        }
    }

    // ========== Construction ==========

    /// Open chain of segments through the points
    pub fn create_polyline_wire(&self, dto: &PolylineDto) -> OccResult<Wire> {
        self.polygon(&dto.points, false)
    }

    /// Closed chain of segments; the last point connects back to the first
    pub fn create_polygon_wire(&self, dto: &PolygonDto) -> OccResult<Wire> {
        self.polygon(&dto.points, true)
    }

    fn polygon(&self, points: &[Point3], closed: bool) -> OccResult<Wire> {
        let needed = if closed { 3 } else { 2 };
        if points.len() < needed {
            return Err(OccError::InvalidInput(format!(
                "{} needs at least {needed} points, got {}",
                if closed { "a polygon" } else { "a polyline" },
                points.len()
            )));
        }
        let pnts = points
            .iter()
            .map(|p| self.base.pnt(*p))
            .collect::<OccResult<Vec<_>>>()?;
        let request = AlgorithmRequest::MakePolygon {
            points: pnts.iter().map(|p| p.id()).collect(),
            closed,
        };
        self.base.build_typed(&request, "make polygon")
    }

    /// Wire holding a single straight edge
    pub fn create_line_wire(&self, dto: &LineDto) -> OccResult<Wire> {
        let edge = self.edges.line(dto)?;
        self.base.make_wire(&[edge])
    }

    /// Connect edges and wires, in the given order, into a single wire
    pub fn combine_edges_and_wires_into_a_wire(&self, dto: &ShapesDto<&Shape>) -> OccResult<Wire> {
        self.base.make_wire(&dto.shapes)
    }

    /// Closed wire around a circle
    pub fn create_circle_wire(&self, dto: &CircleDto) -> OccResult<Wire> {
        Wire::try_from(self.base.create_circle(dto, TypeSpecificity::Wire)?)
    }

    /// Closed wire around an ellipse
    pub fn create_ellipse_wire(&self, dto: &EllipseDto) -> OccResult<Wire> {
        Wire::try_from(self.base.create_ellipse(dto, TypeSpecificity::Wire)?)
    }

    /// Square wire centered on `center`, normal to `direction`
    pub fn create_square_wire(&self, dto: &SquareDto) -> OccResult<Wire> {
        self.centered_rectangle(dto.size, dto.size, dto.center, dto.direction)
    }

    /// Rectangle with `width` along the local X axis and `length` along the
    /// local Y axis of the plane normal to `direction`
    pub fn create_rectangle_wire(&self, dto: &RectangleDto) -> OccResult<Wire> {
        self.centered_rectangle(dto.width, dto.length, dto.center, dto.direction)
    }

    fn centered_rectangle(
        &self,
        width: f64,
        length: f64,
        center: Point3,
        direction: Vector3,
    ) -> OccResult<Wire> {
        if !(width > 0.0 && length > 0.0) {
            return Err(OccError::InvalidInput(format!(
                "rectangle sides must be positive, got {width} x {length}"
            )));
        }
        let (w, l) = (width / 2.0, length / 2.0);
        let flat = self.polygon(
            &[[-w, -l, 0.0], [w, -l, 0.0], [w, l, 0.0], [-w, l, 0.0]],
            true,
        )?;
        let aligned = self
            .transforms
            .align_from_xy(flat.shape(), center, direction)?;
        Wire::try_from(aligned)
    }

    // ========== Lookup ==========

    /// Wire at an index in traversal order. Edges and vertices hold no wires
    /// and are rejected.
    pub fn get_wire(&self, dto: &ShapeIndexDto<&Shape>) -> OccResult<Wire> {
        self.base
            .indexed_sub_shape(dto.shape, dto.index, ShapeKind::Wire, |kind| {
                kind >= ShapeKind::Wire
            })
    }

    /// Distinct wires of a shape in traversal order
    pub fn get_wires(&self, shape: &Shape) -> OccResult<Vec<Wire>> {
        self.base.shape_getters().get_wires(shape)
    }

    // ========== Queries ==========

    /// Total length of the edges of a wire
    pub fn get_wire_length(&self, wire: &Wire) -> OccResult<f64> {
        self.base.mass(wire.shape(), GPropKind::Linear)
    }

    pub fn get_wires_lengths(&self, wires: &[&Wire]) -> OccResult<Vec<f64>> {
        wires.iter().map(|w| self.get_wire_length(w)).collect()
    }

    /// Whether the last edge ends where the first one starts
    pub fn is_wire_closed(&self, wire: &Wire) -> OccResult<bool> {
        self.base
            .kernel()
            .is_closed(wire.id())
            .during("wire closure")
    }

    /// Copy of a wire with flipped orientation
    pub fn reversed_wire(&self, wire: &Wire) -> OccResult<Wire> {
        self.base.reversed(wire.shape(), "reverse wire")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Edge, NativeClass};
    use crate::testing::{fixture, square_wire};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_polyline_is_open_polygon_is_closed() {
        let (_memory, occ) = fixture();
        let wires = occ.wires();
        let points = vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]];
        let open = wires
            .create_polyline_wire(&PolylineDto {
                points: points.clone(),
            })
            .unwrap();
        let closed = wires.create_polygon_wire(&PolygonDto { points }).unwrap();
        assert!(!wires.is_wire_closed(&open).unwrap());
        assert!(wires.is_wire_closed(&closed).unwrap());
        assert_relative_eq!(wires.get_wire_length(&open).unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(
            wires.get_wire_length(&closed).unwrap(),
            2.0 + 2.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_too_few_points_allocates_nothing() {
        let (memory, occ) = fixture();
        let err = occ
            .wires()
            .create_polygon_wire(&PolygonDto {
                points: vec![[0.0; 3], [1.0, 0.0, 0.0]],
            })
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.allocated_total(), 0);
    }

    #[test]
    fn test_combine_edges_and_wires() {
        let (memory, occ) = fixture();
        let first = occ
            .wires()
            .create_line_wire(&LineDto {
                start: [0.0; 3],
                end: [1.0, 0.0, 0.0],
            })
            .unwrap();
        let second = occ
            .edges()
            .line(&LineDto {
                start: [1.0, 0.0, 0.0],
                end: [1.0, 1.0, 0.0],
            })
            .unwrap();
        let combined = occ
            .wires()
            .combine_edges_and_wires_into_a_wire(&ShapesDto {
                shapes: vec![first.shape(), second.shape()],
            })
            .unwrap();
        assert_eq!(occ.edges().get_edges_along_wire(&combined).unwrap().len(), 2);
        drop((first, second, combined));
        assert_eq!(memory.live_total(), 0);
    }

    #[test]
    fn test_combine_rejects_faces() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 1.0);
        let face = occ.base().make_face(&wire, true).unwrap();
        let err = occ
            .wires()
            .combine_edges_and_wires_into_a_wire(&ShapesDto {
                shapes: vec![face.shape()],
            })
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
    }

    #[test]
    fn test_circle_and_ellipse_wires() {
        let (memory, occ) = fixture();
        let circle = occ
            .wires()
            .create_circle_wire(&CircleDto {
                radius: 2.0,
                center: [0.0; 3],
                direction: [0.0, 0.0, 1.0],
            })
            .unwrap();
        assert_relative_eq!(
            occ.wires().get_wire_length(&circle).unwrap(),
            4.0 * PI,
            epsilon = 1e-9
        );
        assert!(occ.wires().is_wire_closed(&circle).unwrap());

        let ellipse = occ
            .wires()
            .create_ellipse_wire(&EllipseDto {
                radius_minor: 1.0,
                radius_major: 1.0,
                center: [0.0; 3],
                direction: [1.0, 0.0, 0.0],
            })
            .unwrap();
        assert_relative_eq!(
            occ.wires().get_wire_length(&ellipse).unwrap(),
            2.0 * PI,
            epsilon = 1e-6
        );
        assert_eq!(memory.live(NativeClass::Geometry), 0);
    }

    #[test]
    fn test_rectangle_is_centered_and_aligned() {
        let (_memory, occ) = fixture();
        let rectangle = occ
            .wires()
            .create_rectangle_wire(&RectangleDto {
                width: 4.0,
                length: 2.0,
                center: [1.0, 1.0, 1.0],
                direction: [0.0, 1.0, 0.0],
            })
            .unwrap();
        assert_relative_eq!(
            occ.wires().get_wire_length(&rectangle).unwrap(),
            12.0,
            epsilon = 1e-9
        );
        let center = occ
            .base()
            .center_of_mass(rectangle.shape(), GPropKind::Linear)
            .unwrap();
        for (actual, expected) in center.iter().zip([1.0, 1.0, 1.0]) {
            assert_relative_eq!(*actual, expected, epsilon = 1e-9);
        }
        // every corner lies in the plane y = 1
        for point in occ.vertices().get_vertices_as_points(rectangle.shape()).unwrap() {
            assert_relative_eq!(point[1], 1.0, epsilon = 1e-9);
        }

        let square = occ
            .wires()
            .create_square_wire(&SquareDto {
                size: 3.0,
                center: [0.0; 3],
                direction: [0.0, 0.0, 1.0],
            })
            .unwrap();
        let lengths = occ.wires().get_wires_lengths(&[&rectangle, &square]).unwrap();
        assert_relative_eq!(lengths[1], 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_get_wire_rules() {
        let (memory, occ) = fixture();
        let wire = square_wire(&occ, 1.0);
        let face = occ.base().make_face(&wire, true).unwrap();
        let outer = occ
            .wires()
            .get_wire(&ShapeIndexDto::new(face.shape(), 0))
            .unwrap();
        assert_relative_eq!(occ.wires().get_wire_length(&outer).unwrap(), 4.0);
        assert_eq!(occ.wires().get_wires(face.shape()).unwrap().len(), 1);

        let err = occ
            .wires()
            .get_wire(&ShapeIndexDto::new(face.shape(), 1))
            .unwrap_err();
        assert!(matches!(err, OccError::NotFound(_)));

        let edge: Edge = occ.edges().get_edge(&ShapeIndexDto::new(wire.shape(), 0)).unwrap();
        let allocated = memory.allocated_total();
        let err = occ
            .wires()
            .get_wire(&ShapeIndexDto::new(edge.shape(), 0))
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.allocated_total(), allocated);
    }

    #[test]
    fn test_reversed_wire_runs_backwards() {
        let (_memory, occ) = fixture();
        let wire = occ
            .wires()
            .create_polyline_wire(&PolylineDto {
                points: vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 2.0, 0.0]],
            })
            .unwrap();
        let reversed = occ.wires().reversed_wire(&wire).unwrap();
        let edges = occ.edges().get_edges_along_wire(&reversed).unwrap();
        let first = occ.edges().start_point_on_edge(&edges[0]).unwrap();
        assert_relative_eq!(first[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(
            occ.wires().get_wire_length(&reversed).unwrap(),
            3.0,
            epsilon = 1e-12
        );
    }
}
