//! Face construction and queries
//!
//! Faces hold the one association that points up the service graph: face
//! fillets are delegated to [`FilletsService`], which is built after this
//! service and attached once by the facade.

use std::sync::{Arc, OnceLock, Weak};

use occ_core::inputs::{
    CircleDto, EllipseDto, FaceFromWireDto, FaceFromWireOnPlaneDto, FilletDto, PolygonDto,
    RectangleDto, ShapeIndexDto, SquareDto,
};
use occ_core::{Point3, ShapeKind, TypeSpecificity};
use tracing::warn;

use super::{FilletsService, WiresService};
use crate::error::{OccError, OccResult};
use crate::helper::OccBase;
use crate::kernel::{AlgorithmRequest, Face, GPropKind, Shape, Wire};

pub struct FacesService {
    base: Arc<OccBase>,
    wires: Arc<WiresService>,
    fillets: OnceLock<Weak<FilletsService>>,
}

impl FacesService {
    /// Create a face service on top of the wire level
    pub fn new(base: Arc<OccBase>, wires: Arc<WiresService>) -> Self {
        Self {
            base,
            wires,
            fillets: OnceLock::new(),
        }
    }

    /// Link the fillet service. Only the first call has an effect.
    pub(crate) fn attach_fillets(&self, fillets: &Arc<FilletsService>) {
        if self.fillets.set(Arc::downgrade(fillets)).is_err() {
            warn!("fillet service already attached to faces, ignoring");
        }
    }

    // ========== Construction ==========

    /// Face bounded by a closed wire; with `planar_only` a non-planar wire fails
    pub fn create_face_from_wire(&self, dto: &FaceFromWireDto<&Wire>) -> OccResult<Face> {
        self.base.require_non_null(&[dto.shape])?;
        self.base.make_face(dto.shape, dto.planar_only)
    }

    /// Face bounded by `shape` on the plane through `plane_origin` with
    /// normal `plane_normal`
    pub fn create_face_from_wire_on_plane(
        &self,
        dto: &FaceFromWireOnPlaneDto<&Wire>,
    ) -> OccResult<Face> {
        self.base.require_non_null(&[dto.shape])?;
        let plane = self
            .base
            .geom()
            .plane_surface(dto.plane_origin, dto.plane_normal)?;
        let request = AlgorithmRequest::MakeFace {
            wire: dto.shape.id(),
            surface: Some(plane.id()),
            planar_only: true,
        };
        self.base.build_typed(&request, "make face on plane")
    }

    /// Disc bounded by a circle
    pub fn create_circle_face(&self, dto: &CircleDto) -> OccResult<Face> {
        Face::try_from(self.base.create_circle(dto, TypeSpecificity::Face)?)
    }

    /// Face bounded by an ellipse
    pub fn create_ellipse_face(&self, dto: &EllipseDto) -> OccResult<Face> {
        Face::try_from(self.base.create_ellipse(dto, TypeSpecificity::Face)?)
    }

    /// Square face centered on `center`, normal to `direction`
    pub fn create_square_face(&self, dto: &SquareDto) -> OccResult<Face> {
        let wire = self.wires.create_square_wire(dto)?;
        self.base.make_face(&wire, true)
    }

    /// Rectangular face centered on `center`, normal to `direction`
    pub fn create_rectangle_face(&self, dto: &RectangleDto) -> OccResult<Face> {
        let wire = self.wires.create_rectangle_wire(dto)?;
        self.base.make_face(&wire, true)
    }

    /// Planar face bounded by a closed polygon
    pub fn create_polygon_face(&self, dto: &PolygonDto) -> OccResult<Face> {
        let wire = self.wires.create_polygon_wire(dto)?;
        self.base.make_face(&wire, true)
    }

    /// Round the corners of a planar face
    pub fn fillet_face(&self, dto: &FilletDto<&Face>) -> OccResult<Face> {
        let fillets = self
            .fillets
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| {
                OccError::ConstructionFailure("fillet service is not available".into())
            })?;
        let rounded = fillets.fillet_2d(&FilletDto {
            shape: dto.shape.shape(),
            radius: dto.radius,
            indexes: dto.indexes.clone(),
        })?;
        Face::try_from(rounded)
    }

    /// Copy of a face with flipped orientation
    pub fn reversed_face(&self, face: &Face) -> OccResult<Face> {
        self.base.reversed(face.shape(), "reverse face")
    }

    // ========== Lookup ==========

    /// Face at an index in traversal order. Only wires and lower levels are rejected.
    pub fn get_face(&self, dto: &ShapeIndexDto<&Shape>) -> OccResult<Face> {
        self.base
            .indexed_sub_shape(dto.shape, dto.index, ShapeKind::Face, |kind| {
                kind >= ShapeKind::Face
            })
    }

    /// Distinct faces of a shape in traversal order
    pub fn get_faces(&self, shape: &Shape) -> OccResult<Vec<Face>> {
        self.base.shape_getters().get_faces(shape)
    }

    // ========== Queries ==========

    /// Surface area of a face
    pub fn get_face_area(&self, face: &Face) -> OccResult<f64> {
        self.base.mass(face.shape(), GPropKind::Surface)
    }

    pub fn get_faces_areas(&self, faces: &[&Face]) -> OccResult<Vec<f64>> {
        faces.iter().map(|f| self.get_face_area(f)).collect()
    }

    /// Center of mass of a face
    pub fn get_face_center_of_mass(&self, face: &Face) -> OccResult<Point3> {
        self.base.center_of_mass(face.shape(), GPropKind::Surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{MemoryKernel, NativeClass};
    use crate::services::{EdgesService, TransformsService, VerticesService};
    use crate::testing::{fixture, square_wire};
    use approx::assert_relative_eq;
    use occ_core::OccConfig;
    use occ_core::inputs::CubeDto;
    use std::f64::consts::PI;

    #[test]
    fn test_face_from_square_wire() {
        let (memory, occ) = fixture();
        let wire = square_wire(&occ, 2.0);
        let face = occ
            .faces()
            .create_face_from_wire(&FaceFromWireDto {
                shape: &wire,
                planar_only: true,
            })
            .unwrap();
        assert_relative_eq!(occ.faces().get_face_area(&face).unwrap(), 4.0, epsilon = 1e-9);
        let center = occ.faces().get_face_center_of_mass(&face).unwrap();
        assert_relative_eq!(center[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(center[1], 1.0, epsilon = 1e-9);
        assert_eq!(memory.live(NativeClass::Algorithm), 0);
    }

    #[test]
    fn test_face_on_explicit_plane() {
        let (memory, occ) = fixture();
        let wire = square_wire(&occ, 3.0);
        let face = occ
            .faces()
            .create_face_from_wire_on_plane(&FaceFromWireOnPlaneDto {
                shape: &wire,
                plane_origin: [0.0; 3],
                plane_normal: [0.0, 0.0, 1.0],
            })
            .unwrap();
        assert_relative_eq!(occ.faces().get_face_area(&face).unwrap(), 9.0, epsilon = 1e-9);
        assert_eq!(memory.live(NativeClass::Geometry), 0);
    }

    #[test]
    fn test_standard_faces() {
        let (_memory, occ) = fixture();
        let faces = occ.faces();
        let circle = faces
            .create_circle_face(&CircleDto {
                radius: 1.0,
                center: [0.0; 3],
                direction: [0.0, 0.0, 1.0],
            })
            .unwrap();
        let ellipse = faces
            .create_ellipse_face(&EllipseDto {
                radius_minor: 1.0,
                radius_major: 2.0,
                center: [0.0; 3],
                direction: [0.0, 0.0, 1.0],
            })
            .unwrap();
        let square = faces
            .create_square_face(&SquareDto {
                size: 2.0,
                center: [0.0; 3],
                direction: [1.0, 0.0, 0.0],
            })
            .unwrap();
        let rectangle = faces
            .create_rectangle_face(&RectangleDto {
                width: 2.0,
                length: 3.0,
                center: [0.0; 3],
                direction: [0.0, 0.0, 1.0],
            })
            .unwrap();
        let triangle = faces
            .create_polygon_face(&PolygonDto {
                points: vec![[0.0; 3], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]],
            })
            .unwrap();
        let areas = faces
            .get_faces_areas(&[&circle, &ellipse, &square, &rectangle, &triangle])
            .unwrap();
        let expected = [PI, 2.0 * PI, 4.0, 6.0, 2.0];
        for (area, expected) in areas.into_iter().zip(expected) {
            assert_relative_eq!(area, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_get_face_from_solid() {
        let (memory, occ) = fixture();
        let cube = occ
            .solids()
            .create_cube(&CubeDto {
                size: 2.0,
                center: [0.0; 3],
            })
            .unwrap();
        assert_eq!(occ.faces().get_faces(cube.shape()).unwrap().len(), 6);
        let face = occ
            .faces()
            .get_face(&ShapeIndexDto {
                shape: Some(cube.shape()),
                index: None,
            })
            .unwrap();
        assert_relative_eq!(occ.faces().get_face_area(&face).unwrap(), 4.0, epsilon = 1e-9);

        let err = occ
            .faces()
            .get_face(&ShapeIndexDto::new(cube.shape(), 6))
            .unwrap_err();
        assert!(matches!(err, OccError::NotFound(_)));

        let wire = square_wire(&occ, 1.0);
        let allocated = memory.allocated_total();
        let err = occ
            .faces()
            .get_face(&ShapeIndexDto::new(wire.shape(), 0))
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.allocated_total(), allocated);
    }

    #[test]
    fn test_reversed_face_keeps_area() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 2.0);
        let face = occ.base().make_face(&wire, true).unwrap();
        let reversed = occ.faces().reversed_face(&face).unwrap();
        assert_eq!(reversed.shape().kind(), Some(ShapeKind::Face));
        assert_relative_eq!(
            occ.faces().get_face_area(&reversed).unwrap(),
            4.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_fillet_face_without_fillets_fails() {
        let memory = Arc::new(MemoryKernel::default());
        let base = Arc::new(OccBase::new(memory.clone(), OccConfig::default()));
        let transforms = Arc::new(TransformsService::new(base.clone()));
        let vertices = Arc::new(VerticesService::new(base.clone()));
        let edges = Arc::new(EdgesService::new(base.clone(), vertices));
        let wires = Arc::new(WiresService::new(base.clone(), edges, transforms));
        let faces = FacesService::new(base, wires);

        let face = faces
            .create_polygon_face(&PolygonDto {
                points: vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
            })
            .unwrap();
        let err = faces
            .fillet_face(&FilletDto {
                shape: &face,
                radius: 0.1,
                indexes: None,
            })
            .unwrap_err();
        assert!(matches!(err, OccError::ConstructionFailure(_)));
    }

    #[test]
    fn test_fillet_selected_corner() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 2.0);
        let face = occ.base().make_face(&wire, true).unwrap();
        let rounded = occ
            .faces()
            .fillet_face(&FilletDto {
                shape: &face,
                radius: 0.5,
                indexes: Some(vec![0]),
            })
            .unwrap();
        // one corner loses a square of r^2 and gains a quarter disc
        let expected = 4.0 - 0.25 + PI * 0.25 / 4.0;
        assert_relative_eq!(
            occ.faces().get_face_area(&rounded).unwrap(),
            expected,
            epsilon = 1e-6
        );
    }
}
