//! Planar corner rounding
//!
//! Corner `k` of a profile is the start vertex of its `k`-th edge in
//! traversal order. Without explicit indexes every corner between two
//! straight edges is rounded.

use std::sync::Arc;

use occ_core::ShapeKind;
use occ_core::inputs::{
    ExtrudeDto, FaceFromWireDto, FilletDto, FilletShapesDto, RoundedPrismDto, ShapeIndexDto,
};

use super::{FacesService, OperationsService, WiresService};
use crate::error::{OccError, OccResult};
use crate::helper::OccBase;
use crate::kernel::{AlgorithmRequest, Face, Shape, Wire};

pub struct FilletsService {
    base: Arc<OccBase>,
    wires: Arc<WiresService>,
    faces: Arc<FacesService>,
    operations: Arc<OperationsService>,
}

impl FilletsService {
    /// Create the fillet service over the wire, face and operation levels
    pub fn new(
        base: Arc<OccBase>,
        wires: Arc<WiresService>,
        faces: Arc<FacesService>,
        operations: Arc<OperationsService>,
    ) -> Self {
        Self {
            base,
            wires,
            faces,
            operations,
        }
    }

    /// Round corners of a planar face or a closed planar wire. The result has
    /// the kind of the input.
    pub fn fillet_2d(&self, dto: &FilletDto<&Shape>) -> OccResult<Shape> {
        if !(dto.radius > 0.0) || !dto.radius.is_finite() {
            return Err(OccError::InvalidInput(format!(
                "fillet radius must be positive, got {}",
                dto.radius
            )));
        }
        self.base.require_non_null(&[dto.shape])?;
        match dto.shape.kind() {
            Some(ShapeKind::Face) => {
                let rounded = self.fillet_face(dto.shape, dto.radius, dto.indexes.as_deref())?;
                Ok(rounded.into_shape())
            }
            Some(ShapeKind::Wire) => {
                let wire = Wire::try_from(dto.shape.try_clone()?)?;
                Ok(self
                    .fillet_wire(&wire, dto.radius, dto.indexes.as_deref())?
                    .into_shape())
            }
            other => Err(OccError::InvalidInput(format!(
                "only faces and wires can be filleted in 2D, got {other:?}"
            ))),
        }
    }

    /// Round every corner of each shape with one radius
    pub fn fillet_2d_shapes(&self, dto: &FilletShapesDto<&Shape>) -> OccResult<Vec<Shape>> {
        dto.shapes
            .iter()
            .map(|shape| {
                self.fillet_2d(&FilletDto {
                    shape: *shape,
                    radius: dto.radius,
                    indexes: None,
                })
            })
            .collect()
    }

    /// Fillet every corner of a profile, then extrude it along `direction`
    pub fn rounded_prism(&self, dto: &RoundedPrismDto<&Shape>) -> OccResult<Shape> {
        let rounded = self.fillet_2d(&FilletDto {
            shape: dto.shape,
            radius: dto.radius,
            indexes: None,
        })?;
        let profile = match rounded.kind() {
            Some(ShapeKind::Wire) => {
                let wire = Wire::try_from(rounded)?;
                self.faces
                    .create_face_from_wire(&FaceFromWireDto {
                        shape: &wire,
                        planar_only: true,
                    })?
                    .into_shape()
            }
            _ => rounded,
        };
        self.operations.extrude(&ExtrudeDto {
            shape: &profile,
            direction: dto.direction,
        })
    }

    fn fillet_face(&self, face: &Shape, radius: f64, corners: Option<&[usize]>) -> OccResult<Face> {
        let request = AlgorithmRequest::Fillet2d {
            face: face.id(),
            radius,
            corners: corners.map(<[usize]>::to_vec),
        };
        self.base.build_typed(&request, "fillet 2d")
    }

    /// Wires are filleted through a temporary face whose outer wire is
    /// returned
    fn fillet_wire(&self, wire: &Wire, radius: f64, corners: Option<&[usize]>) -> OccResult<Wire> {
        if !self.wires.is_wire_closed(wire)? {
            return Err(OccError::InvalidInput(
                "only closed wires can be filleted".into(),
            ));
        }
        let face = self.faces.create_face_from_wire(&FaceFromWireDto {
            shape: wire,
            planar_only: true,
        })?;
        let rounded = self.fillet_face(face.shape(), radius, corners)?;
        self.wires
            .get_wire(&ShapeIndexDto::new(rounded.shape(), 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{GPropKind, NativeClass};
    use crate::testing::{fixture, square_wire};
    use approx::assert_relative_eq;
    use occ_core::inputs::{CircleDto, PolylineDto};
    use std::f64::consts::PI;

    #[test]
    fn test_fillet_closed_wire() {
        let (memory, occ) = fixture();
        let wire = square_wire(&occ, 2.0);
        let rounded = occ
            .fillets()
            .fillet_2d(&FilletDto {
                shape: wire.shape(),
                radius: 0.5,
                indexes: None,
            })
            .unwrap();
        assert_eq!(rounded.kind(), Some(ShapeKind::Wire));
        // four straight sides shortened by 2r, plus one full circle of arcs
        assert_relative_eq!(
            occ.base().mass(&rounded, GPropKind::Linear).unwrap(),
            4.0 * 1.0 + PI,
            epsilon = 1e-9
        );
        assert_eq!(occ.edges().get_edges(&rounded).unwrap().len(), 8);
        drop((wire, rounded));
        assert_eq!(memory.live_total(), 0);
    }

    #[test]
    fn test_fillet_open_wire_is_invalid() {
        let (memory, occ) = fixture();
        let open = occ
            .wires()
            .create_polyline_wire(&PolylineDto {
                points: vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
            })
            .unwrap();
        let before = memory.live_total();
        let err = occ
            .fillets()
            .fillet_2d(&FilletDto {
                shape: open.shape(),
                radius: 0.1,
                indexes: None,
            })
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.live_total(), before);
    }

    #[test]
    fn test_fillet_rejects_bad_radius_and_kind() {
        let (memory, occ) = fixture();
        let wire = square_wire(&occ, 1.0);
        let allocated = memory.allocated_total();
        for radius in [0.0, -1.0, f64::NAN] {
            let err = occ
                .fillets()
                .fillet_2d(&FilletDto {
                    shape: wire.shape(),
                    radius,
                    indexes: None,
                })
                .unwrap_err();
            assert!(matches!(err, OccError::InvalidInput(_)));
        }
        assert_eq!(memory.allocated_total(), allocated);

        let edges = occ.edges().get_edges(wire.shape()).unwrap();
        let err = occ
            .fillets()
            .fillet_2d(&FilletDto {
                shape: edges[0].shape(),
                radius: 0.1,
                indexes: None,
            })
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
    }

    #[test]
    fn test_radius_too_large_fails_cleanly() {
        let (memory, occ) = fixture();
        let wire = square_wire(&occ, 1.0);
        let face = occ.base().make_face(&wire, true).unwrap();
        let before = memory.live_total();
        let err = occ
            .fillets()
            .fillet_2d(&FilletDto {
                shape: face.shape(),
                radius: 2.0,
                indexes: None,
            })
            .unwrap_err();
        assert!(matches!(err, OccError::ConstructionFailure(_)));
        assert_eq!(memory.live_total(), before);
        assert_eq!(memory.live(NativeClass::Algorithm), 0);
    }

    #[test]
    fn test_corner_index_out_of_range() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 1.0);
        let face = occ.base().make_face(&wire, true).unwrap();
        let err = occ
            .fillets()
            .fillet_2d(&FilletDto {
                shape: face.shape(),
                radius: 0.1,
                indexes: Some(vec![4]),
            })
            .unwrap_err();
        assert!(matches!(err, OccError::ConstructionFailure(_)));
    }

    #[test]
    fn test_fillet_many_shapes() {
        let (_memory, occ) = fixture();
        let small = square_wire(&occ, 1.0);
        let large = square_wire(&occ, 3.0);
        let face = occ.base().make_face(&large, true).unwrap();
        let rounded = occ
            .fillets()
            .fillet_2d_shapes(&FilletShapesDto {
                shapes: vec![small.shape(), face.shape()],
                radius: 0.25,
            })
            .unwrap();
        assert_eq!(rounded[0].kind(), Some(ShapeKind::Wire));
        assert_eq!(rounded[1].kind(), Some(ShapeKind::Face));
        let corner_loss = 4.0 * 0.25 * 0.25 * (1.0 - PI / 4.0);
        assert_relative_eq!(
            occ.base().mass(&rounded[1], GPropKind::Surface).unwrap(),
            9.0 - corner_loss,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_rounded_prism() {
        let (memory, occ) = fixture();
        let wire = square_wire(&occ, 2.0);
        let prism = occ
            .fillets()
            .rounded_prism(&RoundedPrismDto {
                shape: wire.shape(),
                radius: 0.5,
                direction: [0.0, 0.0, 2.0],
            })
            .unwrap();
        assert_eq!(prism.kind(), Some(ShapeKind::Solid));
        let area = 4.0 - 4.0 * 0.25 * (1.0 - PI / 4.0);
        assert_relative_eq!(
            occ.base().mass(&prism, GPropKind::Volume).unwrap(),
            2.0 * area,
            epsilon = 1e-6
        );
        drop((wire, prism));
        assert_eq!(memory.live_total(), 0);
    }

    #[test]
    fn test_circle_has_no_corners_to_round() {
        let (_memory, occ) = fixture();
        let disc = occ
            .faces()
            .create_circle_face(&CircleDto {
                radius: 1.0,
                center: [0.0; 3],
                direction: [0.0, 0.0, 1.0],
            })
            .unwrap();
        let same = occ
            .fillets()
            .fillet_2d(&FilletDto {
                shape: disc.shape(),
                radius: 0.1,
                indexes: None,
            })
            .unwrap();
        assert_relative_eq!(
            occ.base().mass(&same, GPropKind::Surface).unwrap(),
            PI,
            epsilon = 1e-6
        );
    }
}
