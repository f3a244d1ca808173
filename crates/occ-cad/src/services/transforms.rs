//! Rigid and similarity transformations of shapes
//!
//! Every operation copies the input; angles are in degrees.

use std::sync::Arc;

use occ_core::inputs::{
    MirrorDto, RotateAroundCenterDto, RotateDto, ScaleAroundCenterDto, ScaleDto, TranslateDto,
};
use occ_core::{Point3, Vector3};

use crate::error::{OccError, OccResult};
use crate::helper::OccBase;
use crate::kernel::{AlgorithmRequest, GpTrsf, Shape};

const Z_AXIS: Vector3 = [0.0, 0.0, 1.0];

pub struct TransformsService {
    base: Arc<OccBase>,
}

impl TransformsService {
    /// Create the transform service
    pub fn new(base: Arc<OccBase>) -> Self {
        Self { base }
    }

    /// Copy of `shape` mapped through `trsf`
    pub fn transform(&self, shape: &Shape, trsf: &GpTrsf) -> OccResult<Shape> {
        self.base.require_non_null(&[shape])?;
        let request = AlgorithmRequest::Transform {
            shape: shape.id(),
            trsf: trsf.id(),
        };
        self.base.build_shape(&request, "transform")
    }

    /// Copy of a shape moved by `translation`
    pub fn translate(&self, dto: &TranslateDto<&Shape>) -> OccResult<Shape> {
        let trsf = self.base.entities().translation(dto.translation)?;
        self.transform(dto.shape, &trsf)
    }

    /// Rotation about an axis through the origin
    pub fn rotate(&self, dto: &RotateDto<&Shape>) -> OccResult<Shape> {
        self.rotate_around_center(&RotateAroundCenterDto {
            shape: dto.shape,
            axis: dto.axis,
            angle: dto.angle,
            center: [0.0; 3],
        })
    }

    /// Rotation about the axis through `center`, angle in degrees
    pub fn rotate_around_center(&self, dto: &RotateAroundCenterDto<&Shape>) -> OccResult<Shape> {
        let angle = self.base.vector().deg_to_rad(dto.angle);
        let trsf = self.base.entities().rotation(dto.center, dto.axis, angle)?;
        self.transform(dto.shape, &trsf)
    }

    /// Uniform scale about the origin
    pub fn scale(&self, dto: &ScaleDto<&Shape>) -> OccResult<Shape> {
        self.scale_around_center(&ScaleAroundCenterDto {
            shape: dto.shape,
            factor: dto.factor,
            center: [0.0; 3],
        })
    }

    /// Uniform scale about `center`
    pub fn scale_around_center(&self, dto: &ScaleAroundCenterDto<&Shape>) -> OccResult<Shape> {
        let trsf = self.base.entities().scaling(dto.center, dto.factor)?;
        self.transform(dto.shape, &trsf)
    }

    /// Mirror through the plane at `origin` with normal `direction`
    pub fn mirror(&self, dto: &MirrorDto<&Shape>) -> OccResult<Shape> {
        let trsf = self.base.entities().mirroring(dto.origin, dto.direction)?;
        self.transform(dto.shape, &trsf)
    }

    /// Move a profile drawn in the XY plane around the origin so that its
    /// plane normal becomes `direction` and its origin lands on `center`
    pub fn align_from_xy(&self, shape: &Shape, center: Point3, direction: Vector3) -> OccResult<Shape> {
        let vh = self.base.vector();
        let normal = vh.normalized(direction).ok_or_else(|| {
            OccError::InvalidInput(format!("direction {direction:?} has no length"))
        })?;

        let axis = vh.cross(Z_AXIS, normal);
        let rotated = if vh.length(axis) > 1e-12 {
            Some(self.rotate(&RotateDto {
                shape,
                axis,
                angle: vh.angle_between_deg(Z_AXIS, normal),
            })?)
        } else if normal[2] < 0.0 {
            Some(self.rotate(&RotateDto {
                shape,
                axis: [1.0, 0.0, 0.0],
                angle: 180.0,
            })?)
        } else {
            None
        };

        self.translate(&TranslateDto {
            shape: rotated.as_ref().unwrap_or(shape),
            translation: center,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{GPropKind, NativeClass};
    use crate::testing::{fixture, square_wire};
    use approx::assert_relative_eq;
    use occ_core::inputs::CubeDto;

    #[test]
    fn test_translate_moves_center_of_mass() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 2.0);
        let moved = occ
            .transforms()
            .translate(&TranslateDto {
                shape: wire.shape(),
                translation: [1.0, 2.0, 3.0],
            })
            .unwrap();
        let center = occ.base().center_of_mass(&moved, GPropKind::Linear).unwrap();
        assert_relative_eq!(center[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(center[1], 3.0, epsilon = 1e-9);
        assert_relative_eq!(center[2], 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 2.0);
        let rotated = occ
            .transforms()
            .rotate(&RotateDto {
                shape: wire.shape(),
                axis: [0.0, 0.0, 1.0],
                angle: 90.0,
            })
            .unwrap();
        let center = occ.base().center_of_mass(&rotated, GPropKind::Linear).unwrap();
        assert_relative_eq!(center[0], -1.0, epsilon = 1e-9);
        assert_relative_eq!(center[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scale_cube_volume() {
        let (memory, occ) = fixture();
        let cube = occ
            .solids()
            .create_cube(&CubeDto {
                size: 1.0,
                center: [0.0; 3],
            })
            .unwrap();
        let scaled = occ
            .transforms()
            .scale(&ScaleDto {
                shape: cube.shape(),
                factor: 2.0,
            })
            .unwrap();
        assert_relative_eq!(
            occ.base().mass(&scaled, GPropKind::Volume).unwrap(),
            8.0,
            epsilon = 1e-9
        );
        assert_eq!(memory.live(NativeClass::Primitive), 0);
        assert_eq!(memory.live(NativeClass::Algorithm), 0);
    }

    #[test]
    fn test_mirror_through_yz_plane() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 2.0);
        let mirrored = occ
            .transforms()
            .mirror(&MirrorDto {
                shape: wire.shape(),
                origin: [0.0; 3],
                direction: [1.0, 0.0, 0.0],
            })
            .unwrap();
        let center = occ.base().center_of_mass(&mirrored, GPropKind::Linear).unwrap();
        assert_relative_eq!(center[0], -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_align_flips_down_facing_profile() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 2.0);
        let aligned = occ
            .transforms()
            .align_from_xy(wire.shape(), [0.0, 0.0, 5.0], [0.0, 0.0, -1.0])
            .unwrap();
        let center = occ.base().center_of_mass(&aligned, GPropKind::Linear).unwrap();
        assert_relative_eq!(center[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(center[1], -1.0, epsilon = 1e-9);
        assert_relative_eq!(center[2], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_scale_is_invalid() {
        let (memory, occ) = fixture();
        let wire = square_wire(&occ, 1.0);
        let before = memory.live_total();
        let err = occ
            .transforms()
            .scale(&ScaleDto {
                shape: wire.shape(),
                factor: 0.0,
            })
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.live_total(), before);
    }
}
