//! Solid construction and queries

use std::sync::Arc;

use occ_core::Point3;
use occ_core::inputs::{BoxDto, CubeDto, TranslateDto};

use super::{FacesService, TransformsService};
use crate::error::{OccError, OccResult};
use crate::helper::OccBase;
use crate::kernel::{AlgorithmRequest, Face, GPropKind, Shape, Shell, Solid};

pub struct SolidsService {
    base: Arc<OccBase>,
    faces: Arc<FacesService>,
    transforms: Arc<TransformsService>,
}

impl SolidsService {
    /// Create a solid service on top of the face level
    pub fn new(
        base: Arc<OccBase>,
        faces: Arc<FacesService>,
        transforms: Arc<TransformsService>,
    ) -> Self {
        Self {
            base,
            faces,
            transforms,
        }
    }

    /// Axis-aligned box centered on `center`: `width` along X, `length`
    /// along Y, `height` along Z
    pub fn create_box(&self, dto: &BoxDto) -> OccResult<Solid> {
        let sizes = [dto.width, dto.length, dto.height];
        if sizes.iter().any(|s| !(*s > 0.0)) {
            return Err(OccError::InvalidInput(format!(
                "box sizes must be positive, got {sizes:?}"
            )));
        }
        let corner = self.base.pnt(sizes.map(|s| -s / 2.0))?;
        let request = AlgorithmRequest::MakeBox {
            corner: corner.id(),
            dx: dto.width,
            dy: dto.length,
            dz: dto.height,
        };
        let centered = self.base.build_shape(&request, "make box")?;
        let placed = self.transforms.translate(&TranslateDto {
            shape: &centered,
            translation: dto.center,
        })?;
        Solid::try_from(placed)
    }

    /// Cube of side `size` centered on `center`
    pub fn create_cube(&self, dto: &CubeDto) -> OccResult<Solid> {
        self.create_box(&BoxDto {
            width: dto.size,
            length: dto.size,
            height: dto.size,
            center: dto.center,
        })
    }

    /// Solid bounded by a closed shell
    pub fn from_closed_shell(&self, shell: &Shell) -> OccResult<Solid> {
        self.base.require_non_null(&[shell])?;
        self.base
            .build_typed(&AlgorithmRequest::MakeSolid { shell: shell.id() }, "make solid")
    }

    /// Distinct solids of a shape in traversal order
    pub fn get_solids(&self, shape: &Shape) -> OccResult<Vec<Solid>> {
        self.base.shape_getters().get_solids(shape)
    }

    /// Volume enclosed by a solid
    pub fn get_solid_volume(&self, solid: &Solid) -> OccResult<f64> {
        self.base.mass(solid.shape(), GPropKind::Volume)
    }

    /// Total area of the faces of a solid
    pub fn get_solid_surface_area(&self, solid: &Solid) -> OccResult<f64> {
        let faces = self.faces.get_faces(solid.shape())?;
        let refs: Vec<&Face> = faces.iter().collect();
        Ok(self.faces.get_faces_areas(&refs)?.into_iter().sum())
    }

    /// Volume center of mass of a solid
    pub fn get_solid_center_of_mass(&self, solid: &Solid) -> OccResult<Point3> {
        self.base.center_of_mass(solid.shape(), GPropKind::Volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::NativeClass;
    use crate::testing::fixture;
    use approx::assert_relative_eq;
    use occ_core::inputs::{CircleDto, SewDto};

    #[test]
    fn test_box_measures() {
        let (memory, occ) = fixture();
        let solid = occ
            .solids()
            .create_box(&BoxDto {
                width: 1.0,
                length: 2.0,
                height: 3.0,
                center: [5.0, 0.0, -1.0],
            })
            .unwrap();
        let solids = occ.solids();
        assert_relative_eq!(solids.get_solid_volume(&solid).unwrap(), 6.0, epsilon = 1e-9);
        assert_relative_eq!(
            solids.get_solid_surface_area(&solid).unwrap(),
            2.0 * (2.0 + 3.0 + 6.0),
            epsilon = 1e-9
        );
        let center = solids.get_solid_center_of_mass(&solid).unwrap();
        for (actual, expected) in center.iter().zip([5.0, 0.0, -1.0]) {
            assert_relative_eq!(*actual, expected, epsilon = 1e-9);
        }
        assert_eq!(memory.live(NativeClass::Primitive), 0);
        assert_eq!(memory.live(NativeClass::Algorithm), 0);
        drop(solid);
        assert_eq!(memory.live_total(), 0);
    }

    #[test]
    fn test_flat_box_is_invalid() {
        let (memory, occ) = fixture();
        let err = occ
            .solids()
            .create_box(&BoxDto {
                width: 1.0,
                length: 0.0,
                height: 1.0,
                center: [0.0; 3],
            })
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.allocated_total(), 0);
    }

    #[test]
    fn test_solid_from_sewn_cube_shell() {
        let (_memory, occ) = fixture();
        let cube = occ
            .solids()
            .create_cube(&CubeDto {
                size: 2.0,
                center: [0.0; 3],
            })
            .unwrap();
        let faces = occ.faces().get_faces(cube.shape()).unwrap();
        let shell = occ
            .shells()
            .sew_faces(&SewDto {
                shapes: faces.iter().collect(),
                tolerance: None,
            })
            .unwrap();
        let solid = occ.solids().from_closed_shell(&shell).unwrap();
        assert_relative_eq!(
            occ.solids().get_solid_volume(&solid).unwrap(),
            8.0,
            epsilon = 1e-9
        );
        assert_eq!(occ.solids().get_solids(solid.shape()).unwrap().len(), 1);
    }

    #[test]
    fn test_open_shell_is_not_a_solid() {
        let (memory, occ) = fixture();
        let disc = occ
            .faces()
            .create_circle_face(&CircleDto {
                radius: 1.0,
                center: [0.0; 3],
                direction: [0.0, 0.0, 1.0],
            })
            .unwrap();
        let shell = occ
            .shells()
            .sew_faces(&SewDto {
                shapes: vec![&disc],
                tolerance: None,
            })
            .unwrap();
        let before = memory.live_total();
        let err = occ.solids().from_closed_shell(&shell).unwrap_err();
        assert!(matches!(err, OccError::ConstructionFailure(_)));
        assert_eq!(memory.live_total(), before);
    }
}
