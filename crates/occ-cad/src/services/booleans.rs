//! Boolean operations
//!
//! Unless `keep_edges` is set, results go through same-domain unification so
//! seams left by the operation are merged away.

use std::sync::Arc;

use occ_core::inputs::{DifferenceDto, IntersectionDto, UnionDto};

use crate::error::{OccError, OccResult};
use crate::helper::OccBase;
use crate::kernel::{AlgorithmRequest, BooleanOperation, Shape};

pub struct BooleansService {
    base: Arc<OccBase>,
}

impl BooleansService {
    /// Create a boolean service over the shared base
    pub fn new(base: Arc<OccBase>) -> Self {
        Self { base }
    }

    /// Fuse all shapes into one
    pub fn union(&self, dto: &UnionDto<&Shape>) -> OccResult<Shape> {
        let Some((first, rest)) = dto.shapes.split_first() else {
            return Err(OccError::InvalidInput("union needs at least one shape".into()));
        };
        self.run(BooleanOperation::Fuse, first, rest, dto.keep_edges)
    }

    /// Subtract every shape in `shapes` from `shape`
    pub fn difference(&self, dto: &DifferenceDto<&Shape>) -> OccResult<Shape> {
        self.run(BooleanOperation::Cut, dto.shape, &dto.shapes, dto.keep_edges)
    }

    /// Common volume of all shapes
    pub fn intersection(&self, dto: &IntersectionDto<&Shape>) -> OccResult<Shape> {
        let Some((first, rest)) = dto.shapes.split_first() else {
            return Err(OccError::InvalidInput(
                "intersection needs at least one shape".into(),
            ));
        };
        self.run(BooleanOperation::Common, first, rest, dto.keep_edges)
    }

    fn run(
        &self,
        operation: BooleanOperation,
        object: &Shape,
        tools: &[&Shape],
        keep_edges: bool,
    ) -> OccResult<Shape> {
        self.base.require_non_null(&[object])?;
        self.base.require_non_null(tools)?;
        let request = AlgorithmRequest::Boolean {
            operation,
            arguments: vec![object.id()],
            tools: tools.iter().map(|s| s.id()).collect(),
        };
        let result = self.base.build_shape(&request, "boolean operation")?;
        if keep_edges {
            return Ok(result);
        }
        self.base.unify_same_domain(&result, true, true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{GPropKind, NativeClass, Solid};
    use crate::testing::fixture;
    use crate::OccHelper;
    use approx::assert_relative_eq;
    use occ_core::ShapeKind;
    use occ_core::inputs::CubeDto;

    fn cube(occ: &OccHelper, center: [f64; 3]) -> Solid {
        occ.solids()
            .create_cube(&CubeDto { size: 1.0, center })
            .unwrap()
    }

    #[test]
    fn test_union_of_disjoint_cubes() {
        let (memory, occ) = fixture();
        let a = cube(&occ, [0.0; 3]);
        let b = cube(&occ, [3.0, 0.0, 0.0]);
        let fused = occ
            .booleans()
            .union(&UnionDto {
                shapes: vec![a.shape(), b.shape()],
                keep_edges: false,
            })
            .unwrap();
        assert_eq!(fused.kind(), Some(ShapeKind::Compound));
        assert_relative_eq!(
            occ.base().mass(&fused, GPropKind::Volume).unwrap(),
            2.0,
            epsilon = 1e-9
        );
        assert_eq!(memory.live(NativeClass::Algorithm), 0);
    }

    #[test]
    fn test_difference_with_distant_tool_keeps_volume() {
        let (_memory, occ) = fixture();
        let a = cube(&occ, [0.0; 3]);
        let b = cube(&occ, [0.0, 0.0, 5.0]);
        let cut = occ
            .booleans()
            .difference(&DifferenceDto {
                shape: a.shape(),
                shapes: vec![b.shape()],
                keep_edges: true,
            })
            .unwrap();
        assert_relative_eq!(
            occ.base().mass(&cut, GPropKind::Volume).unwrap(),
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_overlapping_operands_fail_cleanly() {
        let (memory, occ) = fixture();
        let a = cube(&occ, [0.0; 3]);
        let b = cube(&occ, [0.5, 0.0, 0.0]);
        let before = memory.live_total();
        let err = occ
            .booleans()
            .intersection(&IntersectionDto {
                shapes: vec![a.shape(), b.shape()],
                keep_edges: false,
            })
            .unwrap_err();
        assert!(matches!(err, OccError::ConstructionFailure(_)));
        assert_eq!(memory.live_total(), before);
    }

    #[test]
    fn test_empty_union_is_invalid() {
        let (memory, occ) = fixture();
        let err = occ
            .booleans()
            .union(&UnionDto {
                shapes: Vec::new(),
                keep_edges: false,
            })
            .unwrap_err();
        assert!(matches!(err, OccError::InvalidInput(_)));
        assert_eq!(memory.allocated_total(), 0);
    }
}
