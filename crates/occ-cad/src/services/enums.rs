//! Translation between kernel enumerations and facade enumerations

use occ_core::{Orientation, ShapeKind};

use crate::kernel::{TopAbsOrientation, TopAbsShapeEnum};

/// Stateless enum translation table
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumService;

impl EnumService {
    /// Create the enum mapper
    pub fn new() -> Self {
        Self
    }

    /// Facade kind of a kernel shape type, `None` for the abstract `Shape`
    pub fn shape_kind(&self, shape_type: TopAbsShapeEnum) -> Option<ShapeKind> {
        match shape_type {
            TopAbsShapeEnum::Vertex => Some(ShapeKind::Vertex),
            TopAbsShapeEnum::Edge => Some(ShapeKind::Edge),
            TopAbsShapeEnum::Wire => Some(ShapeKind::Wire),
            TopAbsShapeEnum::Face => Some(ShapeKind::Face),
            TopAbsShapeEnum::Shell => Some(ShapeKind::Shell),
            TopAbsShapeEnum::Solid => Some(ShapeKind::Solid),
            TopAbsShapeEnum::CompSolid => Some(ShapeKind::CompSolid),
            TopAbsShapeEnum::Compound => Some(ShapeKind::Compound),
            TopAbsShapeEnum::Shape => None,
        }
    }

    /// Kernel shape type for a facade kind
    pub fn top_abs(&self, kind: ShapeKind) -> TopAbsShapeEnum {
        match kind {
            ShapeKind::Vertex => TopAbsShapeEnum::Vertex,
            ShapeKind::Edge => TopAbsShapeEnum::Edge,
            ShapeKind::Wire => TopAbsShapeEnum::Wire,
            ShapeKind::Face => TopAbsShapeEnum::Face,
            ShapeKind::Shell => TopAbsShapeEnum::Shell,
            ShapeKind::Solid => TopAbsShapeEnum::Solid,
            ShapeKind::CompSolid => TopAbsShapeEnum::CompSolid,
            ShapeKind::Compound => TopAbsShapeEnum::Compound,
        }
    }

    /// Facade orientation of a kernel orientation
    pub fn orientation(&self, orientation: TopAbsOrientation) -> Orientation {
        match orientation {
            TopAbsOrientation::Forward => Orientation::Forward,
            TopAbsOrientation::Reversed => Orientation::Reversed,
            TopAbsOrientation::Internal => Orientation::Internal,
            TopAbsOrientation::External => Orientation::External,
        }
    }
}
