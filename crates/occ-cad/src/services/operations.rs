//! Operations spanning several topological levels: sweeps, lofts and
//! boolean-based modeling

use std::sync::Arc;

use occ_core::inputs::{
    CutExtrusionDto, DifferenceDto, ExtrudeDto, ExtrudeShapesDto, FaceFromWireDto, LoftDto,
};
use occ_core::{ShapeKind, Vector3};

use super::{BooleansService, EdgesService, FacesService, WiresService};
use crate::error::{OccError, OccResult};
use crate::helper::OccBase;
use crate::kernel::{AlgorithmRequest, Face, Shape, Wire};

pub struct OperationsService {
    base: Arc<OccBase>,
    edges: Arc<EdgesService>,
    wires: Arc<WiresService>,
    faces: Arc<FacesService>,
    booleans: Arc<BooleansService>,
}

impl OperationsService {
    /// Create the operations service over the lower levels
    pub fn new(
        base: Arc<OccBase>,
        edges: Arc<EdgesService>,
        wires: Arc<WiresService>,
        faces: Arc<FacesService>,
        booleans: Arc<BooleansService>,
    ) -> Self {
        Self {
            base,
            edges,
            wires,
            faces,
            booleans,
        }
    }

    /// Linear sweep along `direction`: a vertex gives an edge, an edge a
    /// face, a wire a shell and a face a solid
    pub fn extrude(&self, dto: &ExtrudeDto<&Shape>) -> OccResult<Shape> {
        self.base.require_non_null(&[dto.shape])?;
        self.prism(dto.shape, dto.direction)
    }

    /// Extrude each shape along the same direction
    pub fn extrude_shapes(&self, dto: &ExtrudeShapesDto<&Shape>) -> OccResult<Vec<Shape>> {
        self.base.require_non_null(&dto.shapes)?;
        dto.shapes
            .iter()
            .map(|shape| self.prism(shape, dto.direction))
            .collect()
    }

    fn prism(&self, shape: &Shape, direction: Vector3) -> OccResult<Shape> {
        if self.base.vector().length(direction) == 0.0 {
            return Err(OccError::InvalidInput(
                "extrusion direction has no length".into(),
            ));
        }
        let vector = self.base.vec(direction)?;
        let request = AlgorithmRequest::Prism {
            shape: shape.id(),
            vector: vector.id(),
        };
        self.base.build_shape(&request, "extrude")
    }

    /// Ruled surface through the section wires in order. With `make_solid`
    /// the sections must be closed and the ends are capped.
    pub fn loft(&self, dto: &LoftDto<&Wire>) -> OccResult<Shape> {
        if dto.shapes.len() < 2 {
            return Err(OccError::InvalidInput(format!(
                "a loft needs at least 2 sections, got {}",
                dto.shapes.len()
            )));
        }
        self.base.require_non_null(&dto.shapes)?;

        let mut edge_counts = Vec::with_capacity(dto.shapes.len());
        for wire in &dto.shapes {
            edge_counts.push(self.edges.get_edges_along_wire(wire)?.len());
            if dto.make_solid && !self.wires.is_wire_closed(wire)? {
                return Err(OccError::InvalidInput(
                    "a solid loft needs closed sections".into(),
                ));
            }
        }
        if edge_counts.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(OccError::InvalidInput(format!(
                "loft sections must have matching edge counts, got {edge_counts:?}"
            )));
        }

        let request = AlgorithmRequest::ThruSections {
            wires: dto.shapes.iter().map(|w| w.id()).collect(),
            make_solid: dto.make_solid,
        };
        self.base.build_shape(&request, "loft")
    }

    /// Extrude a planar profile (closed wire or face) and subtract the
    /// resulting solid from `shape`
    pub fn cut_extrusion(&self, dto: &CutExtrusionDto<&Shape>) -> OccResult<Shape> {
        self.base.require_non_null(&[dto.shape, dto.profile])?;
        let filled: Face;
        let profile = match dto.profile.kind() {
            Some(ShapeKind::Face) => dto.profile,
            Some(ShapeKind::Wire) => {
                let wire = Wire::try_from(dto.profile.try_clone()?)?;
                filled = self.faces.create_face_from_wire(&FaceFromWireDto {
                    shape: &wire,
                    planar_only: true,
                })?;
                filled.shape()
            }
            other => {
                return Err(OccError::InvalidInput(format!(
                    "a cut profile must be a wire or a face, got {other:?}"
                )));
            }
        };
        let tool = self.prism(profile, dto.direction)?;
        self.booleans.difference(&DifferenceDto {
            shape: dto.shape,
            shapes: vec![&tool],
            keep_edges: false,
        })
    }
}
