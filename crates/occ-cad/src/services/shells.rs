//! Shell construction and queries

use std::sync::Arc;

use occ_core::inputs::SewDto;

use super::FacesService;
use crate::error::{KernelResultExt, OccError, OccResult};
use crate::helper::OccBase;
use crate::kernel::{AlgorithmRequest, Face, Shape, Shell};

pub struct ShellsService {
    base: Arc<OccBase>,
    faces: Arc<FacesService>,
}

impl ShellsService {
    /// Create a shell service on top of the face level
    pub fn new(base: Arc<OccBase>, faces: Arc<FacesService>) -> Self {
        Self { base, faces }
    }

    /// Sew faces into one shell, merging vertices and edges that lie within
    /// the tolerance. Without a tolerance the configured sewing tolerance is
    /// used.
    pub fn sew_faces(&self, dto: &SewDto<&Face>) -> OccResult<Shell> {
        if dto.shapes.is_empty() {
            return Err(OccError::InvalidInput("no faces to sew".into()));
        }
        self.base.require_non_null(&dto.shapes)?;
        let tolerance = dto
            .tolerance
            .unwrap_or(self.base.config().sewing_tolerance);
        if !(tolerance >= 0.0) {
            return Err(OccError::InvalidInput(format!(
                "sewing tolerance must be non-negative, got {tolerance}"
            )));
        }
        let request = AlgorithmRequest::Sewing {
            shapes: dto.shapes.iter().map(|f| f.id()).collect(),
            tolerance,
        };
        self.base.build_typed(&request, "sewing")
    }

    /// Distinct shells of a shape in traversal order
    pub fn get_shells(&self, shape: &Shape) -> OccResult<Vec<Shell>> {
        self.base.shape_getters().get_shells(shape)
    }

    /// Whether every edge of the shell borders exactly two faces
    pub fn is_shell_closed(&self, shell: &Shell) -> OccResult<bool> {
        self.base
            .kernel()
            .is_closed(shell.id())
            .during("shell closure")
    }

    /// Total area of the faces of a shell
    pub fn get_shell_surface_area(&self, shell: &Shell) -> OccResult<f64> {
        let faces = self.faces.get_faces(shell.shape())?;
        let refs: Vec<&Face> = faces.iter().collect();
        Ok(self.faces.get_faces_areas(&refs)?.into_iter().sum())
    }
}
