//! Vertex construction and queries

use std::sync::Arc;

use occ_core::Point3;

use crate::error::{KernelResultExt, OccResult};
use crate::helper::OccBase;
use crate::kernel::{Shape, Vertex};

pub struct VerticesService {
    base: Arc<OccBase>,
}

impl VerticesService {
    /// Create a vertex service
    pub fn new(base: Arc<OccBase>) -> Self {
        Self { base }
    }

    pub fn vertex_from_xyz(&self, x: f64, y: f64, z: f64) -> OccResult<Vertex> {
        self.vertex_from_point([x, y, z])
    }

    /// Vertex at a point
    pub fn vertex_from_point(&self, point: Point3) -> OccResult<Vertex> {
        self.base.vertex_from_point(point)
    }

    pub fn vertices_from_points(&self, points: &[Point3]) -> OccResult<Vec<Vertex>> {
        points.iter().map(|p| self.vertex_from_point(*p)).collect()
    }

    /// Location of a vertex
    pub fn vertex_to_point(&self, vertex: &Vertex) -> OccResult<Point3> {
        self.base
            .kernel()
            .vertex_point(vertex.id())
            .during("vertex point")
    }

    pub fn vertices_to_points(&self, vertices: &[&Vertex]) -> OccResult<Vec<Point3>> {
        vertices.iter().map(|v| self.vertex_to_point(v)).collect()
    }

    /// Distinct vertices of a shape in traversal order
    pub fn get_vertices(&self, shape: &Shape) -> OccResult<Vec<Vertex>> {
        self.base.shape_getters().get_vertices(shape)
    }

    /// Locations of the distinct vertices of a shape
    pub fn get_vertices_as_points(&self, shape: &Shape) -> OccResult<Vec<Point3>> {
        let mut points = Vec::new();
        self.base.for_each_vertex(shape, |_, vertex| {
            points.push(self.vertex_to_point(&vertex)?);
            Ok(())
        })?;
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{fixture, square_wire};

    #[test]
    fn test_vertex_roundtrip() {
        let (memory, occ) = fixture();
        let vertices = occ.vertices();
        let vertex = vertices.vertex_from_xyz(1.0, 2.0, 3.0).unwrap();
        assert_eq!(vertices.vertex_to_point(&vertex).unwrap(), [1.0, 2.0, 3.0]);
        drop(vertex);
        assert_eq!(memory.live_total(), 0);
    }

    #[test]
    fn test_vertices_from_points() {
        let (_memory, occ) = fixture();
        let vertices = occ.vertices();
        let made = vertices
            .vertices_from_points(&[[0.0; 3], [1.0, 1.0, 1.0]])
            .unwrap();
        let refs: Vec<_> = made.iter().collect();
        assert_eq!(
            vertices.vertices_to_points(&refs).unwrap(),
            vec![[0.0; 3], [1.0, 1.0, 1.0]]
        );
    }

    #[test]
    fn test_square_corners_in_order() {
        let (_memory, occ) = fixture();
        let wire = square_wire(&occ, 1.0);
        let points = occ.vertices().get_vertices_as_points(wire.shape()).unwrap();
        assert_eq!(
            points,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]
        );
        assert_eq!(occ.vertices().get_vertices(wire.shape()).unwrap().len(), 4);
    }
}
