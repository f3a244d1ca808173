//! Shape classification and typed sub-shape access

use std::sync::Arc;

use occ_core::{Orientation, ShapeKind};
use tracing::trace;

use super::{EnumService, IteratorService};
use crate::error::{KernelResultExt, OccError, OccResult};
use crate::kernel::native::markers;
use crate::kernel::{Edge, Face, Kernel, Native, Shape, Shell, Solid, Vertex, Wire};

pub struct ShapeGettersService {
    kernel: Arc<dyn Kernel>,
    enums: Arc<EnumService>,
    iterator: Arc<IteratorService>,
}

impl ShapeGettersService {
    /// Create the shape getters over the explorer
    pub fn new(
        kernel: Arc<dyn Kernel>,
        enums: Arc<EnumService>,
        iterator: Arc<IteratorService>,
    ) -> Self {
        Self {
            kernel,
            enums,
            iterator,
        }
    }

    /// Wrap a raw handle, discovering its kind from the kernel
    pub fn classify(&self, native: Native<markers::Topology>) -> OccResult<Shape> {
        if self.kernel.is_null(native.id()).during("classify shape")? {
            return Ok(Shape::from_parts(native, None));
        }
        let shape_type = self.kernel.shape_type(native.id()).during("classify shape")?;
        let kind = self.enums.shape_kind(shape_type).ok_or_else(|| {
            OccError::ConstructionFailure(format!("kernel returned an untyped shape {shape_type:?}"))
        })?;
        trace!(id = native.id().0, %kind, "classified shape");
        Ok(Shape::from_parts(native, Some(kind)))
    }

    /// Kind of a non-null shape
    pub fn shape_kind(&self, shape: &Shape) -> OccResult<ShapeKind> {
        shape
            .kind()
            .ok_or_else(|| OccError::InvalidInput("shape is null".into()))
    }

    /// New handle on the same entity, typed as its concrete kind
    pub fn actual_type_of_shape(&self, shape: &Shape) -> OccResult<Shape> {
        let kind = self.shape_kind(shape)?;
        let target = self.enums.top_abs(kind);
        let native = Native::from_result(&self.kernel, self.kernel.cast(shape.id(), target))
            .during("cast shape")?;
        Ok(Shape::from_parts(native, Some(kind)))
    }

    /// Orientation of a non-null shape
    pub fn orientation(&self, shape: &Shape) -> OccResult<Orientation> {
        self.shape_kind(shape)?;
        let orientation = self.kernel.orientation(shape.id()).during("shape orientation")?;
        Ok(self.enums.orientation(orientation))
    }

    /// Distinct sub-shapes of `kind`, in traversal order
    pub fn sub_shapes<T>(&self, shape: &Shape, kind: ShapeKind) -> OccResult<Vec<T>>
    where
        T: TryFrom<Shape, Error = OccError>,
    {
        let mut found = Vec::new();
        self.iterator.for_each_sub_shape(shape, kind, |_, sub| {
            found.push(T::try_from(sub)?);
            Ok(())
        })?;
        Ok(found)
    }

    pub fn get_vertices(&self, shape: &Shape) -> OccResult<Vec<Vertex>> {
        self.sub_shapes(shape, ShapeKind::Vertex)
    }

    pub fn get_edges(&self, shape: &Shape) -> OccResult<Vec<Edge>> {
        self.sub_shapes(shape, ShapeKind::Edge)
    }

    pub fn get_wires(&self, shape: &Shape) -> OccResult<Vec<Wire>> {
        self.sub_shapes(shape, ShapeKind::Wire)
    }

    pub fn get_faces(&self, shape: &Shape) -> OccResult<Vec<Face>> {
        self.sub_shapes(shape, ShapeKind::Face)
    }

    pub fn get_shells(&self, shape: &Shape) -> OccResult<Vec<Shell>> {
        self.sub_shapes(shape, ShapeKind::Shell)
    }

    pub fn get_solids(&self, shape: &Shape) -> OccResult<Vec<Solid>> {
        self.sub_shapes(shape, ShapeKind::Solid)
    }

    /// Edges of a wire in connection order, oriented as the wire runs.
    ///
    /// Unlike [`Self::get_edges`], an edge used twice appears twice.
    pub fn get_edges_along_wire(&self, wire: &Wire) -> OccResult<Vec<Edge>> {
        let ids = self.kernel.wire_edges(wire.id()).during("edges along wire")?;
        // adopt everything first so no handle is lost if a conversion fails
        let shapes: Vec<Shape> = ids
            .into_iter()
            .map(|id| Shape::from_parts(Native::adopt(&self.kernel, id), Some(ShapeKind::Edge)))
            .collect();
        shapes.into_iter().map(Edge::try_from).collect()
    }
}
