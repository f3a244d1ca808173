//! Deterministic sub-shape traversal
//!
//! Sub-shapes are visited once per distinct entity, depth-first in order of
//! first occurrence. A shape of the requested kind visits itself at index 0.
//! Orientation does not affect identity. Callers rely on this order for
//! indexed lookups, so it is part of the contract.

use std::sync::Arc;

use occ_core::ShapeKind;

use super::EnumService;
use crate::error::{KernelResultExt, OccResult};
use crate::kernel::{Kernel, Native, Shape, ShapeMap};

pub struct IteratorService {
    kernel: Arc<dyn Kernel>,
    enums: Arc<EnumService>,
}

impl IteratorService {
    /// Create a sub-shape explorer
    pub fn new(kernel: Arc<dyn Kernel>, enums: Arc<EnumService>) -> Self {
        Self { kernel, enums }
    }

    fn shape_map(&self, shape: &Shape, kind: ShapeKind) -> OccResult<ShapeMap> {
        let kind = self.enums.top_abs(kind);
        ShapeMap::from_result(&self.kernel, self.kernel.new_shape_map(shape.id(), kind))
            .during("explore sub-shapes")
    }

    /// Call `f` with every distinct sub-shape of `kind` and its index.
    ///
    /// Each visited handle is owned by the callback: dropping it releases it,
    /// keeping it moves it out of the traversal. Stops at the first error.
    pub fn for_each_sub_shape<F>(&self, shape: &Shape, kind: ShapeKind, mut f: F) -> OccResult<()>
    where
        F: FnMut(usize, Shape) -> OccResult<()>,
    {
        let map = self.shape_map(shape, kind)?;
        let extent = self.kernel.shape_map_extent(map.id()).during("explore sub-shapes")?;
        for index in 0..extent {
            let item = Native::from_result(&self.kernel, self.kernel.shape_map_item(map.id(), index))
                .during("explore sub-shapes")?;
            f(index, Shape::from_parts(item, Some(kind)))?;
        }
        Ok(())
    }

    /// Number of distinct sub-shapes of `kind`
    pub fn count(&self, shape: &Shape, kind: ShapeKind) -> OccResult<usize> {
        let map = self.shape_map(shape, kind)?;
        self.kernel.shape_map_extent(map.id()).during("explore sub-shapes")
    }

    /// Sub-shape of `kind` at `index` in traversal order
    pub fn nth(&self, shape: &Shape, kind: ShapeKind, index: usize) -> OccResult<Option<Shape>> {
        let map = self.shape_map(shape, kind)?;
        let extent = self.kernel.shape_map_extent(map.id()).during("explore sub-shapes")?;
        if index >= extent {
            return Ok(None);
        }
        let item = Native::from_result(&self.kernel, self.kernel.shape_map_item(map.id(), index))
            .during("explore sub-shapes")?;
        Ok(Some(Shape::from_parts(item, Some(kind))))
    }
}
